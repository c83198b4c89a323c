//! Permissions checked by the voting plugin and its member list

use std::sync::LazyLock;

use concord_core::PermissionId;

pub static CREATE_PROPOSAL_PERMISSION_ID: LazyLock<PermissionId> =
    LazyLock::new(|| PermissionId::named("CREATE_PROPOSAL_PERMISSION"));

pub static UPDATE_VOTING_SETTINGS_PERMISSION_ID: LazyLock<PermissionId> =
    LazyLock::new(|| PermissionId::named("UPDATE_VOTING_SETTINGS_PERMISSION"));

pub static UPDATE_ADDRESSES_PERMISSION_ID: LazyLock<PermissionId> =
    LazyLock::new(|| PermissionId::named("UPDATE_ADDRESSES_PERMISSION"));
