//! Well-known permission identifiers

use std::sync::LazyLock;

use concord_core::PermissionId;

/// Administers the permission registry itself
pub static ROOT_PERMISSION_ID: LazyLock<PermissionId> =
    LazyLock::new(|| PermissionId::named("ROOT_PERMISSION"));
