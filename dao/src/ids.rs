//! Permissions guarding the DAO's own operations

use std::sync::LazyLock;

use concord_core::PermissionId;
use concord_permission::ROOT_PERMISSION_ID;

pub static EXECUTE_PERMISSION_ID: LazyLock<PermissionId> =
    LazyLock::new(|| PermissionId::named("EXECUTE_PERMISSION"));

pub static UPGRADE_DAO_PERMISSION_ID: LazyLock<PermissionId> =
    LazyLock::new(|| PermissionId::named("UPGRADE_DAO_PERMISSION"));

pub static SET_METADATA_PERMISSION_ID: LazyLock<PermissionId> =
    LazyLock::new(|| PermissionId::named("SET_METADATA_PERMISSION"));

pub static SET_TRUSTED_FORWARDER_PERMISSION_ID: LazyLock<PermissionId> =
    LazyLock::new(|| PermissionId::named("SET_TRUSTED_FORWARDER_PERMISSION"));

pub static REGISTER_STANDARD_CALLBACK_PERMISSION_ID: LazyLock<PermissionId> =
    LazyLock::new(|| PermissionId::named("REGISTER_STANDARD_CALLBACK_PERMISSION"));

/// Permissions that can never be granted to or on `Address::ANY`
pub fn restricted_permissions() -> [PermissionId; 6] {
    [
        *ROOT_PERMISSION_ID,
        *EXECUTE_PERMISSION_ID,
        *UPGRADE_DAO_PERMISSION_ID,
        *SET_METADATA_PERMISSION_ID,
        *SET_TRUSTED_FORWARDER_PERMISSION_ID,
        *REGISTER_STANDARD_CALLBACK_PERMISSION_ID,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_permission_id() {
        assert_eq!(
            EXECUTE_PERMISSION_ID.to_string(),
            "0xbf04b4486c9663d805744005c3da000eda93de6e3308a4a7a812eb565327b78d"
        );
    }

    #[test]
    fn test_restricted_ids_are_distinct() {
        let ids = restricted_permissions();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
