//! Permission registry error types

use concord_core::{Address, PermissionId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("Unauthorized: {who} lacks {permission_id} on {target}")]
    Unauthorized {
        target: Address,
        who: Address,
        permission_id: PermissionId,
    },

    #[error("Target and caller cannot both be the wildcard address")]
    AnyAddressDisallowedForWhoAndWhere,

    #[error("Permission {0} cannot be granted to or on the wildcard address")]
    PermissionsForAnyAddressDisallowed(PermissionId),

    #[error("Permission {permission_id} for {who} on {target} already granted with condition {current:?}, not {requested}")]
    PermissionAlreadyGrantedForDifferentCondition {
        target: Address,
        who: Address,
        permission_id: PermissionId,
        /// `None` when the existing grant is unconditional
        current: Option<Address>,
        requested: Address,
    },

    #[error("Condition interface not supported by {0}")]
    ConditionInterfaceNotSupported(Address),
}

pub type Result<T> = std::result::Result<T, PermissionError>;
