//! Concord Permission Registry
//!
//! Grants, revokes and checks `(target, who, permission_id)` relations,
//! optionally gated by a condition contract.

pub mod error;
pub mod ids;
pub mod manager;

pub use error::{PermissionError, Result};
pub use ids::ROOT_PERMISSION_ID;
pub use manager::{
    GrantRecord, MultiTargetPermission, PermissionManager, PermissionOperation,
    SingleTargetPermission,
};
