//! Capability interfaces between the governance components
//!
//! The DAO is handed to plugins through these traits instead of concrete
//! types, so a plugin only sees "check a permission" and "run a batch".

use crate::action::{Action, BitMap, CallId, ExecutionResult};
use crate::address::{Address, PermissionId};
use crate::chain::{CallContext, Chain};
use crate::error::ExecuteError;

/// Dynamic check attached to a conditional permission grant
pub trait PermissionCondition {
    fn is_granted(
        &self,
        chain: &Chain,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool;
}

/// Authorization gate exposed by the permission registry owner
pub trait PermissionOracle {
    fn has_permission(
        &self,
        chain: &Chain,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool;
}

/// Runs action batches on behalf of an authorized caller.
///
/// `ctx` must be a frame whose address is the executor and whose sender is
/// the caller being authorized.
pub trait ActionExecutor {
    fn executor_address(&self) -> Address;

    fn execute(
        &self,
        ctx: &mut CallContext<'_>,
        call_id: CallId,
        actions: &[Action],
        allow_failure_map: BitMap,
    ) -> Result<ExecutionResult, ExecuteError>;
}

/// Everything a governance plugin needs from its DAO
pub trait DaoHandle: PermissionOracle + ActionExecutor {}

impl<T: PermissionOracle + ActionExecutor> DaoHandle for T {}
