//! Action executor
//!
//! Runs an ordered batch of external calls from the DAO's address. Each
//! action either succeeds, fails the whole batch, or (if its bit is set in
//! the allow-failure map) fails on its own and is recorded in the returned
//! failure map.

use std::cell::Cell;

use concord_core::{Action, BitMap, CallContext, ExecuteError, ExecutionResult, MAX_ACTIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReentrancyStatus {
    /// Fresh or pre-1.3 deployment that never set the flag
    #[default]
    Unset,
    NotEntered,
    Entered,
}

/// Scoped lock over a reentrancy flag, released when dropped
pub struct ReentrancyGuard<'a> {
    status: &'a Cell<ReentrancyStatus>,
}

impl<'a> ReentrancyGuard<'a> {
    pub fn enter(status: &'a Cell<ReentrancyStatus>) -> Result<Self, ExecuteError> {
        if status.get() == ReentrancyStatus::Entered {
            return Err(ExecuteError::ReentrantCall);
        }
        status.set(ReentrancyStatus::Entered);
        Ok(Self { status })
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.status.set(ReentrancyStatus::NotEntered);
    }
}

pub fn check_batch_size(actions: &[Action]) -> Result<(), ExecuteError> {
    if actions.len() > MAX_ACTIONS {
        return Err(ExecuteError::TooManyActions {
            count: actions.len(),
            limit: MAX_ACTIONS,
        });
    }
    Ok(())
}

/// Run `actions` from `ctx.address()`.
///
/// A tolerated failure that left the frame with less than 1/64 of the gas it
/// had before the call fails with `InsufficientGas`: the action most likely
/// failed for lack of gas rather than on its own terms.
pub fn run_actions(
    ctx: &mut CallContext<'_>,
    actions: &[Action],
    allow_failure_map: BitMap,
) -> Result<ExecutionResult, ExecuteError> {
    check_batch_size(actions)?;

    let mut result = ExecutionResult {
        exec_results: Vec::with_capacity(actions.len()),
        failure_map: BitMap::empty(),
    };

    for (index, action) in actions.iter().enumerate() {
        // MAX_ACTIONS keeps every index within the bitmap
        let bit = index as u8;

        let gas_before = ctx.gas_left();
        let outcome = ctx.call(action.to, action.value, &action.data);
        let gas_after = ctx.gas_left();

        if !outcome.success {
            if !allow_failure_map.has_bit(bit) {
                log::warn!("Action {} to {} failed", index, action.to);
                return Err(ExecuteError::ActionFailed { index });
            }
            if gas_after < gas_before / 64 {
                return Err(ExecuteError::InsufficientGas);
            }
            log::debug!("Tolerated failure of action {} to {}", index, action.to);
            result.failure_map.flip_bit(bit);
        }
        result.exec_results.push(outcome.output);
    }

    Ok(result)
}
