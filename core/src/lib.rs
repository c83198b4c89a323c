//! Concord Core Library
//!
//! The simulated ledger every governance contract runs on: addresses and
//! permission ids, action batches, gas metering, the event log and the
//! transactional [`Chain`] host.

pub mod action;
pub mod address;
pub mod chain;
pub mod error;
pub mod event;
pub mod gas;
pub mod interfaces;
pub mod vote;

// Re-export main types
pub use action::{call_id_from_u64, Action, BitMap, CallId, ExecutionResult, MAX_ACTIONS};
pub use address::{Address, PermissionId};
pub use chain::{CallContext, CallOutcome, Chain, Contract, Revert, Tx};
pub use error::{ChainError, ExecuteError, OutOfGas, Result};
pub use event::{Event, LogEntry};
pub use gas::{GasMeter, CALL_BASE_GAS, DEFAULT_GAS_LIMIT};
pub use interfaces::{ActionExecutor, DaoHandle, PermissionCondition, PermissionOracle};
pub use vote::{VoteOption, VotingMode};

/// Genesis timestamp used by [`Chain::new`] (2024-01-01T00:00:00Z)
pub const GENESIS_TIMESTAMP: u64 = 1_704_067_200;

/// Largest representable timestamp; proposal dates are validated against it
pub const MAX_TIMESTAMP: u64 = u64::MAX;
