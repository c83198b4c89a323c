//! Core error types

use thiserror::Error;

use crate::address::{Address, PermissionId};

/// Gas exhausted inside a call frame
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Out of gas: requested {requested}, remaining {remaining}")]
pub struct OutOfGas {
    pub requested: u64,
    pub remaining: u64,
}

/// Ledger host errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Insufficient balance: {account} holds {available}, needs {required}")]
    InsufficientBalance {
        account: Address,
        available: u128,
        required: u128,
    },

    #[error("Address already in use: {0}")]
    AddressInUse(Address),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("No contract deployed at {0}")]
    NoContract(Address),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error(transparent)]
    OutOfGas(#[from] OutOfGas),
}

/// Failures of the action executor (`execute`) capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    #[error("Unauthorized: {who} lacks {permission_id} on {target}")]
    Unauthorized {
        target: Address,
        who: Address,
        permission_id: PermissionId,
    },

    #[error("Too many actions: {count} exceeds the limit of {limit}")]
    TooManyActions { count: usize, limit: usize },

    #[error("Reentrant call")]
    ReentrantCall,

    #[error("Action {index} failed")]
    ActionFailed { index: usize },

    #[error("Insufficient gas forwarded to a tolerated action")]
    InsufficientGas,

    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub type Result<T> = std::result::Result<T, ChainError>;
