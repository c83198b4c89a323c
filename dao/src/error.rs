//! DAO error types

use concord_core::{Address, ChainError, ExecuteError};
use concord_permission::PermissionError;
use thiserror::Error;

use crate::version::ProtocolVersion;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DaoError {
    #[error("DAO already initialized")]
    AlreadyInitialized,

    #[error("Upgrade from protocol version {0} not supported")]
    ProtocolVersionUpgradeNotSupported(ProtocolVersion),

    #[error("Deposit amount mismatch: declared {expected}, attached {actual}")]
    NativeTokenDepositAmountMismatch { expected: u128, actual: u128 },

    #[error("Zero amount")]
    ZeroAmount,

    #[error("Token {0} not supported, only native deposits are accepted")]
    UnsupportedToken(Address),

    #[error("Unknown callback selector 0x{}", hex::encode(.0))]
    UnknownCallback([u8; 4]),

    #[error("Invalid call data: {0}")]
    InvalidCallData(String),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Errors loading a [`crate::DaoConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, DaoError>;
