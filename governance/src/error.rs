//! Governance error types

use concord_core::{Address, ChainError, ExecuteError, PermissionId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Plugin already initialized")]
    AlreadyInitialized,

    #[error("Plugin not initialized")]
    NotInitialized,

    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Proposal creation forbidden for {0}")]
    ProposalCreationForbidden(Address),

    #[error("No voting power at the snapshot block")]
    NoVotingPower,

    #[error("Date out of bounds: limit {limit}, actual {actual}")]
    DateOutOfBounds { limit: u64, actual: u64 },

    #[error("Too many actions: {count} exceeds the limit of {limit}")]
    TooManyActions { count: usize, limit: usize },

    #[error("Vote cast forbidden on proposal {proposal_id} for {voter}")]
    VoteCastForbidden { proposal_id: u64, voter: Address },

    #[error("Vote replacement not allowed on proposal {proposal_id} for {voter}")]
    VoteReplacementNotAllowed { proposal_id: u64, voter: Address },

    #[error("Proposal execution forbidden: {0}")]
    ProposalExecutionForbidden(u64),

    #[error("Ratio out of bounds: limit {limit}, actual {actual}")]
    RatioOutOfBounds { limit: u32, actual: u32 },

    #[error("Minimum duration out of bounds: limit {limit}, actual {actual}")]
    MinDurationOutOfBounds { limit: u64, actual: u64 },

    #[error("Unauthorized: {who} lacks {permission_id} on {target}")]
    Unauthorized {
        target: Address,
        who: Address,
        permission_id: PermissionId,
    },

    #[error("Invalid address list update for {0}")]
    InvalidAddresslistUpdate(Address),

    #[error("Insufficient balance: {account} holds {available}, needs {required}")]
    InsufficientBalance {
        account: Address,
        available: u128,
        required: u128,
    },

    #[error("Invalid call data: {0}")]
    InvalidCallData(String),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Errors loading a [`crate::PluginConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] GovernanceError),
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
