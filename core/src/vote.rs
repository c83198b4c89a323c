//! Vote options and voting modes shared by the voting plugin and the event log

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VoteOption {
    #[default]
    None,
    Abstain,
    Yes,
    No,
}

/// How a proposal treats early execution and changed votes.
///
/// Early execution and vote replacement are mutually exclusive: once votes
/// can change, no outcome is locked in before the end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VotingMode {
    #[default]
    Standard,
    EarlyExecution,
    VoteReplacement,
}

impl VotingMode {
    pub fn early_execution(&self) -> bool {
        matches!(self, VotingMode::EarlyExecution)
    }

    pub fn vote_replacement(&self) -> bool {
        matches!(self, VotingMode::VoteReplacement)
    }
}
