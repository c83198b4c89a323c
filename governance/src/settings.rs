//! Voting settings of a plugin

use serde::{Deserialize, Serialize};

use concord_core::VotingMode;

use crate::error::{GovernanceError, Result};
use crate::tally::RATIO_BASE;

/// Shortest allowed voting window (1 hour)
pub const MIN_DURATION_LOWER_BOUND: u64 = 60 * 60;

/// Longest allowed voting window (365 days)
pub const MIN_DURATION_UPPER_BOUND: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSettings {
    #[serde(default)]
    pub voting_mode: VotingMode,
    /// Share of yes votes among yes+no that must be exceeded, out of `RATIO_BASE`
    pub support_threshold: u32,
    /// Share of the total voting power that must take part, out of `RATIO_BASE`
    pub min_participation: u32,
    /// Minimum voting window in seconds
    pub min_duration: u64,
    #[serde(default)]
    pub min_proposer_voting_power: u128,
}

impl VotingSettings {
    pub fn validate(&self) -> Result<()> {
        if self.support_threshold > RATIO_BASE - 1 {
            return Err(GovernanceError::RatioOutOfBounds {
                limit: RATIO_BASE - 1,
                actual: self.support_threshold,
            });
        }
        if self.min_participation > RATIO_BASE {
            return Err(GovernanceError::RatioOutOfBounds {
                limit: RATIO_BASE,
                actual: self.min_participation,
            });
        }
        if self.min_duration < MIN_DURATION_LOWER_BOUND {
            return Err(GovernanceError::MinDurationOutOfBounds {
                limit: MIN_DURATION_LOWER_BOUND,
                actual: self.min_duration,
            });
        }
        if self.min_duration > MIN_DURATION_UPPER_BOUND {
            return Err(GovernanceError::MinDurationOutOfBounds {
                limit: MIN_DURATION_UPPER_BOUND,
                actual: self.min_duration,
            });
        }
        Ok(())
    }
}
