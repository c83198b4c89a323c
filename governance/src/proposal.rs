//! Proposal records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use concord_core::{Action, Address, BitMap, VoteOption, VotingMode};

use crate::tally::{
    is_min_participation_reached, is_support_threshold_reached_early, Tally, Window,
};

/// Settings frozen into a proposal at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalParameters {
    pub voting_mode: VotingMode,
    pub support_threshold: u32,
    pub start_date: u64,
    pub end_date: u64,
    /// Block whose closing state defines voting power
    pub snapshot_block: u64,
    /// Participation needed, in absolute voting power
    pub min_voting_power: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub option: VoteOption,
    pub voting_power: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Active,
    Executed,
    /// Voting ended without execution. A passed proposal can still be
    /// executed in this state.
    Expired,
}

/// Arguments of `create_proposal`
///
/// Zero dates are normalized: a zero start means "now" and a zero end means
/// "start plus the minimum duration". A vote option other than `None` is cast
/// for the creator right away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProposal {
    pub metadata: Vec<u8>,
    pub actions: Vec<Action>,
    pub allow_failure_map: BitMap,
    pub start_date: u64,
    pub end_date: u64,
    pub try_early_execution: bool,
    pub vote_option: VoteOption,
}

impl NewProposal {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            actions,
            ..Self::default()
        }
    }

    pub fn metadata(mut self, metadata: impl Into<Vec<u8>>) -> Self {
        self.metadata = metadata.into();
        self
    }

    pub fn allow_failure_map(mut self, allow_failure_map: BitMap) -> Self {
        self.allow_failure_map = allow_failure_map;
        self
    }

    pub fn dates(mut self, start_date: u64, end_date: u64) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    /// Cast `vote_option` for the creator as part of the creation
    pub fn vote(mut self, vote_option: VoteOption, try_early_execution: bool) -> Self {
        self.vote_option = vote_option;
        self.try_early_execution = try_early_execution;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub creator: Address,
    pub metadata: Vec<u8>,
    pub actions: Vec<Action>,
    pub allow_failure_map: BitMap,
    pub parameters: ProposalParameters,
    pub tally: Tally,
    pub executed: bool,
    pub votes: BTreeMap<Address, VoteRecord>,
}

impl Proposal {
    pub fn window(&self, now: u64) -> Window {
        Window::at(self.parameters.start_date, self.parameters.end_date, now)
    }

    /// Open for votes: started, not ended and not executed
    pub fn is_open(&self, now: u64) -> bool {
        !self.executed && self.window(now) == Window::Open
    }

    /// Outcome is final before the end date: early execution is enabled and
    /// the result cannot change whatever the remaining voters do
    pub fn is_decided_early(&self, total_voting_power: u128) -> bool {
        self.parameters.voting_mode.early_execution()
            && is_support_threshold_reached_early(
                &self.tally,
                self.parameters.support_threshold,
                total_voting_power,
            )
            && is_min_participation_reached(&self.tally, self.parameters.min_voting_power)
    }

    /// Lifecycle state at `now`.
    ///
    /// A proposal decided early stays `Active` past its end date until it is
    /// executed. `total_voting_power` is the power at the snapshot block.
    pub fn status(&self, now: u64, total_voting_power: u128) -> ProposalStatus {
        if self.executed {
            return ProposalStatus::Executed;
        }
        match self.window(now) {
            Window::NotStarted => ProposalStatus::Pending,
            Window::Open => ProposalStatus::Active,
            Window::Ended if self.is_decided_early(total_voting_power) => ProposalStatus::Active,
            Window::Ended => ProposalStatus::Expired,
        }
    }

    pub fn vote_of(&self, voter: &Address) -> Option<VoteRecord> {
        self.votes.get(voter).copied()
    }

    /// Replace `voter`'s contribution to the tally with `option` at `power`
    pub(crate) fn record_vote(&mut self, voter: Address, option: VoteOption, power: u128) {
        if let Some(previous) = self.votes.get(&voter) {
            self.tally.retract(previous.option, previous.voting_power);
        }
        self.tally.add(option, power);
        self.votes.insert(
            voter,
            VoteRecord {
                option,
                voting_power: power,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Proposal {
        Proposal {
            id: 0,
            creator: Address::derive("creator"),
            metadata: Vec::new(),
            actions: Vec::new(),
            allow_failure_map: BitMap::empty(),
            parameters: ProposalParameters {
                voting_mode: VotingMode::VoteReplacement,
                support_threshold: 500_000,
                start_date: 100,
                end_date: 200,
                snapshot_block: 1,
                min_voting_power: 1,
            },
            tally: Tally::default(),
            executed: false,
            votes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_status() {
        let mut p = proposal();
        assert_eq!(p.status(99, 10), ProposalStatus::Pending);
        assert_eq!(p.status(100, 10), ProposalStatus::Active);
        assert_eq!(p.status(200, 10), ProposalStatus::Expired);
        p.executed = true;
        assert_eq!(p.status(150, 10), ProposalStatus::Executed);
        assert!(!p.is_open(150));
    }

    #[test]
    fn test_decided_proposal_stays_active() {
        let mut p = proposal();
        p.parameters.voting_mode = VotingMode::EarlyExecution;
        p.tally = Tally { yes: 6, no: 0, abstain: 0 };

        assert!(p.is_decided_early(10));
        assert_eq!(p.status(200, 10), ProposalStatus::Active);
        assert_eq!(p.status(10_000, 10), ProposalStatus::Active);
        // Voting itself still closes at the end date
        assert!(!p.is_open(200));

        // Not locked in: 5 yes could still be matched by 5 no
        p.tally.yes = 5;
        assert_eq!(p.status(200, 10), ProposalStatus::Expired);

        // Same tally without early execution expires normally
        p.tally.yes = 6;
        p.parameters.voting_mode = VotingMode::Standard;
        assert_eq!(p.status(200, 10), ProposalStatus::Expired);
    }

    #[test]
    fn test_replacement_never_double_counts() {
        let mut p = proposal();
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");

        p.record_vote(alice, VoteOption::Yes, 5);
        p.record_vote(bob, VoteOption::No, 3);
        p.record_vote(alice, VoteOption::Abstain, 5);
        p.record_vote(alice, VoteOption::No, 5);

        assert_eq!(p.tally, Tally { yes: 0, no: 8, abstain: 0 });
        assert_eq!(p.tally.casted(), 8);
        assert_eq!(p.vote_of(&alice).map(|v| v.option), Some(VoteOption::No));
    }
}
