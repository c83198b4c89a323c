//! Concord Governance
//!
//! Majority voting plugin for a Concord DAO: proposals, snapshot-based
//! voting power, tallying and the execution gate.

pub mod call;
pub mod config;
pub mod error;
pub mod ids;
pub mod power;
pub mod proposal;
pub mod settings;
pub mod tally;
pub mod voting;

pub use call::VotingCall;
pub use config::PluginConfig;
pub use error::{ConfigError, GovernanceError, Result};
pub use ids::{
    CREATE_PROPOSAL_PERMISSION_ID, UPDATE_ADDRESSES_PERMISSION_ID,
    UPDATE_VOTING_SETTINGS_PERMISSION_ID,
};
pub use power::{AddressList, AddressListCall, Checkpoints, TokenCall, TokenSnapshot, VotingPowerSource};
pub use proposal::{NewProposal, Proposal, ProposalParameters, ProposalStatus, VoteRecord};
pub use settings::{VotingSettings, MIN_DURATION_LOWER_BOUND, MIN_DURATION_UPPER_BOUND};
pub use tally::{Tally, RATIO_BASE};
pub use voting::{validate_proposal_dates, VotingPlugin};
