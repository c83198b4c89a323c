//! Voting power sources
//!
//! A plugin reads voting power as of a proposal's snapshot block, so every
//! source keeps a per-block history instead of only current values.

pub mod address_list;
pub mod checkpoints;
pub mod token;

use concord_core::Address;

pub use address_list::{AddressList, AddressListCall};
pub use checkpoints::Checkpoints;
pub use token::{TokenCall, TokenSnapshot};

pub trait VotingPowerSource {
    /// Power of `account` at the end of `block`
    fn voting_power(&self, account: &Address, block: u64) -> u128;

    fn total_voting_power(&self, block: u64) -> u128;

    /// Power of `account` as of now
    fn current_voting_power(&self, account: &Address) -> u128;
}
