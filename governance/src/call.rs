//! Byte interface of the voting plugin
//!
//! Calls are bincode-encoded so that proposals can target the plugin (for
//! example to update its own settings).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use concord_core::{Action, Address, VoteOption};

use crate::error::{GovernanceError, Result};
use crate::proposal::NewProposal;
use crate::settings::VotingSettings;

pub(crate) fn encode_call<T: Serialize>(call: &T) -> Vec<u8> {
    // In-memory serialization into a Vec cannot fail
    bincode::serialize(call).unwrap_or_default()
}

pub(crate) fn decode_call<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| GovernanceError::InvalidCallData(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotingCall {
    /// Returns the new proposal id as bincode `u64`
    CreateProposal(NewProposal),
    Vote {
        proposal_id: u64,
        vote_option: VoteOption,
        try_early_execution: bool,
    },
    Execute {
        proposal_id: u64,
    },
    UpdateVotingSettings(VotingSettings),
}

impl VotingCall {
    pub fn encode(&self) -> Vec<u8> {
        encode_call(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_call(bytes)
    }

    /// Wrap this call into an action targeting the plugin at `plugin`
    pub fn into_action(self, plugin: Address) -> Action {
        Action::new(plugin, 0, self.encode())
    }
}
