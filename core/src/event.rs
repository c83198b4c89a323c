//! Change notifications consumed by indexers and off-chain observers.
//!
//! Variant and field names (and their order) are part of the compatibility
//! surface: indexers key on them.

use serde::{Deserialize, Serialize};

use crate::action::{Action, BitMap, CallId};
use crate::address::{Address, PermissionId};
use crate::vote::{VoteOption, VotingMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    Granted {
        permission_id: PermissionId,
        here: Address,
        target: Address,
        who: Address,
        condition: Option<Address>,
    },
    Revoked {
        permission_id: PermissionId,
        here: Address,
        target: Address,
        who: Address,
    },
    Executed {
        actor: Address,
        call_id: CallId,
        actions: Vec<Action>,
        allow_failure_map: BitMap,
        failure_map: BitMap,
        exec_results: Vec<Vec<u8>>,
    },
    MetadataSet {
        metadata: Vec<u8>,
    },
    DaoUriSet {
        dao_uri: String,
    },
    TrustedForwarderSet {
        forwarder: Address,
    },
    StandardCallbackRegistered {
        interface_id: [u8; 4],
        callback_selector: [u8; 4],
        magic_number: [u8; 4],
    },
    CallbackReceived {
        sender: Address,
        selector: [u8; 4],
        data: Vec<u8>,
    },
    Deposited {
        sender: Address,
        token: Address,
        amount: u128,
        reference: String,
    },
    NativeTokenDeposited {
        sender: Address,
        amount: u128,
    },
    ProposalCreated {
        proposal_id: u64,
        creator: Address,
        start_date: u64,
        end_date: u64,
        metadata: Vec<u8>,
        actions: Vec<Action>,
        allow_failure_map: BitMap,
    },
    VoteCast {
        proposal_id: u64,
        voter: Address,
        vote_option: VoteOption,
        voting_power: u128,
    },
    ProposalExecuted {
        proposal_id: u64,
        exec_results: Vec<Vec<u8>>,
        failure_map: BitMap,
    },
    VotingSettingsUpdated {
        voting_mode: VotingMode,
        support_threshold: u32,
        min_participation: u32,
        min_duration: u64,
        min_proposer_voting_power: u128,
    },
    MembersAdded {
        members: Vec<Address>,
    },
    MembersRemoved {
        members: Vec<Address>,
    },
}

/// An event together with the contract that emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub emitter: Address,
    pub block_number: u64,
    pub event: Event,
}
