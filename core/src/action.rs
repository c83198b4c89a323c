//! Action batches and the 256-bit allow-failure bitmap

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Maximum number of actions a single batch may carry
pub const MAX_ACTIONS: usize = 256;

/// Identifier correlating an execution with its caller (proposal id, nonce, ...)
pub type CallId = [u8; 32];

/// Encode a numeric id (e.g. a proposal id) as a big-endian call id
pub fn call_id_from_u64(id: u64) -> CallId {
    let mut call_id = [0u8; 32];
    call_id[24..].copy_from_slice(&id.to_be_bytes());
    call_id
}

/// A single external call: target, native value and opaque payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

impl Action {
    pub fn new(to: Address, value: u128, data: Vec<u8>) -> Self {
        Self { to, value, data }
    }

    /// A plain native-token transfer with no payload
    pub fn transfer(to: Address, value: u128) -> Self {
        Self::new(to, value, Vec::new())
    }
}

/// One bit per action index (0..=255)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BitMap([u64; 4]);

impl BitMap {
    pub const fn empty() -> Self {
        Self([0; 4])
    }

    pub fn from_indices(indices: &[u8]) -> Self {
        let mut map = Self::empty();
        for index in indices {
            map.set_bit(*index);
        }
        map
    }

    pub fn has_bit(&self, index: u8) -> bool {
        let (word, bit) = Self::position(index);
        self.0[word] & (1u64 << bit) != 0
    }

    pub fn flip_bit(&mut self, index: u8) {
        let (word, bit) = Self::position(index);
        self.0[word] ^= 1u64 << bit;
    }

    pub fn set_bit(&mut self, index: u8) {
        let (word, bit) = Self::position(index);
        self.0[word] |= 1u64 << bit;
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|word| *word == 0)
    }

    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|word| word.count_ones()).sum()
    }

    fn position(index: u8) -> (usize, u32) {
        ((index / 64) as usize, (index % 64) as u32)
    }
}

/// Output of a batch execution: results aligned 1:1 with the actions and the
/// bits of tolerated failures
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exec_results: Vec<Vec<u8>>,
    pub failure_map: BitMap,
}
