//! Block-indexed value history

use serde::{Deserialize, Serialize};

/// Values recorded per block, ascending by block number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoints {
    history: Vec<(u64, u128)>,
}

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` as of `block`. Writes within the same block overwrite
    /// each other; `block` must not precede the latest checkpoint.
    pub fn push(&mut self, block: u64, value: u128) {
        match self.history.last_mut() {
            Some((last, current)) if *last == block => *current = value,
            _ => {
                debug_assert!(self.history.last().map_or(true, |(last, _)| *last < block));
                self.history.push((block, value));
            }
        }
    }

    pub fn latest(&self) -> u128 {
        self.history.last().map(|(_, value)| *value).unwrap_or(0)
    }

    /// Value at the end of `block`
    pub fn at(&self, block: u64) -> u128 {
        let index = self.history.partition_point(|(b, _)| *b <= block);
        if index == 0 {
            0
        } else {
            self.history[index - 1].1
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut cp = Checkpoints::new();
        assert_eq!(cp.at(100), 0);

        cp.push(5, 10);
        cp.push(8, 3);
        assert_eq!(cp.at(4), 0);
        assert_eq!(cp.at(5), 10);
        assert_eq!(cp.at(7), 10);
        assert_eq!(cp.at(8), 3);
        assert_eq!(cp.at(u64::MAX), 3);
        assert_eq!(cp.latest(), 3);
    }

    #[test]
    fn test_same_block_overwrites() {
        let mut cp = Checkpoints::new();
        cp.push(5, 10);
        cp.push(5, 12);
        assert_eq!(cp.len(), 1);
        assert_eq!(cp.at(5), 12);
    }
}
