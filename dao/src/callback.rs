//! Standard callback registry
//!
//! Maps 4-byte callback selectors (e.g. token-received hooks) to the magic
//! value the DAO answers with. Interface ids registered alongside are
//! reported by `supports_interface`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type Selector = [u8; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    Handled(Selector),
    Unhandled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackRegistry {
    callbacks: BTreeMap<Selector, Selector>,
    interfaces: BTreeSet<Selector>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) the magic number returned for `callback_selector`
    pub fn register(&mut self, interface_id: Selector, callback_selector: Selector, magic_number: Selector) {
        self.interfaces.insert(interface_id);
        self.callbacks.insert(callback_selector, magic_number);
    }

    pub fn handle(&self, selector: Selector) -> CallbackResult {
        match self.callbacks.get(&selector) {
            Some(magic) => CallbackResult::Handled(*magic),
            None => CallbackResult::Unhandled,
        }
    }

    pub fn supports_interface(&self, interface_id: &Selector) -> bool {
        self.interfaces.contains(interface_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC721_RECEIVED: Selector = [0x15, 0x0b, 0x7a, 0x02];

    #[test]
    fn test_unregistered_selector_is_unhandled() {
        let registry = CallbackRegistry::new();
        assert_eq!(registry.handle(ERC721_RECEIVED), CallbackResult::Unhandled);
    }

    #[test]
    fn test_register_and_handle() {
        let mut registry = CallbackRegistry::new();
        let interface_id = [0x80, 0xac, 0x58, 0xcd];
        registry.register(interface_id, ERC721_RECEIVED, ERC721_RECEIVED);

        assert_eq!(registry.handle(ERC721_RECEIVED), CallbackResult::Handled(ERC721_RECEIVED));
        assert!(registry.supports_interface(&interface_id));
        assert!(!registry.supports_interface(&[0; 4]));
    }
}
