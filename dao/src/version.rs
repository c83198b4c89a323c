//! Protocol versions and versioned DAO state
//!
//! Each protocol version that changes the stored layout gets its own state
//! struct. Upgrades convert the previous struct with an explicit `migrate`.

use serde::{Deserialize, Serialize};
use std::fmt;

use concord_core::Address;
use concord_permission::PermissionManager;

use crate::callback::{CallbackRegistry, Selector};
use crate::ids::restricted_permissions;

/// Semantic `(major, minor, patch)` protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProtocolVersion(pub u8, pub u8, pub u8);

impl ProtocolVersion {
    pub const CURRENT: ProtocolVersion = ProtocolVersion(1, 3, 0);
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Stored state of 1.0 to 1.2 deployments
#[derive(Debug, Clone)]
pub struct DaoStateV1 {
    pub metadata: Vec<u8>,
    pub dao_uri: String,
    pub trusted_forwarder: Address,
    pub permissions: PermissionManager,
    /// Registration log of `(interface_id, callback_selector, magic_number)`
    pub standard_callbacks: Vec<(Selector, Selector, Selector)>,
}

impl DaoStateV1 {
    /// Convert to the current layout.
    ///
    /// The callback log is replayed into the registry (later registrations
    /// win) and the permission manager picks up the full never-wildcard set.
    pub fn migrate(self) -> DaoState {
        let mut callbacks = CallbackRegistry::new();
        for (interface_id, selector, magic) in self.standard_callbacks {
            callbacks.register(interface_id, selector, magic);
        }

        DaoState {
            version: Some(ProtocolVersion::CURRENT),
            metadata: self.metadata,
            dao_uri: self.dao_uri,
            trusted_forwarder: self.trusted_forwarder,
            permissions: self.permissions.with_restricted(restricted_permissions()),
            callbacks,
        }
    }
}

/// Current stored state
#[derive(Debug, Clone)]
pub struct DaoState {
    /// `None` until initialized
    pub version: Option<ProtocolVersion>,
    pub metadata: Vec<u8>,
    pub dao_uri: String,
    pub trusted_forwarder: Address,
    pub permissions: PermissionManager,
    pub callbacks: CallbackRegistry,
}

impl DaoState {
    pub fn new(address: Address) -> Self {
        Self {
            version: None,
            metadata: Vec::new(),
            dao_uri: String::new(),
            trusted_forwarder: Address::ZERO,
            permissions: PermissionManager::new(address).with_restricted(restricted_permissions()),
            callbacks: CallbackRegistry::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.version.is_some()
    }
}
