//! Permission manager
//!
//! Stores `(target, who, permission_id)` grants and answers authorization
//! queries. The owning contract performs the `ROOT_PERMISSION` check before
//! any mutating call reaches this type.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use concord_core::{Address, Chain, Event, PermissionId};

use crate::error::{PermissionError, Result};
use crate::ids::ROOT_PERMISSION_ID;

/// Value stored for a permission key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantRecord {
    Allow,
    Conditional(Address),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionOperation {
    Grant,
    Revoke,
    GrantWithCondition(Address),
}

/// Batch item for a single fixed target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleTargetPermission {
    pub operation: PermissionOperation,
    pub who: Address,
    pub permission_id: PermissionId,
}

/// Batch item carrying its own target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTargetPermission {
    pub operation: PermissionOperation,
    pub target: Address,
    pub who: Address,
    pub permission_id: PermissionId,
}

type PermissionKey = (Address, Address, PermissionId);

#[derive(Debug, Clone)]
pub struct PermissionManager {
    /// Address the registry lives at, reported as `here` in events
    here: Address,
    grants: HashMap<PermissionKey, GrantRecord>,
    /// Permissions that may never be granted to or on `Address::ANY`
    restricted: HashSet<PermissionId>,
}

impl PermissionManager {
    pub fn new(here: Address) -> Self {
        let mut restricted = HashSet::new();
        restricted.insert(*ROOT_PERMISSION_ID);
        Self {
            here,
            grants: HashMap::new(),
            restricted,
        }
    }

    /// Add permissions to the never-wildcard set
    pub fn with_restricted(mut self, ids: impl IntoIterator<Item = PermissionId>) -> Self {
        self.restricted.extend(ids);
        self
    }

    pub fn here(&self) -> Address {
        self.here
    }

    pub fn is_restricted_for_any_address(&self, permission_id: &PermissionId) -> bool {
        self.restricted.contains(permission_id)
    }

    pub fn grant_record(
        &self,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Option<GrantRecord> {
        self.grants.get(&(target, who, permission_id)).copied()
    }

    /// Number of stored grants
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Check whether `who` may use `permission_id` on `target`.
    ///
    /// The exact grant decides if present. Otherwise the `(target, ANY)`
    /// record decides, then `(ANY, who)`; wildcards are only consulted for
    /// permissions outside the restricted set.
    pub fn is_granted(
        &self,
        chain: &Chain,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        if let Some(record) = self.grant_record(target, who, permission_id) {
            return self.evaluate(chain, record, target, who, permission_id, data);
        }
        if self.is_restricted_for_any_address(&permission_id) {
            return false;
        }

        // The first stored wildcard record decides, conditional or not
        [(target, Address::ANY), (Address::ANY, who)]
            .into_iter()
            .find_map(|(t, w)| self.grant_record(t, w, permission_id))
            .map(|record| self.evaluate(chain, record, target, who, permission_id, data))
            .unwrap_or(false)
    }

    fn evaluate(
        &self,
        chain: &Chain,
        record: GrantRecord,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        match record {
            GrantRecord::Allow => true,
            GrantRecord::Conditional(condition) => {
                chain.check_condition(condition, target, who, permission_id, data)
            }
        }
    }

    /// Like [`Self::is_granted`] but fails with `Unauthorized`
    pub fn authorize(
        &self,
        chain: &Chain,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> Result<()> {
        if self.is_granted(chain, target, who, permission_id, data) {
            Ok(())
        } else {
            Err(PermissionError::Unauthorized {
                target,
                who,
                permission_id,
            })
        }
    }

    fn check_wildcards(&self, target: Address, who: Address, permission_id: PermissionId) -> Result<()> {
        if target.is_any() && who.is_any() {
            return Err(PermissionError::AnyAddressDisallowedForWhoAndWhere);
        }
        if (target.is_any() || who.is_any()) && self.is_restricted_for_any_address(&permission_id) {
            return Err(PermissionError::PermissionsForAnyAddressDisallowed(permission_id));
        }
        Ok(())
    }

    /// Unconditional grant. Redundant grants change nothing.
    pub fn grant(
        &mut self,
        chain: &Chain,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.check_wildcards(target, who, permission_id)?;

        let key = (target, who, permission_id);
        if self.grants.contains_key(&key) {
            return Ok(());
        }
        self.grants.insert(key, GrantRecord::Allow);

        log::info!("🔑 Granted {} to {} on {}", permission_id, who, target);
        chain.emit(
            self.here,
            Event::Granted {
                permission_id,
                here: self.here,
                target,
                who,
                condition: None,
            },
        );
        Ok(())
    }

    /// Grant gated by the condition contract at `condition`
    pub fn grant_with_condition(
        &mut self,
        chain: &Chain,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        condition: Address,
    ) -> Result<()> {
        self.check_wildcards(target, who, permission_id)?;
        if !chain.is_condition(&condition) {
            return Err(PermissionError::ConditionInterfaceNotSupported(condition));
        }

        let key = (target, who, permission_id);
        match self.grants.get(&key).copied() {
            Some(GrantRecord::Conditional(current)) if current == condition => return Ok(()),
            Some(record) => {
                let current = match record {
                    GrantRecord::Allow => None,
                    GrantRecord::Conditional(current) => Some(current),
                };
                return Err(PermissionError::PermissionAlreadyGrantedForDifferentCondition {
                    target,
                    who,
                    permission_id,
                    current,
                    requested: condition,
                });
            }
            None => {}
        }
        self.grants.insert(key, GrantRecord::Conditional(condition));

        log::info!(
            "🔑 Granted {} to {} on {} under condition {}",
            permission_id,
            who,
            target,
            condition
        );
        chain.emit(
            self.here,
            Event::Granted {
                permission_id,
                here: self.here,
                target,
                who,
                condition: Some(condition),
            },
        );
        Ok(())
    }

    /// Remove a grant. Revoking a missing grant changes nothing.
    pub fn revoke(
        &mut self,
        chain: &Chain,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        if self.grants.remove(&(target, who, permission_id)).is_none() {
            return Ok(());
        }

        log::info!("🔒 Revoked {} from {} on {}", permission_id, who, target);
        chain.emit(
            self.here,
            Event::Revoked {
                permission_id,
                here: self.here,
                target,
                who,
            },
        );
        Ok(())
    }

    fn apply(
        &mut self,
        chain: &Chain,
        operation: PermissionOperation,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        match operation {
            PermissionOperation::Grant => self.grant(chain, target, who, permission_id),
            PermissionOperation::Revoke => self.revoke(chain, target, who, permission_id),
            PermissionOperation::GrantWithCondition(condition) => {
                self.grant_with_condition(chain, target, who, permission_id, condition)
            }
        }
    }

    /// Apply a batch against one target. Stops at the first failure; the
    /// caller's transaction is expected to roll back.
    pub fn apply_single_target_permissions(
        &mut self,
        chain: &Chain,
        target: Address,
        items: &[SingleTargetPermission],
    ) -> Result<()> {
        for item in items {
            self.apply(chain, item.operation, target, item.who, item.permission_id)?;
        }
        Ok(())
    }

    pub fn apply_multi_target_permissions(
        &mut self,
        chain: &Chain,
        items: &[MultiTargetPermission],
    ) -> Result<()> {
        for item in items {
            self.apply(chain, item.operation, item.target, item.who, item.permission_id)?;
        }
        Ok(())
    }
}
