//! Byte interface of the DAO contract
//!
//! Actions address the DAO with a bincode-encoded [`DaoCall`]. An empty
//! payload is a plain native-token transfer.

use serde::{Deserialize, Serialize};

use concord_core::{Action, Address, BitMap, CallId, PermissionId};
use concord_permission::{MultiTargetPermission, SingleTargetPermission};

use crate::callback::Selector;
use crate::error::{DaoError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaoCall {
    Execute {
        call_id: CallId,
        actions: Vec<Action>,
        allow_failure_map: BitMap,
    },
    Grant {
        target: Address,
        who: Address,
        permission_id: PermissionId,
    },
    GrantWithCondition {
        target: Address,
        who: Address,
        permission_id: PermissionId,
        condition: Address,
    },
    Revoke {
        target: Address,
        who: Address,
        permission_id: PermissionId,
    },
    ApplySingleTargetPermissions {
        target: Address,
        items: Vec<SingleTargetPermission>,
    },
    ApplyMultiTargetPermissions {
        items: Vec<MultiTargetPermission>,
    },
    SetMetadata(Vec<u8>),
    SetDaoUri(String),
    SetTrustedForwarder(Address),
    RegisterStandardCallback {
        interface_id: Selector,
        callback_selector: Selector,
        magic_number: Selector,
    },
    Deposit {
        token: Address,
        amount: u128,
        reference: String,
    },
    /// Hook invoked by third parties (e.g. token-received callbacks)
    Callback {
        selector: Selector,
        data: Vec<u8>,
    },
}

impl DaoCall {
    pub fn encode(&self) -> Vec<u8> {
        // Serializing an in-memory enum into a Vec cannot fail
        bincode::serialize(self).unwrap_or_default()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| DaoError::InvalidCallData(e.to_string()))
    }

    /// Wrap this call into an action targeting `dao`
    pub fn into_action(self, dao: Address) -> Action {
        Action::new(dao, 0, self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            DaoCall::decode(&[0xff, 0xff, 0xff, 0xff]),
            Err(DaoError::InvalidCallData(_))
        ));
    }

    #[test]
    fn test_into_action() {
        let dao = Address::derive("dao");
        let call = DaoCall::SetDaoUri("https://dao.example".to_string());
        let action = call.clone().into_action(dao);

        assert_eq!(action.to, dao);
        assert_eq!(action.value, 0);
        assert_eq!(DaoCall::decode(&action.data).unwrap(), call);
    }
}
