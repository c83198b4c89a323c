//! Checkpointed member list: one unit of voting power per member
//!
//! Membership changes take effect at the block they are made in, so
//! proposals whose snapshot precedes the change are unaffected.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use concord_core::{Address, CallContext, Chain, Contract, DaoHandle, Event, Revert};

use super::checkpoints::Checkpoints;
use super::VotingPowerSource;
use crate::call::{decode_call, encode_call};
use crate::error::{GovernanceError, Result};
use crate::ids::UPDATE_ADDRESSES_PERMISSION_ID;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressListCall {
    AddAddresses(Vec<Address>),
    RemoveAddresses(Vec<Address>),
}

impl AddressListCall {
    pub fn encode(&self) -> Vec<u8> {
        encode_call(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_call(bytes)
    }
}

#[derive(Debug, Clone, Default)]
struct Members {
    listed: BTreeMap<Address, Checkpoints>,
    count: Checkpoints,
}

pub struct AddressList {
    address: Address,
    dao: Rc<dyn DaoHandle>,
    state: RefCell<Members>,
}

impl AddressList {
    pub fn new(address: Address, dao: Rc<dyn DaoHandle>) -> Self {
        Self {
            address,
            dao,
            state: RefCell::new(Members::default()),
        }
    }

    /// Deploy with a genesis member set recorded at the current block
    pub fn deploy(
        chain: &Chain,
        address: Address,
        dao: Rc<dyn DaoHandle>,
        members: &[Address],
    ) -> Result<Rc<Self>> {
        let list = Rc::new(Self::new(address, dao));
        list.record(chain, members, true)?;
        chain.deploy(address, list.clone())?;
        Ok(list)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_listed(&self, account: &Address) -> bool {
        self.state
            .borrow()
            .listed
            .get(account)
            .map(|cp| cp.latest() == 1)
            .unwrap_or(false)
    }

    pub fn is_listed_at_block(&self, account: &Address, block: u64) -> bool {
        self.state
            .borrow()
            .listed
            .get(account)
            .map(|cp| cp.at(block) == 1)
            .unwrap_or(false)
    }

    pub fn member_count(&self) -> u128 {
        self.state.borrow().count.latest()
    }

    fn authorize(&self, ctx: &CallContext<'_>) -> Result<()> {
        let permission_id = *UPDATE_ADDRESSES_PERMISSION_ID;
        if self
            .dao
            .has_permission(ctx.chain(), self.address, ctx.sender(), permission_id, &[])
        {
            Ok(())
        } else {
            Err(GovernanceError::Unauthorized {
                target: self.address,
                who: ctx.sender(),
                permission_id,
            })
        }
    }

    pub fn add_addresses(&self, ctx: &CallContext<'_>, members: &[Address]) -> Result<()> {
        self.authorize(ctx)?;
        self.record(ctx.chain(), members, true)
    }

    pub fn remove_addresses(&self, ctx: &CallContext<'_>, members: &[Address]) -> Result<()> {
        self.authorize(ctx)?;
        self.record(ctx.chain(), members, false)
    }

    fn record(&self, chain: &Chain, members: &[Address], listed: bool) -> Result<()> {
        let block = chain.block_number();
        let mut state = self.state.borrow_mut();

        for member in members {
            let history = state.listed.entry(*member).or_default();
            if (history.latest() == 1) == listed {
                return Err(GovernanceError::InvalidAddresslistUpdate(*member));
            }
            history.push(block, u128::from(listed));
        }

        let count = state.count.latest();
        let changed = members.len() as u128;
        let count = if listed {
            count.saturating_add(changed)
        } else {
            count.saturating_sub(changed)
        };
        state.count.push(block, count);
        drop(state);

        log::info!(
            "👥 {} {} member(s) on {}",
            if listed { "Added" } else { "Removed" },
            members.len(),
            self.address
        );
        let members = members.to_vec();
        chain.emit(
            self.address,
            if listed {
                Event::MembersAdded { members }
            } else {
                Event::MembersRemoved { members }
            },
        );
        Ok(())
    }
}

impl VotingPowerSource for AddressList {
    fn voting_power(&self, account: &Address, block: u64) -> u128 {
        u128::from(self.is_listed_at_block(account, block))
    }

    fn total_voting_power(&self, block: u64) -> u128 {
        self.state.borrow().count.at(block)
    }

    fn current_voting_power(&self, account: &Address) -> u128 {
        u128::from(self.is_listed(account))
    }
}

impl Contract for AddressList {
    fn call(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> std::result::Result<Vec<u8>, Revert> {
        let result = match AddressListCall::decode(input).map_err(Revert::from_message)? {
            AddressListCall::AddAddresses(members) => self.add_addresses(ctx, &members),
            AddressListCall::RemoveAddresses(members) => self.remove_addresses(ctx, &members),
        };
        result.map(|_| Vec::new()).map_err(Revert::from_message)
    }

    fn snapshot(&self) -> Box<dyn Any> {
        Box::new(self.state.borrow().clone())
    }

    fn restore(&self, snapshot: Box<dyn Any>) {
        if let Ok(state) = snapshot.downcast::<Members>() {
            *self.state.borrow_mut() = *state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::{
        Action, ActionExecutor, BitMap, CallId, ExecuteError, ExecutionResult, PermissionId,
        PermissionOracle, Tx,
    };

    /// Grants everything to a single admin
    struct SingleAdmin(Address);

    impl PermissionOracle for SingleAdmin {
        fn has_permission(&self, _: &Chain, _: Address, who: Address, _: PermissionId, _: &[u8]) -> bool {
            who == self.0
        }
    }

    impl ActionExecutor for SingleAdmin {
        fn executor_address(&self) -> Address {
            self.0
        }

        fn execute(
            &self,
            _ctx: &mut CallContext<'_>,
            _call_id: CallId,
            _actions: &[Action],
            _allow_failure_map: BitMap,
        ) -> std::result::Result<ExecutionResult, ExecuteError> {
            Ok(ExecutionResult::default())
        }
    }

    fn setup(members: &[Address]) -> (Chain, Rc<AddressList>, Address) {
        let chain = Chain::new();
        let admin = Address::derive("admin");
        let list = AddressList::deploy(
            &chain,
            Address::derive("members"),
            Rc::new(SingleAdmin(admin)),
            members,
        )
        .unwrap();
        (chain, list, admin)
    }

    #[test]
    fn test_genesis_members() {
        let alice = Address::derive("alice");
        let (chain, list, _) = setup(&[alice]);

        assert!(list.is_listed(&alice));
        assert_eq!(list.voting_power(&alice, chain.block_number()), 1);
        assert_eq!(list.voting_power(&alice, chain.block_number() - 1), 0);
        assert_eq!(list.total_voting_power(chain.block_number()), 1);
    }

    #[test]
    fn test_changes_do_not_rewrite_history() {
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        let (chain, list, admin) = setup(&[alice]);
        let before = chain.block_number();
        chain.mine(1, 12);

        chain
            .transact(Tx::new(admin, list.address()), |ctx| {
                list.add_addresses(ctx, &[bob])?;
                list.remove_addresses(ctx, &[alice])
            })
            .unwrap();

        assert_eq!(list.voting_power(&alice, before), 1);
        assert_eq!(list.voting_power(&bob, before), 0);
        assert_eq!(list.current_voting_power(&alice), 0);
        assert_eq!(list.current_voting_power(&bob), 1);
        assert_eq!(list.total_voting_power(before), 1);
        assert_eq!(list.member_count(), 1);
    }

    #[test]
    fn test_invalid_updates() {
        let alice = Address::derive("alice");
        let (chain, list, admin) = setup(&[alice]);

        let add = chain.transact(Tx::new(admin, list.address()), |ctx| {
            list.add_addresses(ctx, &[alice])
        });
        assert_eq!(add, Err(GovernanceError::InvalidAddresslistUpdate(alice)));

        let bob = Address::derive("bob");
        let remove = chain.transact(Tx::new(admin, list.address()), |ctx| {
            list.remove_addresses(ctx, &[bob])
        });
        assert_eq!(remove, Err(GovernanceError::InvalidAddresslistUpdate(bob)));
        assert_eq!(list.member_count(), 1);
    }

    #[test]
    fn test_updates_need_permission() {
        let (chain, list, _) = setup(&[]);
        let mallory = Address::derive("mallory");

        let result = chain.transact(Tx::new(mallory, list.address()), |ctx| {
            list.add_addresses(ctx, &[mallory])
        });
        assert!(matches!(result, Err(GovernanceError::Unauthorized { .. })));
        assert!(!list.is_listed(&mallory));
    }
}
