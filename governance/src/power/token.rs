//! Governance token with per-block balance snapshots
//!
//! Voting power equals the balance held at the snapshot block. Tokens are
//! allocated at deployment (`mint`) and move with `transfer` and `burn`.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use concord_core::{Address, CallContext, Chain, Contract, Revert};

use super::checkpoints::Checkpoints;
use super::VotingPowerSource;
use crate::call::{decode_call, encode_call};
use crate::error::{GovernanceError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenCall {
    Transfer { to: Address, amount: u128 },
    Burn { amount: u128 },
}

impl TokenCall {
    pub fn encode(&self) -> Vec<u8> {
        encode_call(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_call(bytes)
    }
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    balances: BTreeMap<Address, Checkpoints>,
    total_supply: Checkpoints,
}

impl Ledger {
    fn balance(&self, account: &Address) -> u128 {
        self.balances.get(account).map(|cp| cp.latest()).unwrap_or(0)
    }

    fn set_balance(&mut self, block: u64, account: Address, value: u128) {
        self.balances.entry(account).or_default().push(block, value);
    }
}

pub struct TokenSnapshot {
    address: Address,
    state: RefCell<Ledger>,
}

impl TokenSnapshot {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: RefCell::new(Ledger::default()),
        }
    }

    pub fn deploy(chain: &Chain, address: Address) -> Result<Rc<Self>> {
        let token = Rc::new(Self::new(address));
        chain.deploy(address, token.clone())?;
        Ok(token)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.state.borrow().balance(account)
    }

    pub fn total_supply(&self) -> u128 {
        self.state.borrow().total_supply.latest()
    }

    /// Allocate new tokens at the current block
    pub fn mint(&self, chain: &Chain, to: Address, amount: u128) {
        let block = chain.block_number();
        let mut ledger = self.state.borrow_mut();
        let balance = ledger.balance(&to).saturating_add(amount);
        ledger.set_balance(block, to, balance);
        let supply = ledger.total_supply.latest().saturating_add(amount);
        ledger.total_supply.push(block, supply);
        log::debug!("Minted {} to {}", amount, to);
    }

    pub fn transfer(&self, ctx: &CallContext<'_>, to: Address, amount: u128) -> Result<()> {
        let from = ctx.sender();
        let block = ctx.block_number();
        let mut ledger = self.state.borrow_mut();

        let available = ledger.balance(&from);
        if available < amount {
            return Err(GovernanceError::InsufficientBalance {
                account: from,
                available,
                required: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        ledger.set_balance(block, from, available - amount);
        let received = ledger.balance(&to).saturating_add(amount);
        ledger.set_balance(block, to, received);
        Ok(())
    }

    pub fn burn(&self, ctx: &CallContext<'_>, amount: u128) -> Result<()> {
        let from = ctx.sender();
        let block = ctx.block_number();
        let mut ledger = self.state.borrow_mut();

        let available = ledger.balance(&from);
        if available < amount {
            return Err(GovernanceError::InsufficientBalance {
                account: from,
                available,
                required: amount,
            });
        }
        ledger.set_balance(block, from, available - amount);
        let supply = ledger.total_supply.latest().saturating_sub(amount);
        ledger.total_supply.push(block, supply);
        Ok(())
    }
}

impl VotingPowerSource for TokenSnapshot {
    fn voting_power(&self, account: &Address, block: u64) -> u128 {
        self.state
            .borrow()
            .balances
            .get(account)
            .map(|cp| cp.at(block))
            .unwrap_or(0)
    }

    fn total_voting_power(&self, block: u64) -> u128 {
        self.state.borrow().total_supply.at(block)
    }

    fn current_voting_power(&self, account: &Address) -> u128 {
        self.balance_of(account)
    }
}

impl Contract for TokenSnapshot {
    fn call(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> std::result::Result<Vec<u8>, Revert> {
        let result = match TokenCall::decode(input).map_err(Revert::from_message)? {
            TokenCall::Transfer { to, amount } => self.transfer(ctx, to, amount),
            TokenCall::Burn { amount } => self.burn(ctx, amount),
        };
        result.map(|_| Vec::new()).map_err(Revert::from_message)
    }

    fn snapshot(&self) -> Box<dyn Any> {
        Box::new(self.state.borrow().clone())
    }

    fn restore(&self, snapshot: Box<dyn Any>) {
        if let Ok(state) = snapshot.downcast::<Ledger>() {
            *self.state.borrow_mut() = *state;
        }
    }
}
