//! Transactional ledger host
//!
//! A single-threaded stand-in for the chain the governance contracts are
//! deployed on. It owns block height, time, native balances, the contract
//! registry and the event log, and it makes every top-level call atomic:
//! state is snapshotted before the call and restored if the call fails.
//! External sub-calls get the same treatment at their own level.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

use crate::address::{Address, PermissionId};
use crate::error::{ChainError, OutOfGas, Result};
use crate::event::{Event, LogEntry};
use crate::gas::{GasMeter, CALL_BASE_GAS, DEFAULT_GAS_LIMIT};
use crate::interfaces::PermissionCondition;
use crate::GENESIS_TIMESTAMP;

/// Revert payload returned by a failed call
#[derive(Error, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[error("Execution reverted: {}", String::from_utf8_lossy(.data))]
pub struct Revert {
    pub data: Vec<u8>,
}

impl Revert {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn from_message(message: impl fmt::Display) -> Self {
        Self {
            data: message.to_string().into_bytes(),
        }
    }

    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl From<OutOfGas> for Revert {
    fn from(_: OutOfGas) -> Self {
        // Running out of gas leaves no return data
        Self::default()
    }
}

impl From<ChainError> for Revert {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::OutOfGas(oog) => oog.into(),
            other => Self::from_message(other),
        }
    }
}

/// Code deployed at an address.
///
/// Contracts keep their state behind interior mutability and must not hold a
/// `RefCell` borrow across [`CallContext::call`]: the host snapshots and
/// restores every contract around sub-calls.
pub trait Contract {
    /// Entry point for byte-encoded calls
    fn call(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> std::result::Result<Vec<u8>, Revert>;

    /// Capture the contract's state for rollback
    fn snapshot(&self) -> Box<dyn Any> {
        Box::new(())
    }

    /// Restore state captured by [`Contract::snapshot`]
    fn restore(&self, _snapshot: Box<dyn Any>) {}

    /// `Some` if this contract can act as a permission condition
    fn as_condition(&self) -> Option<&dyn PermissionCondition> {
        None
    }
}

/// Parameters of a top-level transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tx {
    pub sender: Address,
    pub target: Address,
    pub value: u128,
    pub gas_limit: u64,
}

impl Tx {
    pub fn new(sender: Address, target: Address) -> Self {
        Self {
            sender,
            target,
            value: 0,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    pub fn value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

/// Result of an external sub-call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub success: bool,
    /// Return data on success, revert payload on failure
    pub output: Vec<u8>,
}

struct Snapshot {
    balances: HashMap<Address, u128>,
    events: usize,
    contracts: Vec<(Rc<dyn Contract>, Box<dyn Any>)>,
}

pub struct Chain {
    block_number: Cell<u64>,
    timestamp: Cell<u64>,
    balances: RefCell<HashMap<Address, u128>>,
    contracts: RefCell<HashMap<Address, Rc<dyn Contract>>>,
    events: RefCell<Vec<LogEntry>>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// Start at block 1 and [`GENESIS_TIMESTAMP`]
    pub fn new() -> Self {
        Self::starting_at(1, GENESIS_TIMESTAMP)
    }

    pub fn starting_at(block_number: u64, timestamp: u64) -> Self {
        Self {
            block_number: Cell::new(block_number),
            timestamp: Cell::new(timestamp),
            balances: RefCell::new(HashMap::new()),
            contracts: RefCell::new(HashMap::new()),
            events: RefCell::new(Vec::new()),
        }
    }

    pub fn block_number(&self) -> u64 {
        self.block_number.get()
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp.get()
    }

    /// Advance the chain by `blocks` blocks and `seconds` seconds
    pub fn mine(&self, blocks: u64, seconds: u64) {
        self.block_number
            .set(self.block_number.get().saturating_add(blocks));
        self.timestamp.set(self.timestamp.get().saturating_add(seconds));
    }

    /// Jump to an absolute timestamp (one block is mined)
    pub fn warp(&self, timestamp: u64) {
        self.block_number
            .set(self.block_number.get().saturating_add(1));
        self.timestamp.set(timestamp);
    }

    /// Register code at `address`
    pub fn deploy(&self, address: Address, contract: Rc<dyn Contract>) -> Result<()> {
        if address.is_zero() || address.is_any() {
            return Err(ChainError::InvalidAddress(address.to_string()));
        }
        let mut contracts = self.contracts.borrow_mut();
        if contracts.contains_key(&address) {
            return Err(ChainError::AddressInUse(address));
        }
        contracts.insert(address, contract);
        log::debug!("Deployed contract at {}", address);
        Ok(())
    }

    pub fn contract(&self, address: &Address) -> Option<Rc<dyn Contract>> {
        self.contracts.borrow().get(address).cloned()
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.borrow().get(account).copied().unwrap_or(0)
    }

    /// Credit native tokens out of thin air (genesis allocation)
    pub fn fund(&self, account: Address, amount: u128) {
        let mut balances = self.balances.borrow_mut();
        let balance = balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub(crate) fn transfer(&self, from: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 || from == to {
            return Ok(());
        }
        let mut balances = self.balances.borrow_mut();
        let available = balances.get(&from).copied().unwrap_or(0);
        if available < amount {
            return Err(ChainError::InsufficientBalance {
                account: from,
                available,
                required: amount,
            });
        }
        balances.insert(from, available - amount);
        *balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    pub fn emit(&self, emitter: Address, event: Event) {
        log::debug!("Event from {}: {:?}", emitter, event);
        self.events.borrow_mut().push(LogEntry {
            emitter,
            block_number: self.block_number(),
            event,
        });
    }

    pub fn events(&self) -> Vec<LogEntry> {
        self.events.borrow().clone()
    }

    pub fn events_from(&self, emitter: &Address) -> Vec<Event> {
        self.events
            .borrow()
            .iter()
            .filter(|entry| entry.emitter == *emitter)
            .map(|entry| entry.event.clone())
            .collect()
    }

    /// Render the event log as JSON lines for indexers
    pub fn export_events_json(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for entry in self.events.borrow().iter() {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Evaluate the condition contract at `condition`.
    ///
    /// Missing code or code without the condition capability denies.
    pub fn check_condition(
        &self,
        condition: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        match self.contract(&condition) {
            Some(contract) => contract
                .as_condition()
                .map(|cond| cond.is_granted(self, target, who, permission_id, data))
                .unwrap_or(false),
            None => false,
        }
    }

    pub fn is_condition(&self, address: &Address) -> bool {
        self.contract(address)
            .map(|contract| contract.as_condition().is_some())
            .unwrap_or(false)
    }

    fn snapshot(&self) -> Snapshot {
        let deployed: Vec<Rc<dyn Contract>> = self.contracts.borrow().values().cloned().collect();
        Snapshot {
            balances: self.balances.borrow().clone(),
            events: self.events.borrow().len(),
            contracts: deployed
                .into_iter()
                .map(|contract| {
                    let state = contract.snapshot();
                    (contract, state)
                })
                .collect(),
        }
    }

    fn restore(&self, snapshot: Snapshot) {
        *self.balances.borrow_mut() = snapshot.balances;
        self.events.borrow_mut().truncate(snapshot.events);
        for (contract, state) in snapshot.contracts {
            contract.restore(state);
        }
    }

    /// Run `f` as one atomic top-level call from `tx.sender` to `tx.target`.
    ///
    /// The attached value is transferred first. If `f` fails, every change
    /// made during the call is rolled back.
    pub fn transact<T, E, F>(&self, tx: Tx, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut CallContext<'_>) -> std::result::Result<T, E>,
        E: From<ChainError>,
    {
        let snapshot = self.snapshot();
        let mut gas = GasMeter::new(tx.gas_limit);

        let result = match self.transfer(tx.sender, tx.target, tx.value) {
            Err(err) => Err(E::from(err)),
            Ok(()) => {
                let mut ctx = CallContext {
                    chain: self,
                    sender: tx.sender,
                    address: tx.target,
                    value: tx.value,
                    gas: &mut gas,
                };
                f(&mut ctx)
            }
        };

        if result.is_err() {
            log::debug!("Transaction from {} to {} reverted", tx.sender, tx.target);
            self.restore(snapshot);
        }
        result
    }

    /// Top-level byte-encoded call into the contract at `tx.target`
    pub fn transact_call(&self, tx: Tx, input: &[u8]) -> std::result::Result<Vec<u8>, Revert> {
        self.transact(tx, |ctx| match ctx.chain().contract(&ctx.address()) {
            Some(contract) => contract.call(ctx, input),
            None => Ok(Vec::new()),
        })
    }
}

/// Execution context of one call frame
pub struct CallContext<'a> {
    chain: &'a Chain,
    sender: Address,
    address: Address,
    value: u128,
    gas: &'a mut GasMeter,
}

impl<'a> CallContext<'a> {
    pub fn chain(&self) -> &'a Chain {
        self.chain
    }

    /// Immediate caller of this frame
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Address of the contract executing this frame
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn value(&self) -> u128 {
        self.value
    }

    pub fn block_number(&self) -> u64 {
        self.chain.block_number()
    }

    pub fn timestamp(&self) -> u64 {
        self.chain.timestamp()
    }

    pub fn gas_left(&self) -> u64 {
        self.gas.remaining()
    }

    pub fn charge_gas(&mut self, amount: u64) -> std::result::Result<(), OutOfGas> {
        self.gas.charge(amount)
    }

    pub fn emit(&self, event: Event) {
        self.chain.emit(self.address, event);
    }

    /// Typed nested call into `callee`: the current contract becomes the
    /// sender and the gas meter is shared.
    pub fn frame(&mut self, callee: Address) -> CallContext<'_> {
        CallContext {
            chain: self.chain,
            sender: self.address,
            address: callee,
            value: 0,
            gas: &mut *self.gas,
        }
    }

    /// External sub-call with at most 63/64 of the remaining gas.
    ///
    /// A failed sub-call leaves no trace besides the gas it consumed. Every
    /// call snapshots all deployed contracts up front, so the cost of a batch
    /// grows with the number of actions times the size of the world state.
    pub fn call(&mut self, to: Address, value: u128, data: &[u8]) -> CallOutcome {
        if self.gas.charge(CALL_BASE_GAS).is_err() {
            return CallOutcome {
                success: false,
                output: Vec::new(),
            };
        }

        let chain = self.chain;
        let snapshot = chain.snapshot();
        let mut child_gas = GasMeter::new(self.gas.forwardable());

        let result = match chain.transfer(self.address, to, value) {
            Err(err) => Err(Revert::from(err)),
            Ok(()) => match chain.contract(&to) {
                None => Ok(Vec::new()),
                Some(contract) => {
                    let mut child = CallContext {
                        chain,
                        sender: self.address,
                        address: to,
                        value,
                        gas: &mut child_gas,
                    };
                    contract.call(&mut child, data)
                }
            },
        };
        self.gas.absorb(child_gas.used());

        match result {
            Ok(output) => CallOutcome {
                success: true,
                output,
            },
            Err(revert) => {
                log::debug!("Call from {} to {} reverted: {}", self.address, to, revert);
                chain.restore(snapshot);
                CallOutcome {
                    success: false,
                    output: revert.data,
                }
            }
        }
    }
}
