//! The DAO contract
//!
//! Composes the permission registry, the callback registry, protocol-version
//! metadata and the action executor. Plugins reach it through the
//! [`PermissionOracle`] and [`ActionExecutor`] capabilities.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use concord_core::{
    Action, ActionExecutor, Address, BitMap, CallContext, CallId, Chain, Contract, Event,
    ExecuteError, ExecutionResult, PermissionId, PermissionOracle, Revert,
};
use concord_permission::{MultiTargetPermission, SingleTargetPermission, ROOT_PERMISSION_ID};

use crate::call::DaoCall;
use crate::callback::{CallbackResult, Selector};
use crate::error::{DaoError, Result};
use crate::executor::{self, ReentrancyGuard, ReentrancyStatus};
use crate::ids::{
    EXECUTE_PERMISSION_ID, REGISTER_STANDARD_CALLBACK_PERMISSION_ID,
    SET_METADATA_PERMISSION_ID, SET_TRUSTED_FORWARDER_PERMISSION_ID,
};
use crate::version::{DaoState, DaoStateV1, ProtocolVersion};

/// ERC-165 `supportsInterface` selector, always supported
pub const ERC165_INTERFACE_ID: Selector = [0x01, 0xff, 0xc9, 0xa7];

pub struct Dao {
    address: Address,
    state: RefCell<DaoState>,
    /// Kept out of `state` so rollbacks never touch it
    reentrancy: Cell<ReentrancyStatus>,
}

impl Dao {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: RefCell::new(DaoState::new(address)),
            reentrancy: Cell::new(ReentrancyStatus::Unset),
        }
    }

    /// Create an uninitialized DAO and register it on `chain`
    pub fn deploy(chain: &Chain, address: Address) -> concord_core::Result<Rc<Self>> {
        let dao = Rc::new(Self::new(address));
        chain.deploy(address, dao.clone())?;
        Ok(dao)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        ProtocolVersion::CURRENT
    }

    /// Version the stored state was initialized or migrated to
    pub fn initialized_version(&self) -> Option<ProtocolVersion> {
        self.state.borrow().version
    }

    pub fn reentrancy_status(&self) -> ReentrancyStatus {
        self.reentrancy.get()
    }

    /// One-time setup of a fresh deployment. `initial_owner` receives
    /// `ROOT_PERMISSION` on the DAO.
    pub fn initialize(
        &self,
        ctx: &CallContext<'_>,
        metadata: Vec<u8>,
        initial_owner: Address,
        trusted_forwarder: Address,
        dao_uri: String,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.is_initialized() {
            return Err(DaoError::AlreadyInitialized);
        }
        state.version = Some(ProtocolVersion::CURRENT);
        self.reentrancy.set(ReentrancyStatus::NotEntered);

        state.metadata = metadata.clone();
        ctx.emit(Event::MetadataSet { metadata });
        state.trusted_forwarder = trusted_forwarder;
        ctx.emit(Event::TrustedForwarderSet {
            forwarder: trusted_forwarder,
        });
        state.dao_uri = dao_uri.clone();
        ctx.emit(Event::DaoUriSet { dao_uri });

        state
            .permissions
            .grant(ctx.chain(), self.address, initial_owner, *ROOT_PERMISSION_ID)?;

        log::info!(
            "🏛️  DAO {} initialized at {} with owner {}",
            self.address,
            ProtocolVersion::CURRENT,
            initial_owner
        );
        Ok(())
    }

    /// Adopt the state of a deployment running an older 1.x protocol.
    pub fn initialize_from(&self, previous: ProtocolVersion, legacy: DaoStateV1) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.is_initialized() {
            return Err(DaoError::AlreadyInitialized);
        }
        if previous.0 != 1 || previous >= ProtocolVersion::CURRENT {
            return Err(DaoError::ProtocolVersionUpgradeNotSupported(previous));
        }

        *state = legacy.migrate();
        // The guard flag did not exist before 1.3
        self.reentrancy.set(ReentrancyStatus::NotEntered);

        log::info!(
            "🏛️  DAO {} migrated from {} to {}",
            self.address,
            previous,
            ProtocolVersion::CURRENT
        );
        Ok(())
    }

    fn auth(&self, ctx: &CallContext<'_>, permission_id: PermissionId) -> Result<()> {
        self.state.borrow().permissions.authorize(
            ctx.chain(),
            self.address,
            ctx.sender(),
            permission_id,
            &[],
        )?;
        Ok(())
    }

    pub fn is_granted(
        &self,
        chain: &Chain,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        self.state
            .borrow()
            .permissions
            .is_granted(chain, target, who, permission_id, data)
    }

    pub fn grant(
        &self,
        ctx: &CallContext<'_>,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.auth(ctx, *ROOT_PERMISSION_ID)?;
        self.state
            .borrow_mut()
            .permissions
            .grant(ctx.chain(), target, who, permission_id)?;
        Ok(())
    }

    pub fn grant_with_condition(
        &self,
        ctx: &CallContext<'_>,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        condition: Address,
    ) -> Result<()> {
        self.auth(ctx, *ROOT_PERMISSION_ID)?;
        self.state
            .borrow_mut()
            .permissions
            .grant_with_condition(ctx.chain(), target, who, permission_id, condition)?;
        Ok(())
    }

    pub fn revoke(
        &self,
        ctx: &CallContext<'_>,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.auth(ctx, *ROOT_PERMISSION_ID)?;
        self.state
            .borrow_mut()
            .permissions
            .revoke(ctx.chain(), target, who, permission_id)?;
        Ok(())
    }

    pub fn apply_single_target_permissions(
        &self,
        ctx: &CallContext<'_>,
        target: Address,
        items: &[SingleTargetPermission],
    ) -> Result<()> {
        self.auth(ctx, *ROOT_PERMISSION_ID)?;
        self.state
            .borrow_mut()
            .permissions
            .apply_single_target_permissions(ctx.chain(), target, items)?;
        Ok(())
    }

    pub fn apply_multi_target_permissions(
        &self,
        ctx: &CallContext<'_>,
        items: &[MultiTargetPermission],
    ) -> Result<()> {
        self.auth(ctx, *ROOT_PERMISSION_ID)?;
        self.state
            .borrow_mut()
            .permissions
            .apply_multi_target_permissions(ctx.chain(), items)?;
        Ok(())
    }

    pub fn metadata(&self) -> Vec<u8> {
        self.state.borrow().metadata.clone()
    }

    pub fn dao_uri(&self) -> String {
        self.state.borrow().dao_uri.clone()
    }

    pub fn trusted_forwarder(&self) -> Address {
        self.state.borrow().trusted_forwarder
    }

    pub fn set_metadata(&self, ctx: &CallContext<'_>, metadata: Vec<u8>) -> Result<()> {
        self.auth(ctx, *SET_METADATA_PERMISSION_ID)?;
        self.state.borrow_mut().metadata = metadata.clone();
        ctx.emit(Event::MetadataSet { metadata });
        Ok(())
    }

    pub fn set_dao_uri(&self, ctx: &CallContext<'_>, dao_uri: String) -> Result<()> {
        self.auth(ctx, *SET_METADATA_PERMISSION_ID)?;
        self.state.borrow_mut().dao_uri = dao_uri.clone();
        ctx.emit(Event::DaoUriSet { dao_uri });
        Ok(())
    }

    pub fn set_trusted_forwarder(&self, ctx: &CallContext<'_>, forwarder: Address) -> Result<()> {
        self.auth(ctx, *SET_TRUSTED_FORWARDER_PERMISSION_ID)?;
        self.state.borrow_mut().trusted_forwarder = forwarder;
        ctx.emit(Event::TrustedForwarderSet { forwarder });
        Ok(())
    }

    pub fn register_standard_callback(
        &self,
        ctx: &CallContext<'_>,
        interface_id: Selector,
        callback_selector: Selector,
        magic_number: Selector,
    ) -> Result<()> {
        self.auth(ctx, *REGISTER_STANDARD_CALLBACK_PERMISSION_ID)?;
        self.state
            .borrow_mut()
            .callbacks
            .register(interface_id, callback_selector, magic_number);
        ctx.emit(Event::StandardCallbackRegistered {
            interface_id,
            callback_selector,
            magic_number,
        });
        Ok(())
    }

    pub fn supports_interface(&self, interface_id: &Selector) -> bool {
        *interface_id == ERC165_INTERFACE_ID
            || self.state.borrow().callbacks.supports_interface(interface_id)
    }

    /// Answer a third-party callback with its registered magic number
    pub fn handle_callback(&self, ctx: &CallContext<'_>, selector: Selector, data: &[u8]) -> CallbackResult {
        let result = self.state.borrow().callbacks.handle(selector);
        if let CallbackResult::Handled(_) = result {
            ctx.emit(Event::CallbackReceived {
                sender: ctx.sender(),
                selector,
                data: data.to_vec(),
            });
        }
        result
    }

    /// Native-token deposit with a reference note. The declared amount must
    /// match the value attached to the call.
    pub fn deposit(
        &self,
        ctx: &CallContext<'_>,
        token: Address,
        amount: u128,
        reference: String,
    ) -> Result<()> {
        if amount == 0 {
            return Err(DaoError::ZeroAmount);
        }
        if !token.is_zero() {
            return Err(DaoError::UnsupportedToken(token));
        }
        if ctx.value() != amount {
            return Err(DaoError::NativeTokenDepositAmountMismatch {
                expected: amount,
                actual: ctx.value(),
            });
        }

        log::info!("💰 Deposit of {} from {}", amount, ctx.sender());
        ctx.emit(Event::Deposited {
            sender: ctx.sender(),
            token,
            amount,
            reference,
        });
        Ok(())
    }

    fn receive(&self, ctx: &CallContext<'_>) {
        ctx.emit(Event::NativeTokenDeposited {
            sender: ctx.sender(),
            amount: ctx.value(),
        });
    }

    fn dispatch(&self, ctx: &mut CallContext<'_>, call: DaoCall) -> Result<Vec<u8>> {
        match call {
            DaoCall::Execute {
                call_id,
                actions,
                allow_failure_map,
            } => {
                let result = self.execute(ctx, call_id, &actions, allow_failure_map)?;
                bincode::serialize(&result).map_err(|e| DaoError::InvalidCallData(e.to_string()))
            }
            DaoCall::Grant {
                target,
                who,
                permission_id,
            } => self.grant(ctx, target, who, permission_id).map(|_| Vec::new()),
            DaoCall::GrantWithCondition {
                target,
                who,
                permission_id,
                condition,
            } => self
                .grant_with_condition(ctx, target, who, permission_id, condition)
                .map(|_| Vec::new()),
            DaoCall::Revoke {
                target,
                who,
                permission_id,
            } => self.revoke(ctx, target, who, permission_id).map(|_| Vec::new()),
            DaoCall::ApplySingleTargetPermissions { target, items } => self
                .apply_single_target_permissions(ctx, target, &items)
                .map(|_| Vec::new()),
            DaoCall::ApplyMultiTargetPermissions { items } => self
                .apply_multi_target_permissions(ctx, &items)
                .map(|_| Vec::new()),
            DaoCall::SetMetadata(metadata) => self.set_metadata(ctx, metadata).map(|_| Vec::new()),
            DaoCall::SetDaoUri(dao_uri) => self.set_dao_uri(ctx, dao_uri).map(|_| Vec::new()),
            DaoCall::SetTrustedForwarder(forwarder) => {
                self.set_trusted_forwarder(ctx, forwarder).map(|_| Vec::new())
            }
            DaoCall::RegisterStandardCallback {
                interface_id,
                callback_selector,
                magic_number,
            } => self
                .register_standard_callback(ctx, interface_id, callback_selector, magic_number)
                .map(|_| Vec::new()),
            DaoCall::Deposit {
                token,
                amount,
                reference,
            } => self.deposit(ctx, token, amount, reference).map(|_| Vec::new()),
            DaoCall::Callback { selector, data } => match self.handle_callback(ctx, selector, &data) {
                CallbackResult::Handled(magic) => Ok(magic.to_vec()),
                CallbackResult::Unhandled => Err(DaoError::UnknownCallback(selector)),
            },
        }
    }
}

impl PermissionOracle for Dao {
    fn has_permission(
        &self,
        chain: &Chain,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        self.is_granted(chain, target, who, permission_id, data)
    }
}

impl ActionExecutor for Dao {
    fn executor_address(&self) -> Address {
        self.address
    }

    /// Run `actions` for `ctx.sender()`, who needs `EXECUTE_PERMISSION` on
    /// the DAO. Nested calls back into `execute` fail with `ReentrantCall`.
    fn execute(
        &self,
        ctx: &mut CallContext<'_>,
        call_id: CallId,
        actions: &[Action],
        allow_failure_map: BitMap,
    ) -> std::result::Result<ExecutionResult, ExecuteError> {
        let _guard = ReentrancyGuard::enter(&self.reentrancy)?;

        let actor = ctx.sender();
        if !self.is_granted(ctx.chain(), self.address, actor, *EXECUTE_PERMISSION_ID, &[]) {
            return Err(ExecuteError::Unauthorized {
                target: self.address,
                who: actor,
                permission_id: *EXECUTE_PERMISSION_ID,
            });
        }

        let result = executor::run_actions(ctx, actions, allow_failure_map)?;

        log::info!(
            "⚡ DAO {} executed {} action(s) for {} ({} tolerated failure(s))",
            self.address,
            actions.len(),
            actor,
            result.failure_map.count_ones()
        );
        ctx.emit(Event::Executed {
            actor,
            call_id,
            actions: actions.to_vec(),
            allow_failure_map,
            failure_map: result.failure_map,
            exec_results: result.exec_results.clone(),
        });
        Ok(result)
    }
}

impl Contract for Dao {
    fn call(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> std::result::Result<Vec<u8>, Revert> {
        if input.is_empty() {
            self.receive(ctx);
            return Ok(Vec::new());
        }
        let call = DaoCall::decode(input).map_err(Revert::from_message)?;
        self.dispatch(ctx, call).map_err(|err| {
            log::debug!("DAO {} reverted: {}", self.address, err);
            Revert::from_message(err)
        })
    }

    fn snapshot(&self) -> Box<dyn Any> {
        Box::new(self.state.borrow().clone())
    }

    fn restore(&self, snapshot: Box<dyn Any>) {
        if let Ok(state) = snapshot.downcast::<DaoState>() {
            *self.state.borrow_mut() = *state;
        }
    }
}
