use concord_core::{
    call_id_from_u64, Action, ActionExecutor, Address, BitMap, CallContext, Chain, Contract,
    Event, ExecuteError, ExecutionResult, PermissionCondition, PermissionId, Revert, Tx,
    MAX_ACTIONS,
};
use concord_dao::{Dao, DaoCall, DaoConfig, DaoError, ReentrancyStatus, EXECUTE_PERMISSION_ID};
use concord_permission::{
    MultiTargetPermission, PermissionOperation, SingleTargetPermission, ROOT_PERMISSION_ID,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Records every payload it receives; reverts on "fail".
struct Recorder {
    seen: RefCell<Vec<Vec<u8>>>,
}

impl Contract for Recorder {
    fn call(&self, _ctx: &mut CallContext<'_>, input: &[u8]) -> Result<Vec<u8>, Revert> {
        if input == b"fail" {
            return Err(Revert::from_message("recorder: refused"));
        }
        self.seen.borrow_mut().push(input.to_vec());
        Ok(b"ok".to_vec())
    }

    fn snapshot(&self) -> Box<dyn std::any::Any> {
        Box::new(self.seen.borrow().clone())
    }

    fn restore(&self, snapshot: Box<dyn std::any::Any>) {
        if let Ok(seen) = snapshot.downcast::<Vec<Vec<u8>>>() {
            *self.seen.borrow_mut() = *seen;
        }
    }
}

/// Consumes every unit of gas it is given
struct GasGuzzler;

impl Contract for GasGuzzler {
    fn call(&self, ctx: &mut CallContext<'_>, _input: &[u8]) -> Result<Vec<u8>, Revert> {
        loop {
            ctx.charge_gas(5_000)?;
        }
    }
}

/// Grants from a given block onwards
struct FromBlock(u64);

impl PermissionCondition for FromBlock {
    fn is_granted(
        &self,
        chain: &Chain,
        _target: Address,
        _who: Address,
        _permission_id: PermissionId,
        _data: &[u8],
    ) -> bool {
        chain.block_number() >= self.0
    }
}

impl Contract for FromBlock {
    fn call(&self, _ctx: &mut CallContext<'_>, _input: &[u8]) -> Result<Vec<u8>, Revert> {
        Ok(Vec::new())
    }

    fn as_condition(&self) -> Option<&dyn PermissionCondition> {
        Some(self)
    }
}

struct Harness {
    chain: Chain,
    dao: Rc<Dao>,
    owner: Address,
    executor: Address,
    recorder: Address,
    recorder_state: Rc<Recorder>,
}

fn harness() -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let chain = Chain::new();
    let owner = Address::derive("owner");
    let executor = Address::derive("executor");
    let config = DaoConfig {
        address: Address::derive("dao"),
        initial_owner: owner,
        metadata: "ipfs://dao".to_string(),
        trusted_forwarder: Address::ZERO,
        dao_uri: String::new(),
    };
    let dao = config.deploy(&chain).unwrap();

    chain
        .transact(Tx::new(owner, dao.address()), |ctx| {
            dao.grant(ctx, dao.address(), executor, *EXECUTE_PERMISSION_ID)?;
            // Actions that manage permissions run with the DAO as caller
            dao.grant(ctx, dao.address(), dao.address(), *ROOT_PERMISSION_ID)
        })
        .unwrap();

    let recorder_state = Rc::new(Recorder {
        seen: RefCell::new(Vec::new()),
    });
    let recorder = Address::derive("recorder");
    chain.deploy(recorder, recorder_state.clone()).unwrap();

    Harness {
        chain,
        dao,
        owner,
        executor,
        recorder,
        recorder_state,
    }
}

fn execute(
    h: &Harness,
    actions: &[Action],
    allow_failure_map: BitMap,
    gas_limit: u64,
) -> Result<ExecutionResult, ExecuteError> {
    h.chain
        .transact(Tx::new(h.executor, h.dao.address()).gas_limit(gas_limit), |ctx| {
            h.dao.execute(ctx, call_id_from_u64(7), actions, allow_failure_map)
        })
}

#[test]
fn test_execute_emits_executed() {
    let h = harness();
    let actions = vec![Action::new(h.recorder, 0, b"hello".to_vec())];

    let result = execute(&h, &actions, BitMap::empty(), 1_000_000).unwrap();
    assert_eq!(result.exec_results, vec![b"ok".to_vec()]);
    assert_eq!(*h.recorder_state.seen.borrow(), vec![b"hello".to_vec()]);

    let last = h.chain.events().pop().unwrap();
    assert_eq!(last.emitter, h.dao.address());
    match last.event {
        Event::Executed {
            actor,
            call_id,
            actions: logged,
            failure_map,
            ..
        } => {
            assert_eq!(actor, h.executor);
            assert_eq!(call_id, call_id_from_u64(7));
            assert_eq!(logged, actions);
            assert!(failure_map.is_empty());
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_tolerated_failure_preserves_revert_payload() {
    let h = harness();
    let actions = vec![
        Action::new(h.recorder, 0, b"first".to_vec()),
        Action::new(h.recorder, 0, b"fail".to_vec()),
        Action::new(h.recorder, 0, b"third".to_vec()),
    ];

    let result = execute(&h, &actions, BitMap::from_indices(&[1]), 1_000_000).unwrap();
    assert!(result.failure_map.has_bit(1));
    assert_eq!(result.failure_map.count_ones(), 1);
    assert_eq!(result.exec_results[1], b"recorder: refused".to_vec());
    assert_eq!(
        *h.recorder_state.seen.borrow(),
        vec![b"first".to_vec(), b"third".to_vec()]
    );
}

#[test]
fn test_untolerated_failure_reverts_everything() {
    let h = harness();
    let events_before = h.chain.events().len();
    let actions = vec![
        Action::new(h.recorder, 0, b"first".to_vec()),
        Action::new(h.recorder, 0, b"fail".to_vec()),
    ];

    let err = execute(&h, &actions, BitMap::empty(), 1_000_000).unwrap_err();
    assert_eq!(err, ExecuteError::ActionFailed { index: 1 });
    assert!(h.recorder_state.seen.borrow().is_empty());
    assert_eq!(h.chain.events().len(), events_before);
    assert_eq!(h.dao.reentrancy_status(), ReentrancyStatus::NotEntered);
}

#[test]
fn test_gas_starved_tolerated_failure_reverts() {
    let h = harness();
    let guzzler = Address::derive("guzzler");
    h.chain.deploy(guzzler, Rc::new(GasGuzzler)).unwrap();
    let target = Address::derive("target");
    let events_before = h.chain.events().len();

    let actions = vec![
        DaoCall::Grant {
            target,
            who: h.owner,
            permission_id: PermissionId::named("TEST_PERMISSION"),
        }
        .into_action(h.dao.address()),
        Action::new(h.recorder, 0, b"seen".to_vec()),
        Action::new(guzzler, 0, Vec::new()),
    ];

    let err = execute(&h, &actions, BitMap::from_indices(&[2]), 2_000_000).unwrap_err();
    assert_eq!(err, ExecuteError::InsufficientGas);

    // No trace of the first two actions
    assert!(!h.dao.is_granted(
        &h.chain,
        target,
        h.owner,
        PermissionId::named("TEST_PERMISSION"),
        &[]
    ));
    assert!(h.recorder_state.seen.borrow().is_empty());
    assert_eq!(h.chain.events().len(), events_before);
}

#[test]
fn test_too_many_actions() {
    let h = harness();
    let actions = vec![Action::new(h.recorder, 0, Vec::new()); MAX_ACTIONS + 1];

    let err = execute(&h, &actions, BitMap::empty(), 30_000_000).unwrap_err();
    assert_eq!(
        err,
        ExecuteError::TooManyActions {
            count: MAX_ACTIONS + 1,
            limit: MAX_ACTIONS,
        }
    );
}

#[test]
fn test_reentrant_execute_is_rejected() {
    let h = harness();
    let inner = DaoCall::Execute {
        call_id: call_id_from_u64(8),
        actions: vec![Action::new(h.recorder, 0, b"inner".to_vec())],
        allow_failure_map: BitMap::empty(),
    }
    .into_action(h.dao.address());

    let err = execute(&h, &[inner.clone()], BitMap::empty(), 1_000_000).unwrap_err();
    assert_eq!(err, ExecuteError::ActionFailed { index: 0 });

    let result = execute(&h, &[inner], BitMap::from_indices(&[0]), 1_000_000).unwrap();
    assert!(result.failure_map.has_bit(0));
    assert_eq!(result.exec_results[0], b"Reentrant call".to_vec());
    assert!(h.recorder_state.seen.borrow().is_empty());
}

#[test]
fn test_actions_manage_permissions() {
    let h = harness();
    let plugin = Address::derive("plugin");
    let permission = PermissionId::named("UPDATE_SETTINGS_PERMISSION");

    let actions = vec![
        DaoCall::ApplySingleTargetPermissions {
            target: plugin,
            items: vec![SingleTargetPermission {
                operation: PermissionOperation::Grant,
                who: h.dao.address(),
                permission_id: permission,
            }],
        }
        .into_action(h.dao.address()),
        DaoCall::ApplyMultiTargetPermissions {
            items: vec![MultiTargetPermission {
                operation: PermissionOperation::Grant,
                target: h.dao.address(),
                who: plugin,
                permission_id: *EXECUTE_PERMISSION_ID,
            }],
        }
        .into_action(h.dao.address()),
    ];

    execute(&h, &actions, BitMap::empty(), 1_000_000).unwrap();
    assert!(h.dao.is_granted(&h.chain, plugin, h.dao.address(), permission, &[]));
    assert!(h.dao.is_granted(&h.chain, h.dao.address(), plugin, *EXECUTE_PERMISSION_ID, &[]));
}

#[test]
fn test_execute_permission_is_never_wildcard() {
    let h = harness();
    let result = h.chain.transact(Tx::new(h.owner, h.dao.address()), |ctx| {
        h.dao.grant(ctx, h.dao.address(), Address::ANY, *EXECUTE_PERMISSION_ID)
    });
    assert!(matches!(
        result,
        Err(DaoError::Permission(
            concord_permission::PermissionError::PermissionsForAnyAddressDisallowed(_)
        ))
    ));
}

#[test]
fn test_conditional_execute_permission() {
    let h = harness();
    let condition = Address::derive("from-block-10");
    h.chain.deploy(condition, Rc::new(FromBlock(10))).unwrap();
    let operator = Address::derive("operator");

    h.chain
        .transact(Tx::new(h.owner, h.dao.address()), |ctx| {
            h.dao
                .grant_with_condition(ctx, h.dao.address(), operator, *EXECUTE_PERMISSION_ID, condition)
        })
        .unwrap();

    let run = || {
        h.chain.transact(Tx::new(operator, h.dao.address()), |ctx| {
            h.dao.execute(ctx, [0; 32], &[], BitMap::empty())
        })
    };
    assert!(matches!(run(), Err(ExecuteError::Unauthorized { .. })));

    h.chain.mine(10, 120);
    assert!(run().is_ok());
}

#[test]
fn test_value_transfer_action() {
    let h = harness();
    let alice = Address::derive("alice");
    let bob = Address::derive("bob");
    h.chain.fund(alice, 500);
    h.chain
        .transact_call(Tx::new(alice, h.dao.address()).value(500), &[])
        .unwrap();

    execute(&h, &[Action::transfer(bob, 200)], BitMap::empty(), 1_000_000).unwrap();
    assert_eq!(h.chain.balance_of(&bob), 200);
    assert_eq!(h.chain.balance_of(&h.dao.address()), 300);
}

#[test]
fn test_event_log_exports_as_json() {
    let h = harness();
    let json = h.chain.export_events_json().unwrap();
    assert!(json.lines().any(|line| line.contains("\"event\":\"Granted\"")));
    assert!(json.lines().any(|line| line.contains("\"event\":\"MetadataSet\"")));
}
