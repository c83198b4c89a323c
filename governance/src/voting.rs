//! Majority voting plugin
//!
//! Proposals bundle DAO actions. Members vote with the power they held at
//! the block before the proposal was created, and a proposal that passes is
//! executed through the DAO's `execute`, which needs `EXECUTE_PERMISSION`
//! granted to the plugin.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use concord_core::{
    call_id_from_u64, Address, CallContext, Chain, Contract, DaoHandle, Event, ExecutionResult,
    PermissionId, Revert, Tx, VoteOption, MAX_ACTIONS, MAX_TIMESTAMP,
};

use crate::call::{encode_call, VotingCall};
use crate::error::{GovernanceError, Result};
use crate::ids::{CREATE_PROPOSAL_PERMISSION_ID, UPDATE_VOTING_SETTINGS_PERMISSION_ID};
use crate::power::VotingPowerSource;
use crate::proposal::{NewProposal, Proposal, ProposalParameters, ProposalStatus};
use crate::settings::VotingSettings;
use crate::tally::{self, apply_ratio_ceiled, GateInput, Tally};

/// Normalize and check proposal dates against `now`.
///
/// Returns the effective `(start_date, end_date)`.
pub fn validate_proposal_dates(
    start_date: u64,
    end_date: u64,
    now: u64,
    min_duration: u64,
) -> Result<(u64, u64)> {
    let start_date = if start_date == 0 {
        now
    } else if start_date < now {
        return Err(GovernanceError::DateOutOfBounds {
            limit: now,
            actual: start_date,
        });
    } else {
        start_date
    };

    let latest_start = MAX_TIMESTAMP - min_duration;
    if start_date > latest_start {
        return Err(GovernanceError::DateOutOfBounds {
            limit: latest_start,
            actual: start_date,
        });
    }

    let earliest_end = start_date + min_duration;
    let end_date = if end_date == 0 {
        earliest_end
    } else if end_date < earliest_end {
        return Err(GovernanceError::DateOutOfBounds {
            limit: earliest_end,
            actual: end_date,
        });
    } else {
        end_date
    };

    Ok((start_date, end_date))
}

#[derive(Debug, Clone, Default)]
struct PluginState {
    settings: Option<VotingSettings>,
    proposals: Vec<Proposal>,
}

pub struct VotingPlugin {
    address: Address,
    dao: Rc<dyn DaoHandle>,
    power: Rc<dyn VotingPowerSource>,
    state: RefCell<PluginState>,
}

impl VotingPlugin {
    fn new(address: Address, dao: Rc<dyn DaoHandle>, power: Rc<dyn VotingPowerSource>) -> Self {
        Self {
            address,
            dao,
            power,
            state: RefCell::new(PluginState::default()),
        }
    }

    /// Register a plugin on `chain` and initialize it with `settings` in a
    /// transaction sent by `deployer`.
    ///
    /// There is no window in which an uninitialized plugin is reachable, so
    /// nobody else can pick its settings.
    pub fn deploy(
        chain: &Chain,
        address: Address,
        dao: Rc<dyn DaoHandle>,
        power: Rc<dyn VotingPowerSource>,
        deployer: Address,
        settings: VotingSettings,
    ) -> Result<Rc<Self>> {
        settings.validate()?;
        let plugin = Rc::new(Self::new(address, dao, power));
        chain.deploy(address, plugin.clone())?;
        chain.transact(Tx::new(deployer, address), |ctx| {
            plugin.initialize(ctx, settings)
        })?;
        Ok(plugin)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn dao_address(&self) -> Address {
        self.dao.executor_address()
    }

    /// One-time setup of the voting settings
    fn initialize(&self, ctx: &CallContext<'_>, settings: VotingSettings) -> Result<()> {
        if self.state.borrow().settings.is_some() {
            return Err(GovernanceError::AlreadyInitialized);
        }
        self.apply_settings(ctx, settings)?;
        log::info!("🗳️  Voting plugin {} initialized for DAO {}", self.address, self.dao_address());
        Ok(())
    }

    pub fn voting_settings(&self) -> Result<VotingSettings> {
        self.state.borrow().settings.ok_or(GovernanceError::NotInitialized)
    }

    pub fn update_voting_settings(&self, ctx: &CallContext<'_>, settings: VotingSettings) -> Result<()> {
        self.voting_settings()?;
        self.authorize(ctx, *UPDATE_VOTING_SETTINGS_PERMISSION_ID)?;
        self.apply_settings(ctx, settings)
    }

    fn apply_settings(&self, ctx: &CallContext<'_>, settings: VotingSettings) -> Result<()> {
        settings.validate()?;
        self.state.borrow_mut().settings = Some(settings);
        ctx.emit(Event::VotingSettingsUpdated {
            voting_mode: settings.voting_mode,
            support_threshold: settings.support_threshold,
            min_participation: settings.min_participation,
            min_duration: settings.min_duration,
            min_proposer_voting_power: settings.min_proposer_voting_power,
        });
        Ok(())
    }

    fn authorize(&self, ctx: &CallContext<'_>, permission_id: PermissionId) -> Result<()> {
        let who = ctx.sender();
        if self
            .dao
            .has_permission(ctx.chain(), self.address, who, permission_id, &[])
        {
            return Ok(());
        }
        Err(GovernanceError::Unauthorized {
            target: self.address,
            who,
            permission_id,
        })
    }

    pub fn total_voting_power(&self, block: u64) -> u128 {
        self.power.total_voting_power(block)
    }

    pub fn proposal_count(&self) -> u64 {
        self.state.borrow().proposals.len() as u64
    }

    fn with_proposal<T>(&self, proposal_id: u64, f: impl FnOnce(&Proposal) -> T) -> Result<T> {
        let state = self.state.borrow();
        usize::try_from(proposal_id)
            .ok()
            .and_then(|index| state.proposals.get(index))
            .map(f)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }

    fn with_proposal_mut<T>(&self, proposal_id: u64, f: impl FnOnce(&mut Proposal) -> T) -> Result<T> {
        let mut state = self.state.borrow_mut();
        usize::try_from(proposal_id)
            .ok()
            .and_then(|index| state.proposals.get_mut(index))
            .map(f)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }

    pub fn get_proposal(&self, proposal_id: u64) -> Result<Proposal> {
        self.with_proposal(proposal_id, Proposal::clone)
    }

    /// Last option cast by `voter` (`None` if they have not voted)
    pub fn get_vote_option(&self, proposal_id: u64, voter: &Address) -> Result<VoteOption> {
        self.with_proposal(proposal_id, |p| {
            p.vote_of(voter).map(|v| v.option).unwrap_or_default()
        })
    }

    pub fn get_voting_power_of_vote(&self, proposal_id: u64, voter: &Address) -> Result<u128> {
        self.with_proposal(proposal_id, |p| {
            p.vote_of(voter).map(|v| v.voting_power).unwrap_or(0)
        })
    }

    pub fn proposal_status(&self, chain: &Chain, proposal_id: u64) -> Result<ProposalStatus> {
        self.with_proposal(proposal_id, |p| {
            p.status(
                chain.timestamp(),
                self.power.total_voting_power(p.parameters.snapshot_block),
            )
        })
    }

    pub fn is_support_threshold_reached(&self, proposal_id: u64) -> Result<bool> {
        self.with_proposal(proposal_id, |p| {
            tally::is_support_threshold_reached(&p.tally, p.parameters.support_threshold)
        })
    }

    pub fn is_support_threshold_reached_early(&self, proposal_id: u64) -> Result<bool> {
        self.with_proposal(proposal_id, |p| {
            tally::is_support_threshold_reached_early(
                &p.tally,
                p.parameters.support_threshold,
                self.power.total_voting_power(p.parameters.snapshot_block),
            )
        })
    }

    pub fn is_min_participation_reached(&self, proposal_id: u64) -> Result<bool> {
        self.with_proposal(proposal_id, |p| {
            tally::is_min_participation_reached(&p.tally, p.parameters.min_voting_power)
        })
    }

    /// Check a vote and return the voter's power at the snapshot block
    fn check_vote(&self, proposal: &Proposal, voter: Address, option: VoteOption, now: u64) -> Result<u128> {
        let forbidden = GovernanceError::VoteCastForbidden {
            proposal_id: proposal.id,
            voter,
        };
        if !proposal.is_open(now) || option == VoteOption::None {
            return Err(forbidden);
        }
        let power = self
            .power
            .voting_power(&voter, proposal.parameters.snapshot_block);
        if power == 0 {
            return Err(forbidden);
        }
        if proposal.votes.contains_key(&voter) && !proposal.parameters.voting_mode.vote_replacement() {
            return Err(GovernanceError::VoteReplacementNotAllowed {
                proposal_id: proposal.id,
                voter,
            });
        }
        Ok(power)
    }

    pub fn can_vote(&self, chain: &Chain, proposal_id: u64, voter: &Address, option: VoteOption) -> bool {
        self.with_proposal(proposal_id, |p| {
            self.check_vote(p, *voter, option, chain.timestamp()).is_ok()
        })
        .unwrap_or(false)
    }

    pub fn can_execute(&self, chain: &Chain, proposal_id: u64) -> bool {
        self.with_proposal(proposal_id, |p| {
            tally::can_execute(GateInput {
                tally: &p.tally,
                early_execution: p.parameters.voting_mode.early_execution(),
                support_threshold: p.parameters.support_threshold,
                min_voting_power: p.parameters.min_voting_power,
                total_voting_power: self.power.total_voting_power(p.parameters.snapshot_block),
                window: p.window(chain.timestamp()),
                executed: p.executed,
            })
        })
        .unwrap_or(false)
    }

    /// Open a proposal and return its id.
    ///
    /// The caller needs `CREATE_PROPOSAL_PERMISSION` on the plugin or at
    /// least the configured minimum proposer voting power.
    pub fn create_proposal(&self, ctx: &mut CallContext<'_>, request: NewProposal) -> Result<u64> {
        let settings = self.voting_settings()?;
        let creator = ctx.sender();

        let permitted = self.dao.has_permission(
            ctx.chain(),
            self.address,
            creator,
            *CREATE_PROPOSAL_PERMISSION_ID,
            &[],
        );
        if !permitted && self.power.current_voting_power(&creator) < settings.min_proposer_voting_power {
            return Err(GovernanceError::ProposalCreationForbidden(creator));
        }

        let snapshot_block = ctx.block_number().saturating_sub(1);
        let total_voting_power = self.power.total_voting_power(snapshot_block);
        if total_voting_power == 0 {
            return Err(GovernanceError::NoVotingPower);
        }

        let (start_date, end_date) = validate_proposal_dates(
            request.start_date,
            request.end_date,
            ctx.timestamp(),
            settings.min_duration,
        )?;

        if request.actions.len() > MAX_ACTIONS {
            return Err(GovernanceError::TooManyActions {
                count: request.actions.len(),
                limit: MAX_ACTIONS,
            });
        }

        let proposal_id = self.proposal_count();
        let proposal = Proposal {
            id: proposal_id,
            creator,
            metadata: request.metadata,
            actions: request.actions,
            allow_failure_map: request.allow_failure_map,
            parameters: ProposalParameters {
                voting_mode: settings.voting_mode,
                support_threshold: settings.support_threshold,
                start_date,
                end_date,
                snapshot_block,
                min_voting_power: apply_ratio_ceiled(total_voting_power, settings.min_participation),
            },
            tally: Tally::default(),
            executed: false,
            votes: BTreeMap::new(),
        };

        ctx.emit(Event::ProposalCreated {
            proposal_id,
            creator,
            start_date,
            end_date,
            metadata: proposal.metadata.clone(),
            actions: proposal.actions.clone(),
            allow_failure_map: proposal.allow_failure_map,
        });
        self.state.borrow_mut().proposals.push(proposal);

        log::info!(
            "📝 Proposal {} created by {} (voting {} to {})",
            proposal_id,
            creator,
            start_date,
            end_date
        );

        if request.vote_option != VoteOption::None {
            self.vote(ctx, proposal_id, request.vote_option, request.try_early_execution)?;
        }
        Ok(proposal_id)
    }

    /// Cast or (in vote replacement mode) replace the sender's vote.
    ///
    /// With `try_early_execution` the proposal is executed right away if the
    /// vote made it executable.
    pub fn vote(
        &self,
        ctx: &mut CallContext<'_>,
        proposal_id: u64,
        option: VoteOption,
        try_early_execution: bool,
    ) -> Result<()> {
        let voter = ctx.sender();
        let now = ctx.timestamp();

        let voting_power = self.with_proposal_mut(proposal_id, |p| {
            let power = self.check_vote(p, voter, option, now)?;
            p.record_vote(voter, option, power);
            Ok::<_, GovernanceError>(power)
        })??;

        log::info!(
            "🗳️  {} voted {:?} on proposal {} with power {}",
            voter,
            option,
            proposal_id,
            voting_power
        );
        ctx.emit(Event::VoteCast {
            proposal_id,
            voter,
            vote_option: option,
            voting_power,
        });

        if try_early_execution && self.can_execute(ctx.chain(), proposal_id) {
            log::info!("⚡ Proposal {} reached early execution", proposal_id);
            self.execute_proposal(ctx, proposal_id)?;
        }
        Ok(())
    }

    pub fn execute(&self, ctx: &mut CallContext<'_>, proposal_id: u64) -> Result<ExecutionResult> {
        if !self.can_execute(ctx.chain(), proposal_id) {
            return Err(GovernanceError::ProposalExecutionForbidden(proposal_id));
        }
        self.execute_proposal(ctx, proposal_id)
    }

    fn execute_proposal(&self, ctx: &mut CallContext<'_>, proposal_id: u64) -> Result<ExecutionResult> {
        // Marked before the DAO runs the actions so nothing they trigger can
        // execute this proposal a second time
        let (actions, allow_failure_map) = self.with_proposal_mut(proposal_id, |p| {
            p.executed = true;
            (p.actions.clone(), p.allow_failure_map)
        })?;

        let dao_address = self.dao.executor_address();
        let result = self.dao.execute(
            &mut ctx.frame(dao_address),
            call_id_from_u64(proposal_id),
            &actions,
            allow_failure_map,
        )?;

        log::info!(
            "✅ Proposal {} executed ({} action(s))",
            proposal_id,
            actions.len()
        );
        ctx.emit(Event::ProposalExecuted {
            proposal_id,
            exec_results: result.exec_results.clone(),
            failure_map: result.failure_map,
        });
        Ok(result)
    }

    fn dispatch(&self, ctx: &mut CallContext<'_>, call: VotingCall) -> Result<Vec<u8>> {
        match call {
            VotingCall::CreateProposal(request) => {
                let proposal_id = self.create_proposal(ctx, request)?;
                Ok(encode_call(&proposal_id))
            }
            VotingCall::Vote {
                proposal_id,
                vote_option,
                try_early_execution,
            } => self
                .vote(ctx, proposal_id, vote_option, try_early_execution)
                .map(|_| Vec::new()),
            VotingCall::Execute { proposal_id } => {
                let result = self.execute(ctx, proposal_id)?;
                Ok(encode_call(&result))
            }
            VotingCall::UpdateVotingSettings(settings) => self
                .update_voting_settings(ctx, settings)
                .map(|_| Vec::new()),
        }
    }
}

impl Contract for VotingPlugin {
    fn call(&self, ctx: &mut CallContext<'_>, input: &[u8]) -> std::result::Result<Vec<u8>, Revert> {
        let call = VotingCall::decode(input).map_err(Revert::from_message)?;
        self.dispatch(ctx, call).map_err(|err| {
            log::debug!("Voting plugin {} reverted: {}", self.address, err);
            Revert::from_message(err)
        })
    }

    fn snapshot(&self) -> Box<dyn Any> {
        Box::new(self.state.borrow().clone())
    }

    fn restore(&self, snapshot: Box<dyn Any>) {
        if let Ok(state) = snapshot.downcast::<PluginState>() {
            *self.state.borrow_mut() = *state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::TokenSnapshot;
    use concord_core::{
        Action, ActionExecutor, BitMap, CallId, ExecuteError, PermissionOracle, VotingMode,
    };

    const HOUR: u64 = 60 * 60;

    struct Unprivileged(Address);

    impl PermissionOracle for Unprivileged {
        fn has_permission(&self, _: &Chain, _: Address, _: Address, _: PermissionId, _: &[u8]) -> bool {
            false
        }
    }

    impl ActionExecutor for Unprivileged {
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

    fn settings(min_duration: u64) -> VotingSettings {
        VotingSettings {
            voting_mode: VotingMode::Standard,
            support_threshold: 500_000,
            min_participation: 200_000,
            min_duration,
            min_proposer_voting_power: 0,
        }
    }

    fn deploy(chain: &Chain, settings: VotingSettings) -> Result<Rc<VotingPlugin>> {
        let token = TokenSnapshot::deploy(chain, Address::derive("token"))?;
        VotingPlugin::deploy(
            chain,
            Address::derive("plugin"),
            Rc::new(Unprivileged(Address::derive("dao"))),
            token,
            Address::derive("deployer"),
            settings,
        )
    }

    #[test]
    fn test_deploy_initializes() {
        let chain = Chain::new();
        let plugin = deploy(&chain, settings(HOUR)).unwrap();
        assert_eq!(plugin.voting_settings().unwrap(), settings(HOUR));

        // A second initialization from any account is refused
        let result = chain.transact(Tx::new(Address::derive("intruder"), plugin.address()), |ctx| {
            plugin.initialize(ctx, settings(2 * HOUR))
        });
        assert_eq!(result, Err(GovernanceError::AlreadyInitialized));
        assert_eq!(plugin.voting_settings().unwrap().min_duration, HOUR);
    }

    #[test]
    fn test_deploy_with_invalid_settings_leaves_no_contract() {
        let chain = Chain::new();
        assert!(matches!(
            deploy(&chain, settings(60)),
            Err(GovernanceError::MinDurationOutOfBounds { .. })
        ));
        assert!(chain.contract(&Address::derive("plugin")).is_none());
    }

    #[test]
    fn test_zero_dates_are_normalized() {
        assert_eq!(validate_proposal_dates(0, 0, 1_000, HOUR), Ok((1_000, 1_000 + HOUR)));
        assert_eq!(
            validate_proposal_dates(2_000, 0, 1_000, HOUR),
            Ok((2_000, 2_000 + HOUR))
        );
    }

    #[test]
    fn test_start_in_the_past() {
        assert_eq!(
            validate_proposal_dates(999, 0, 1_000, HOUR),
            Err(GovernanceError::DateOutOfBounds {
                limit: 1_000,
                actual: 999,
            })
        );
    }

    #[test]
    fn test_end_before_min_duration() {
        assert_eq!(
            validate_proposal_dates(0, 1_000 + HOUR - 1, 1_000, HOUR),
            Err(GovernanceError::DateOutOfBounds {
                limit: 1_000 + HOUR,
                actual: 1_000 + HOUR - 1,
            })
        );
        assert!(validate_proposal_dates(0, 1_000 + HOUR, 1_000, HOUR).is_ok());
    }

    #[test]
    fn test_start_near_max_timestamp() {
        let latest_start = MAX_TIMESTAMP - HOUR;
        assert!(validate_proposal_dates(latest_start, 0, 1_000, HOUR).is_ok());
        assert_eq!(
            validate_proposal_dates(latest_start + 1, 0, 1_000, HOUR),
            Err(GovernanceError::DateOutOfBounds {
                limit: latest_start,
                actual: latest_start + 1,
            })
        );
    }
}
