//! Voting plugin deployment configuration
//!
//! ```toml
//! address = "0x..."
//!
//! [voting]
//! voting_mode = "EarlyExecution"
//! support_threshold = 500000
//! min_participation = 200000
//! min_duration = 3600
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;

use concord_core::{Address, Chain, ChainError, DaoHandle};

use crate::error::{ConfigError, GovernanceError};
use crate::power::VotingPowerSource;
use crate::settings::VotingSettings;
use crate::voting::VotingPlugin;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Address the plugin is deployed at
    pub address: Address,
    pub voting: VotingSettings,
}

impl PluginConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: PluginConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.address.is_zero() || self.address.is_any() {
            return Err(GovernanceError::Chain(ChainError::InvalidAddress(
                self.address.to_string(),
            )));
        }
        self.voting.validate()
    }

    /// Deploy the plugin on `chain` and initialize it in a transaction sent
    /// by `deployer`
    pub fn deploy(
        &self,
        chain: &Chain,
        deployer: Address,
        dao: Rc<dyn DaoHandle>,
        power: Rc<dyn VotingPowerSource>,
    ) -> Result<Rc<VotingPlugin>, GovernanceError> {
        VotingPlugin::deploy(chain, self.address, dao, power, deployer, self.voting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::TokenSnapshot;
    use concord_core::{
        Action, ActionExecutor, BitMap, CallContext, CallId, ExecuteError, ExecutionResult,
        PermissionId, PermissionOracle, VotingMode,
    };

    struct NoPermissions(Address);

    impl PermissionOracle for NoPermissions {
        fn has_permission(&self, _: &Chain, _: Address, _: Address, _: PermissionId, _: &[u8]) -> bool {
            false
        }
    }

    impl ActionExecutor for NoPermissions {
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

    fn sample(min_duration: u64) -> String {
        format!(
            "address = \"{}\"\n\n[voting]\nvoting_mode = \"EarlyExecution\"\nsupport_threshold = 500000\nmin_participation = 200000\nmin_duration = {}\n",
            Address::derive("plugin"),
            min_duration
        )
    }

    #[test]
    fn test_parse() {
        let config = PluginConfig::from_toml_str(&sample(3600)).unwrap();
        assert_eq!(config.voting.voting_mode, VotingMode::EarlyExecution);
        assert_eq!(config.voting.support_threshold, 500_000);
        assert_eq!(config.voting.min_proposer_voting_power, 0);
    }

    #[test]
    fn test_rejects_short_duration() {
        assert!(matches!(
            PluginConfig::from_toml_str(&sample(60)),
            Err(ConfigError::Invalid(GovernanceError::MinDurationOutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_load_and_deploy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.toml");
        std::fs::write(&path, sample(7200)).unwrap();
        let config = PluginConfig::load(&path).unwrap();

        let chain = Chain::new();
        let token = TokenSnapshot::deploy(&chain, Address::derive("token")).unwrap();
        let plugin = config
            .deploy(
                &chain,
                Address::derive("deployer"),
                Rc::new(NoPermissions(Address::derive("dao"))),
                token,
            )
            .unwrap();

        assert_eq!(plugin.voting_settings().unwrap().min_duration, 7200);
        assert_eq!(plugin.dao_address(), Address::derive("dao"));
    }
}
