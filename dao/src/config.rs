//! DAO deployment configuration
//!
//! ```toml
//! address = "0x..."
//! initial_owner = "0x..."
//! metadata = "ipfs://..."
//! dao_uri = "https://..."
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;

use concord_core::{Address, Chain, Tx};

use crate::dao::Dao;
use crate::error::{ConfigError, DaoError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoConfig {
    /// Address the DAO is deployed at
    pub address: Address,
    /// Receives `ROOT_PERMISSION` on initialization
    pub initial_owner: Address,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub trusted_forwarder: Address,
    #[serde(default)]
    pub dao_uri: String,
}

impl DaoConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: DaoConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.is_zero() || self.address.is_any() {
            return Err(ConfigError::Invalid(format!("bad DAO address {}", self.address)));
        }
        if self.initial_owner.is_any() {
            return Err(ConfigError::Invalid(
                "initial owner cannot be the wildcard address".to_string(),
            ));
        }
        Ok(())
    }

    /// Deploy and initialize a DAO on `chain`
    pub fn deploy(&self, chain: &Chain) -> Result<Rc<Dao>, DaoError> {
        let dao = Dao::deploy(chain, self.address)?;
        chain.transact(Tx::new(self.initial_owner, self.address), |ctx| {
            dao.initialize(
                ctx,
                self.metadata.clone().into_bytes(),
                self.initial_owner,
                self.trusted_forwarder,
                self.dao_uri.clone(),
            )
        })?;
        Ok(dao)
    }
}
