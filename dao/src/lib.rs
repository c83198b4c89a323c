//! Concord DAO
//!
//! The organization contract: owns the permission registry, runs action
//! batches through the executor and answers standard callbacks.

pub mod call;
pub mod callback;
pub mod config;
pub mod dao;
pub mod error;
pub mod executor;
pub mod ids;
pub mod version;

pub use call::DaoCall;
pub use callback::{CallbackRegistry, CallbackResult, Selector};
pub use config::DaoConfig;
pub use dao::{Dao, ERC165_INTERFACE_ID};
pub use error::{ConfigError, DaoError, Result};
pub use executor::{ReentrancyGuard, ReentrancyStatus};
pub use ids::{
    restricted_permissions, EXECUTE_PERMISSION_ID, REGISTER_STANDARD_CALLBACK_PERMISSION_ID,
    SET_METADATA_PERMISSION_ID, SET_TRUSTED_FORWARDER_PERMISSION_ID, UPGRADE_DAO_PERMISSION_ID,
};
pub use version::{DaoState, DaoStateV1, ProtocolVersion};
