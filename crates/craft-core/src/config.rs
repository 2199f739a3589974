//! Client configuration.
//!
//! [`ClientConfig`] is an immutable value handed to each component at
//! construction. It is layered with the `config` crate: built-in defaults
//! (the Sepolia deployment), then an optional TOML file, then `CRAFT_*`
//! environment variables (`CRAFT_SYNC__POLL_INTERVAL_MS=5000`).

use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{
    DEFAULT_CONFIRMATION_POLL_MS, DEFAULT_CONFIRMATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RPC_ENDPOINT, SEPOLIA_CHAIN_ID, SEPOLIA_LARPCOIN,
};
use crate::error::ConfigError;
use crate::types::Governor;

/// Top-level configuration for a client instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_endpoint: String,
    /// Chain the contracts are deployed on.
    pub chain_id: u64,
    /// Account whose state is displayed and which sends transactions.
    pub account: Address,
    pub contracts: ContractAddresses,
    pub names: DisplayNames,
    pub sync: SyncConfig,
    pub orchestrator: OrchestratorConfig,
    /// Log filter string (e.g. "info", "craft_sync=debug").
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractAddresses {
    pub larpcoin: Address,
    pub game_piece: Address,
    pub slowlock: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayNames {
    pub larpcoin: String,
    pub game_piece: String,
}

/// Contract State Cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Advisory lower bound between gateway polls.
    pub poll_interval_ms: u64,
    /// Timeout of a single gateway request.
    pub request_timeout_ms: u64,
}

/// Transaction Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Interval between finality queries.
    pub confirmation_poll_ms: u64,
    /// A step still pending after this long fails the run as indeterminate.
    pub confirmation_timeout_ms: u64,
    /// Blocks a receipt must be buried under before it counts as final.
    pub required_confirmations: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::sepolia()
    }
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self { larpcoin: SEPOLIA_LARPCOIN, game_piece: Address::ZERO, slowlock: Address::ZERO }
    }
}

impl Default for DisplayNames {
    fn default() -> Self {
        Self { larpcoin: "$CRAFT".to_string(), game_piece: "Pickaxe".to_string() }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            confirmation_poll_ms: DEFAULT_CONFIRMATION_POLL_MS,
            confirmation_timeout_ms: DEFAULT_CONFIRMATION_TIMEOUT_MS,
            required_confirmations: 1,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl OrchestratorConfig {
    pub fn confirmation_poll(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }
}

impl ClientConfig {
    /// Preset for the public Sepolia deployment.
    pub fn sepolia() -> Self {
        Self {
            rpc_endpoint: DEFAULT_RPC_ENDPOINT.to_string(),
            chain_id: SEPOLIA_CHAIN_ID,
            account: Address::ZERO,
            contracts: ContractAddresses::default(),
            names: DisplayNames::default(),
            sync: SyncConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }

    /// Layer defaults, an optional file and `CRAFT_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CRAFT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        let cfg: ClientConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        debug!(file = ?path, endpoint = %cfg.rpc_endpoint, chain_id = cfg.chain_id, "configuration loaded");
        Ok(cfg)
    }

    /// Reject settings no component can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_endpoint.is_empty() {
            return Err(ConfigError::Invalid { field: "rpc_endpoint", reason: "empty".into() });
        }
        if self.sync.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "sync.poll_interval_ms",
                reason: "must be positive".into(),
            });
        }
        if self.orchestrator.confirmation_poll_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "orchestrator.confirmation_poll_ms",
                reason: "must be positive".into(),
            });
        }
        if self.orchestrator.confirmation_timeout_ms < self.orchestrator.confirmation_poll_ms {
            return Err(ConfigError::Invalid {
                field: "orchestrator.confirmation_timeout_ms",
                reason: "shorter than the poll interval".into(),
            });
        }
        Ok(())
    }

    pub fn larpcoin(&self) -> Result<Address, ConfigError> {
        require(self.contracts.larpcoin, "larpcoin")
    }

    pub fn game_piece(&self) -> Result<Address, ConfigError> {
        require(self.contracts.game_piece, "game_piece")
    }

    pub fn slowlock(&self) -> Result<Address, ConfigError> {
        require(self.contracts.slowlock, "slowlock")
    }

    /// The configured account. Writes and per-account reads need one.
    pub fn account(&self) -> Result<Address, ConfigError> {
        require(self.account, "account")
    }

    /// Token whose votes the given governor counts.
    pub fn governor_token(&self, governor: Governor) -> Result<Address, ConfigError> {
        match governor {
            Governor::Larpcoin => self.larpcoin(),
            Governor::GamePiece => self.game_piece(),
        }
    }
}

fn require(address: Address, name: &'static str) -> Result<Address, ConfigError> {
    if address == Address::ZERO {
        return Err(ConfigError::MissingAddress(name));
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_is_sepolia() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.chain_id, SEPOLIA_CHAIN_ID);
        assert_eq!(cfg.contracts.larpcoin, SEPOLIA_LARPCOIN);
        assert_eq!(cfg.rpc_endpoint, DEFAULT_RPC_ENDPOINT);
        assert_eq!(cfg.sync.poll_interval(), Duration::from_millis(24_000));
    }

    #[test]
    fn default_validates() {
        ClientConfig::default().validate().unwrap();
    }

    #[test]
    fn default_names() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.names.larpcoin, "$CRAFT");
        assert_eq!(cfg.names.game_piece, "Pickaxe");
    }

    #[test]
    fn unset_addresses_are_reported() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.game_piece(), Err(ConfigError::MissingAddress("game_piece")));
        assert_eq!(cfg.account(), Err(ConfigError::MissingAddress("account")));
        assert_eq!(cfg.larpcoin(), Ok(SEPOLIA_LARPCOIN));
    }

    #[test]
    fn governor_token_maps_to_contract() {
        let cfg = ClientConfig {
            contracts: ContractAddresses {
                larpcoin: Address::repeat_byte(1),
                game_piece: Address::repeat_byte(2),
                slowlock: Address::repeat_byte(3),
            },
            ..ClientConfig::default()
        };
        assert_eq!(cfg.governor_token(Governor::Larpcoin), Ok(Address::repeat_byte(1)));
        assert_eq!(cfg.governor_token(Governor::GamePiece), Ok(Address::repeat_byte(2)));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let cfg = ClientConfig {
            sync: SyncConfig { poll_interval_ms: 0, ..SyncConfig::default() },
            ..ClientConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { field: "sync.poll_interval_ms", .. })));
    }

    #[test]
    fn timeout_shorter_than_poll_rejected() {
        let cfg = ClientConfig {
            orchestrator: OrchestratorConfig {
                confirmation_poll_ms: 1_000,
                confirmation_timeout_ms: 10,
                required_confirmations: 1,
            },
            ..ClientConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_from_toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
rpc_endpoint = "http://127.0.0.1:8545"
account = "0x1111111111111111111111111111111111111111"

[contracts]
game_piece = "0x2222222222222222222222222222222222222222"

[sync]
poll_interval_ms = 1000
"#
        )
        .unwrap();

        let cfg = ClientConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.rpc_endpoint, "http://127.0.0.1:8545");
        assert_eq!(cfg.account, Address::repeat_byte(0x11));
        assert_eq!(cfg.contracts.game_piece, Address::repeat_byte(0x22));
        assert_eq!(cfg.contracts.larpcoin, SEPOLIA_LARPCOIN);
        assert_eq!(cfg.sync.poll_interval_ms, 1000);
        assert_eq!(cfg.sync.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
    }

    #[test]
    fn load_rejects_invalid_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[sync]\npoll_interval_ms = 0").unwrap();
        assert!(ClientConfig::load(Some(file.path())).is_err());
    }
}
