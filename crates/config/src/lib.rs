//! Gateway configuration.
//!
//! This crate provides:
//!
//! - [`GatewayConfig`] -- node endpoint, proxy/FA2 contract addresses,
//!   and inclusion-tracking budgets for one deployment
//! - [`constants`] -- protocol-level parameters (fee model, gas caps,
//!   tracker defaults)
//!
//! `config` depends only on `tezos-core` and can be used freely as a
//! leaf dependency. Environment loading lives here so the server binary
//! and integration tests share one parsing path.

pub mod constants;

use std::fmt;

use tezos_core::{ContractAddress, Network};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from environment-based configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset.
    MissingEnv(&'static str),

    /// An environment variable is set but unparseable.
    InvalidEnv {
        key: &'static str,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnv(key) => write!(f, "missing environment variable {key}"),
            Self::InvalidEnv { key, reason } => {
                write!(f, "invalid value for {key}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

/// Deployment configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Which Tezos network this deployment targets.
    pub network: Network,

    /// Base URL of the Tezos node RPC (e.g. `http://localhost:20000`).
    pub node_url: String,

    /// The FinP2P proxy contract all domain operations are sent to.
    pub proxy_contract: ContractAddress,

    /// The FA2 ledger contract behind the proxy.
    pub fa2_contract: ContractAddress,

    /// Confirmations required before an inclusion is reported final.
    pub confirmations: u32,

    /// Blocks of history scanned before subscribing to new heads.
    pub search_depth: u32,

    /// New heads observed without success before timing out.
    pub max_heads: u32,

    /// How many blocks behind the head the branch anchor is taken.
    pub branch_offset: u32,
}

impl GatewayConfig {
    /// Build a configuration with default tracker budgets.
    pub fn new(
        network: Network,
        node_url: impl Into<String>,
        proxy_contract: ContractAddress,
        fa2_contract: ContractAddress,
    ) -> Self {
        Self {
            network,
            node_url: node_url.into(),
            proxy_contract,
            fa2_contract,
            confirmations: constants::DEFAULT_CONFIRMATIONS,
            search_depth: constants::DEFAULT_SEARCH_DEPTH,
            max_heads: constants::DEFAULT_MAX_HEADS,
            branch_offset: constants::DEFAULT_BRANCH_OFFSET,
        }
    }

    /// Default public node endpoint for a network.
    pub const fn default_node_url(network: Network) -> &'static str {
        match network {
            Network::Mainnet => "https://mainnet.tezos.marigold.dev",
            Network::Ghostnet => "https://rpc.ghostnet.teztnets.com",
            Network::Sandbox => "http://localhost:20000",
        }
    }

    /// Load a configuration from the environment.
    ///
    /// | Variable | Meaning | Default |
    /// |---|---|---|
    /// | `TEZOS_NETWORK` | `mainnet` / `ghostnet` / `sandbox` | `sandbox` |
    /// | `TEZOS_NODE_URL` | node RPC base URL | per-network default |
    /// | `FINP2P_PROXY_CONTRACT` | KT1 proxy address | required |
    /// | `FINP2P_FA2_CONTRACT` | KT1 FA2 address | required |
    /// | `TEZOS_CONFIRMATIONS` | required confirmations | 2 |
    pub fn from_env() -> Result<Self, ConfigError> {
        let network = match std::env::var("TEZOS_NETWORK").ok().as_deref() {
            None | Some("sandbox") => Network::Sandbox,
            Some("mainnet") => Network::Mainnet,
            Some("ghostnet") => Network::Ghostnet,
            Some(other) => {
                return Err(ConfigError::InvalidEnv {
                    key: "TEZOS_NETWORK",
                    reason: format!("unknown network '{other}'"),
                })
            }
        };

        let node_url = std::env::var("TEZOS_NODE_URL")
            .unwrap_or_else(|_| Self::default_node_url(network).to_owned());

        let proxy_contract = require_contract("FINP2P_PROXY_CONTRACT")?;
        let fa2_contract = require_contract("FINP2P_FA2_CONTRACT")?;

        let mut config = Self::new(network, node_url, proxy_contract, fa2_contract);

        if let Ok(raw) = std::env::var("TEZOS_CONFIRMATIONS") {
            config.confirmations = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "TEZOS_CONFIRMATIONS",
                reason: format!("'{raw}' is not a block count"),
            })?;
        }

        Ok(config)
    }
}

/// Read and parse a required KT1 address from the environment.
fn require_contract(key: &'static str) -> Result<ContractAddress, ConfigError> {
    let raw = std::env::var(key).map_err(|_| ConfigError::MissingEnv(key))?;
    raw.parse().map_err(|e| ConfigError::InvalidEnv {
        key,
        reason: format!("{e}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
