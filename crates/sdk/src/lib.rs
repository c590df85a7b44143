//! FinP2P token operations over Tezos: the transaction lifecycle
//! manager.
//!
//! The SDK orchestrates every domain operation end to end:
//!
//! - **Batch building** ([`batch`]) -- counter assignment, reveal
//!   handling, per-action fee/gas/storage estimation
//! - **Forging** ([`forge`]) -- the canonical binary encoding of
//!   manager operation groups
//! - **Sign and inject** ([`inject`]) -- branch anchoring, signing via
//!   the [`signer::SignerRegistry`], local hash computation, injection
//! - **Inclusion tracking** ([`confirm`]) -- history scan, live head
//!   stream, confirmation depth, reorg detection
//! - **Token operations** ([`operations`]) -- issue, transfer, redeem,
//!   hold, release, execute, balance and receipt queries
//!
//! The chain boundary is the [`chain::ChainRpc`] trait; production uses
//! [`rpc::RpcClient`], tests use a scripted chain. All chain state
//! (balances, holds) lives on-chain -- the SDK holds no ledger.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use config::GatewayConfig;
//! use crypto::Keypair;
//! use rpc::{RpcClient, RpcConfig};
//! use sdk::{IssueRequest, Sdk};
//! use signer::{LocalSigner, SignerRegistry};
//! use tezos_core::Network;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::new(
//!     Network::Sandbox,
//!     "http://localhost:20000",
//!     "KT1BEqzn5Wx8uJrZNvuS9DVHmLvG9td3fDLi".parse()?,
//!     "KT19kgnqC5VWoxktLRdRUERbyUPku9YioE8W".parse()?,
//! );
//! let chain = RpcClient::new(config.node_url.as_str(), RpcConfig::default())?;
//!
//! let registry = Arc::new(SignerRegistry::new());
//! let operator = registry.register_derived(Arc::new(LocalSigner::new(
//!     Keypair::from_b58_secret("edsk...")?,
//! )));
//!
//! let cancel = CancellationToken::new();
//! let sdk = Sdk::new(config, chain, registry, operator, cancel.clone());
//!
//! let receipt = sdk
//!     .issue(IssueRequest {
//!         asset_id: "asset-A".into(),
//!         destination: "edpk...".into(),
//!         quantity: "150".into(),
//!     })
//!     .await?;
//! println!("issued in operation {}", receipt.operation);
//!
//! // SDK is Clone -- share across tasks. Graceful shutdown:
//! cancel.cancel();
//! sdk.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod chain;
pub mod confirm;
pub mod error;
pub mod forge;
pub mod inject;
pub mod micheline;
pub mod operations;

pub(crate) mod utils;

#[cfg(test)]
pub(crate) mod mock;

pub use confirm::{TrackOutcome, TrackerConfig};
pub use error::SdkError;
pub use operations::{
    Balance, ExecuteRequest, HoldRequest, IssueRequest, Receipt, ReceiptStatus, RedeemRequest,
    ReleaseRequest, SettlementTerms, TransferRequest,
};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use config::GatewayConfig;
use signer::SignerRegistry;
use tezos_core::Address;

use crate::chain::ChainRpc;

// ---------------------------------------------------------------------------
// Sdk
// ---------------------------------------------------------------------------

/// Shared state across all SDK operations.
pub(crate) struct SdkInner<C> {
    pub config: GatewayConfig,
    pub chain: C,
    pub registry: Arc<SignerRegistry>,
    pub operator: Address,
    pub cancel: CancellationToken,
}

/// The gateway SDK entry point.
///
/// `Clone`-able (wraps an `Arc`). The signer registry is an explicitly
/// passed instance, never module-level state, so each process and each
/// test gets its own.
///
/// `operator` is the Tezos account that submits all proxy calls; asset
/// accounts authorize their operations at the contract level via
/// hash-group signatures, not by submitting Tezos operations
/// themselves.
pub struct Sdk<C: ChainRpc> {
    pub(crate) inner: Arc<SdkInner<C>>,
}

// Manual Clone: C itself need not be Clone.
impl<C: ChainRpc> Clone for Sdk<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: ChainRpc> std::fmt::Debug for Sdk<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdk")
            .field("network", &self.inner.config.network)
            .field("operator", &self.inner.operator.to_string())
            .finish()
    }
}

impl<C: ChainRpc> Sdk<C> {
    /// Creates a new SDK instance. No network I/O happens here.
    pub fn new(
        config: GatewayConfig,
        chain: C,
        registry: Arc<SignerRegistry>,
        operator: Address,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(SdkInner {
                config,
                chain,
                registry,
                operator,
                cancel,
            }),
        }
    }

    /// The deployment configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// The signer registry.
    pub fn registry(&self) -> &SignerRegistry {
        &self.inner.registry
    }

    /// The operator account submitting proxy calls.
    pub fn operator(&self) -> Address {
        self.inner.operator
    }

    /// Checks whether the SDK has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Returns [`SdkError::Cancelled`] if the cancellation token fired.
    pub(crate) fn check_cancelled(&self) -> Result<(), SdkError> {
        if self.inner.cancel.is_cancelled() {
            Err(SdkError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Graceful shutdown: signals cancellation and yields so in-flight
    /// operations observing the token can exit.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        tokio::task::yield_now().await;
    }
}
