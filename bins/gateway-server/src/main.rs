//! HTTP gateway for FinP2P token operations over Tezos.
//!
//! Initializes the SDK against the configured node, registers the
//! operator account's signer, and serves the route layer until ctrl-c.
//!
//! # Configuration
//!
//! Chain settings come from the environment (see
//! [`GatewayConfig::from_env`]). The operator key is resolved from, in
//! order: `TEZOS_OPERATOR_SECRET` (an `edsk...` secret key),
//! `GATEWAY_MNEMONIC` (a BIP39 phrase), or a freshly generated mnemonic
//! that is logged so a dev sandbox run can be repeated.
//!
//! ```bash
//! export TEZOS_NODE_URL="http://localhost:20000"
//! export FINP2P_PROXY_CONTRACT="KT1..."
//! export FINP2P_FA2_CONTRACT="KT1..."
//! export TEZOS_OPERATOR_SECRET="edsk..."
//! RUST_LOG=info cargo run --release -p gateway-server
//! ```

mod routes;

use std::sync::Arc;

use bip39::Mnemonic;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::GatewayConfig;
use crypto::Keypair;
use rpc::{RpcClient, RpcConfig};
use sdk::Sdk;
use signer::{LocalSigner, SignerRegistry};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("gateway-server starting");

    // -----------------------------------------------------------------------
    // Configuration and operator wallet
    // -----------------------------------------------------------------------

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(%e, "configuration error");
            std::process::exit(1);
        }
    };

    let operator_keypair = resolve_operator_keypair();
    let operator_pk = operator_keypair.public_key();

    let registry = Arc::new(SignerRegistry::new());
    let operator = registry.register_derived(Arc::new(LocalSigner::new(operator_keypair)));

    tracing::info!(network = %config.network, node = %config.node_url, "chain configuration loaded");
    tracing::info!(address = %operator, finid = %operator_pk, "operator account ready");

    // -----------------------------------------------------------------------
    // SDK init
    // -----------------------------------------------------------------------

    let chain = match RpcClient::new(config.node_url.as_str(), RpcConfig::default()) {
        Ok(chain) => chain,
        Err(e) => {
            tracing::error!(%e, "node endpoint rejected");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let sdk = Sdk::new(config, chain, registry, operator, cancel.clone());

    tracing::info!("SDK initialized");

    // -----------------------------------------------------------------------
    // HTTP server
    // -----------------------------------------------------------------------

    let listen_addr =
        std::env::var("GATEWAY_LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_owned());

    let app = routes::router(sdk.clone());
    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%listen_addr, %e, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(%listen_addr, "listening");

    let shutdown = cancel.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown.cancelled().await;
    });

    // -----------------------------------------------------------------------
    // Wait for shutdown
    // -----------------------------------------------------------------------

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
            cancel.cancel();
        }
    });

    if let Err(e) = server.await {
        tracing::error!(%e, "server error");
    }

    sdk.shutdown().await;
    tracing::info!("gateway-server stopped");
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve the operator key pair from the environment, or generate a
/// fresh one for sandbox runs.
fn resolve_operator_keypair() -> Keypair {
    if let Ok(secret) = std::env::var("TEZOS_OPERATOR_SECRET") {
        return Keypair::from_b58_secret(&secret)
            .unwrap_or_else(|e| panic!("TEZOS_OPERATOR_SECRET is not a valid edsk key: {e}"));
    }

    let mnemonic = if let Ok(phrase) = std::env::var("GATEWAY_MNEMONIC") {
        phrase
            .parse::<Mnemonic>()
            .unwrap_or_else(|e| panic!("GATEWAY_MNEMONIC is not a valid BIP39 mnemonic: {e}"))
    } else {
        let mut entropy = [0u8; 16];
        rand_core::RngCore::fill_bytes(&mut rand_core::OsRng, &mut entropy);
        let mnemonic = Mnemonic::from_entropy(&entropy).expect("valid entropy");
        tracing::warn!(%mnemonic, "no operator key configured, generated a fresh mnemonic");
        mnemonic
    };

    Keypair::from_seed(&mnemonic.to_seed("")).expect("BIP39 seed is 64 bytes")
}
