//! Tezos node RPC client.
//!
//! Provides [`RpcClient`] -- a `reqwest`-backed JSON/HTTP client for the
//! node endpoints the gateway consumes:
//!
//! - context reads: account counter, manager key
//! - block queries: header, hash at offset, operation hashes
//! - `run_operation` simulation and `run_view` contract reads
//! - signed-operation injection
//! - the chunked `/monitor/heads/main` stream ([`monitor`])
//!
//! # Connection Model
//!
//! One shared `reqwest::Client` (connection-pooled, HTTP/1.1 keep-alive).
//! Per-request timeouts are applied call-by-call so the long-lived head
//! monitor is exempt from the request deadline; cancelling the monitor is
//! done by dropping it.
//!
//! # Example
//!
//! ```no_run
//! use rpc::{RpcClient, RpcConfig};
//!
//! # async fn example() -> Result<(), rpc::RpcError> {
//! let client = RpcClient::new("http://localhost:20000", RpcConfig::default())?;
//! let head = client.head_header().await?;
//! println!("head at level {}", head.level);
//! # Ok(())
//! # }
//! ```

pub mod monitor;
pub mod types;

pub use monitor::HeadMonitor;
pub use types::{BlockHeader, Estimate, NewHead, SimulatedOp};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde_json::{json, Value};

use tezos_core::{Address, BlockHash, OperationHash, PublicKey};

use crate::types::RawBlockHeader;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from the node RPC layer.
#[derive(Debug)]
pub enum RpcError {
    /// The node base URL is invalid.
    InvalidEndpoint { url: String, reason: String },

    /// The HTTP request failed before a response arrived (connect,
    /// timeout, TLS, mid-stream disconnect).
    Transport(String),

    /// The node answered with a non-success status.
    Http { status: u16, body: String },

    /// The response body could not be decoded into the expected shape.
    Decode(String),
}

impl RpcError {
    /// True for failures that are plausibly transient network hiccups.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEndpoint { url, reason } => {
                write!(f, "invalid node endpoint '{url}': {reason}")
            }
            Self::Transport(reason) => write!(f, "node unreachable: {reason}"),
            Self::Http { status, body } => write!(f, "node returned HTTP {status}: {body}"),
            Self::Decode(reason) => write!(f, "unexpected node response: {reason}"),
        }
    }
}

impl std::error::Error for RpcError {}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the RPC client.
///
/// All timeouts have sensible defaults. The request timeout does not
/// apply to the head monitor stream.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// TCP + TLS handshake timeout. Default: 10 s.
    pub connect_timeout: Duration,

    /// Per-request timeout for unary calls. Default: 30 s.
    pub request_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RpcConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RpcConfigBuilder {
        RpcConfigBuilder::default()
    }
}

/// Builder for [`RpcConfig`].
#[derive(Debug, Default)]
pub struct RpcConfigBuilder {
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl RpcConfigBuilder {
    /// Sets the TCP + TLS connection timeout.
    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = Some(d);
        self
    }

    /// Sets the per-request timeout for unary calls.
    pub fn request_timeout(mut self, d: Duration) -> Self {
        self.request_timeout = Some(d);
        self
    }

    /// Builds the configuration, filling unset values with defaults.
    pub fn build(self) -> RpcConfig {
        let d = RpcConfig::default();
        RpcConfig {
            connect_timeout: self.connect_timeout.unwrap_or(d.connect_timeout),
            request_timeout: self.request_timeout.unwrap_or(d.request_timeout),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// JSON/HTTP client for one Tezos node.
///
/// Cheap to clone (`reqwest::Client` is reference-counted internally).
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    base: String,
    config: RpcConfig,
}

impl RpcClient {
    /// Creates a client for the given node base URL.
    ///
    /// No network I/O happens during construction.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InvalidEndpoint`] if the URL cannot back a
    /// client (bad scheme, TLS setup failure).
    pub fn new(node_url: impl Into<String>, config: RpcConfig) -> Result<Self, RpcError> {
        let base = node_url.into().trim_end_matches('/').to_owned();

        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(RpcError::InvalidEndpoint {
                url: base,
                reason: "expected an http:// or https:// URL".into(),
            });
        }

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| RpcError::InvalidEndpoint {
                url: base.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { http, base, config })
    }

    /// The node base URL.
    pub fn node_url(&self) -> &str {
        &self.base
    }

    // -- context reads -------------------------------------------------------

    /// Current on-chain counter of an implicit account.
    pub async fn counter(&self, source: &Address) -> Result<u64, RpcError> {
        let value: String = self
            .get_json(&format!(
                "/chains/main/blocks/head/context/contracts/{source}/counter"
            ))
            .await?;
        value
            .parse()
            .map_err(|_| RpcError::Decode(format!("counter '{value}' is not an integer")))
    }

    /// The revealed manager key of an account, or `None` when the
    /// account has not published its public key yet.
    pub async fn manager_key(&self, source: &Address) -> Result<Option<PublicKey>, RpcError> {
        let value: Value = self
            .get_json(&format!(
                "/chains/main/blocks/head/context/contracts/{source}/manager_key"
            ))
            .await?;
        match value {
            Value::Null => Ok(None),
            Value::String(s) => s
                .parse()
                .map(Some)
                .map_err(|e| RpcError::Decode(format!("bad manager key '{s}': {e}"))),
            other => Err(RpcError::Decode(format!(
                "manager_key is neither string nor null: {other}"
            ))),
        }
    }

    /// The chain id of the main chain (needed by simulation calls).
    pub async fn chain_id(&self) -> Result<String, RpcError> {
        self.get_json("/chains/main/chain_id").await
    }

    // -- block queries -------------------------------------------------------

    /// Header of the current head.
    pub async fn head_header(&self) -> Result<BlockHeader, RpcError> {
        self.block_header("head").await
    }

    /// Header of an arbitrary block reference (`head`, `head~2`, a hash,
    /// or `<hash>~<n>`).
    pub async fn block_header(&self, block_ref: &str) -> Result<BlockHeader, RpcError> {
        let raw: RawBlockHeader = self
            .get_json(&format!("/chains/main/blocks/{block_ref}/header"))
            .await?;
        raw.try_into()
    }

    /// Hash of the block `offset` levels behind `base`.
    pub async fn block_hash_at_offset(
        &self,
        base: &BlockHash,
        offset: u32,
    ) -> Result<BlockHash, RpcError> {
        let block_ref = if offset == 0 {
            base.to_string()
        } else {
            format!("{base}~{offset}")
        };
        let value: String = self
            .get_json(&format!("/chains/main/blocks/{block_ref}/hash"))
            .await?;
        value
            .parse()
            .map_err(|e| RpcError::Decode(format!("bad block hash '{value}': {e}")))
    }

    /// All operation hashes in a block, flattened across the four
    /// validation passes.
    pub async fn operation_hashes(&self, block: &BlockHash) -> Result<Vec<OperationHash>, RpcError> {
        let passes: Vec<Vec<String>> = self
            .get_json(&format!("/chains/main/blocks/{block}/operation_hashes"))
            .await?;

        let mut hashes = Vec::new();
        for s in passes.into_iter().flatten() {
            let hash = OperationHash::from_str(&s)
                .map_err(|e| RpcError::Decode(format!("bad operation hash '{s}': {e}")))?;
            hashes.push(hash);
        }
        Ok(hashes)
    }

    // -- simulation and views ------------------------------------------------

    /// Simulate an operation group against the head context.
    ///
    /// `operation` is the JSON form of the group (branch, contents, dummy
    /// signature). Returns one [`SimulatedOp`] per content, in order.
    pub async fn run_operation(&self, operation: Value) -> Result<Vec<SimulatedOp>, RpcError> {
        let chain_id = self.chain_id().await?;
        let body = json!({ "operation": operation, "chain_id": chain_id });

        let response: Value = self
            .post_json(
                "/chains/main/blocks/head/helpers/scripts/run_operation",
                &body,
            )
            .await?;

        parse_simulation(&response)
    }

    /// Execute an on-chain view and return its Micheline result.
    pub async fn run_view(
        &self,
        contract: &str,
        view: &str,
        input: Value,
    ) -> Result<Value, RpcError> {
        let chain_id = self.chain_id().await?;
        let body = json!({
            "contract": contract,
            "view": view,
            "input": input,
            "chain_id": chain_id,
            "unparsing_mode": "Readable",
        });

        let response: Value = self
            .post_json("/chains/main/blocks/head/helpers/scripts/run_view", &body)
            .await?;

        response
            .get("data")
            .cloned()
            .ok_or_else(|| RpcError::Decode("run_view response missing 'data'".into()))
    }

    // -- injection -----------------------------------------------------------

    /// Inject hex-encoded signed operation bytes, returning the
    /// operation hash assigned by the node.
    pub async fn inject_operation(&self, signed_hex: &str) -> Result<OperationHash, RpcError> {
        let value: String = self
            .post_json("/injection/operation?chain=main", &json!(signed_hex))
            .await?;
        value
            .parse()
            .map_err(|e| RpcError::Decode(format!("bad injected hash '{value}': {e}")))
    }

    // -- monitoring ----------------------------------------------------------

    /// Open the live head stream.
    ///
    /// The returned [`HeadMonitor`] yields one [`NewHead`] per new block
    /// until dropped; dropping it closes the underlying connection.
    pub async fn monitor_heads(&self) -> Result<HeadMonitor, RpcError> {
        let url = format!("{}/monitor/heads/main", self.base);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Http { status, body });
        }

        Ok(HeadMonitor::new(response.bytes_stream()))
    }

    // -- private helpers -----------------------------------------------------

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, RpcError> {
        let url = format!("{}{path}", self.base);
        tracing::trace!(%url, "rpc get");

        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        decode_response(response).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, RpcError> {
        let url = format!("{}{path}", self.base);
        tracing::trace!(%url, "rpc post");

        let response = self
            .http
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        decode_response(response).await
    }
}

/// Turn an HTTP response into a decoded value or a typed error.
async fn decode_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, RpcError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RpcError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(RpcError::Http {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| RpcError::Decode(format!("{e} in body: {body}")))
}

// ---------------------------------------------------------------------------
// Simulation response parsing
// ---------------------------------------------------------------------------

/// Extract per-content outcomes from a `run_operation` response.
fn parse_simulation(response: &Value) -> Result<Vec<SimulatedOp>, RpcError> {
    let contents = response
        .get("contents")
        .and_then(Value::as_array)
        .ok_or_else(|| RpcError::Decode("run_operation response missing 'contents'".into()))?;

    contents.iter().map(parse_simulated_content).collect()
}

fn parse_simulated_content(content: &Value) -> Result<SimulatedOp, RpcError> {
    let result = content
        .pointer("/metadata/operation_result")
        .ok_or_else(|| RpcError::Decode("content missing metadata.operation_result".into()))?;

    let status = result
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::Decode("operation_result missing status".into()))?;

    if status != "applied" {
        let errors = result
            .get("errors")
            .map(render_errors)
            .unwrap_or_else(|| status.to_owned());
        return Ok(SimulatedOp::Failed(errors));
    }

    let mut milligas = read_string_u64(result, "consumed_milligas")?;
    let mut storage = read_string_u64(result, "paid_storage_size_diff")?;

    // Internal operations (contract-to-contract calls) consume resources
    // on behalf of the same source.
    if let Some(internal) = content
        .pointer("/metadata/internal_operation_results")
        .and_then(Value::as_array)
    {
        for op in internal {
            if let Some(r) = op.get("result") {
                milligas += read_string_u64(r, "consumed_milligas")?;
                storage += read_string_u64(r, "paid_storage_size_diff")?;
            }
        }
    }

    Ok(SimulatedOp::Applied(Estimate {
        consumed_gas: milligas.div_ceil(1000),
        storage_diff: storage,
    }))
}

/// Read an optional decimal-string field, defaulting to 0 when absent.
fn read_string_u64(value: &Value, field: &str) -> Result<u64, RpcError> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| RpcError::Decode(format!("{field} '{s}' is not an integer"))),
        Some(other) => Err(RpcError::Decode(format!(
            "{field} has unexpected type: {other}"
        ))),
    }
}

/// Flatten a protocol error list into a compact identifier string.
fn render_errors(errors: &Value) -> String {
    match errors.as_array() {
        Some(list) => {
            let ids: Vec<&str> = list
                .iter()
                .filter_map(|e| e.get("id").and_then(Value::as_str))
                .collect();
            if ids.is_empty() {
                errors.to_string()
            } else {
                ids.join("; ")
            }
        }
        None => errors.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
