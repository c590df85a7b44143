//! The chain boundary.
//!
//! [`ChainRpc`] is the trait the lifecycle components are written
//! against, so tests can feed the batch builder, the pipeline, and the
//! inclusion tracker a scripted chain. [`rpc::RpcClient`] is the
//! production implementation.
//!
//! The trait is used generically (`Sdk<C: ChainRpc>`), never as a trait
//! object, so methods return `impl Future + Send` directly.

use std::future::Future;

use serde_json::Value;

use rpc::{BlockHeader, NewHead, RpcError, SimulatedOp};
use tezos_core::{Address, BlockHash, ContractAddress, OperationHash, PublicKey};

use crate::error::SdkError;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A cancellable sequence of new block heads.
///
/// Dropping the feed tears down the underlying connection; that is the
/// unsubscribe operation.
pub trait HeadFeed: Send {
    /// Await the next head. `Ok(None)` means the producer closed the
    /// stream cleanly.
    fn next_head(&mut self) -> impl Future<Output = Result<Option<NewHead>, SdkError>> + Send;
}

/// Everything the lifecycle components need from a Tezos node.
pub trait ChainRpc: Send + Sync {
    /// The head stream type produced by [`ChainRpc::monitor_heads`].
    type Heads: HeadFeed;

    /// Current on-chain counter of an implicit account.
    fn counter(&self, source: &Address) -> impl Future<Output = Result<u64, SdkError>> + Send;

    /// Revealed manager key of an account, `None` if not yet revealed.
    fn manager_key(
        &self,
        source: &Address,
    ) -> impl Future<Output = Result<Option<PublicKey>, SdkError>> + Send;

    /// Header of the current head.
    fn head_header(&self) -> impl Future<Output = Result<BlockHeader, SdkError>> + Send;

    /// Header of a specific block.
    fn block_header(
        &self,
        block: &BlockHash,
    ) -> impl Future<Output = Result<BlockHeader, SdkError>> + Send;

    /// Hash of the block `offset` levels behind `base`, following the
    /// canonical chain. This is the ancestry probe used for reorg
    /// detection.
    fn block_hash_at_offset(
        &self,
        base: &BlockHash,
        offset: u32,
    ) -> impl Future<Output = Result<BlockHash, SdkError>> + Send;

    /// All operation hashes included in a block.
    fn operation_hashes(
        &self,
        block: &BlockHash,
    ) -> impl Future<Output = Result<Vec<OperationHash>, SdkError>> + Send;

    /// Simulate an operation group (JSON form) against the head context.
    fn run_operation(
        &self,
        operation: Value,
    ) -> impl Future<Output = Result<Vec<SimulatedOp>, SdkError>> + Send;

    /// Execute an on-chain view.
    fn run_view(
        &self,
        contract: &ContractAddress,
        view: &str,
        input: Value,
    ) -> impl Future<Output = Result<Value, SdkError>> + Send;

    /// Inject hex-encoded signed bytes, returning the node's hash.
    fn inject_operation(
        &self,
        signed_hex: &str,
    ) -> impl Future<Output = Result<OperationHash, SdkError>> + Send;

    /// Open a live head stream.
    fn monitor_heads(&self) -> impl Future<Output = Result<Self::Heads, SdkError>> + Send;
}

// ---------------------------------------------------------------------------
// Production implementation
// ---------------------------------------------------------------------------

impl From<RpcError> for SdkError {
    fn from(e: RpcError) -> Self {
        SdkError::Rpc {
            transient: e.is_transport(),
            message: e.to_string(),
        }
    }
}

impl HeadFeed for rpc::HeadMonitor {
    async fn next_head(&mut self) -> Result<Option<NewHead>, SdkError> {
        rpc::HeadMonitor::next_head(self).await.map_err(Into::into)
    }
}

impl ChainRpc for rpc::RpcClient {
    type Heads = rpc::HeadMonitor;

    async fn counter(&self, source: &Address) -> Result<u64, SdkError> {
        rpc::RpcClient::counter(self, source).await.map_err(Into::into)
    }

    async fn manager_key(&self, source: &Address) -> Result<Option<PublicKey>, SdkError> {
        rpc::RpcClient::manager_key(self, source)
            .await
            .map_err(Into::into)
    }

    async fn head_header(&self) -> Result<BlockHeader, SdkError> {
        rpc::RpcClient::head_header(self).await.map_err(Into::into)
    }

    async fn block_header(&self, block: &BlockHash) -> Result<BlockHeader, SdkError> {
        rpc::RpcClient::block_header(self, &block.to_string())
            .await
            .map_err(Into::into)
    }

    async fn block_hash_at_offset(
        &self,
        base: &BlockHash,
        offset: u32,
    ) -> Result<BlockHash, SdkError> {
        rpc::RpcClient::block_hash_at_offset(self, base, offset)
            .await
            .map_err(Into::into)
    }

    async fn operation_hashes(&self, block: &BlockHash) -> Result<Vec<OperationHash>, SdkError> {
        rpc::RpcClient::operation_hashes(self, block)
            .await
            .map_err(Into::into)
    }

    async fn run_operation(&self, operation: Value) -> Result<Vec<SimulatedOp>, SdkError> {
        rpc::RpcClient::run_operation(self, operation)
            .await
            .map_err(Into::into)
    }

    async fn run_view(
        &self,
        contract: &ContractAddress,
        view: &str,
        input: Value,
    ) -> Result<Value, SdkError> {
        rpc::RpcClient::run_view(self, &contract.to_string(), view, input)
            .await
            .map_err(Into::into)
    }

    async fn inject_operation(&self, signed_hex: &str) -> Result<OperationHash, SdkError> {
        rpc::RpcClient::inject_operation(self, signed_hex)
            .await
            .map_err(Into::into)
    }

    async fn monitor_heads(&self) -> Result<Self::Heads, SdkError> {
        rpc::RpcClient::monitor_heads(self).await.map_err(Into::into)
    }
}
