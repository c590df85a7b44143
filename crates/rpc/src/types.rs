//! Wire types for the node RPC.
//!
//! The node speaks JSON; numeric-like fields arrive as decimal strings
//! (counters, gas, balances). Raw serde structs live next to their typed
//! counterparts and the conversion happens at the crate boundary, so
//! consumers only ever see parsed values.

use serde::Deserialize;

use tezos_core::{Base58Error, BlockHash};

use crate::RpcError;

// ---------------------------------------------------------------------------
// Block headers and heads
// ---------------------------------------------------------------------------

/// A block header as needed by the gateway: identity, height, parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub hash: BlockHash,
    pub level: u32,
    pub predecessor: BlockHash,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBlockHeader {
    pub hash: String,
    pub level: u32,
    pub predecessor: String,
}

impl TryFrom<RawBlockHeader> for BlockHeader {
    type Error = RpcError;

    fn try_from(raw: RawBlockHeader) -> Result<Self, Self::Error> {
        Ok(Self {
            hash: parse_block_hash(&raw.hash)?,
            level: raw.level,
            predecessor: parse_block_hash(&raw.predecessor)?,
        })
    }
}

/// A head notification from `/monitor/heads/main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHead {
    pub hash: BlockHash,
    pub level: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawNewHead {
    pub hash: String,
    pub level: u32,
}

impl TryFrom<RawNewHead> for NewHead {
    type Error = RpcError;

    fn try_from(raw: RawNewHead) -> Result<Self, Self::Error> {
        Ok(Self {
            hash: parse_block_hash(&raw.hash)?,
            level: raw.level,
        })
    }
}

fn parse_block_hash(s: &str) -> Result<BlockHash, RpcError> {
    s.parse()
        .map_err(|e: Base58Error| RpcError::Decode(format!("bad block hash '{s}': {e}")))
}

// ---------------------------------------------------------------------------
// Simulation results
// ---------------------------------------------------------------------------

/// Resource consumption of one simulated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    /// Consumed gas in whole gas units (milligas rounded up).
    pub consumed_gas: u64,
    /// Paid storage size increase in bytes.
    pub storage_diff: u64,
}

/// Outcome of simulating one operation inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedOp {
    /// The operation would apply; resource usage attached.
    Applied(Estimate),
    /// The operation was rejected by the protocol. Carries the error
    /// identifiers reported by the node (e.g. `contract.balance_too_low`
    /// or a failwith payload).
    Failed(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
