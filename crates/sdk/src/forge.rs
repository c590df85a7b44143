//! Local operation forging: the canonical binary encoding of manager
//! operation groups.
//!
//! Forging is pure: the same logical group always yields the same
//! bytes, with no randomness and no clock. Numeric-like fields pass
//! through [`NumValue`], which canonicalizes integers and their decimal
//! string representations to one form, so `"100"` and `100` forge
//! identically.
//!
//! Wire layout of a group:
//!
//! ```text
//! branch (32 bytes)
//! per operation:
//!   tag (reveal = 107, transaction = 108)
//!   source (21 bytes: curve tag + pkh)
//!   fee, counter, gas_limit, storage_limit (unsigned zarith)
//!   reveal:      public key (33 bytes: curve tag + key)
//!   transaction: amount (zarith), destination (22 bytes),
//!                parameters? (0x00 | 0xFF + entrypoint + length-prefixed value)
//! ```

use std::fmt;
use std::str::FromStr;

use tezos_core::{Address, BlockHash, ContractAddress, PublicKey};

use crate::micheline::{zarith_unsigned, Micheline};

// ---------------------------------------------------------------------------
// NumValue
// ---------------------------------------------------------------------------

/// A canonical non-negative integer field (fee, counter, limit, amount).
///
/// Constructed from a native integer or its decimal string form; both
/// normalize to the same value and therefore to the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NumValue(u64);

impl NumValue {
    /// The canonical integer.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NumValue {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl FromStr for NumValue {
    type Err = NumValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NumValueError(s.to_owned()));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| NumValueError(s.to_owned()))
    }
}

impl fmt::Display for NumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A string that is not a canonical decimal integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumValueError(String);

impl fmt::Display for NumValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a non-negative decimal integer", self.0)
    }
}

impl std::error::Error for NumValueError {}

// ---------------------------------------------------------------------------
// Operation model
// ---------------------------------------------------------------------------

/// Operation tags on the wire.
const TAG_REVEAL: u8 = 107;
const TAG_TRANSACTION: u8 = 108;

/// Destination of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// An implicit tz1 account.
    Implicit(Address),
    /// An originated KT1 contract.
    Contract(ContractAddress),
}

impl Destination {
    fn to_contract_bytes(self) -> [u8; 22] {
        match self {
            Self::Implicit(a) => a.to_contract_bytes(),
            Self::Contract(c) => c.to_contract_bytes(),
        }
    }
}

/// Entrypoint of a contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entrypoint {
    /// The `%default` entrypoint.
    Default,
    /// A named entrypoint.
    Named(String),
}

impl Entrypoint {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Default => out.push(0x00),
            Self::Named(name) => {
                out.push(0xFF);
                out.push(name.len() as u8);
                out.extend_from_slice(name.as_bytes());
            }
        }
    }

    /// Name used in the JSON encoding.
    pub fn name(&self) -> &str {
        match self {
            Self::Default => "default",
            Self::Named(name) => name,
        }
    }
}

/// Call parameters attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub entrypoint: Entrypoint,
    pub value: Micheline,
}

/// The kind-specific payload of a manager operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerOp {
    /// Publish the account's public key (required once per account
    /// before its first transaction).
    Reveal { public_key: PublicKey },

    /// Transfer mutez and/or call a contract.
    Transaction {
        amount: NumValue,
        destination: Destination,
        parameters: Option<Parameters>,
    },
}

impl ManagerOp {
    /// Wire tag of the operation kind.
    fn tag(&self) -> u8 {
        match self {
            Self::Reveal { .. } => TAG_REVEAL,
            Self::Transaction { .. } => TAG_TRANSACTION,
        }
    }

    /// Kind name used in the JSON encoding.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reveal { .. } => "reveal",
            Self::Transaction { .. } => "transaction",
        }
    }
}

/// One manager operation with its accounting fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContents {
    pub source: Address,
    pub fee: NumValue,
    pub counter: NumValue,
    pub gas_limit: NumValue,
    pub storage_limit: NumValue,
    pub operation: ManagerOp,
}

/// An ordered group of manager operations anchored at a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationGroup {
    pub branch: BlockHash,
    pub contents: Vec<OperationContents>,
}

// ---------------------------------------------------------------------------
// Binary forging
// ---------------------------------------------------------------------------

/// Forge a full group: branch followed by each operation's encoding.
pub fn forge_group(group: &OperationGroup) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + group.contents.len() * 64);
    out.extend_from_slice(group.branch.as_bytes());
    for contents in &group.contents {
        forge_contents(contents, &mut out);
    }
    out
}

/// Forge a single operation's contents (no branch). Also used by the
/// batch builder to size each operation for the fee model.
pub fn forge_contents(contents: &OperationContents, out: &mut Vec<u8>) {
    out.push(contents.operation.tag());
    out.extend_from_slice(&contents.source.to_tagged_bytes());
    zarith_unsigned(contents.fee.get(), out);
    zarith_unsigned(contents.counter.get(), out);
    zarith_unsigned(contents.gas_limit.get(), out);
    zarith_unsigned(contents.storage_limit.get(), out);

    match &contents.operation {
        ManagerOp::Reveal { public_key } => {
            out.extend_from_slice(&public_key.to_tagged_bytes());
        }
        ManagerOp::Transaction {
            amount,
            destination,
            parameters,
        } => {
            zarith_unsigned(amount.get(), out);
            out.extend_from_slice(&destination.to_contract_bytes());
            match parameters {
                None => out.push(0x00),
                Some(params) => {
                    out.push(0xFF);
                    params.entrypoint.encode(out);
                    let value = params.value.encode_to_vec();
                    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
                    out.extend_from_slice(&value);
                }
            }
        }
    }
}

/// Byte size of one forged operation, for fee computation.
pub fn contents_size(contents: &OperationContents) -> usize {
    let mut buf = Vec::new();
    forge_contents(contents, &mut buf);
    buf.len()
}

// ---------------------------------------------------------------------------
// JSON form (for run_operation)
// ---------------------------------------------------------------------------

/// A syntactically valid placeholder signature for simulation; the node
/// does not check it when running `run_operation`.
pub const SIMULATION_SIGNATURE: &str =
    "edsigtkpiSSschcaCt9pUVrpNPf7TTcgvgDEDD6NCEHMy8NNQJCGnMfLZzYoQj74yLjo9wx6MPVV29CvVzgi7qEcEUok3k7AuMg";

/// Render a group to the JSON form `run_operation` expects.
pub fn group_to_rpc_json(group: &OperationGroup) -> serde_json::Value {
    let contents: Vec<serde_json::Value> = group.contents.iter().map(contents_to_rpc_json).collect();
    serde_json::json!({
        "branch": group.branch.to_string(),
        "contents": contents,
        "signature": SIMULATION_SIGNATURE,
    })
}

fn contents_to_rpc_json(contents: &OperationContents) -> serde_json::Value {
    let mut object = serde_json::json!({
        "kind": contents.operation.kind(),
        "source": contents.source.to_string(),
        "fee": contents.fee.to_string(),
        "counter": contents.counter.to_string(),
        "gas_limit": contents.gas_limit.to_string(),
        "storage_limit": contents.storage_limit.to_string(),
    });

    let map = object.as_object_mut().expect("literal object");
    match &contents.operation {
        ManagerOp::Reveal { public_key } => {
            map.insert("public_key".into(), public_key.to_string().into());
        }
        ManagerOp::Transaction {
            amount,
            destination,
            parameters,
        } => {
            map.insert("amount".into(), amount.to_string().into());
            let destination = match destination {
                Destination::Implicit(a) => a.to_string(),
                Destination::Contract(c) => c.to_string(),
            };
            map.insert("destination".into(), destination.into());
            if let Some(params) = parameters {
                map.insert(
                    "parameters".into(),
                    serde_json::json!({
                        "entrypoint": params.entrypoint.name(),
                        "value": params.value.to_json(),
                    }),
                );
            }
        }
    }

    object
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
