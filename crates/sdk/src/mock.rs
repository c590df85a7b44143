//! Scripted chain double for lifecycle tests.
//!
//! [`MockChain`] implements [`ChainRpc`] over an in-memory block graph,
//! a scripted head stream, and a miniature token ledger. It behaves
//! like a node where it matters to the code under test:
//!
//! - injected bytes are hashed exactly like a real node (BLAKE2b over
//!   the signed bytes), so the pipeline's local hash can be checked for
//!   real agreement
//! - `run_operation` interprets the proxy entrypoints against the
//!   ledger, so balance failures surface at estimation time
//! - injection applies the previously simulated effects and mints a
//!   block containing the operation, so the tracker's history scan has
//!   something to find
//! - ancestry queries walk real predecessor links, so reorgs can be
//!   staged by building competing branches

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use rpc::{BlockHeader, Estimate, NewHead, SimulatedOp};
use tezos_core::{Address, BlockHash, ContractAddress, OperationHash, PublicKey};

use crate::chain::{ChainRpc, HeadFeed};
use crate::error::SdkError;
use crate::utils::hex_decode;

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Hash + level of a block created on the mock chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockInfo {
    pub hash: BlockHash,
    pub level: u32,
}

#[derive(Debug, Clone)]
struct MockBlock {
    level: u32,
    predecessor: BlockHash,
    ops: Vec<OperationHash>,
}

/// One scripted event on the head stream.
#[derive(Debug, Clone)]
pub(crate) enum StreamEvent {
    /// Deliver a head notification.
    Head(NewHead),
    /// Break the stream with a transient transport error.
    TransportError,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct HoldEntry {
    asset: String,
    source: Vec<u8>,
    destination: Option<Vec<u8>>,
    quantity: u128,
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    /// Total balance per (asset, owner public key bytes).
    balances: HashMap<(String, Vec<u8>), u128>,
    /// Active holds by hold id.
    holds: HashMap<String, HoldEntry>,
}

impl Ledger {
    fn total(&self, asset: &str, owner: &[u8]) -> u128 {
        self.balances
            .get(&(asset.to_owned(), owner.to_owned()))
            .copied()
            .unwrap_or(0)
    }

    fn held(&self, asset: &str, owner: &[u8]) -> u128 {
        self.holds
            .values()
            .filter(|h| h.asset == asset && h.source == owner)
            .map(|h| h.quantity)
            .sum()
    }

    fn spendable(&self, asset: &str, owner: &[u8]) -> u128 {
        self.total(asset, owner) - self.held(asset, owner)
    }

    fn credit(&mut self, asset: &str, owner: &[u8], quantity: u128) {
        *self
            .balances
            .entry((asset.to_owned(), owner.to_owned()))
            .or_insert(0) += quantity;
    }

    fn debit(&mut self, asset: &str, owner: &[u8], quantity: u128) {
        let entry = self
            .balances
            .entry((asset.to_owned(), owner.to_owned()))
            .or_insert(0);
        *entry -= quantity;
    }

    /// Simulate or apply one parsed action. Returns a protocol error
    /// identifier on rejection.
    fn apply(&mut self, action: &ParsedAction) -> Result<(), &'static str> {
        match action {
            ParsedAction::Reveal => Ok(()),
            ParsedAction::Issue {
                asset,
                destination,
                quantity,
            } => {
                self.credit(asset, destination, *quantity);
                Ok(())
            }
            ParsedAction::Transfer {
                asset,
                source,
                destination,
                quantity,
            } => {
                if self.spendable(asset, source) < *quantity {
                    return Err("FA2_INSUFFICIENT_SPENDABLE_BALANCE");
                }
                self.debit(asset, source, *quantity);
                self.credit(asset, destination, *quantity);
                Ok(())
            }
            ParsedAction::Redeem {
                asset,
                source,
                quantity,
            } => {
                if self.spendable(asset, source) < *quantity {
                    return Err("FA2_INSUFFICIENT_SPENDABLE_BALANCE");
                }
                self.debit(asset, source, *quantity);
                Ok(())
            }
            ParsedAction::Hold {
                hold_id,
                asset,
                source,
                destination,
                quantity,
            } => {
                if self.holds.contains_key(hold_id) {
                    return Err("FINP2P_HOLD_ALREADY_EXISTS");
                }
                if self.spendable(asset, source) < *quantity {
                    return Err("FA2_INSUFFICIENT_SPENDABLE_BALANCE");
                }
                self.holds.insert(
                    hold_id.clone(),
                    HoldEntry {
                        asset: asset.clone(),
                        source: source.clone(),
                        destination: destination.clone(),
                        quantity: *quantity,
                    },
                );
                Ok(())
            }
            ParsedAction::Release { hold_id } => {
                self.holds
                    .remove(hold_id)
                    .map(|_| ())
                    .ok_or("FINP2P_UNKNOWN_HOLD_ID")
            }
            ParsedAction::Execute {
                hold_id,
                destination,
            } => {
                let hold = self
                    .holds
                    .remove(hold_id)
                    .ok_or("FINP2P_UNKNOWN_HOLD_ID")?;
                let to = destination
                    .clone()
                    .or(hold.destination)
                    .ok_or("FINP2P_HOLD_WITHOUT_DESTINATION")?;
                self.debit(&hold.asset, &hold.source, hold.quantity);
                self.credit(&hold.asset, &to, hold.quantity);
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsed proxy calls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum ParsedAction {
    Reveal,
    Issue {
        asset: String,
        destination: Vec<u8>,
        quantity: u128,
    },
    Transfer {
        asset: String,
        source: Vec<u8>,
        destination: Vec<u8>,
        quantity: u128,
    },
    Redeem {
        asset: String,
        source: Vec<u8>,
        quantity: u128,
    },
    Hold {
        hold_id: String,
        asset: String,
        source: Vec<u8>,
        destination: Option<Vec<u8>>,
        quantity: u128,
    },
    Release {
        hold_id: String,
    },
    Execute {
        hold_id: String,
        destination: Option<Vec<u8>>,
    },
}

/// A scalar leaf of a Micheline JSON value, in traversal order.
#[derive(Debug, Clone)]
enum Leaf {
    Int(u128),
    Str(String),
    Bytes(Vec<u8>),
}

fn collect_leaves(value: &Value, out: &mut Vec<Leaf>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_leaves(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("int") {
                out.push(Leaf::Int(s.parse().expect("mock: int leaf")));
            } else if let Some(Value::String(s)) = map.get("string") {
                out.push(Leaf::Str(s.clone()));
            } else if let Some(Value::String(s)) = map.get("bytes") {
                out.push(Leaf::Bytes(hex_decode(s).expect("mock: bytes leaf")));
            } else if let Some(Value::Array(args)) = map.get("args") {
                for arg in args {
                    collect_leaves(arg, out);
                }
            }
        }
        _ => {}
    }
}

fn leaf_str(leaf: &Leaf) -> String {
    match leaf {
        Leaf::Str(s) => s.clone(),
        other => panic!("mock: expected string leaf, got {other:?}"),
    }
}

fn leaf_bytes(leaf: &Leaf) -> Vec<u8> {
    match leaf {
        Leaf::Bytes(b) => b.clone(),
        other => panic!("mock: expected bytes leaf, got {other:?}"),
    }
}

fn leaf_int(leaf: &Leaf) -> u128 {
    match leaf {
        Leaf::Int(v) => *v,
        other => panic!("mock: expected int leaf, got {other:?}"),
    }
}

/// Decode one `contents` entry of the RPC JSON form.
fn parse_content(content: &Value) -> ParsedAction {
    let kind = content["kind"].as_str().expect("mock: content kind");
    if kind == "reveal" {
        return ParsedAction::Reveal;
    }

    let entrypoint = content["parameters"]["entrypoint"]
        .as_str()
        .expect("mock: entrypoint");
    let mut leaves = Vec::new();
    collect_leaves(&content["parameters"]["value"], &mut leaves);

    match entrypoint {
        "issue_tokens" => ParsedAction::Issue {
            asset: leaf_str(&leaves[0]),
            destination: leaf_bytes(&leaves[1]),
            quantity: leaf_int(&leaves[2]),
        },
        "transfer_tokens" => ParsedAction::Transfer {
            // [nonce, asset, source, destination, quantity, signature]
            asset: leaf_str(&leaves[1]),
            source: leaf_bytes(&leaves[2]),
            destination: leaf_bytes(&leaves[3]),
            quantity: leaf_int(&leaves[4]),
        },
        "redeem_tokens" => ParsedAction::Redeem {
            // [nonce, asset, source, quantity, signature]
            asset: leaf_str(&leaves[1]),
            source: leaf_bytes(&leaves[2]),
            quantity: leaf_int(&leaves[3]),
        },
        "hold_tokens" => {
            // [hold_id, asset, source, (destination)?, quantity, expiry, signature]
            let with_destination = leaves.len() == 7;
            ParsedAction::Hold {
                hold_id: leaf_str(&leaves[0]),
                asset: leaf_str(&leaves[1]),
                source: leaf_bytes(&leaves[2]),
                destination: with_destination.then(|| leaf_bytes(&leaves[3])),
                quantity: leaf_int(&leaves[if with_destination { 4 } else { 3 }]),
            }
        }
        "release_hold" => ParsedAction::Release {
            hold_id: leaf_str(&leaves[0]),
        },
        "execute_hold" => ParsedAction::Execute {
            hold_id: leaf_str(&leaves[0]),
            destination: leaves.get(1).map(leaf_bytes),
        },
        other => panic!("mock: unknown entrypoint {other}"),
    }
}

// ---------------------------------------------------------------------------
// MockChain
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct State {
    blocks: HashMap<BlockHash, MockBlock>,
    head: BlockHash,
    /// Tip of the scripted lineage extended by `add_detached_block`.
    tip: BlockHash,
    next_seed: u8,

    counters: HashMap<Address, u64>,
    counter_reads: HashMap<Address, u32>,
    revealed: HashMap<Address, PublicKey>,

    ledger: Ledger,
    last_simulated: Vec<ParsedAction>,
    simulation_failure: Option<String>,
    injection_rejection: Option<String>,
    injected_hash_override: Option<OperationHash>,
    injected: Vec<OperationHash>,

    stream_events: VecDeque<StreamEvent>,
    stream_opens: u32,
    heads_consumed: u32,
}

/// The scripted chain double. Cloning shares the underlying state.
#[derive(Debug, Clone)]
pub(crate) struct MockChain {
    state: Arc<Mutex<State>>,
}

impl MockChain {
    pub fn new() -> Self {
        let genesis = BlockHash([0; 32]);
        let mut blocks = HashMap::new();
        blocks.insert(
            genesis,
            MockBlock {
                level: 0,
                predecessor: genesis,
                ops: vec![],
            },
        );

        Self {
            state: Arc::new(Mutex::new(State {
                blocks,
                head: genesis,
                tip: genesis,
                next_seed: 1,
                counters: HashMap::new(),
                counter_reads: HashMap::new(),
                revealed: HashMap::new(),
                ledger: Ledger::default(),
                last_simulated: Vec::new(),
                simulation_failure: None,
                injection_rejection: None,
                injected_hash_override: None,
                injected: Vec::new(),
                stream_events: VecDeque::new(),
                stream_opens: 0,
                heads_consumed: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("mock chain lock")
    }

    fn new_block(state: &mut State, parent: BlockHash, ops: Vec<OperationHash>) -> BlockInfo {
        let level = state.blocks[&parent].level + 1;
        let mut hash_bytes = [0u8; 32];
        hash_bytes[0] = state.next_seed;
        hash_bytes[1] = (state.next_seed as u16 * 7 % 251) as u8;
        state.next_seed += 1;
        let hash = BlockHash(hash_bytes);
        state.blocks.insert(
            hash,
            MockBlock {
                level,
                predecessor: parent,
                ops,
            },
        );
        BlockInfo { hash, level }
    }

    // -- chain staging -------------------------------------------------------

    /// Append a block on the current head and advance the head to it.
    pub fn push_block(&self, ops: Vec<OperationHash>) -> BlockInfo {
        let mut state = self.lock();
        let head = state.head;
        let info = Self::new_block(&mut state, head, ops);
        state.head = info.hash;
        state.tip = info.hash;
        info
    }

    /// Create a block chained on the scripted lineage without moving
    /// the head. Used to stage blocks announced only via the stream.
    pub fn add_detached_block(&self, ops: Vec<OperationHash>) -> BlockInfo {
        let mut state = self.lock();
        let tip = state.tip;
        let info = Self::new_block(&mut state, tip, ops);
        state.tip = info.hash;
        info
    }

    /// Create a block on an explicit parent (for competing branches).
    pub fn add_block_on(&self, parent: &BlockHash, ops: Vec<OperationHash>) -> BlockInfo {
        let mut state = self.lock();
        Self::new_block(&mut state, *parent, ops)
    }

    /// Move the head pointer.
    pub fn set_head(&self, hash: &BlockHash) {
        let mut state = self.lock();
        assert!(state.blocks.contains_key(hash), "mock: unknown head");
        state.head = *hash;
        state.tip = *hash;
    }

    // -- account staging -----------------------------------------------------

    pub fn set_counter(&self, address: Address, counter: u64) {
        self.lock().counters.insert(address, counter);
    }

    pub fn set_revealed(&self, address: Address) {
        self.lock().revealed.insert(address, PublicKey([9; 32]));
    }

    pub fn counter_reads(&self, address: Address) -> u32 {
        self.lock()
            .counter_reads
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    // -- failure injection ---------------------------------------------------

    pub fn fail_simulation(&self, reason: &str) {
        self.lock().simulation_failure = Some(reason.to_owned());
    }

    pub fn reject_injection(&self, reason: &str) {
        self.lock().injection_rejection = Some(reason.to_owned());
    }

    pub fn override_injected_hash(&self, hash: OperationHash) {
        self.lock().injected_hash_override = Some(hash);
    }

    // -- stream scripting ----------------------------------------------------

    pub fn script(&self, event: StreamEvent) {
        self.lock().stream_events.push_back(event);
    }

    pub fn stream_opens(&self) -> u32 {
        self.lock().stream_opens
    }

    pub fn heads_consumed(&self) -> u32 {
        self.lock().heads_consumed
    }

    // -- observation ---------------------------------------------------------

    pub fn injected_hashes(&self) -> Vec<OperationHash> {
        self.lock().injected.clone()
    }
}

// ---------------------------------------------------------------------------
// ChainRpc implementation
// ---------------------------------------------------------------------------

pub(crate) struct MockFeed {
    state: Arc<Mutex<State>>,
}

impl HeadFeed for MockFeed {
    async fn next_head(&mut self) -> Result<Option<NewHead>, SdkError> {
        let mut state = self.state.lock().expect("mock chain lock");
        match state.stream_events.pop_front() {
            Some(StreamEvent::Head(head)) => {
                state.heads_consumed += 1;
                Ok(Some(head))
            }
            Some(StreamEvent::TransportError) => Err(SdkError::Rpc {
                message: "scripted stream break".into(),
                transient: true,
            }),
            None => Ok(None),
        }
    }
}

impl ChainRpc for MockChain {
    type Heads = MockFeed;

    async fn counter(&self, source: &Address) -> Result<u64, SdkError> {
        let mut state = self.lock();
        *state.counter_reads.entry(*source).or_insert(0) += 1;
        Ok(state.counters.get(source).copied().unwrap_or(0))
    }

    async fn manager_key(&self, source: &Address) -> Result<Option<PublicKey>, SdkError> {
        Ok(self.lock().revealed.get(source).copied())
    }

    async fn head_header(&self) -> Result<BlockHeader, SdkError> {
        let state = self.lock();
        let head = state.head;
        let block = &state.blocks[&head];
        Ok(BlockHeader {
            hash: head,
            level: block.level,
            predecessor: block.predecessor,
        })
    }

    async fn block_header(&self, block: &BlockHash) -> Result<BlockHeader, SdkError> {
        let state = self.lock();
        let entry = state.blocks.get(block).ok_or_else(|| SdkError::Rpc {
            message: format!("mock: unknown block {block}"),
            transient: false,
        })?;
        Ok(BlockHeader {
            hash: *block,
            level: entry.level,
            predecessor: entry.predecessor,
        })
    }

    async fn block_hash_at_offset(
        &self,
        base: &BlockHash,
        offset: u32,
    ) -> Result<BlockHash, SdkError> {
        let state = self.lock();
        let mut cursor = *base;
        for _ in 0..offset {
            let entry = state.blocks.get(&cursor).ok_or_else(|| SdkError::Rpc {
                message: format!("mock: unknown block {cursor}"),
                transient: false,
            })?;
            cursor = entry.predecessor;
        }
        Ok(cursor)
    }

    async fn operation_hashes(&self, block: &BlockHash) -> Result<Vec<OperationHash>, SdkError> {
        let state = self.lock();
        state
            .blocks
            .get(block)
            .map(|b| b.ops.clone())
            .ok_or_else(|| SdkError::Rpc {
                message: format!("mock: unknown block {block}"),
                transient: false,
            })
    }

    async fn run_operation(&self, operation: Value) -> Result<Vec<SimulatedOp>, SdkError> {
        let mut state = self.lock();

        if let Some(reason) = state.simulation_failure.clone() {
            let n = operation["contents"].as_array().map_or(1, Vec::len);
            return Ok((0..n).map(|_| SimulatedOp::Failed(reason.clone())).collect());
        }

        let contents = operation["contents"]
            .as_array()
            .expect("mock: contents array");
        let actions: Vec<ParsedAction> = contents.iter().map(parse_content).collect();

        // Simulate sequentially against a scratch copy of the ledger so
        // later actions in a batch see earlier effects.
        let mut scratch = state.ledger.clone();
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in &actions {
            match scratch.apply(action) {
                Ok(()) => outcomes.push(SimulatedOp::Applied(Estimate {
                    consumed_gas: 2500,
                    storage_diff: 30,
                })),
                Err(id) => outcomes.push(SimulatedOp::Failed(id.to_owned())),
            }
        }

        state.last_simulated = actions;
        Ok(outcomes)
    }

    async fn run_view(
        &self,
        _contract: &ContractAddress,
        view: &str,
        input: Value,
    ) -> Result<Value, SdkError> {
        let state = self.lock();
        let mut leaves = Vec::new();
        collect_leaves(&input, &mut leaves);
        let asset = leaf_str(&leaves[0]);
        let owner = leaf_bytes(&leaves[1]);

        let amount = match view {
            "get_balance" => state.ledger.total(&asset, &owner),
            "get_spendable_balance" => state.ledger.spendable(&asset, &owner),
            other => panic!("mock: unknown view {other}"),
        };

        Ok(serde_json::json!({ "int": amount.to_string() }))
    }

    async fn inject_operation(&self, signed_hex: &str) -> Result<OperationHash, SdkError> {
        let mut state = self.lock();

        if let Some(reason) = state.injection_rejection.clone() {
            return Err(SdkError::Rpc {
                message: reason,
                transient: false,
            });
        }

        // Hash the signed bytes like a real node would.
        let bytes = hex_decode(signed_hex).expect("mock: injection hex");
        let hash = state
            .injected_hash_override
            .unwrap_or(OperationHash(crypto::blake2b_256(&[&bytes])));

        // Apply the effects observed during the last simulation and
        // mint the inclusion block.
        let actions = std::mem::take(&mut state.last_simulated);
        for action in &actions {
            state
                .ledger
                .apply(action)
                .expect("mock: injected batch must have simulated cleanly");
        }

        let head = state.head;
        let info = Self::new_block(&mut state, head, vec![hash]);
        state.head = info.hash;
        state.tip = info.hash;
        state.injected.push(hash);

        Ok(hash)
    }

    async fn monitor_heads(&self) -> Result<Self::Heads, SdkError> {
        self.lock().stream_opens += 1;
        Ok(MockFeed {
            state: Arc::clone(&self.state),
        })
    }
}
