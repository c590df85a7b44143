//! Counter management and batch assembly.
//!
//! [`build_batch`] turns logical actions into an unsigned operation
//! list: it fetches the source's on-chain counter exactly once, assigns
//! sequential counters in action order, prepends a reveal when the
//! account has not published its key, simulates the whole group for
//! per-action fee/gas/storage estimation, and prices each operation.
//!
//! Estimation failure of any action aborts the entire batch; partial
//! batches are never handed to the pipeline.
//!
//! Two concurrent builds for the same source will read the same counter
//! and collide at injection time. Serializing builds per source is the
//! caller's responsibility; the chain rejects the loser with a counter
//! conflict, which the facade treats as retryable.

use config::constants;
use rpc::SimulatedOp;
use tezos_core::{Address, ContractAddress, PublicKey};

use crate::chain::ChainRpc;
use crate::error::SdkError;
use crate::forge::{
    contents_size, group_to_rpc_json, Destination, Entrypoint, ManagerOp, NumValue,
    OperationContents, OperationGroup, Parameters,
};
use crate::micheline::Micheline;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// A logical action to be executed by one manager operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Call a contract entrypoint (no mutez attached).
    Call {
        destination: ContractAddress,
        entrypoint: String,
        value: Micheline,
    },

    /// Plain mutez transfer.
    Transfer {
        destination: Destination,
        amount: NumValue,
    },
}

impl Action {
    fn into_manager_op(self) -> ManagerOp {
        match self {
            Self::Call {
                destination,
                entrypoint,
                value,
            } => ManagerOp::Transaction {
                amount: NumValue::from(0),
                destination: Destination::Contract(destination),
                parameters: Some(Parameters {
                    entrypoint: Entrypoint::Named(entrypoint),
                    value,
                }),
            },
            Self::Transfer {
                destination,
                amount,
            } => ManagerOp::Transaction {
                amount,
                destination,
                parameters: None,
            },
        }
    }
}

/// An unsigned batch: ordered contents sharing one source, ready for
/// the sign-and-inject pipeline (which resolves the branch anchor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedBatch {
    pub contents: Vec<OperationContents>,
}

impl UnsignedBatch {
    /// The shared source account.
    ///
    /// # Errors
    ///
    /// [`SdkError::MixedSources`] if the contents disagree -- such a
    /// batch must never reach signing.
    pub fn source(&self) -> Result<Address, SdkError> {
        let first = self
            .contents
            .first()
            .ok_or(SdkError::EmptyBatch)?
            .source;
        if self.contents.iter().any(|c| c.source != first) {
            return Err(SdkError::MixedSources);
        }
        Ok(first)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build an unsigned batch for `source`.
///
/// `public_key` is used for the reveal operation when the account has
/// not yet published its key; callers resolve it from the signer
/// registry.
///
/// # Errors
///
/// - [`SdkError::EmptyBatch`] for a zero-length action list
/// - [`SdkError::EstimationFailed`] when simulation rejects any action
/// - [`SdkError::Rpc`] when the node is unreachable
pub async fn build_batch<C: ChainRpc>(
    chain: &C,
    source: Address,
    public_key: &PublicKey,
    actions: Vec<Action>,
) -> Result<UnsignedBatch, SdkError> {
    if actions.is_empty() {
        return Err(SdkError::EmptyBatch);
    }

    // One counter read per build; every operation in the batch derives
    // its counter from this snapshot.
    let base_counter = chain.counter(&source).await?;

    // Typed reveal pre-check instead of matching error text after the
    // fact: the context tells us directly whether the key is published.
    let needs_reveal = chain.manager_key(&source).await?.is_none();

    let mut operations: Vec<ManagerOp> = Vec::with_capacity(actions.len() + 1);
    if needs_reveal {
        operations.push(ManagerOp::Reveal {
            public_key: *public_key,
        });
    }
    operations.extend(actions.into_iter().map(Action::into_manager_op));

    // Draft contents with simulation limits; real limits and fees are
    // assigned after the simulation reports consumption.
    let mut contents: Vec<OperationContents> = operations
        .into_iter()
        .enumerate()
        .map(|(i, operation)| OperationContents {
            source,
            fee: NumValue::from(0),
            counter: NumValue::from(base_counter + 1 + i as u64),
            gas_limit: NumValue::from(constants::SIMULATION_GAS_LIMIT),
            storage_limit: NumValue::from(constants::SIMULATION_STORAGE_LIMIT),
            operation,
        })
        .collect();

    let estimates = simulate(chain, &contents).await?;

    for (content, estimate) in contents.iter_mut().zip(&estimates) {
        let gas_limit =
            (estimate.consumed_gas + constants::GAS_SAFETY_MARGIN).min(constants::HARD_GAS_LIMIT_PER_OPERATION);
        let storage_limit = if estimate.storage_diff == 0 {
            0
        } else {
            (estimate.storage_diff + constants::STORAGE_SAFETY_MARGIN)
                .min(constants::HARD_STORAGE_LIMIT_PER_OPERATION)
        };

        content.gas_limit = NumValue::from(gas_limit);
        content.storage_limit = NumValue::from(storage_limit);
        content.fee = NumValue::from(compute_fee(gas_limit, contents_size(content) as u64));
    }

    Ok(UnsignedBatch { contents })
}

/// Run the draft group through `run_operation` and collect estimates.
async fn simulate<C: ChainRpc>(
    chain: &C,
    contents: &[OperationContents],
) -> Result<Vec<rpc::Estimate>, SdkError> {
    // The simulation branch does not anchor anything; head is fine.
    let head = chain.head_header().await?;
    let group = OperationGroup {
        branch: head.hash,
        contents: contents.to_vec(),
    };

    let outcomes = chain.run_operation(group_to_rpc_json(&group)).await?;
    if outcomes.len() != contents.len() {
        return Err(SdkError::Rpc {
            message: format!(
                "simulation returned {} results for {} operations",
                outcomes.len(),
                contents.len()
            ),
            transient: false,
        });
    }

    let mut estimates = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            SimulatedOp::Applied(estimate) => estimates.push(estimate),
            SimulatedOp::Failed(reason) => {
                return Err(SdkError::EstimationFailed { reason });
            }
        }
    }
    Ok(estimates)
}

/// Fee model: flat minimum plus gas-proportional and size-proportional
/// components (nanotez rounded up to mutez).
fn compute_fee(gas_limit: u64, op_size_bytes: u64) -> u64 {
    let gas_nanotez = gas_limit * constants::NANOTEZ_PER_GAS_UNIT;
    let size_nanotez =
        (op_size_bytes + constants::FEE_SIZE_MARGIN_BYTES) * constants::NANOTEZ_PER_BYTE;
    constants::MINIMAL_FEE_MUTEZ + (gas_nanotez + size_nanotez).div_ceil(1000)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
