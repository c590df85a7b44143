//! The sign-and-inject pipeline.
//!
//! Drives an unsigned batch through its dependent stages:
//!
//! 1. resolve the branch anchor (a block a few levels behind head, to
//!    tolerate propagation delay)
//! 2. forge the group locally
//! 3. resolve the signer for the group's single source
//! 4. sign under the generic-operation watermark
//! 5. compute the operation hash from the signed bytes *before*
//!    injection, so a rejected injection can still be correlated
//! 6. inject
//! 7. verify the node-returned hash equals the local one
//!
//! A hash disagreement is a fatal consistency error
//! ([`SdkError::HashMismatch`]), never silently accepted.

use signer::SignerRegistry;
use tezos_core::{OperationHash, Watermark};

use crate::batch::UnsignedBatch;
use crate::chain::ChainRpc;
use crate::error::SdkError;
use crate::forge::{forge_group, OperationGroup};
use crate::utils::hex_encode;

/// Result of a successful injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injected {
    /// The operation hash, locally computed and node-confirmed.
    pub hash: OperationHash,
    /// Level of the head at injection time; the inclusion search
    /// starts from here.
    pub head_level: u32,
}

/// Sign a batch and inject it.
///
/// # Errors
///
/// - [`SdkError::UnregisteredSigner`] when no capability is registered
///   for the batch source
/// - [`SdkError::SigningFailed`] when the signing backend fails
/// - [`SdkError::InjectionFailed`] when the node rejects the bytes
///   (counter conflict, fee balance, signature); carries the attempted
///   hash
/// - [`SdkError::HashMismatch`] when the node's hash differs from the
///   locally computed one
pub async fn sign_and_inject<C: ChainRpc>(
    chain: &C,
    registry: &SignerRegistry,
    batch: UnsignedBatch,
    branch_offset: u32,
) -> Result<Injected, SdkError> {
    let source = batch.source()?;

    // Branch anchor: a block `branch_offset` levels behind the head.
    let head = chain.head_header().await?;
    let branch = chain
        .block_hash_at_offset(&head.hash, branch_offset.min(head.level))
        .await?;

    let group = OperationGroup {
        branch,
        contents: batch.contents,
    };
    let forged = forge_group(&group);

    let account_signer = registry
        .resolve(&source)
        .ok_or(SdkError::UnregisteredSigner { address: source })?;

    let signature = account_signer
        .sign(Watermark::GenericOperation, &forged)
        .map_err(|e| SdkError::SigningFailed {
            reason: e.to_string(),
        })?;

    // Hash before injection: blake2b over the exact bytes the node will
    // hash, so the identifier exists even if injection is rejected.
    let computed = OperationHash(crypto::blake2b_256(&[&forged, signature.as_bytes()]));

    let mut signed = forged;
    signed.extend_from_slice(signature.as_bytes());

    tracing::debug!(
        operation = %computed,
        source = %source,
        bytes = signed.len(),
        "injecting operation group"
    );

    let returned = chain
        .inject_operation(&hex_encode(&signed))
        .await
        .map_err(|e| SdkError::InjectionFailed {
            attempted: computed,
            cause: e.to_string(),
        })?;

    if returned != computed {
        return Err(SdkError::HashMismatch {
            computed,
            returned,
        });
    }

    Ok(Injected {
        hash: computed,
        head_level: head.level,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{build_batch, Action};
    use crate::micheline::Micheline;
    use crate::mock::MockChain;
    use std::sync::Arc;

    use crypto::Keypair;
    use signer::LocalSigner;
    use tezos_core::ContractAddress;

    fn action() -> Action {
        Action::Call {
            destination: ContractAddress([0xCC; 20]),
            entrypoint: "issue_tokens".into(),
            value: Micheline::pair(
                Micheline::string("asset-A"),
                Micheline::pair(Micheline::bytes(vec![2; 32]), Micheline::nat(150)),
            ),
        }
    }

    async fn prepared() -> (MockChain, SignerRegistry, UnsignedBatch) {
        let chain = MockChain::new();
        let registry = SignerRegistry::new();
        let keypair = Keypair::from_secret_bytes([7; 32]);
        let source = keypair.address();
        let public_key = keypair.public_key();
        registry.register_derived(Arc::new(LocalSigner::new(keypair)));

        chain.set_revealed(source);
        let batch = build_batch(&chain, source, &public_key, vec![action()])
            .await
            .unwrap();
        (chain, registry, batch)
    }

    #[tokio::test]
    async fn returned_hash_equals_precomputed_hash() {
        let (chain, registry, batch) = prepared().await;

        let injected = sign_and_inject(&chain, &registry, batch, 2).await.unwrap();

        // The mock node derives its hash from the signed bytes exactly
        // like a real node, so agreement here proves the local
        // computation matches the node's.
        assert_eq!(chain.injected_hashes(), vec![injected.hash]);
    }

    #[tokio::test]
    async fn unregistered_signer_is_reported() {
        let chain = MockChain::new();
        let registry = SignerRegistry::new(); // empty
        let keypair = Keypair::from_secret_bytes([8; 32]);
        let source = keypair.address();
        chain.set_revealed(source);

        let batch = build_batch(&chain, source, &keypair.public_key(), vec![action()])
            .await
            .unwrap();

        let err = sign_and_inject(&chain, &registry, batch, 2)
            .await
            .unwrap_err();
        assert_eq!(err, SdkError::UnregisteredSigner { address: source });
    }

    #[tokio::test]
    async fn node_hash_disagreement_is_fatal() {
        let (chain, registry, batch) = prepared().await;
        chain.override_injected_hash(OperationHash([0xEE; 32]));

        let err = sign_and_inject(&chain, &registry, batch, 2)
            .await
            .unwrap_err();

        match err {
            SdkError::HashMismatch { computed, returned } => {
                assert_eq!(returned, OperationHash([0xEE; 32]));
                assert_ne!(computed, returned);
            }
            other => panic!("expected HashMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejection_carries_attempted_hash() {
        let (chain, registry, batch) = prepared().await;
        chain.reject_injection("counter_in_the_past");

        let err = sign_and_inject(&chain, &registry, batch, 2)
            .await
            .unwrap_err();

        match err {
            SdkError::InjectionFailed { attempted, cause } => {
                assert_ne!(attempted, OperationHash([0; 32]));
                assert!(cause.contains("counter_in_the_past"));
            }
            other => panic!("expected InjectionFailed, got {other:?}"),
        }
    }
}
