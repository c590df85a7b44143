//! Route layer: thin JSON handlers over the SDK facade.
//!
//! Each route parses a request body, delegates to the facade, and maps
//! the typed [`SdkError`] taxonomy onto HTTP statuses with a structured
//! JSON error body:
//!
//! ```json
//! { "error": { "code": "ESTIMATION_FAILED", "message": "..." } }
//! ```
//!
//! Clients key on `error.code`, never on the free-text message.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use rpc::RpcClient;
use sdk::{
    Balance, ExecuteRequest, HoldRequest, IssueRequest, Receipt, RedeemRequest, ReleaseRequest,
    Sdk, SdkError, TransferRequest,
};

/// Build the gateway router.
pub fn router(sdk: Sdk<RpcClient>) -> Router {
    Router::new()
        .route("/assets/issue", post(issue))
        .route("/assets/transfer", post(transfer))
        .route("/assets/redeem", post(redeem))
        .route("/assets/hold", post(hold))
        .route("/assets/release", post(release))
        .route("/assets/execute", post(execute))
        .route("/assets/balance", get(balance))
        .route("/accounts", post(register_account))
        .route("/receipts/:operation", get(receipt))
        .route("/healthz", get(health))
        .with_state(sdk)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

struct AppError(SdkError);

impl From<SdkError> for AppError {
    fn from(e: SdkError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            SdkError::InvalidRequest { .. }
            | SdkError::EmptyBatch
            | SdkError::MixedSources => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            SdkError::UnregisteredSigner { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNREGISTERED_SIGNER")
            }
            SdkError::EstimationFailed { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "ESTIMATION_FAILED")
            }
            // Typically a counter conflict with a concurrent batch;
            // the client may rebuild and retry.
            SdkError::InjectionFailed { .. } => (StatusCode::CONFLICT, "INJECTION_REJECTED"),
            SdkError::SigningFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SIGNING_FAILED")
            }
            SdkError::HashMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "HASH_MISMATCH")
            }
            SdkError::Rpc { .. } => (StatusCode::BAD_GATEWAY, "CHAIN_UNAVAILABLE"),
            SdkError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "SHUTTING_DOWN"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, code, "request failed");
        } else {
            tracing::debug!(error = %self.0, code, "request rejected");
        }

        (
            status,
            Json(serde_json::json!({
                "error": { "code": code, "message": self.0.to_string() }
            })),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn issue(
    State(sdk): State<Sdk<RpcClient>>,
    Json(request): Json<IssueRequest>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(sdk.issue(request).await?))
}

async fn transfer(
    State(sdk): State<Sdk<RpcClient>>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(sdk.transfer(request).await?))
}

async fn redeem(
    State(sdk): State<Sdk<RpcClient>>,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(sdk.redeem(request).await?))
}

async fn hold(
    State(sdk): State<Sdk<RpcClient>>,
    Json(request): Json<HoldRequest>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(sdk.hold(request).await?))
}

async fn release(
    State(sdk): State<Sdk<RpcClient>>,
    Json(request): Json<ReleaseRequest>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(sdk.release(request).await?))
}

async fn execute(
    State(sdk): State<Sdk<RpcClient>>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(sdk.execute(request).await?))
}

#[derive(Debug, Deserialize)]
struct BalanceQuery {
    asset_id: String,
    account: String,
}

async fn balance(
    State(sdk): State<Sdk<RpcClient>>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<Balance>, AppError> {
    Ok(Json(sdk.get_balance(&query.asset_id, &query.account).await?))
}

async fn receipt(
    State(sdk): State<Sdk<RpcClient>>,
    Path(operation): Path<String>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(sdk.get_receipt(&operation).await?))
}

// ---------------------------------------------------------------------------
// Account registration
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RegisterAccountRequest {
    /// Unencrypted `edsk...` secret key. When omitted, a fresh key is
    /// generated (sandbox convenience).
    #[serde(default)]
    secret: Option<String>,
}

/// Register an asset account's signing key with the gateway.
///
/// The account's finId and derived tz1 address are returned; subsequent
/// transfer/redeem/hold requests naming that finId are authorized with
/// the registered key.
async fn register_account(
    State(sdk): State<Sdk<RpcClient>>,
    Json(request): Json<RegisterAccountRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let keypair = match &request.secret {
        Some(secret) => {
            crypto::Keypair::from_b58_secret(secret).map_err(|e| SdkError::InvalidRequest {
                reason: format!("bad secret key: {e}"),
            })?
        }
        None => crypto::Keypair::generate(&mut rand_core::OsRng),
    };

    let finid = keypair.public_key().to_string();
    let address = sdk
        .registry()
        .register_derived(std::sync::Arc::new(signer::LocalSigner::new(keypair)));

    tracing::info!(%finid, %address, "account registered");

    Ok(Json(serde_json::json!({
        "finid": finid,
        "address": address.to_string(),
    })))
}

async fn health() -> &'static str {
    "ok"
}
