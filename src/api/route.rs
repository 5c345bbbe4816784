use crate::{
    api::{
        error::ApiError,
        response::{with_total_count, ApiResponse},
    },
    models::{AddressRecord, TransactionRecord, WalletTransaction},
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

// Body of /add, /sync, /balance and /transactions
#[derive(Deserialize)]
pub struct AddressRequest {
    pub address: String,
}

// POST /detect-transfers body
#[derive(Deserialize)]
pub struct DetectTransfersRequest {
    pub transactions: Vec<WalletTransaction>,
}

#[derive(Serialize)]
pub struct AddResponse {
    pub address: AddressRecord,
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub address: AddressRecord,
    pub new_transactions: Vec<TransactionRecord>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub balance: f64,
}

#[derive(Serialize)]
pub struct TransactionsResponse<'a> {
    pub transactions: &'a [TransactionRecord],
}

#[derive(Serialize)]
pub struct DetectTransfersResponse {
    pub transfers: BTreeMap<String, String>,
}

// Create router with all routes
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/add", post(add_address))
        .route("/sync", post(sync_address))
        .route("/balance", post(get_balance))
        .route("/transactions", post(get_transactions))
        .route("/detect-transfers", post(detect_transfers))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

// POST /add handler
async fn add_address(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddressRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    info!("Processing add request for address: {}", request.address);

    let address = state.service.add(request.address.trim()).await?;

    Ok(ApiResponse {
        data: AddResponse { address },
    }
    .into_response())
}

// POST /sync handler
async fn sync_address(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddressRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    info!("Processing sync request for address: {}", request.address);

    let outcome = state.service.sync(request.address.trim()).await?;

    Ok(ApiResponse {
        data: SyncResponse {
            address: outcome.address,
            new_transactions: outcome.new_transactions,
        },
    }
    .into_response())
}

// POST /balance handler
async fn get_balance(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddressRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let balance = state.service.balance(request.address.trim()).await?;

    Ok(ApiResponse {
        data: BalanceResponse { balance },
    }
    .into_response())
}

// POST /transactions handler
async fn get_transactions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddressRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let transactions = state.service.transactions(request.address.trim()).await?;

    info!(
        "Returning {} transactions for address: {}",
        transactions.len(),
        request.address
    );

    Ok(with_total_count(
        TransactionsResponse {
            transactions: transactions.as_slice(),
        },
        transactions.len(),
    ))
}

// POST /detect-transfers handler
async fn detect_transfers(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DetectTransfersRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let transfers = state.service.detect_transfers(&request.transactions)?;

    Ok(ApiResponse {
        data: DetectTransfersResponse { transfers },
    }
    .into_response())
}
