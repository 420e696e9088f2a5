use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use sea_orm::{EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::entities::mint_project;
use crate::entities::prelude::MintProject;
use crate::mint::{self, NATIVE_DECIMALS, PreparedTransaction};
use crate::models::mint::DisplayState;
use crate::state::AppState;
use crate::wallet;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_mints))
        .route("/{id}", get(get_mint))
        .route("/{id}/wallet-count", get(wallet_count))
        .route("/{id}/mint", post(request_mint))
}

#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct MintListResponse {
    mints: Vec<DisplayState>,
}

async fn list_mints(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<MintListResponse>, HttpError> {
    let projects = MintProject::find()
        .order_by_desc(mint_project::Column::CreatedAt)
        .all(&state.database)
        .await
        .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    // Per-project chain reads in parallel, response order preserved
    let mut mints = futures::future::join_all(
        projects
            .iter()
            .map(|project| state.reconciler.display_state(project)),
    )
    .await;

    if let Some(status) = query.status {
        mints.retain(|mint| mint.status == status);
    }

    // Live sales first, otherwise keep the newest-first ordering
    mints.sort_by_key(|mint| mint.status != "live");

    Ok(Json(MintListResponse { mints }))
}

#[derive(Debug, Serialize)]
struct MintResponse {
    mint: DisplayState,
}

async fn get_mint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MintResponse>, HttpError> {
    let project = find_project(&state, id).await?;
    let mint = state.reconciler.display_state(&project).await;
    Ok(Json(MintResponse { mint }))
}

#[derive(Debug, Deserialize)]
struct WalletQuery {
    wallet: String,
}

#[derive(Debug, Serialize)]
struct WalletCountResponse {
    wallet_address: String,
    count: u64,
    limit: u64,
    can_mint_more: bool,
}

async fn wallet_count(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<WalletQuery>,
) -> Result<Json<WalletCountResponse>, HttpError> {
    let wallet = wallet::normalize_address(&query.wallet)
        .map_err(|err| HttpError::new(StatusCode::BAD_REQUEST, err.to_string()))?;
    let project = find_project(&state, id).await?;

    let snapshot = state
        .rpc
        .fetch_snapshot(&project.contract_address)
        .await
        .map_err(|err| HttpError::new(StatusCode::BAD_GATEWAY, err.to_string()))?;
    let count = state
        .rpc
        .wallet_mint_count(&project.contract_address, &wallet)
        .await;

    Ok(Json(WalletCountResponse {
        wallet_address: wallet,
        count,
        limit: snapshot.wallet_mint_limit,
        can_mint_more: count < snapshot.wallet_mint_limit,
    }))
}

#[derive(Debug, Deserialize)]
struct MintRequest {
    wallet_address: String,
}

#[derive(Debug, Serialize)]
struct MintAttemptResponse {
    success: bool,
    contract_address: String,
    transaction: PreparedTransaction,
    price: String,
    current_count: u64,
    message: &'static str,
}

async fn request_mint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<MintRequest>,
) -> Result<Json<MintAttemptResponse>, HttpError> {
    let wallet = wallet::normalize_address(&request.wallet_address)
        .map_err(|err| HttpError::new(StatusCode::BAD_REQUEST, err.to_string()))?;

    let rate_key = format!("mint:{}:{wallet}", client_ip(&headers));
    if !state.rate_limiter.check(state.mint_rate_limit, &rate_key).await {
        return Err(HttpError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.".to_string(),
        ));
    }

    let project = find_project(&state, id).await?;

    // Always decided from live chain state, never the display cache
    let eligibility = state
        .eligibility
        .can_mint(&wallet, &project.contract_address)
        .await;
    if !eligibility.allowed {
        let reason = eligibility
            .reason
            .unwrap_or_else(|| "Cannot mint at this time".to_string());
        return Err(HttpError::new(StatusCode::BAD_REQUEST, reason));
    }

    let snapshot = state
        .rpc
        .fetch_snapshot(&project.contract_address)
        .await
        .map_err(|err| HttpError::new(StatusCode::BAD_GATEWAY, err.to_string()))?;

    // The wallet signs and submits this itself; the server never holds keys
    let transaction =
        mint::prepare_mint_transaction(&project.contract_address, &wallet, snapshot.mint_price)
            .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    Ok(Json(MintAttemptResponse {
        success: true,
        contract_address: project.contract_address,
        transaction,
        price: mint::format_price(snapshot.mint_price, NATIVE_DECIMALS),
        current_count: eligibility.current_count.unwrap_or(0),
        message: "Transaction prepared. Sign with your wallet to complete the mint.",
    }))
}

async fn find_project(state: &AppState, id: i64) -> Result<mint_project::Model, HttpError> {
    MintProject::find_by_id(id)
        .one(&state.database)
        .await
        .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
        .ok_or_else(|| {
            HttpError::new(
                StatusCode::NOT_FOUND,
                format!("Mint project {id} not found"),
            )
        })
}

fn client_ip(headers: &HeaderMap) -> String {
    for header in ["x-forwarded-for", "x-real-ip"] {
        if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
            if let Some(first) = value.split(',').next() {
                let trimmed = first.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }
    "unknown".to_string()
}
