use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::entities::mint_transaction;
use crate::registrar::RegistrarError;
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_transaction))
        .route("/{id}", get(get_transaction))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    tx_hash: String,
    contract_address: String,
    wallet_address: String,
    token_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    success: bool,
    transaction: mint_transaction::Model,
}

async fn register_transaction(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, HttpError> {
    let transaction = state
        .registrar
        .register(
            &request.tx_hash,
            &request.contract_address,
            &request.wallet_address,
            request.token_id,
        )
        .await
        .map_err(registrar_error)?;

    Ok(Json(RegisterResponse {
        success: true,
        transaction,
    }))
}

#[derive(Debug, Serialize)]
struct TransactionResponse {
    transaction: mint_transaction::Model,
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TransactionResponse>, HttpError> {
    let transaction = state.registrar.find(id).await.map_err(registrar_error)?;
    Ok(Json(TransactionResponse { transaction }))
}

fn registrar_error(err: RegistrarError) -> HttpError {
    let status = match &err {
        RegistrarError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RegistrarError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistrarError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    HttpError::new(status, err.to_string())
}
