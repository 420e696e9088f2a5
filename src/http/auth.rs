use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/nonce", get(issue_nonce))
        .route("/verify", post(verify_signature))
}

#[derive(Debug, Deserialize)]
struct NonceQuery {
    address: String,
}

#[derive(Debug, Serialize)]
struct NonceResponse {
    nonce: String,
    address: String,
}

async fn issue_nonce(
    State(state): State<AppState>,
    Query(query): Query<NonceQuery>,
) -> Result<Json<NonceResponse>, HttpError> {
    let nonce = state
        .authenticator
        .issue_challenge(&query.address)
        .await
        .map_err(|err| HttpError::new(StatusCode::BAD_REQUEST, err.to_string()))?;

    Ok(Json(NonceResponse {
        nonce,
        address: query.address,
    }))
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    address: String,
    signature: String,
    nonce: String,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    success: bool,
    authenticated: bool,
    address: String,
}

async fn verify_signature(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, HttpError> {
    let authenticated = state
        .authenticator
        .verify(&request.address, &request.signature, &request.nonce)
        .await;

    if !authenticated {
        // Uniform refusal; the failing sub-check is never disclosed
        return Err(HttpError::new(
            StatusCode::UNAUTHORIZED,
            "Invalid signature".to_string(),
        ));
    }

    Ok(Json(VerifyResponse {
        success: true,
        authenticated: true,
        address: request.address,
    }))
}
