//! ERC-721 token metadata endpoint, the JSON document a contract's
//! `tokenURI()` points at.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use sea_orm::{EntityTrait, QueryOrder, QuerySelect};
use serde::Serialize;

use crate::entities::mint_project;
use crate::entities::prelude::MintProject;
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new().route("/{token_id}", get(token_metadata))
}

#[derive(Debug, Serialize)]
struct TokenMetadata {
    name: String,
    description: String,
    image: String,
    attributes: Vec<Attribute>,
}

#[derive(Debug, Serialize)]
struct Attribute {
    trait_type: &'static str,
    value: String,
}

async fn token_metadata(
    State(state): State<AppState>,
    Path(token_id): Path<i64>,
) -> Result<Json<TokenMetadata>, HttpError> {
    if token_id < 1 {
        return Err(HttpError::new(
            StatusCode::BAD_REQUEST,
            "Invalid token ID".to_string(),
        ));
    }

    // Tokens are served from the earliest deployed project
    let project = MintProject::find()
        .order_by_asc(mint_project::Column::CreatedAt)
        .limit(1)
        .one(&state.database)
        .await
        .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
        .ok_or_else(|| HttpError::new(StatusCode::NOT_FOUND, "No projects found".to_string()))?;

    // ownerOf reverts for unminted token ids
    if state
        .rpc
        .fetch_token_owner(&project.contract_address, token_id as u64)
        .await
        .is_err()
    {
        return Err(HttpError::new(
            StatusCode::NOT_FOUND,
            "Token does not exist".to_string(),
        ));
    }

    let metadata = TokenMetadata {
        name: format!("{} #{token_id}", project.name),
        description: project.description.clone(),
        image: project.image.clone(),
        attributes: vec![
            Attribute {
                trait_type: "Collection",
                value: project.name,
            },
            Attribute {
                trait_type: "Token ID",
                value: token_id.to_string(),
            },
            Attribute {
                trait_type: "Network",
                value: project.network,
            },
        ],
    };

    Ok(Json(metadata))
}
