use chrono::{DateTime, Utc};
use serde::Serialize;

/// What the caller sees for a project: live chain data when reachable,
/// the advisory cache otherwise, with admin overrides applied on top.
/// Display values can lag the eligibility decision.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayState {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: String,
    pub network: String,
    pub contract_address: String,
    pub status: String,
    pub price: String,
    pub supply: i64,
    pub minted: i64,
    pub wallet_limit: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}
