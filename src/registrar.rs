//! Durable, idempotent record of externally submitted mint
//! transactions. The wallet mints straight against the chain; this is
//! the one write path that ties the hash back to a project.

use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use thiserror::Error;
use tracing::{info, warn};

use crate::entities::prelude::{MintProject, MintTransaction};
use crate::entities::{mint_project, mint_transaction};
use crate::rpc::RpcClient;
use crate::wallet;

#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

#[derive(Clone)]
pub struct TransactionRegistrar {
    database: DatabaseConnection,
    rpc: RpcClient,
}

impl TransactionRegistrar {
    pub fn new(database: DatabaseConnection, rpc: RpcClient) -> Self {
        Self { database, rpc }
    }

    /// Records a submitted mint transaction. Re-registering a known
    /// hash returns the existing record unchanged; a missing receipt
    /// yields status "pending", never an error.
    pub async fn register(
        &self,
        tx_hash: &str,
        contract_address: &str,
        wallet_address: &str,
        token_id: Option<i64>,
    ) -> Result<mint_transaction::Model, RegistrarError> {
        let contract = wallet::normalize_address(contract_address)
            .map_err(|_| RegistrarError::InvalidInput("Invalid contract address".to_string()))?;
        let wallet = wallet::normalize_address(wallet_address)
            .map_err(|_| RegistrarError::InvalidInput("Invalid wallet address".to_string()))?;
        // Lower-cased so the same hash in different casings hits the
        // unique column as one record
        let tx_hash = normalize_tx_hash(tx_hash).ok_or_else(|| {
            RegistrarError::InvalidInput("Invalid transaction hash".to_string())
        })?;
        let tx_hash = tx_hash.as_str();

        let project = MintProject::find()
            .filter(mint_project::Column::ContractAddress.eq(&contract))
            .one(&self.database)
            .await?
            .ok_or_else(|| {
                RegistrarError::NotFound(format!("No project registered for contract {contract}"))
            })?;

        if let Some(existing) = self.find_by_hash(tx_hash).await? {
            return Ok(existing);
        }

        // Receipt absence just means the transaction has not landed yet
        let receipt = match self.rpc.fetch_receipt(tx_hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!("Receipt lookup failed for {tx_hash}: {err}");
                None
            }
        };
        let status = receipt
            .as_ref()
            .map(|r| r.derived_status())
            .unwrap_or("pending");
        let block_number = receipt.as_ref().and_then(|r| r.block_number_value());

        let now = Utc::now().fixed_offset();
        let record = mint_transaction::ActiveModel {
            id: NotSet,
            project_id: Set(project.id),
            wallet_address: Set(wallet),
            tx_hash: Set(tx_hash.to_string()),
            token_id: Set(token_id),
            status: Set(status.to_string()),
            block_number: Set(block_number),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // A concurrent registration of the same hash loses the insert on
        // the unique column and picks up the winner's row below
        MintTransaction::insert(record)
            .on_conflict(
                OnConflict::column(mint_transaction::Column::TxHash)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;

        info!("Registered mint transaction {tx_hash} for project {}", project.id);

        self.find_by_hash(tx_hash)
            .await?
            .ok_or_else(|| RegistrarError::NotFound(format!("Transaction {tx_hash} not recorded")))
    }

    pub async fn find(&self, id: i64) -> Result<mint_transaction::Model, RegistrarError> {
        MintTransaction::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| RegistrarError::NotFound(format!("Transaction {id} not found")))
    }

    async fn find_by_hash(
        &self,
        tx_hash: &str,
    ) -> Result<Option<mint_transaction::Model>, sea_orm::DbErr> {
        MintTransaction::find()
            .filter(mint_transaction::Column::TxHash.eq(tx_hash))
            .one(&self.database)
            .await
    }
}

pub fn is_valid_tx_hash(value: &str) -> bool {
    let Some(body) = value.strip_prefix("0x") else {
        return false;
    };
    body.len() == 64 && body.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn normalize_tx_hash(value: &str) -> Option<String> {
    let trimmed = value.trim();
    is_valid_tx_hash(trimmed).then(|| trimmed.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_hash_validation() {
        let valid = format!("0x{}", "ab".repeat(32));
        assert!(is_valid_tx_hash(&valid));
        assert!(!is_valid_tx_hash(&"ab".repeat(33)));
        assert!(!is_valid_tx_hash("0x1234"));
        assert!(!is_valid_tx_hash(&format!("0x{}", "zz".repeat(32))));
        assert!(!is_valid_tx_hash(""));
    }

    #[test]
    fn tx_hash_normalization_is_case_insensitive() {
        let upper = format!("0x{}", "AB".repeat(32));
        let lower = format!("0x{}", "ab".repeat(32));
        assert_eq!(normalize_tx_hash(&upper), Some(lower.clone()));
        assert_eq!(normalize_tx_hash(&format!("  {lower} ")), Some(lower));
        assert_eq!(normalize_tx_hash("0x1234"), None);
    }
}
