use std::time::Duration;

use anyhow::{Context, Result};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::wallet;

pub mod abi;

/// Point-in-time read of a sale contract. Field reads that fail are
/// defaulted individually, so a partially reachable contract still
/// yields a usable snapshot. `total_supply <= max_supply` is NOT
/// guaranteed; consumers must not assume it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub address: String,
    pub total_supply: u64,
    pub max_supply: u64,
    pub mint_price: u128,
    pub minting_active: bool,
    pub wallet_mint_limit: u64,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Invalid contract address: {0}")]
    InvalidAddress(String),
    #[error("Chain endpoint unreachable: {0}")]
    Unreachable(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct RpcClient {
    inner: HttpClient,
    timeout: Duration,
    // Per contract: whether it exposes mintedBy(address). Probed once,
    // then consulted instead of riding on the error path.
    minted_by_support: Cache<String, bool>,
}

const CAPABILITY_CACHE_CAPACITY: u64 = 1_024;

impl RpcClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        assert!(!endpoint.is_empty(), "RPC endpoint must be provided");
        assert!(
            timeout >= Duration::from_millis(100),
            "Timeout below 100ms is unsafe"
        );

        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .build(endpoint)
            .with_context(|| format!("Failed to build RPC client for {endpoint}"))?;

        Ok(Self {
            inner: client,
            timeout,
            minted_by_support: Cache::new(CAPABILITY_CACHE_CAPACITY),
        })
    }

    pub fn timeout(&self) -> Duration {
        assert!(
            self.timeout >= Duration::from_millis(100),
            "Timeout invariant broken"
        );
        assert!(
            self.timeout <= Duration::from_secs(60),
            "Timeout exceeds maximum bound"
        );
        self.timeout
    }

    /// Reads the seven sale-state fields concurrently. Only a malformed
    /// contract address is an overall failure; each field falls back to
    /// its zero value on its own.
    pub async fn fetch_snapshot(&self, contract: &str) -> Result<ContractSnapshot, ChainError> {
        let contract = wallet::normalize_address(contract)
            .map_err(|_| ChainError::InvalidAddress(contract.to_string()))?;

        let (
            total_supply,
            max_supply,
            mint_price,
            minting_active,
            wallet_mint_limit,
            start_time,
            end_time,
        ) = tokio::join!(
            self.read_u64(&contract, "totalSupply()"),
            self.read_u64(&contract, "maxSupply()"),
            self.read_u128(&contract, "mintPrice()"),
            self.read_bool(&contract, "mintingActive()"),
            self.read_u64(&contract, "walletMintLimit()"),
            self.read_u64(&contract, "startTime()"),
            self.read_u64(&contract, "endTime()"),
        );

        Ok(ContractSnapshot {
            address: contract,
            total_supply: total_supply.unwrap_or(0),
            max_supply: max_supply.unwrap_or(0),
            mint_price: mint_price.unwrap_or(0),
            minting_active: minting_active.unwrap_or(false),
            wallet_mint_limit: wallet_mint_limit.unwrap_or(0),
            // A zero timestamp means the contract does not schedule the sale
            start_time: start_time.ok().filter(|ts| *ts > 0),
            end_time: end_time.ok().filter(|ts| *ts > 0),
        })
    }

    /// How many mints the wallet has made against this contract,
    /// preferring the contract-specific `mintedBy` counter and falling
    /// back to `balanceOf`. Failures count as zero.
    pub async fn wallet_mint_count(&self, contract: &str, wallet: &str) -> u64 {
        let (Ok(contract), Ok(wallet)) = (
            wallet::normalize_address(contract),
            wallet::normalize_address(wallet),
        ) else {
            return 0;
        };

        match self.minted_by_support.get(&contract) {
            Some(true) => match self
                .read_u64_address(&contract, "mintedBy(address)", &wallet)
                .await
            {
                Ok(count) => count,
                Err(_) => self.balance_of(&contract, &wallet).await,
            },
            Some(false) => self.balance_of(&contract, &wallet).await,
            None => match self
                .read_u64_address(&contract, "mintedBy(address)", &wallet)
                .await
            {
                Ok(count) => {
                    self.minted_by_support.insert(contract, true);
                    count
                }
                Err(err) => {
                    debug!("Contract {contract} has no mintedBy counter: {err}");
                    self.minted_by_support.insert(contract.clone(), false);
                    self.balance_of(&contract, &wallet).await
                }
            },
        }
    }

    /// Receipt lookup by hash. An unknown transaction is `Ok(None)`, not
    /// an error.
    pub async fn fetch_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        let receipt: Option<TransactionReceipt> = self
            .inner
            .request("eth_getTransactionReceipt", rpc_params![tx_hash])
            .await
            .context("RPC call eth_getTransactionReceipt failed")?;
        Ok(receipt)
    }

    /// `ownerOf(tokenId)` existence probe; reverts (unminted tokens)
    /// surface as errors.
    pub async fn fetch_token_owner(
        &self,
        contract: &str,
        token_id: u64,
    ) -> Result<String, ChainError> {
        let contract = wallet::normalize_address(contract)
            .map_err(|_| ChainError::InvalidAddress(contract.to_string()))?;
        let data = abi::encode_call_u256("ownerOf(uint256)", token_id);
        let raw = self.call(&contract, data).await?;
        Ok(abi::decode_address(&raw).context("Malformed ownerOf return data")?)
    }

    async fn balance_of(&self, contract: &str, wallet: &str) -> u64 {
        self.read_u64_address(contract, "balanceOf(address)", wallet)
            .await
            .unwrap_or(0)
    }

    async fn call(&self, to: &str, data: String) -> Result<String> {
        let request = CallRequest {
            to: to.to_string(),
            data,
        };
        self.inner
            .request("eth_call", rpc_params![request, "latest"])
            .await
            .context("RPC call eth_call failed")
    }

    async fn read_u64(&self, contract: &str, signature: &str) -> Result<u64> {
        let raw = self.call(contract, abi::encode_call(signature)).await?;
        abi::decode_u64(&raw)
    }

    async fn read_u128(&self, contract: &str, signature: &str) -> Result<u128> {
        let raw = self.call(contract, abi::encode_call(signature)).await?;
        abi::decode_u128(&raw)
    }

    async fn read_bool(&self, contract: &str, signature: &str) -> Result<bool> {
        let raw = self.call(contract, abi::encode_call(signature)).await?;
        abi::decode_bool(&raw)
    }

    async fn read_u64_address(
        &self,
        contract: &str,
        signature: &str,
        address: &str,
    ) -> Result<u64> {
        let data = abi::encode_call_address(signature, address)?;
        let raw = self.call(contract, data).await?;
        abi::decode_u64(&raw)
    }
}

#[derive(Debug, Serialize)]
struct CallRequest {
    to: String,
    data: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
}

impl TransactionReceipt {
    /// Maps the receipt status word to the persisted transaction status.
    pub fn derived_status(&self) -> &'static str {
        match self.status.as_deref() {
            Some(raw) => match abi::decode_quantity(raw) {
                Ok(1) => "confirmed",
                Ok(_) => "failed",
                Err(_) => "pending",
            },
            None => "pending",
        }
    }

    pub fn block_number_value(&self) -> Option<i64> {
        let raw = self.block_number.as_deref()?;
        let parsed = abi::decode_quantity(raw).ok()?;
        i64::try_from(parsed).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_status_derivation() {
        let confirmed = TransactionReceipt {
            status: Some("0x1".to_string()),
            block_number: Some("0x4cfa23".to_string()),
        };
        assert_eq!(confirmed.derived_status(), "confirmed");
        assert_eq!(confirmed.block_number_value(), Some(0x4cfa23));

        let failed = TransactionReceipt {
            status: Some("0x0".to_string()),
            block_number: Some("0x10".to_string()),
        };
        assert_eq!(failed.derived_status(), "failed");

        let pending = TransactionReceipt {
            status: None,
            block_number: None,
        };
        assert_eq!(pending.derived_status(), "pending");
        assert_eq!(pending.block_number_value(), None);
    }
}
