//! The mint/no-mint business decision. Always derived from live chain
//! state; the advisory display cache and admin overrides never reach
//! this path, so display and eligibility may intentionally disagree.

use serde::Serialize;

use crate::mint::unix_now;
use crate::rpc::{ContractSnapshot, RpcClient};

#[derive(Debug, Clone, Serialize)]
pub struct Eligibility {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_count: Option<u64>,
}

impl Eligibility {
    fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            current_count: None,
        }
    }
}

#[derive(Clone)]
pub struct EligibilityPolicy {
    rpc: RpcClient,
}

impl EligibilityPolicy {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    /// Ordered short-circuit checks; the first failing check names the
    /// refusal reason. An unreadable contract is a refusal, never a
    /// crash.
    pub async fn can_mint(&self, wallet: &str, contract: &str) -> Eligibility {
        let snapshot = match self.rpc.fetch_snapshot(contract).await {
            Ok(snapshot) => snapshot,
            Err(_) => return Eligibility::denied("Contract not found or invalid"),
        };

        let current_count = self.rpc.wallet_mint_count(contract, wallet).await;
        evaluate(&snapshot, current_count, unix_now())
    }
}

/// Pure check sequence over an already-fetched snapshot and wallet
/// count, with the clock injected for deterministic tests.
pub fn evaluate(snapshot: &ContractSnapshot, current_count: u64, now_secs: u64) -> Eligibility {
    if !snapshot.minting_active {
        return Eligibility::denied("Minting is not active");
    }

    if snapshot.total_supply >= snapshot.max_supply {
        return Eligibility::denied("Max supply reached");
    }

    if current_count >= snapshot.wallet_mint_limit {
        return Eligibility::denied(format!(
            "Wallet limit reached ({} per wallet)",
            snapshot.wallet_mint_limit
        ));
    }

    if let Some(start) = snapshot.start_time {
        if now_secs < start {
            return Eligibility::denied("Minting has not started yet");
        }
    }

    if let Some(end) = snapshot.end_time {
        if now_secs > end {
            return Eligibility::denied("Minting has ended");
        }
    }

    Eligibility {
        allowed: true,
        reason: None,
        current_count: Some(current_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ContractSnapshot {
        ContractSnapshot {
            address: "0x177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2".to_string(),
            total_supply: 999,
            max_supply: 1000,
            mint_price: 1_000_000_000_000_000_000,
            minting_active: true,
            wallet_mint_limit: 5,
            start_time: Some(1_000),
            end_time: Some(2_000),
        }
    }

    #[test]
    fn open_sale_admits_wallet_under_limit() {
        let result = evaluate(&snapshot(), 2, 1_500);
        assert!(result.allowed);
        assert_eq!(result.current_count, Some(2));
        assert!(result.reason.is_none());
    }

    #[test]
    fn inactive_sale_wins_over_every_other_check() {
        let mut snap = snapshot();
        snap.minting_active = false;
        snap.total_supply = 1000;
        let result = evaluate(&snap, 9, 1_500);
        assert_eq!(result.reason.as_deref(), Some("Minting is not active"));
    }

    #[test]
    fn exhausted_supply_is_checked_before_wallet_limit() {
        let mut snap = snapshot();
        snap.total_supply = 1000;
        let result = evaluate(&snap, 9, 1_500);
        assert_eq!(result.reason.as_deref(), Some("Max supply reached"));
    }

    #[test]
    fn wallet_at_limit_names_the_limit() {
        let result = evaluate(&snapshot(), 5, 1_500);
        assert!(!result.allowed);
        let reason = result.reason.expect("refusal carries a reason");
        assert!(reason.contains('5'), "reason must mention the limit: {reason}");
    }

    #[test]
    fn sale_window_checks() {
        let early = evaluate(&snapshot(), 0, 500);
        assert_eq!(early.reason.as_deref(), Some("Minting has not started yet"));

        let late = evaluate(&snapshot(), 0, 2_001);
        assert_eq!(late.reason.as_deref(), Some("Minting has ended"));

        let mut unscheduled = snapshot();
        unscheduled.start_time = None;
        unscheduled.end_time = None;
        assert!(evaluate(&unscheduled, 0, 5).allowed);
    }

    #[test]
    fn defaulted_limit_denies_immediately() {
        // A wallet limit that failed to read defaults to zero, so every
        // wallet is over it
        let mut snap = snapshot();
        snap.wallet_mint_limit = 0;
        let result = evaluate(&snap, 0, 1_500);
        assert_eq!(
            result.reason.as_deref(),
            Some("Wallet limit reached (0 per wallet)")
        );
    }
}
