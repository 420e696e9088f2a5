//! Pure derivations over a contract snapshot: sale status,
//! human-readable price formatting, and the unsigned mint call handed
//! to the wallet.

use anyhow::Result;
use serde::Serialize;

use crate::rpc::{ContractSnapshot, abi};

/// Decimals of the network's native gas token (USDC on Arc Testnet).
pub const NATIVE_DECIMALS: u32 = 18;
pub const NATIVE_SYMBOL: &str = "USDC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MintStatus {
    Live,
    Upcoming,
    Ended,
}

impl MintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MintStatus::Live => "live",
            MintStatus::Upcoming => "upcoming",
            MintStatus::Ended => "ended",
        }
    }
}

/// Derives the sale status at `now_secs` (unix seconds, injected for
/// deterministic tests). Rules apply first-match: no snapshot or an
/// inactive sale is ended, a scheduled start in the future is upcoming,
/// a passed end or exhausted supply is ended, anything else is live.
pub fn derive_status(snapshot: Option<&ContractSnapshot>, now_secs: u64) -> MintStatus {
    let Some(snapshot) = snapshot else {
        return MintStatus::Ended;
    };

    if !snapshot.minting_active {
        return MintStatus::Ended;
    }

    if let Some(start) = snapshot.start_time {
        if now_secs < start {
            return MintStatus::Upcoming;
        }
    }

    if let Some(end) = snapshot.end_time {
        if now_secs > end {
            return MintStatus::Ended;
        }
    }

    if snapshot.total_supply >= snapshot.max_supply {
        return MintStatus::Ended;
    }

    MintStatus::Live
}

/// Renders an integer smallest-unit amount as "<whole>[.<frac>] USDC",
/// trimming trailing zeros and omitting a zero fractional part.
pub fn format_price(raw: u128, decimals: u32) -> String {
    assert!(decimals <= 38, "Decimal scale exceeds u128 range");
    let divisor = 10u128.pow(decimals);
    let whole = raw / divisor;
    let frac = raw % divisor;

    if frac == 0 {
        return format!("{whole} {NATIVE_SYMBOL}");
    }

    let frac_str = format!("{frac:0width$}", width = decimals as usize);
    let trimmed = frac_str.trim_end_matches('0');
    format!("{whole}.{trimmed} {NATIVE_SYMBOL}")
}

/// Unsigned transaction for the wallet to sign: `safeMint(address)`
/// against the sale contract, value in smallest units as a decimal
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedTransaction {
    pub to: String,
    pub data: String,
    pub value: String,
}

pub fn prepare_mint_transaction(
    contract: &str,
    recipient: &str,
    mint_price: u128,
) -> Result<PreparedTransaction> {
    Ok(PreparedTransaction {
        to: contract.to_string(),
        data: abi::encode_call_address("safeMint(address)", recipient)?,
        value: mint_price.to_string(),
    })
}

pub fn unix_now() -> u64 {
    let now = chrono::Utc::now().timestamp();
    assert!(now > 0, "System clock before the unix epoch");
    now as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ContractSnapshot {
        ContractSnapshot {
            address: "0x177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2".to_string(),
            total_supply: 100,
            max_supply: 1000,
            mint_price: 1_500_000_000_000_000_000,
            minting_active: true,
            wallet_mint_limit: 5,
            start_time: Some(1_000),
            end_time: Some(2_000),
        }
    }

    #[test]
    fn missing_snapshot_is_ended() {
        assert_eq!(derive_status(None, 1_500), MintStatus::Ended);
    }

    #[test]
    fn inactive_sale_is_ended_regardless_of_other_fields() {
        let mut snap = snapshot();
        snap.minting_active = false;
        assert_eq!(derive_status(Some(&snap), 1_500), MintStatus::Ended);

        // Even inside the window with supply left
        snap.total_supply = 0;
        assert_eq!(derive_status(Some(&snap), 1_500), MintStatus::Ended);
    }

    #[test]
    fn before_start_is_upcoming() {
        let snap = snapshot();
        assert_eq!(derive_status(Some(&snap), 500), MintStatus::Upcoming);
    }

    #[test]
    fn after_end_is_ended() {
        let snap = snapshot();
        assert_eq!(derive_status(Some(&snap), 2_001), MintStatus::Ended);
    }

    #[test]
    fn sold_out_inside_window_is_ended() {
        let mut snap = snapshot();
        snap.total_supply = 1000;
        assert_eq!(derive_status(Some(&snap), 1_500), MintStatus::Ended);

        // Oversold counters must not wedge the evaluator
        snap.total_supply = 1001;
        assert_eq!(derive_status(Some(&snap), 1_500), MintStatus::Ended);
    }

    #[test]
    fn open_sale_is_live() {
        let snap = snapshot();
        assert_eq!(derive_status(Some(&snap), 1_500), MintStatus::Live);

        // Unscheduled sale with supply left is live too
        let mut unscheduled = snapshot();
        unscheduled.start_time = None;
        unscheduled.end_time = None;
        assert_eq!(derive_status(Some(&unscheduled), 42), MintStatus::Live);
    }

    #[test]
    fn price_formatting() {
        assert_eq!(format_price(0, 18), "0 USDC");
        assert_eq!(format_price(1_000_000_000_000_000_000, 18), "1 USDC");
        assert_eq!(format_price(1_500_000_000_000_000_000, 18), "1.5 USDC");
        assert_eq!(format_price(123_456_789_000_000_000, 18), "0.123456789 USDC");
        assert_eq!(format_price(1, 18), "0.000000000000000001 USDC");
        assert_eq!(format_price(25, 0), "25 USDC");
    }

    #[test]
    fn prepared_transaction_encodes_safe_mint() {
        let tx = prepare_mint_transaction(
            "0x177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2",
            "0x4444fbb2177b3e8d4e3a4a2bfd191aacafdae76e",
            1_500_000_000_000_000_000,
        )
        .unwrap();

        assert_eq!(tx.to, "0x177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2");
        // safeMint(address) selector, recipient left-padded to a word
        assert!(tx.data.starts_with("0x40d097c3"));
        assert!(tx.data.ends_with("4444fbb2177b3e8d4e3a4a2bfd191aacafdae76e"));
        assert_eq!(tx.data.len(), 2 + 8 + 64);
        assert_eq!(tx.value, "1500000000000000000");

        let wire = serde_json::to_value(&tx).unwrap();
        assert_eq!(wire["to"], "0x177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2");
        assert_eq!(wire["value"], "1500000000000000000");

        assert!(prepare_mint_transaction("0xbad", "0x1234", 0).is_err());
    }
}
