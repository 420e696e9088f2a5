//! Minimal ABI plumbing for the handful of ERC-721 view calls the API
//! depends on. Calldata is the 4-byte keccak selector of the function
//! signature followed by 32-byte big-endian words.

use anyhow::{Result, anyhow};

use crate::wallet::keccak256;

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for a zero-argument view call, `0x`-prefixed.
pub fn encode_call(signature: &str) -> String {
    format!("0x{}", hex::encode(selector(signature)))
}

/// Calldata for a single-address-argument view call. The address is
/// left-padded to a full word.
pub fn encode_call_address(signature: &str, address: &str) -> Result<String> {
    let body = address
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("Address must be 0x-prefixed: {address}"))?;
    let bytes = hex::decode(body).map_err(|err| anyhow!("Address is not hex: {err}"))?;
    if bytes.len() != 20 {
        return Err(anyhow!("Address must be 20 bytes, got {}", bytes.len()));
    }
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(format!(
        "0x{}{}",
        hex::encode(selector(signature)),
        hex::encode(word)
    ))
}

/// Calldata for a single-uint256-argument view call.
pub fn encode_call_u256(signature: &str, value: u64) -> String {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    format!(
        "0x{}{}",
        hex::encode(selector(signature)),
        hex::encode(word)
    )
}

/// Decodes the first return word as an unsigned integer. Values above
/// u128 range are rejected rather than truncated.
pub fn decode_u128(data: &str) -> Result<u128> {
    let word = first_word(data)?;
    let (high, low) = word.split_at(32);
    if high.bytes().any(|b| b != b'0') {
        return Err(anyhow!("Return value exceeds u128 range"));
    }
    u128::from_str_radix(low, 16).map_err(|err| anyhow!("Malformed uint word: {err}"))
}

pub fn decode_u64(data: &str) -> Result<u64> {
    let value = decode_u128(data)?;
    u64::try_from(value).map_err(|_| anyhow!("Return value exceeds u64 range"))
}

pub fn decode_bool(data: &str) -> Result<bool> {
    Ok(decode_u128(data)? != 0)
}

/// Decodes the first return word as an address (last 20 bytes of the
/// word), lower-cased `0x` form.
pub fn decode_address(data: &str) -> Result<String> {
    let word = first_word(data)?;
    Ok(format!("0x{}", word[24..].to_ascii_lowercase()))
}

/// Parses a `0x`-prefixed quantity the way eth RPC encodes block numbers
/// and receipt statuses.
pub fn decode_quantity(value: &str) -> Result<u64> {
    let body = value
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("Quantity must be 0x-prefixed: {value}"))?;
    if body.is_empty() {
        return Err(anyhow!("Empty quantity"));
    }
    u64::from_str_radix(body, 16).map_err(|err| anyhow!("Malformed quantity: {err}"))
}

fn first_word(data: &str) -> Result<&str> {
    let body = data
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("Return data must be 0x-prefixed"))?;
    // Guard before slicing: a non-ASCII body could put a char boundary
    // inside the word
    if !body.is_ascii() {
        return Err(anyhow!("Return data is not hex"));
    }
    if body.len() < 64 {
        // Reverted calls surface as empty or short return data
        return Err(anyhow!("Return data shorter than one word"));
    }
    Ok(&body[..64])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_selectors() {
        // Canonical ERC-721 selectors
        assert_eq!(hex::encode(selector("totalSupply()")), "18160ddd");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
        assert_eq!(hex::encode(selector("ownerOf(uint256)")), "6352211e");
    }

    #[test]
    fn address_call_encoding() {
        let data =
            encode_call_address("balanceOf(address)", "0x177b3E8D4E3a4A2BFd191aaCafdae76E4444fbB2")
                .unwrap();
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0x70a08231"));
        assert!(data.ends_with("177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2"));
        assert!(encode_call_address("balanceOf(address)", "0x1234").is_err());
    }

    #[test]
    fn u256_call_encoding() {
        let data = encode_call_u256("ownerOf(uint256)", 7);
        assert!(data.starts_with("0x6352211e"));
        assert!(data.ends_with("0000000000000000000000000000000000000007"));
    }

    #[test]
    fn uint_decoding() {
        let word = format!("0x{:064x}", 1_500_000_000_000_000_000u128);
        assert_eq!(decode_u128(&word).unwrap(), 1_500_000_000_000_000_000);
        assert_eq!(decode_u64(&format!("0x{:064x}", 42)).unwrap(), 42);
        assert!(decode_u64(&format!("0x{:064x}", u128::from(u64::MAX) + 1)).is_err());
        assert!(decode_u128("0x").is_err());
        assert!(decode_u128(&format!("0x{}{:032x}", "f".repeat(32), 0)).is_err());
    }

    #[test]
    fn non_ascii_return_data_is_rejected_not_panicked() {
        // 80 bytes of multi-byte UTF-8 passes the length check but must
        // not be sliced
        let garbage = format!("0x{}", "é".repeat(40));
        assert!(decode_u128(&garbage).is_err());
        assert!(decode_address(&garbage).is_err());
    }

    #[test]
    fn bool_decoding() {
        assert!(decode_bool(&format!("0x{:064x}", 1)).unwrap());
        assert!(!decode_bool(&format!("0x{:064x}", 0)).unwrap());
    }

    #[test]
    fn quantity_decoding() {
        assert_eq!(decode_quantity("0x1").unwrap(), 1);
        assert_eq!(decode_quantity("0x4cfa23").unwrap(), 0x4cfa23);
        assert!(decode_quantity("12").is_err());
        assert!(decode_quantity("0x").is_err());
    }

    #[test]
    fn address_decoding() {
        let word = format!(
            "0x000000000000000000000000{}",
            "177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2"
        );
        assert_eq!(
            decode_address(&word).unwrap(),
            "0x177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2"
        );
    }
}
