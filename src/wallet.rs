use anyhow::{Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use tiny_keccak::{Hasher, Keccak};

pub const ADDRESS_HEX_LEN: usize = 40;
pub const SIGNATURE_BYTES: usize = 65;
pub const MAX_SIGNATURE_LEN: usize = 4096;

/// The exact message a wallet signs to prove key ownership. Verification
/// reconstructs this byte-for-byte, so any change here invalidates
/// outstanding challenges.
pub fn auth_message(address: &str, nonce: &str) -> String {
    format!(
        "ArcMint Authentication\n\nWallet: {address}\nNonce: {nonce}\n\nThis request will not trigger a blockchain transaction."
    )
}

/// Checks the `0x` + 40 hex digit address shape. Checksum casing is not
/// enforced; comparisons elsewhere are case-insensitive.
pub fn is_valid_address(value: &str) -> bool {
    let trimmed = value.trim();
    let Some(body) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    else {
        return false;
    };
    body.len() == ADDRESS_HEX_LEN && body.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn normalize_address(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if !is_valid_address(trimmed) {
        return Err(anyhow!("Invalid wallet address: {trimmed}"));
    }
    Ok(trimmed.to_ascii_lowercase())
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// EIP-191 personal-message digest, the prehash `personal_sign` wallets
/// actually sign.
pub fn personal_message_digest(message: &str) -> [u8; 32] {
    let prefixed = format!("\x19Ethereum Signed Message:\n{}{}", message.len(), message);
    keccak256(prefixed.as_bytes())
}

pub fn decode_signature(value: &str) -> Result<Vec<u8>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Signature cannot be empty"));
    }

    match hex::decode(strip_hex_prefix(trimmed)) {
        Ok(bytes) if !bytes.is_empty() => {
            if bytes.len() > MAX_SIGNATURE_LEN {
                return Err(anyhow!("Signature exceeds {MAX_SIGNATURE_LEN} byte limit"));
            }
            return Ok(bytes);
        }
        Ok(_) => {}
        Err(_) => {}
    }

    let decoded = BASE64_STANDARD
        .decode(trimmed)
        .map_err(|err| anyhow!("Failed to decode signature as hex or base64: {err}"))?;
    if decoded.len() > MAX_SIGNATURE_LEN {
        return Err(anyhow!("Signature exceeds {MAX_SIGNATURE_LEN} byte limit"));
    }
    Ok(decoded)
}

/// Recovers the signer address (lower-cased `0x` form) from a 65-byte
/// r||s||v signature over the personal-message digest of `message`.
pub fn recover_signer(message: &str, signature: &[u8]) -> Result<String> {
    if signature.len() != SIGNATURE_BYTES {
        return Err(anyhow!(
            "Signature must be {SIGNATURE_BYTES} bytes, got {}",
            signature.len()
        ));
    }

    let parsed = Signature::from_slice(&signature[..64])
        .map_err(|err| anyhow!("Malformed signature body: {err}"))?;
    let v = signature[64];
    // Wallets emit v as 27/28; raw recovery ids are 0/1
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(recovery_byte)
        .ok_or_else(|| anyhow!("Invalid recovery id: {v}"))?;

    let digest = personal_message_digest(message);
    let verifying_key = VerifyingKey::recover_from_prehash(&digest, &parsed, recovery_id)
        .map_err(|err| anyhow!("Signature recovery failed: {err}"))?;

    Ok(address_from_verifying_key(&verifying_key))
}

/// Uniform boolean check; callers must not branch on why verification
/// failed.
pub fn verify_personal_signature(message: &str, signature: &str, address: &str) -> bool {
    let Ok(bytes) = decode_signature(signature) else {
        return false;
    };
    let Ok(recovered) = recover_signer(message, &bytes) else {
        return false;
    };
    recovered.eq_ignore_ascii_case(address.trim())
}

pub fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

fn strip_hex_prefix(value: &str) -> &str {
    if value.starts_with("0x") || value.starts_with("0X") {
        &value[2..]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn test_key() -> SigningKey {
        SigningKey::from_slice(&[0x42u8; 32]).expect("valid scalar")
    }

    fn sign_message(key: &SigningKey, message: &str) -> String {
        let digest = personal_message_digest(message);
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&digest)
            .expect("signing succeeds");
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(27 + recovery_id.to_byte());
        format!("0x{}", hex::encode(bytes))
    }

    #[test]
    fn address_validation() {
        assert!(is_valid_address(
            "0x177b3E8D4E3a4A2BFd191aaCafdae76E4444fbB2"
        ));
        assert!(is_valid_address(
            " 0x177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2 "
        ));
        assert!(!is_valid_address("177b3E8D4E3a4A2BFd191aaCafdae76E4444fbB2"));
        assert!(!is_valid_address("0x177b"));
        assert!(!is_valid_address("0xzzzz3E8D4E3a4A2BFd191aaCafdae76E4444fb"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn address_normalization() {
        let normalized = normalize_address("0x177b3E8D4E3a4A2BFd191aaCafdae76E4444fbB2").unwrap();
        assert_eq!(normalized, "0x177b3e8d4e3a4a2bfd191aacafdae76e4444fbb2");
        assert!(normalize_address("not-an-address").is_err());
    }

    #[test]
    fn signature_decodes_hex_and_base64() {
        let hex_bytes = decode_signature("0xdeadbeef").expect("hex signature");
        assert_eq!(hex_bytes, vec![0xde, 0xad, 0xbe, 0xef]);

        let base64_encoded = BASE64_STANDARD.encode([0xde, 0xad, 0xbe, 0xef]);
        let base64_bytes = decode_signature(&base64_encoded).expect("base64 signature");
        assert_eq!(base64_bytes, vec![0xde, 0xad, 0xbe, 0xef]);

        assert!(decode_signature("").is_err());
    }

    #[test]
    fn signature_recovery_round_trip() {
        let key = test_key();
        let signer = address_from_verifying_key(key.verifying_key());
        let message = auth_message(&signer, "abc123");
        let signature = sign_message(&key, &message);

        assert!(verify_personal_signature(&message, &signature, &signer));
        assert!(verify_personal_signature(
            &message,
            &signature,
            &signer.to_ascii_uppercase().replace("0X", "0x")
        ));
    }

    #[test]
    fn signature_for_other_message_rejected() {
        let key = test_key();
        let signer = address_from_verifying_key(key.verifying_key());
        let signature = sign_message(&key, &auth_message(&signer, "nonce-a"));

        assert!(!verify_personal_signature(
            &auth_message(&signer, "nonce-b"),
            &signature,
            &signer
        ));
    }

    #[test]
    fn signature_from_other_key_rejected() {
        let key = test_key();
        let other = SigningKey::from_slice(&[0x24u8; 32]).expect("valid scalar");
        let claimed = address_from_verifying_key(key.verifying_key());
        let message = auth_message(&claimed, "abc123");
        let signature = sign_message(&other, &message);

        assert!(!verify_personal_signature(&message, &signature, &claimed));
    }

    #[test]
    fn keccak_known_vector() {
        // keccak256 of the empty input
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
