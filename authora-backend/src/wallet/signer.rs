//! Local key handling
//!
//! Turns a hex secret key (with or without `0x`) into an ethers `LocalWallet`.
//! Transactions are signed locally; keys never leave the process.

use ethers::core::k256::ecdsa::SigningKey;
use ethers::signers::{LocalWallet, Signer};

/// Build a LocalWallet from a private key string
pub fn local_wallet(private_key: &str) -> Result<LocalWallet, String> {
    let key_hex = private_key.trim();
    let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

    let key_bytes = hex::decode(key_hex)
        .map_err(|e| format!("Invalid private key hex: {}", e))?;

    if key_bytes.len() != 32 {
        return Err(format!("Invalid private key: expected 32 bytes, got {}", key_bytes.len()));
    }

    let signing_key = SigningKey::from_bytes(key_bytes.as_slice().into())
        .map_err(|e| format!("Invalid private key: {}", e))?;

    Ok(LocalWallet::from(signing_key))
}

/// Derive the checksummed public address from a private key
pub fn derive_address(private_key: &str) -> Result<String, String> {
    let wallet = local_wallet(private_key)?;
    Ok(ethers::utils::to_checksum(&wallet.address(), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardhat account #0, never use outside tests
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_derive_address() {
        assert_eq!(
            derive_address(TEST_KEY).unwrap(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn test_derive_address_no_prefix() {
        let key = TEST_KEY.strip_prefix("0x").unwrap();
        assert_eq!(
            derive_address(key).unwrap().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_rejects_garbage_key() {
        assert!(local_wallet("not-a-key").is_err());
        assert!(local_wallet("0x1234").is_err());
    }
}
