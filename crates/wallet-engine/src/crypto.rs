//! Credential hashing.
//!
//! MPINs are stored as a keyed HMAC-SHA256 over `owner_id:mpin`, with a server-side
//! pepper as the key. Binding the owner id means equal MPINs of different owners hash
//! differently.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use wallet_core::{Mpin, OwnerId, Result, WalletError};

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 and return hex-encoded result.
///
/// # Errors
///
/// Returns `WalletError::Configuration` if the key is rejected by the MAC.
pub fn hmac_sha256_hex(secret: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WalletError::Configuration(format!("invalid hmac key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Hash an MPIN for storage.
///
/// # Errors
///
/// Returns `WalletError::Configuration` if the pepper is unusable.
pub fn hash_secret(pepper: &str, owner_id: &OwnerId, mpin: &Mpin) -> Result<String> {
    hmac_sha256_hex(pepper, &format!("{owner_id}:{}", mpin.as_str()))
}

/// Constant-time string comparison.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_hex_sha256() {
        let mpin = Mpin::parse("7391").unwrap();
        let hash = hash_secret("pepper", &OwnerId::generate(), &mpin).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_binds_owner_and_pepper() {
        let mpin = Mpin::parse("7391").unwrap();
        let owner = OwnerId::generate();
        let base = hash_secret("pepper", &owner, &mpin).unwrap();

        assert_eq!(base, hash_secret("pepper", &owner, &mpin).unwrap());
        assert_ne!(base, hash_secret("pepper", &OwnerId::generate(), &mpin).unwrap());
        assert_ne!(base, hash_secret("other", &owner, &mpin).unwrap());
    }

    #[test]
    fn constant_time_eq_matches_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
    }
}
