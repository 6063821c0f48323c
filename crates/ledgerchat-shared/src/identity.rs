use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::constants::{ADDRESS_SIZE, KDF_CONTEXT_ADDRESS};
use crate::error::SharedError;
use crate::types::Address;

/// The signing identity that writes to the ledger on behalf of a client.
///
/// Its ledger address is derived from the verifying key, so the same secret
/// always publishes under the same account.
#[derive(Clone)]
pub struct PublisherIdentity {
    signing_key: SigningKey,
}

impl PublisherIdentity {
    /// Generate a new random identity
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Restore an identity from a 64-char hex secret (optional `0x` prefix).
    pub fn from_secret_hex(hex_key: &str) -> Result<Self, SharedError> {
        let hex_key = hex_key.trim();
        let hex_key = hex_key.strip_prefix("0x").unwrap_or(hex_key);
        let bytes = hex::decode(hex_key).map_err(|_| SharedError::InvalidKeyBytes)?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SharedError::InvalidKeyBytes)?;
        Ok(Self::from_secret_bytes(&secret))
    }

    /// Ledger account of this identity: the last 20 bytes of a keyed BLAKE3
    /// hash over the verifying key.
    pub fn address(&self) -> Address {
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_ADDRESS);
        hasher.update(self.signing_key.verifying_key().as_bytes());
        let hash = hasher.finalize();
        let mut addr = [0u8; ADDRESS_SIZE];
        addr.copy_from_slice(&hash.as_bytes()[32 - ADDRESS_SIZE..]);
        Address::from_bytes(addr)
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl std::fmt::Debug for PublisherIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublisherIdentity")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Check a payload signature produced by [`PublisherIdentity::sign`].
pub fn verify_signature(
    key: &VerifyingKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), SharedError> {
    key.verify(message, signature)
        .map_err(|_| SharedError::InvalidKeyBytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_stable() {
        let secret = [7u8; 32];
        let a = PublisherIdentity::from_secret_bytes(&secret).address();
        let b = PublisherIdentity::from_secret_hex(&hex::encode(secret))
            .unwrap()
            .address();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 42);
    }

    #[test]
    fn test_distinct_identities_have_distinct_addresses() {
        let a = PublisherIdentity::generate();
        let b = PublisherIdentity::generate();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn test_secret_hex_rejects_bad_length() {
        assert!(PublisherIdentity::from_secret_hex("abcd").is_err());
        assert!(PublisherIdentity::from_secret_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_sign_verify() {
        let id = PublisherIdentity::generate();
        let sig = id.sign(b"payload");
        assert!(verify_signature(&id.verifying_key(), b"payload", &sig).is_ok());
        assert!(verify_signature(&id.verifying_key(), b"other", &sig).is_err());
    }
}
