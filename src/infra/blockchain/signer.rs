//! Local ed25519 transaction signer.
//!
//! Decouples signing from the fullnode client so that raw private keys are
//! not held in the client and remote signers can be used instead.

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use secrecy::{ExposeSecret, SecretString};

use crate::domain::{BlockchainError, TransactionSigner, normalize_address};

/// Prefix of AIP-80 formatted ed25519 private keys.
const AIP80_PREFIX: &str = "ed25519-priv-";

/// Parse a hex-encoded private key into a SigningKey.
///
/// Accepts `0x`-prefixed or bare hex, optionally in AIP-80 form
/// (`ed25519-priv-0x...`).
pub fn signing_key_from_hex(secret: &SecretString) -> Result<SigningKey, BlockchainError> {
    let raw = secret.expose_secret().trim();
    let raw = raw.strip_prefix(AIP80_PREFIX).unwrap_or(raw);
    let raw = raw.strip_prefix("0x").unwrap_or(raw);

    let key_bytes =
        hex::decode(raw).map_err(|e| BlockchainError::InvalidSignature(e.to_string()))?;
    let key_array: [u8; 32] = key_bytes.try_into().map_err(|v: Vec<u8>| {
        BlockchainError::InvalidSignature(format!("Key must be 32 bytes, got {}", v.len()))
    })?;

    Ok(SigningKey::from_bytes(&key_array))
}

/// Local signer: holds the secret in memory, parses it only when signing.
pub struct LocalSigner {
    secret: SecretString,
    address: String,
    public_key_hex: String,
}

impl LocalSigner {
    /// Build a local signer for `address` from a hex-encoded secret.
    pub fn new(secret: SecretString, address: &str) -> Result<Self, BlockchainError> {
        let signing_key = signing_key_from_hex(&secret)?;
        let address = normalize_address(address)
            .map_err(|e| BlockchainError::InvalidSignature(e.to_string()))?;
        let public_key_hex = format!("0x{}", hex::encode(signing_key.verifying_key().as_bytes()));
        Ok(Self {
            secret,
            address,
            public_key_hex,
        })
    }
}

#[async_trait]
impl TransactionSigner for LocalSigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn public_key_hex(&self) -> String {
        self.public_key_hex.clone()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<String, BlockchainError> {
        let signing_key = signing_key_from_hex(&self.secret)?;
        let signature = signing_key.sign(message);
        Ok(format!("0x{}", hex::encode(signature.to_bytes())))
    }
}
