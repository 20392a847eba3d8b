//! AES-256-GCM encryption for identity-provider client secrets.
//!
//! Each secret is sealed into a self-contained envelope with a unique nonce.
//! The master key must be 32 bytes (256 bits) and is provided as a
//! 64-character lowercase hex string from an environment variable.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use thiserror::Error;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Errors produced by the secret codec.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The master key is not exactly 64 lowercase hex characters.
    #[error("Invalid encryption key format")]
    InvalidKeyFormat,

    /// AES-GCM encryption failed. Unreachable with a well-formed key.
    #[error("encryption failed")]
    EncryptionFailed,

    /// The envelope could not be decrypted. Deliberately coarse: malformed
    /// base64, a truncated envelope, a wrong key, and a failed authentication
    /// tag all collapse into this one kind so error output cannot be used as
    /// a tamper oracle.
    #[error("decryption failed")]
    DecryptionFailed,
}

/// Validates that the master key is exactly 64 lowercase hex characters
/// and returns the decoded 32-byte key.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyFormat`] on wrong length, uppercase hex,
/// or any non-hex character.
pub fn validate_key(key_hex: &str) -> Result<[u8; KEY_SIZE], CryptoError> {
    if key_hex.len() != KEY_SIZE * 2 {
        return Err(CryptoError::InvalidKeyFormat);
    }
    if !key_hex
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return Err(CryptoError::InvalidKeyFormat);
    }

    let decoded = hex::decode(key_hex).map_err(|_| CryptoError::InvalidKeyFormat)?;
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&decoded);
    Ok(key)
}

/// Generates a fresh random master key, encoded as 64 lowercase hex
/// characters. Intended for provisioning tooling; store the output in the
/// environment, never in the database it protects.
pub fn generate_key() -> String {
    use rand::RngCore;

    let mut key = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut key);
    hex::encode(key)
}

/// Cipher handle for one master key.
///
/// Construct once at startup with [`SecretCodec::from_hex`] and share;
/// the codec holds only the imported AES key schedule, is cheap to clone,
/// and is safe to use concurrently. The raw key bytes are not retrievable
/// from it.
#[derive(Clone)]
pub struct SecretCodec {
    cipher: Aes256Gcm,
}

impl SecretCodec {
    /// Creates a codec from a raw 32-byte key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Creates a codec from a 64-character lowercase hex key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyFormat`] if the key does not parse.
    pub fn from_hex(key_hex: &str) -> Result<Self, CryptoError> {
        let key = validate_key(key_hex)?;
        Ok(Self::new(&key))
    }

    /// Encrypts a plaintext string into a storable envelope.
    ///
    /// The envelope is `base64(nonce || ciphertext || tag)`, safe to store in
    /// a text column. A cryptographically secure random nonce is generated
    /// per call (never reuse), so encrypting the same plaintext twice
    /// produces different envelopes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EncryptionFailed`] on an internal AEAD error.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;

        // Prepend the 12-byte nonce; GCM appends the 16-byte tag itself.
        let mut envelope = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&envelope))
    }

    /// Decrypts an envelope produced by [`encrypt`](Self::encrypt) back to
    /// the original plaintext.
    ///
    /// The whole envelope is processed atomically: the authentication tag is
    /// verified before any plaintext is released.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptionFailed`] for every failure: invalid
    /// base64, an envelope shorter than nonce + tag, tag verification
    /// failure (tampered data or wrong key), or non-UTF-8 plaintext.
    pub fn decrypt(&self, envelope: &str) -> Result<String, CryptoError> {
        let bytes = BASE64
            .decode(envelope)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Best-effort decryption for degraded read paths.
    ///
    /// Returns `None` on any failure, without reporting which one occurred.
    /// Listing pages use this to render a placeholder instead of failing the
    /// whole page on one unreadable record.
    pub fn safe_decrypt(&self, envelope: &str) -> Option<String> {
        self.decrypt(envelope).ok()
    }
}
