// ABOUTME: Symmetric token cipher for sealing OAuth token payloads inside handoff credentials
// ABOUTME: AES-256-GCM with random nonce prepended, base64 transport encoding, SHA-256 digests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FlowSphere

//! Token cipher
//!
//! Provider tokens never travel in the clear: before they are embedded in a
//! handoff credential they are sealed with a server-held AES-256-GCM key.
//! Ciphertext layout is `nonce (12 bytes) || ciphertext`, base64-encoded.
//! Decrypting with the wrong key or a truncated payload fails; callers must
//! treat any decode failure as an authentication failure.

use crate::config::environment::Environment;
use crate::constants::env_config;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit};
use anyhow::{anyhow, Result};
use base64::engine::general_purpose;
use base64::Engine;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::env;
use tracing::{info, warn};
use zeroize::Zeroize;

/// AES-256-GCM nonce length in bytes
const NONCE_LEN: usize = 12;

/// Symmetric cipher keyed by a server-held 32-byte secret
pub struct TokenCipher {
    key: [u8; 32],
}

impl TokenCipher {
    /// Create a cipher from raw key bytes - primarily for testing
    #[must_use]
    pub const fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Load the cipher key from the environment, or generate one in development.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured key is invalid, or if the key is
    /// absent in a production environment (fail fast rather than issue
    /// credentials nobody can decrypt after a restart).
    pub fn load_or_generate(environment: &Environment) -> Result<Self> {
        if let Ok(encoded_key) = env::var(env_config::TOKEN_CIPHER_KEY) {
            return Self::load_from_encoded(&encoded_key);
        }

        if environment.is_production() {
            return Err(anyhow!(
                "{} must be set in production",
                env_config::TOKEN_CIPHER_KEY
            ));
        }

        Ok(Self::generate_for_development())
    }

    fn load_from_encoded(encoded_key: &str) -> Result<Self> {
        info!("Loading token cipher key from environment variable");
        let mut key_bytes = general_purpose::STANDARD
            .decode(encoded_key)
            .map_err(|e| anyhow!("Invalid base64 in {}: {e}", env_config::TOKEN_CIPHER_KEY))?;

        if key_bytes.len() != 32 {
            key_bytes.zeroize();
            return Err(anyhow!(
                "Token cipher key must be exactly 32 bytes, got {} bytes",
                key_bytes.len()
            ));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        key_bytes.zeroize();
        Ok(Self { key })
    }

    fn generate_for_development() -> Self {
        warn!(
            "{} not found in environment",
            env_config::TOKEN_CIPHER_KEY
        );
        warn!("Generating temporary token cipher key for development - NOT SECURE FOR PRODUCTION");

        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);

        let encoded = general_purpose::STANDARD.encode(key);
        warn!(
            "Generated key (save for production): {}={encoded}",
            env_config::TOKEN_CIPHER_KEY
        );
        Self { key }
    }

    /// Encrypt a plaintext string; round-trips exactly through [`Self::decrypt`].
    ///
    /// # Errors
    ///
    /// Returns an error if AES-GCM encryption fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = GenericArray::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {e}"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(sealed))
    }

    /// Decrypt a string produced by [`Self::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns an error on malformed base64, truncated payloads, or when the
    /// authentication tag does not verify (wrong key or tampered data).
    pub fn decrypt(&self, sealed: &str) -> Result<String> {
        let data = general_purpose::STANDARD
            .decode(sealed)
            .map_err(|e| anyhow!("Invalid base64 ciphertext: {e}"))?;

        if data.len() < NONCE_LEN {
            return Err(anyhow!("Ciphertext shorter than nonce"));
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(GenericArray::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| anyhow!("Decryption failed: {e}"))?;

        String::from_utf8(plaintext).map_err(|e| anyhow!("Decrypted data is not UTF-8: {e}"))
    }

    /// Serialize-then-encrypt convenience for structured payloads.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or encryption fails.
    pub fn encrypt_object<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = serde_json::to_string(value)?;
        self.encrypt(&json)
    }

    /// Decrypt-then-deserialize counterpart of [`Self::encrypt_object`].
    ///
    /// # Errors
    ///
    /// Returns an error if decryption or deserialization fails.
    pub fn decrypt_object<T: DeserializeOwned>(&self, sealed: &str) -> Result<T> {
        let json = self.decrypt(sealed)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// One-way SHA-256 digest, hex-encoded, for lookup-without-storage cases
    #[must_use]
    pub fn hash(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Drop for TokenCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> TokenCipher {
        TokenCipher::from_bytes([7u8; 32])
    }

    #[test]
    fn test_round_trip() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt("hello world").unwrap();
        assert_ne!(sealed, "hello world");
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "hello world");
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = test_cipher().encrypt("secret").unwrap();
        let other = TokenCipher::from_bytes([8u8; 32]);
        assert!(other.decrypt(&sealed).is_err());
    }

    #[test]
    fn test_nonce_uniqueness() {
        let cipher = test_cipher();
        let a = cipher.encrypt("same input").unwrap();
        let b = cipher.encrypt("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(TokenCipher::hash("abc"), TokenCipher::hash("abc"));
        assert_ne!(TokenCipher::hash("abc"), TokenCipher::hash("abd"));
        assert_eq!(TokenCipher::hash("abc").len(), 64);
    }
}
