// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Field-level encryption for secrets at rest.
//!
//! ## Scheme
//!
//! - AES-256-GCM (`ring`), fresh random 96-bit nonce per seal
//! - Stored layout: `nonce (12 bytes) | ciphertext | tag (16 bytes)`
//! - The AES key is expanded from the process master secret with
//!   HKDF-SHA256; the secret itself is never stored
//! - Associated data binds each ciphertext to the row it belongs to, so a
//!   ciphertext moved to another row, kind or namespace fails to open
//!
//! The key never appears in `Debug` output, logs or errors.

use std::fmt;

use base64ct::{Base64, Encoding};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::hkdf::{Salt, HKDF_SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// HKDF salt for the field encryption key.
const KEY_SALT: &[u8] = b"keeper-field-key-v1";

/// HKDF info label for the field encryption key.
const KEY_INFO: &[u8] = b"aes-256-gcm";

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("master secret must not be empty")]
    EmptySecret,

    #[error("key derivation failed")]
    KeyDerivation,

    #[error("encryption failed")]
    Seal,

    #[error("ciphertext is malformed")]
    Malformed,

    /// Tag mismatch: the ciphertext was modified, moved, or sealed with a
    /// different key.
    #[error("ciphertext failed authentication")]
    Authentication,
}

/// Symmetric cipher for sealing individual record fields.
pub struct FieldCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCipher")
            .field("algorithm", &"AES-256-GCM")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl FieldCipher {
    /// Derive the field key from the master secret supplied at startup.
    pub fn from_secret(secret: &[u8]) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::EmptySecret);
        }

        let prk = Salt::new(HKDF_SHA256, KEY_SALT).extract(secret);
        let okm = prk
            .expand(&[KEY_INFO], &AES_256_GCM)
            .map_err(|_| CryptoError::KeyDerivation)?;
        let key = UnboundKey::from(okm);

        Ok(Self {
            key: LessSafeKey::new(key),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt `plaintext`, authenticating `aad` alongside it.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Sealed, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptoError::Seal)?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(aad),
                &mut in_out,
            )
            .map_err(|_| CryptoError::Seal)?;

        let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&in_out);
        Ok(Sealed(out))
    }

    /// Decrypt a sealed value. `aad` must match what was passed to `seal`.
    pub fn open(&self, sealed: &Sealed, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let bytes = sealed.as_bytes();
        if bytes.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CryptoError::Malformed);
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CryptoError::Malformed)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| CryptoError::Authentication)?;
        Ok(plaintext.to_vec())
    }

    /// Convenience wrapper for UTF-8 fields.
    pub fn open_string(&self, sealed: &Sealed, aad: &[u8]) -> Result<String, CryptoError> {
        let plaintext = self.open(sealed, aad)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Malformed)
    }
}

/// Ciphertext as stored in a row. Serializes as standard base64.
#[derive(Clone, PartialEq, Eq)]
pub struct Sealed(Vec<u8>);

impl Sealed {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Sealed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sealed({} bytes)", self.0.len())
    }
}

impl Serialize for Sealed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(&self.0))
    }
}

impl<'de> Deserialize<'de> for Sealed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded)
            .map(Sealed)
            .map_err(serde::de::Error::custom)
    }
}
