//! Encryption of clinical record fields with AES-256-CBC.
//! Fields are stored as raw ciphertext plus a 16-byte IV so that symptoms,
//! diagnoses, and treatment notes never reach the database in plaintext.

use base64::{engine::general_purpose::STANDARD, Engine};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// AES block and IV length in bytes.
pub const IV_LEN: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

#[derive(Debug, Error)]
pub enum FieldCipherError {
    #[error("invalid key length; expected 32 bytes")]
    InvalidKeyLength,
    #[error("invalid iv length; expected 16 bytes")]
    InvalidIvLength,
    #[error("base64 decoding failed: {0}")]
    Base64DecodeFailed(String),
    #[error("key source unreadable: {0}")]
    KeySourceUnreadable(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
}

/// A single encrypted field together with the IV it was encrypted under.
/// Serializes as a base64 envelope so it can travel through JSON columns and
/// demo endpoints without further encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField {
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_iv")]
    pub iv: [u8; IV_LEN],
}

/// Holds the master symmetric key used for every record field in the system.
/// The key is read-only after construction, which makes the cipher safe to
/// share across request-handling tasks without locking.
pub struct RecordCipher {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for RecordCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCipher")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl RecordCipher {
    /// Builds a cipher from raw key bytes. The key must be exactly 32 bytes.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, FieldCipherError> {
        if key_bytes.len() != KEY_LEN {
            return Err(FieldCipherError::InvalidKeyLength);
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(key_bytes);
        Ok(Self { key })
    }

    /// Builds a cipher from a base64-encoded 32-byte key, the form in which
    /// the master key is distributed to deployments.
    pub fn from_base64(encoded: &str) -> Result<Self, FieldCipherError> {
        let mut decoded = STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(|e| FieldCipherError::Base64DecodeFailed(format!("{e}")))?;
        let cipher = Self::from_key_bytes(&decoded);
        decoded.zeroize();
        cipher
    }

    /// Reads a base64-encoded key from an environment variable.
    pub fn from_env_var(var: &str) -> Result<Self, FieldCipherError> {
        let encoded = std::env::var(var)
            .map_err(|e| FieldCipherError::KeySourceUnreadable(format!("{e}")))?;
        Self::from_base64(&encoded)
    }

    /// Generates a fresh random IV. Callers that encrypt several fields of
    /// one record generate the IV once and pass it to each `encrypt` call so
    /// the whole record can later be verified and re-encrypted together.
    pub fn generate_iv() -> [u8; IV_LEN] {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        iv
    }

    /// Encrypts a plaintext field with AES-256-CBC and PKCS#7 padding.
    /// A fresh random IV is generated unless the caller supplies one to
    /// co-encrypt multiple fields of the same record.
    pub fn encrypt(&self, plaintext: &str, iv: Option<[u8; IV_LEN]>) -> EncryptedField {
        let iv = iv.unwrap_or_else(Self::generate_iv);
        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        EncryptedField { ciphertext, iv }
    }

    /// Decrypts a field encrypted under this key and the given IV. The IV
    /// must be the exact one used at encryption time. Error messages never
    /// include plaintext or key material.
    pub fn decrypt(&self, ciphertext: &[u8], iv: &[u8]) -> Result<String, FieldCipherError> {
        let iv: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|_| FieldCipherError::InvalidIvLength)?;
        if ciphertext.is_empty() || ciphertext.len() % IV_LEN != 0 {
            return Err(FieldCipherError::DecryptionFailed(
                "ciphertext length is not a non-zero multiple of the cipher block size".to_string(),
            ));
        }
        let unpadded = Aes256CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| {
                FieldCipherError::DecryptionFailed(
                    "invalid padding; wrong key, wrong iv, or corrupted ciphertext".to_string(),
                )
            })?;
        String::from_utf8(unpadded).map_err(|_| {
            FieldCipherError::DecryptionFailed(
                "decrypted bytes are not valid utf-8".to_string(),
            )
        })
    }

    /// Decrypts an optional field, distinguishing a field that was never
    /// stored (`Ok(None)`) from one that fails to decrypt (`Err`).
    pub fn decrypt_opt(
        &self,
        ciphertext: Option<&[u8]>,
        iv: &[u8],
    ) -> Result<Option<String>, FieldCipherError> {
        match ciphertext {
            Some(bytes) => self.decrypt(bytes, iv).map(Some),
            None => Ok(None),
        }
    }
}

impl Drop for RecordCipher {
    fn drop(&mut self) {
        // Zero the key material on drop to reduce its lifetime in memory.
        self.key.zeroize();
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

mod base64_iv {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::IV_LEN;

    pub fn serialize<S: Serializer>(iv: &[u8; IV_LEN], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(iv))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; IV_LEN], D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let decoded = STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)?;
        decoded
            .try_into()
            .map_err(|_| serde::de::Error::custom("iv must be 16 bytes"))
    }
}
