//! Process-wide cryptographic service. One `CryptoService` is constructed at
//! startup holding the master key and is passed to every collaborator that
//! needs cryptographic operations; the `OnceLock`-backed global exists for
//! call sites that cannot thread a reference. There is no lazy
//! auto-initialization: a deployment without a configured key fails loudly
//! unless the ephemeral development key is explicitly allowed.

use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::config::{ConfigError, CryptoConfig};
use crate::crypto::fields::{EncryptedField, FieldCipherError, RecordCipher, IV_LEN, KEY_LEN};
use crate::crypto::integrity::{self, IntegrityViolation};
use crate::crypto::passwords::{self, PasswordHashError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no master key configured; set MEDSAFE_MASTER_KEY or explicitly allow the ephemeral development key")]
    MissingMasterKey,
    #[error("crypto service already initialized")]
    AlreadyInitialized,
    #[error(transparent)]
    Cipher(#[from] FieldCipherError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Fronts the key-dependent operations behind one capability object: field
/// encryption under the master key, password hashing at the configured work
/// factor, and record integrity digests. RSA and the demonstration ciphers
/// are stateless and live as free functions in their modules.
///
/// Every operation takes `&self` over an immutable key, so a single instance
/// is safely shared across request-handling threads without locking.
pub struct CryptoService {
    cipher: RecordCipher,
    work_factor: u32,
}

impl CryptoService {
    /// Builds a service from a base64-encoded 32-byte master key.
    pub fn new(master_key_b64: &str, work_factor: u32) -> Result<Self, ServiceError> {
        let cipher = RecordCipher::from_base64(master_key_b64)?;
        Ok(Self {
            cipher,
            work_factor,
        })
    }

    /// Builds a service from raw key bytes. Intended for tests and for
    /// collaborators that inject key material directly.
    pub fn from_key_bytes(key_bytes: &[u8], work_factor: u32) -> Result<Self, ServiceError> {
        let cipher = RecordCipher::from_key_bytes(key_bytes)?;
        Ok(Self {
            cipher,
            work_factor,
        })
    }

    /// Builds a service from loaded configuration. Without a configured
    /// master key this fails, unless the configuration explicitly allows an
    /// ephemeral key, in which case a random key is generated and a warning
    /// logged: data encrypted under it is unrecoverable after restart.
    pub fn from_config(config: &CryptoConfig) -> Result<Self, ServiceError> {
        match &config.master_key_b64 {
            Some(encoded) => {
                let service = Self::new(encoded, config.work_factor)?;
                info!(
                    work_factor = config.work_factor,
                    "crypto service initialized from configured master key"
                );
                Ok(service)
            }
            None if config.allow_ephemeral_key => {
                warn!(
                    "no master key configured; using an EPHEMERAL key, encrypted data will be \
                     unrecoverable after restart"
                );
                let mut key = [0u8; KEY_LEN];
                OsRng.fill_bytes(&mut key);
                let service = Self::from_key_bytes(&key, config.work_factor);
                key.zeroize();
                service
            }
            None => Err(ServiceError::MissingMasterKey),
        }
    }

    /// Encrypts one record field; see [`RecordCipher::encrypt`] for the IV
    /// sharing contract.
    pub fn encrypt_field(&self, plaintext: &str, iv: Option<[u8; IV_LEN]>) -> EncryptedField {
        self.cipher.encrypt(plaintext, iv)
    }

    pub fn decrypt_field(&self, ciphertext: &[u8], iv: &[u8]) -> Result<String, FieldCipherError> {
        self.cipher.decrypt(ciphertext, iv)
    }

    pub fn decrypt_field_opt(
        &self,
        ciphertext: Option<&[u8]>,
        iv: &[u8],
    ) -> Result<Option<String>, FieldCipherError> {
        self.cipher.decrypt_opt(ciphertext, iv)
    }

    /// Fresh random IV for callers co-encrypting the fields of one record.
    pub fn generate_iv(&self) -> [u8; IV_LEN] {
        RecordCipher::generate_iv()
    }

    /// Hashes a credential at the service's configured work factor.
    pub fn hash_password(&self, plaintext: &str) -> Result<String, PasswordHashError> {
        passwords::hash_password(plaintext, self.work_factor)
    }

    pub fn verify_password(&self, plaintext: &str, stored_hash: &str) -> bool {
        passwords::verify_password(plaintext, stored_hash)
    }

    /// Digests a record's fields in their canonical order.
    pub fn digest_record(&self, fields: &[&str]) -> String {
        integrity::digest_fields(fields)
    }

    /// Recomputes a record digest and reports a mismatch for the caller to
    /// surface; a violation is deliberately not fatal here.
    pub fn verify_record(
        &self,
        fields: &[&str],
        stored_digest: &str,
    ) -> Result<(), IntegrityViolation> {
        integrity::verify_fields(fields, stored_digest)
    }
}

static SERVICE: OnceLock<CryptoService> = OnceLock::new();

/// Publishes the process-wide service instance. Must be called exactly once
/// at startup, before any collaborator asks for [`global`]; a second call
/// fails with [`ServiceError::AlreadyInitialized`].
pub fn init(config: &CryptoConfig) -> Result<&'static CryptoService, ServiceError> {
    let service = CryptoService::from_config(config)?;
    if SERVICE.set(service).is_err() {
        return Err(ServiceError::AlreadyInitialized);
    }
    SERVICE.get().ok_or(ServiceError::AlreadyInitialized)
}

/// Returns the process-wide service, or `None` when [`init`] has not run.
pub fn global() -> Option<&'static CryptoService> {
    SERVICE.get()
}

/// Generates a fresh base64-encoded 32-byte master key for a deployment.
pub fn generate_master_key() -> String {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    let encoded = STANDARD.encode(key);
    key.zeroize();
    encoded
}

#[cfg(test)]
mod tests {
    use super::{generate_master_key, global, init, CryptoService, ServiceError};
    use crate::config::CryptoConfig;
    use base64::{engine::general_purpose::STANDARD, Engine};

    fn ephemeral_config() -> CryptoConfig {
        CryptoConfig {
            master_key_b64: None,
            work_factor: 4,
            allow_ephemeral_key: true,
        }
    }

    #[test]
    fn generated_master_keys_decode_to_32_bytes() {
        let key = generate_master_key();
        let decoded = STANDARD.decode(key.as_bytes()).expect("valid base64");
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn round_trips_fields_under_a_configured_key() {
        let config = CryptoConfig {
            master_key_b64: Some(generate_master_key()),
            work_factor: 4,
            allow_ephemeral_key: false,
        };
        let service = CryptoService::from_config(&config).expect("service should build");

        let iv = service.generate_iv();
        let symptoms = service.encrypt_field("shortness of breath", Some(iv));
        let diagnosis = service.encrypt_field("asthma", Some(iv));
        assert_eq!(
            service.decrypt_field(&symptoms.ciphertext, &iv).unwrap(),
            "shortness of breath"
        );
        assert_eq!(
            service.decrypt_field(&diagnosis.ciphertext, &iv).unwrap(),
            "asthma"
        );
    }

    #[test]
    fn missing_key_without_dev_mode_is_fatal() {
        let config = CryptoConfig {
            master_key_b64: None,
            work_factor: 12,
            allow_ephemeral_key: false,
        };
        assert!(matches!(
            CryptoService::from_config(&config),
            Err(ServiceError::MissingMasterKey)
        ));
    }

    #[test]
    fn ephemeral_key_serves_development() {
        let service = CryptoService::from_config(&ephemeral_config()).expect("dev service");
        let field = service.encrypt_field("scratch data", None);
        assert_eq!(
            service.decrypt_field(&field.ciphertext, &field.iv).unwrap(),
            "scratch data"
        );
    }

    #[test]
    fn hashes_passwords_at_configured_work_factor() {
        let service = CryptoService::from_config(&ephemeral_config()).expect("dev service");
        let hash = service.hash_password("reception-desk-pw").unwrap();
        assert!(hash.contains("$04$"));
        assert!(service.verify_password("reception-desk-pw", &hash));
        assert!(!service.verify_password("wrong", &hash));
    }

    #[test]
    fn digests_and_verifies_records() {
        let service = CryptoService::from_config(&ephemeral_config()).expect("dev service");
        let fields = ["fever", "flu", "rest", "", "2024-01-01"];
        let digest = service.digest_record(&fields);
        assert_eq!(digest.len(), 64);
        assert!(service.verify_record(&fields, &digest).is_ok());
        assert!(service
            .verify_record(&["fever", "cold", "rest", "", "2024-01-01"], &digest)
            .is_err());
    }

    #[test]
    fn global_initializes_exactly_once() {
        assert!(global().is_none());
        let service = init(&ephemeral_config()).expect("first init should succeed");
        let field = service.encrypt_field("published", None);
        assert!(global().is_some());
        assert_eq!(
            global()
                .unwrap()
                .decrypt_field(&field.ciphertext, &field.iv)
                .unwrap(),
            "published"
        );
        assert!(matches!(
            init(&ephemeral_config()),
            Err(ServiceError::AlreadyInitialized)
        ));
    }
}
