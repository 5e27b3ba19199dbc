//! Environment-driven configuration for the cryptographic core. The only
//! deployment surface is the base64 master key, the password-hashing work
//! factor, and an explicit opt-in for the development-only ephemeral key.

use thiserror::Error;

use crate::crypto::passwords::DEFAULT_WORK_FACTOR;

/// Base64-encoded 32-byte AES master key.
pub const MASTER_KEY_ENV: &str = "MEDSAFE_MASTER_KEY";
/// bcrypt work factor override; defaults to 12 when unset.
pub const WORK_FACTOR_ENV: &str = "MEDSAFE_WORK_FACTOR";
/// Set to `1` or `true` to allow startup without a configured master key.
pub const EPHEMERAL_KEY_ENV: &str = "MEDSAFE_ALLOW_EPHEMERAL_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MEDSAFE_WORK_FACTOR is not a valid work factor: {0}")]
    InvalidWorkFactor(String),
}

#[derive(Debug, Clone)]
pub struct CryptoConfig {
    pub master_key_b64: Option<String>,
    pub work_factor: u32,
    pub allow_ephemeral_key: bool,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            master_key_b64: None,
            work_factor: DEFAULT_WORK_FACTOR,
            allow_ephemeral_key: false,
        }
    }
}

impl CryptoConfig {
    /// Reads the configuration from the process environment. The master key
    /// is optional here; [`crate::service::CryptoService::from_config`]
    /// decides whether its absence is fatal.
    pub fn from_env() -> Result<Self, ConfigError> {
        let master_key_b64 = std::env::var(MASTER_KEY_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());
        let work_factor = match std::env::var(WORK_FACTOR_ENV) {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidWorkFactor(raw))?,
            Err(_) => DEFAULT_WORK_FACTOR,
        };
        let allow_ephemeral_key = matches!(
            std::env::var(EPHEMERAL_KEY_ENV).as_deref(),
            Ok("1") | Ok("true")
        );
        Ok(Self {
            master_key_b64,
            work_factor,
            allow_ephemeral_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CryptoConfig, EPHEMERAL_KEY_ENV, MASTER_KEY_ENV, WORK_FACTOR_ENV};

    #[test]
    fn defaults_to_work_factor_twelve() {
        let config = CryptoConfig::default();
        assert_eq!(config.work_factor, 12);
        assert!(config.master_key_b64.is_none());
        assert!(!config.allow_ephemeral_key);
    }

    // Environment access is process-global, so every env-var assertion lives
    // in this single sequential test.
    #[test]
    fn reads_environment_variables() {
        std::env::set_var(MASTER_KEY_ENV, "bW9jay1rZXk");
        std::env::set_var(WORK_FACTOR_ENV, "10");
        std::env::set_var(EPHEMERAL_KEY_ENV, "true");
        let config = CryptoConfig::from_env().expect("config should load");
        assert_eq!(config.master_key_b64.as_deref(), Some("bW9jay1rZXk"));
        assert_eq!(config.work_factor, 10);
        assert!(config.allow_ephemeral_key);

        std::env::set_var(WORK_FACTOR_ENV, "not-a-number");
        assert!(CryptoConfig::from_env().is_err());

        std::env::remove_var(MASTER_KEY_ENV);
        std::env::remove_var(WORK_FACTOR_ENV);
        std::env::remove_var(EPHEMERAL_KEY_ENV);
        let config = CryptoConfig::from_env().expect("config should load");
        assert!(config.master_key_b64.is_none());
        assert_eq!(config.work_factor, 12);
        assert!(!config.allow_ephemeral_key);
    }
}
