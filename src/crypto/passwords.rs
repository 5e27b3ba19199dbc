//! Password hashing helpers built around bcrypt.
//! The salt is generated per hash and embedded in the output string, so
//! callers store a single opaque column and never manage salt separately.

use thiserror::Error;

/// Default work factor: 2^12 base iterations. Brute-force cost doubles with
/// every increment, so deployments on faster hardware should raise it.
pub const DEFAULT_WORK_FACTOR: u32 = 12;

const MIN_WORK_FACTOR: u32 = 4;
const MAX_WORK_FACTOR: u32 = 31;

#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("work factor {0} outside the supported 4..=31 range")]
    InvalidWorkFactor(u32),
    #[error("password hashing failed: {0}")]
    HashingFailed(String),
}

/// Hashes a password with bcrypt at the given work factor and returns the
/// self-contained hash string. Note that bcrypt only considers the first 72
/// bytes of the password.
pub fn hash_password(plaintext: &str, work_factor: u32) -> Result<String, PasswordHashError> {
    if !(MIN_WORK_FACTOR..=MAX_WORK_FACTOR).contains(&work_factor) {
        return Err(PasswordHashError::InvalidWorkFactor(work_factor));
    }
    bcrypt::hash(plaintext, work_factor)
        .map_err(|e| PasswordHashError::HashingFailed(format!("{e}")))
}

/// Verifies a plaintext password against a stored bcrypt hash.
/// Returns `false` for a wrong password and for malformed stored hashes;
/// this never panics or propagates an error.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    bcrypt::verify(plaintext, stored_hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password, PasswordHashError};

    #[test]
    fn hashes_and_verifies_passwords() {
        let hash = hash_password("medsafe-test-password", 4).expect("hashing should succeed");
        assert!(verify_password("medsafe-test-password", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn salted_hashes_differ_but_both_verify() {
        let first = hash_password("same-password", 4).unwrap();
        let second = hash_password("same-password", 4).unwrap();
        assert_ne!(first, second);
        assert!(verify_password("same-password", &first));
        assert!(verify_password("same-password", &second));
    }

    #[test]
    fn deployment_work_factors_verify() {
        for work_factor in [10, 12] {
            let hash = hash_password("clinical-staff-pw", work_factor).unwrap();
            assert!(verify_password("clinical-staff-pw", &hash));
        }
    }

    #[test]
    fn rejects_out_of_range_work_factors() {
        assert!(matches!(
            hash_password("pw", 3),
            Err(PasswordHashError::InvalidWorkFactor(3))
        ));
        assert!(matches!(
            hash_password("pw", 32),
            Err(PasswordHashError::InvalidWorkFactor(32))
        ));
    }

    #[test]
    fn garbage_stored_hash_is_rejected_not_fatal() {
        assert!(!verify_password("anything", "garbage"));
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "$2b$not-a-real-hash"));
    }
}
