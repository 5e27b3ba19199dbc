//! Cryptographic core for the MedSafe medical records service. Sensitive
//! clinical fields are stored encrypted at rest, credentials are hashed with a
//! tunable work factor, and every record carries an integrity digest; this
//! crate is deliberately small and transparent so that handling of key
//! material stays auditable in-repo.

pub mod config;
pub mod crypto;
pub mod service;
