//! Cryptographic primitives for the LogWayss vault.
//!
//! This module provides:
//! - Password-based key derivation using scrypt
//! - Authenticated encryption using AES-256-GCM with detached IV and tag
//! - Secure key management with automatic zeroization
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - A fresh random IV is generated for every encryption; callers cannot supply one
//! - Failed decryptions never hand back partial plaintext

pub mod aead;
pub mod kdf;
pub mod keys;

pub use aead::{decrypt, encrypt, Sealed, IV_SIZE, TAG_SIZE};
pub use kdf::{
    derive_key, derive_key_into, ScryptParams, MAX_MEMORY_BYTES, MAX_N, MAX_R_TIMES_P,
};
pub use keys::{Salt, SessionKey, KEY_LENGTH, SALT_LENGTH};
