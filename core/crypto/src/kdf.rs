//! Key derivation using scrypt.
//!
//! scrypt is a memory-hard password hashing function; its cost factors are
//! stored next to the salt in the profile file so any device can re-derive
//! the same key.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::keys::{Salt, SessionKey, KEY_LENGTH};
use logwayss_common::{Error, Result};

/// Largest accepted CPU/memory cost N.
pub const MAX_N: u64 = 1 << 20;

/// Largest accepted product of block size and parallelization.
pub const MAX_R_TIMES_P: u64 = 1 << 10;

/// Largest accepted scrypt working memory (1 GiB).
pub const MAX_MEMORY_BYTES: u64 = 1 << 30;

/// Cost parameters for scrypt key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScryptParams {
    /// CPU/memory cost. Must be a power of two greater than one.
    #[serde(rename = "N")]
    pub n: u64,
    /// Block size.
    #[serde(alias = "R")]
    pub r: u32,
    /// Parallelization.
    #[serde(alias = "P")]
    pub p: u32,
}

impl ScryptParams {
    /// Parameters for desktop-class machines (N = 2^15, about 32 MiB).
    pub fn desktop() -> Self {
        Self {
            n: 1 << 15,
            r: 8,
            p: 1,
        }
    }

    /// Lighter parameters for phones (N = 2^14, about 16 MiB).
    pub fn mobile() -> Self {
        Self {
            n: 1 << 14,
            r: 8,
            p: 1,
        }
    }

    /// Check shape and cost bounds.
    ///
    /// Parameters are read from disk, so bounds are enforced before any
    /// memory is reserved for derivation.
    ///
    /// # Errors
    /// - `Crypto` if N is not a power of two greater than 1, r or p is zero,
    ///   N exceeds [`MAX_N`], r·p exceeds [`MAX_R_TIMES_P`], or the working
    ///   memory 128·r·(N + p) exceeds [`MAX_MEMORY_BYTES`]
    pub fn validate(&self) -> Result<()> {
        if self.n < 2 || !self.n.is_power_of_two() {
            return Err(Error::Crypto(format!(
                "Invalid KDF parameters: N must be a power of two greater than 1, got {}",
                self.n
            )));
        }
        if self.r == 0 || self.p == 0 {
            return Err(Error::Crypto(
                "Invalid KDF parameters: r and p must be positive".to_string(),
            ));
        }
        if self.n > MAX_N {
            return Err(Error::Crypto(format!(
                "Invalid KDF parameters: N = {} exceeds {}",
                self.n, MAX_N
            )));
        }
        if u64::from(self.r) * u64::from(self.p) > MAX_R_TIMES_P {
            return Err(Error::Crypto(format!(
                "Invalid KDF parameters: r * p exceeds {}",
                MAX_R_TIMES_P
            )));
        }
        let memory = 128 * u128::from(self.r) * (u128::from(self.n) + u128::from(self.p));
        if memory > u128::from(MAX_MEMORY_BYTES) {
            return Err(Error::Crypto(format!(
                "Invalid KDF parameters: needs {} bytes, limit is {}",
                memory, MAX_MEMORY_BYTES
            )));
        }
        Ok(())
    }

    /// Check the parameters and convert them for the scrypt crate.
    fn to_scrypt(self, output_len: usize) -> Result<scrypt::Params> {
        self.validate()?;
        let log_n = self.n.trailing_zeros() as u8;

        scrypt::Params::new(log_n, self.r, self.p, output_len)
            .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))
    }
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self::desktop()
    }
}

/// Derive `output.len()` bytes from a password and salt.
///
/// # Preconditions
/// - `password` must not be empty
/// - `output` must not be empty
///
/// # Errors
/// - `Crypto` if password is empty
/// - `Crypto` if the cost parameters or output length are invalid
pub fn derive_key_into(
    password: &[u8],
    salt: &Salt,
    params: &ScryptParams,
    output: &mut [u8],
) -> Result<()> {
    if password.is_empty() {
        return Err(Error::Crypto("Password cannot be empty".to_string()));
    }

    let scrypt_params = params.to_scrypt(output.len())?;

    scrypt::scrypt(password, salt.as_bytes(), &scrypt_params, output)
        .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))
}

/// Derive the 32-byte session key from a password and salt.
///
/// # Postconditions
/// - The derived key is deterministic given the same inputs
///
/// # Security
/// - Password is not stored or logged
/// - The stack buffer used during derivation is zeroized
pub fn derive_key(password: &[u8], salt: &Salt, params: &ScryptParams) -> Result<SessionKey> {
    let mut key_bytes = [0u8; KEY_LENGTH];
    let result = derive_key_into(password, salt, params, &mut key_bytes);
    let key = result.map(|()| SessionKey::from_bytes(key_bytes));
    key_bytes.zeroize();
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> ScryptParams {
        ScryptParams { n: 1 << 10, r: 8, p: 1 }
    }

    #[test]
    fn test_derive_key_deterministic() {
        let password = b"test-password-123";
        let salt = Salt::from_bytes([42u8; 32]);

        let key1 = derive_key(password, &salt, &fast_params()).unwrap();
        let key2 = derive_key(password, &salt, &fast_params()).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_salt() {
        let password = b"test-password-123";
        let salt1 = Salt::from_bytes([1u8; 32]);
        let salt2 = Salt::from_bytes([2u8; 32]);

        let key1 = derive_key(password, &salt1, &fast_params()).unwrap();
        let key2 = derive_key(password, &salt2, &fast_params()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_password() {
        let salt = Salt::from_bytes([42u8; 32]);

        let key1 = derive_key(b"password1", &salt, &fast_params()).unwrap();
        let key2 = derive_key(b"password2", &salt, &fast_params()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_empty_password_fails() {
        let salt = Salt::generate().unwrap();
        assert!(matches!(
            derive_key(b"", &salt, &fast_params()),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_known_answer_vector() {
        // RFC 7914 section 12, second vector.
        let salt = Salt::from_bytes(b"NaCl".to_vec());
        let params = ScryptParams { n: 1024, r: 8, p: 16 };
        let mut out = [0u8; 64];
        derive_key_into(b"password", &salt, &params, &mut out).unwrap();
        assert_eq!(
            &out[..16],
            &[
                0xfd, 0xba, 0xbe, 0x1c, 0x9d, 0x34, 0x72, 0x00, 0x78, 0x56, 0xe7, 0x19, 0x0d,
                0x01, 0xe9, 0xfe
            ]
        );
    }

    #[test]
    fn test_invalid_cost_parameters() {
        let salt = Salt::from_bytes([0u8; 32]);
        for params in [
            ScryptParams { n: 1000, r: 8, p: 1 },
            ScryptParams { n: 1, r: 8, p: 1 },
            ScryptParams { n: 0, r: 8, p: 1 },
            ScryptParams { n: 1024, r: 0, p: 1 },
            ScryptParams { n: 1024, r: 8, p: 0 },
            ScryptParams { n: 1 << 40, r: 8, p: 1 },
            ScryptParams { n: 1 << 21, r: 1, p: 1 },
            ScryptParams { n: 1 << 20, r: 16, p: 1 },
            ScryptParams { n: 1024, r: 8, p: 1 << 20 },
            ScryptParams { n: 1024, r: u32::MAX, p: u32::MAX },
        ] {
            assert!(
                matches!(derive_key(b"pw", &salt, &params), Err(Error::Crypto(_))),
                "accepted {:?}",
                params
            );
        }
    }

    #[test]
    fn test_presets_within_limits() {
        assert!(ScryptParams::desktop().validate().is_ok());
        assert!(ScryptParams::mobile().validate().is_ok());
        assert!(ScryptParams { n: MAX_N, r: 4, p: 1 }.validate().is_ok());
    }

    #[test]
    fn test_params_json_field_names() {
        let json = serde_json::to_value(ScryptParams::desktop()).unwrap();
        assert_eq!(json, serde_json::json!({"N": 32768, "r": 8, "p": 1}));

        let upper: ScryptParams = serde_json::from_str(r#"{"N":16384,"R":8,"P":1}"#).unwrap();
        assert_eq!(upper, ScryptParams::mobile());
    }
}
