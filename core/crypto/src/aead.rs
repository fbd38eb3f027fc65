//! Authenticated encryption using AES-256-GCM.
//!
//! IV, tag and ciphertext are kept apart so they can be stored in separate
//! columns. Associated data binds each ciphertext to the record it belongs to.

use aes_gcm::{
    aead::{generic_array::GenericArray, AeadCore, AeadInPlace, KeyInit, OsRng},
    Aes256Gcm,
};
use zeroize::Zeroize;

use crate::keys::KEY_LENGTH;
use logwayss_common::{Error, Result};

/// IV size for AES-GCM (96 bits).
pub const IV_SIZE: usize = 12;

/// Authentication tag size (128 bits).
pub const TAG_SIZE: usize = 16;

/// Output of [`encrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub iv: [u8; IV_SIZE],
    pub tag: [u8; TAG_SIZE],
    pub ciphertext: Vec<u8>,
}

fn cipher(key: &[u8]) -> Result<Aes256Gcm> {
    if key.len() != KEY_LENGTH {
        return Err(Error::Crypto(format!(
            "Invalid key length: expected {}, got {}",
            KEY_LENGTH,
            key.len()
        )));
    }
    Ok(Aes256Gcm::new(GenericArray::from_slice(key)))
}

/// Encrypt plaintext bound to `associated_data`.
///
/// # Preconditions
/// - `key` must be exactly KEY_LENGTH bytes
///
/// # Postconditions
/// - The IV is freshly drawn from the OS random source
/// - `ciphertext` has the same length as `plaintext`
///
/// # Errors
/// - Returns error if key length is incorrect
/// - Returns error if encryption fails
pub fn encrypt(associated_data: &[u8], key: &[u8], plaintext: &[u8]) -> Result<Sealed> {
    let cipher = cipher(key)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut buffer = plaintext.to_vec();
    let tag = match cipher.encrypt_in_place_detached(&nonce, associated_data, &mut buffer) {
        Ok(tag) => tag,
        Err(e) => {
            buffer.zeroize();
            return Err(Error::Crypto(format!("Encryption failed: {}", e)));
        }
    };

    let mut sealed = Sealed {
        iv: [0u8; IV_SIZE],
        tag: [0u8; TAG_SIZE],
        ciphertext: buffer,
    };
    sealed.iv.copy_from_slice(&nonce);
    sealed.tag.copy_from_slice(&tag);
    Ok(sealed)
}

/// Decrypt and authenticate a ciphertext.
///
/// # Errors
/// - `Crypto` if the key, IV or tag has the wrong length
/// - `Authentication` if the tag does not verify under this key and
///   associated data
///
/// # Security
/// - On failure the working buffer is zeroized; no plaintext is returned
pub fn decrypt(
    associated_data: &[u8],
    key: &[u8],
    iv: &[u8],
    tag: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = cipher(key)?;

    if iv.len() != IV_SIZE {
        return Err(Error::Crypto(format!(
            "Invalid IV length: expected {}, got {}",
            IV_SIZE,
            iv.len()
        )));
    }
    if tag.len() != TAG_SIZE {
        return Err(Error::Crypto(format!(
            "Invalid tag length: expected {}, got {}",
            TAG_SIZE,
            tag.len()
        )));
    }

    let mut buffer = ciphertext.to_vec();
    match cipher.decrypt_in_place_detached(
        GenericArray::from_slice(iv),
        associated_data,
        &mut buffer,
        GenericArray::from_slice(tag),
    ) {
        Ok(()) => Ok(buffer),
        Err(_) => {
            buffer.zeroize();
            Err(Error::Authentication)
        }
    }
}
