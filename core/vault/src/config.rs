//! Profile file: the public KDF header plus a sealed password verifier.
//!
//! The file is plain JSON. Binary fields are lowercase hex. Nothing in it is
//! secret on its own; the verifier only opens under the key derived from the
//! right password.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::binding::profile_aad;
use logwayss_common::{format_timestamp, Error, Result, SCHEMA_VERSION};
use logwayss_crypto::{decrypt, derive_key, encrypt, Salt, ScryptParams, SessionKey};

/// Profile file name in the vault directory.
pub const PROFILE_FILENAME: &str = "profile.json";

/// Database file name in the vault directory.
pub const DB_FILENAME: &str = "db.sqlite3";

/// Marker sealed inside the verifier.
pub const PROFILE_MAGIC: &str = "LOGWAYSS_PROFILE";

/// On-disk profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFile {
    pub schema_version: u32,
    /// KDF cost parameters, so any device can re-derive the key.
    pub scrypt: ScryptParams,
    pub salt: Salt,
    #[serde(with = "hex::serde")]
    pub iv: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub tag: Vec<u8>,
    /// Sealed [`VerifierPayload`].
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
}

/// Plaintext of the sealed verifier.
#[derive(Debug, Serialize, Deserialize)]
struct VerifierPayload {
    magic: String,
    schema_version: u32,
    created_at: String,
}

impl ProfileFile {
    /// Derive a key from `password` and seal a fresh verifier with it.
    ///
    /// # Postconditions
    /// - Salt is randomly generated
    /// - [`ProfileFile::unseal`] with the same password yields the same key
    ///
    /// # Errors
    /// - Password empty
    /// - Invalid KDF parameters
    pub fn seal(password: &[u8], params: &ScryptParams) -> Result<Self> {
        let salt = Salt::generate()?;
        let key = derive_key(password, &salt, params)?;

        let payload = VerifierPayload {
            magic: PROFILE_MAGIC.to_string(),
            schema_version: SCHEMA_VERSION,
            created_at: format_timestamp(&Utc::now()),
        };
        let plaintext =
            serde_json::to_vec(&payload).map_err(|e| Error::Serialization(e.to_string()))?;
        let sealed = encrypt(
            profile_aad(SCHEMA_VERSION).as_bytes(),
            key.as_bytes(),
            &plaintext,
        )?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            scrypt: *params,
            salt,
            iv: sealed.iv.to_vec(),
            tag: sealed.tag.to_vec(),
            ciphertext: sealed.ciphertext,
        })
    }

    /// Re-derive the key from `password` and check it against the verifier.
    ///
    /// # Errors
    /// - `InvalidProfile` for any failure. A wrong password cannot be told
    ///   apart from a damaged header.
    pub fn unseal(&self, password: &[u8]) -> Result<SessionKey> {
        self.scrypt.validate().map_err(|_| Error::InvalidProfile)?;
        let key =
            derive_key(password, &self.salt, &self.scrypt).map_err(|_| Error::InvalidProfile)?;

        let plaintext = decrypt(
            profile_aad(self.schema_version).as_bytes(),
            key.as_bytes(),
            &self.iv,
            &self.tag,
            &self.ciphertext,
        )
        .map_err(|_| Error::InvalidProfile)?;

        let payload: VerifierPayload =
            serde_json::from_slice(&plaintext).map_err(|_| Error::InvalidProfile)?;
        if !bool::from(payload.magic.as_bytes().ct_eq(PROFILE_MAGIC.as_bytes())) {
            return Err(Error::InvalidProfile);
        }

        debug!(created_at = %payload.created_at, "Profile verifier opened");
        Ok(key)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Check whether `directory` already holds a profile file.
    pub fn exists(directory: &Path) -> bool {
        directory.join(PROFILE_FILENAME).exists()
    }

    /// Read the profile file from `directory`.
    ///
    /// # Errors
    /// - `Io` if the file cannot be read
    /// - `Serialization` if it is not a valid profile
    pub fn load(directory: &Path) -> Result<Self> {
        let json = fs::read_to_string(directory.join(PROFILE_FILENAME))?;
        Self::from_json(&json)
    }

    /// Write this profile into `directory`, creating the directory if needed.
    ///
    /// The directory is created owner-only and the file owner read/write
    /// on unix.
    ///
    /// # Errors
    /// - `ProfileExists` if a profile file is already there
    /// - `Io` on any filesystem failure
    pub fn store_new(&self, directory: &Path) -> Result<()> {
        create_private_dir(directory)?;

        let path = directory.join(PROFILE_FILENAME);
        let mut file = match private_file_options().open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::ProfileExists)
            }
            Err(e) => return Err(e.into()),
        };

        let json = self.to_json()?;
        if let Err(e) = file
            .write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
        {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(unix)]
fn create_private_dir(directory: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(directory)
}

#[cfg(not(unix))]
fn create_private_dir(directory: &Path) -> io::Result<()> {
    fs::create_dir_all(directory)
}

fn private_file_options() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> ScryptParams {
        ScryptParams { n: 1 << 10, r: 8, p: 1 }
    }

    #[test]
    fn test_seal_and_unseal() {
        let profile = ProfileFile::seal(b"correct horse", &fast_params()).unwrap();

        assert!(profile.unseal(b"correct horse").is_ok());
        assert!(matches!(
            profile.unseal(b"battery staple"),
            Err(Error::InvalidProfile)
        ));
        assert!(matches!(profile.unseal(b""), Err(Error::InvalidProfile)));
    }

    #[test]
    fn test_unseal_gives_same_key_each_time() {
        let profile = ProfileFile::seal(b"pw", &fast_params()).unwrap();
        let k1 = profile.unseal(b"pw").unwrap();
        let k2 = profile.unseal(b"pw").unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_tampered_header_is_invalid_profile() {
        let profile = ProfileFile::seal(b"pw", &fast_params()).unwrap();

        let mut bumped = profile.clone();
        bumped.schema_version += 1;
        assert!(matches!(bumped.unseal(b"pw"), Err(Error::InvalidProfile)));

        let mut reparam = profile.clone();
        reparam.scrypt.n = 1 << 11;
        assert!(matches!(reparam.unseal(b"pw"), Err(Error::InvalidProfile)));

        let mut broken = profile.clone();
        broken.scrypt.n = 1000;
        assert!(matches!(broken.unseal(b"pw"), Err(Error::InvalidProfile)));
    }

    #[test]
    fn test_oversized_cost_is_invalid_profile() {
        let profile = ProfileFile::seal(b"pw", &fast_params()).unwrap();

        for (n, r, p) in [(1u64 << 40, 8, 1), (1 << 20, 64, 1), (1 << 10, 8, u32::MAX)] {
            let mut tampered = profile.clone();
            tampered.scrypt = ScryptParams { n, r, p };
            assert!(matches!(tampered.unseal(b"pw"), Err(Error::InvalidProfile)));
        }
    }

    #[test]
    fn test_json_layout() {
        let profile = ProfileFile::seal(b"pw", &fast_params()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&profile.to_json().unwrap()).unwrap();

        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["scrypt"], serde_json::json!({"N": 1024, "r": 8, "p": 1}));
        assert_eq!(value["salt"].as_str().unwrap().len(), 64);
        assert_eq!(value["iv"].as_str().unwrap().len(), 24);
        assert_eq!(value["tag"].as_str().unwrap().len(), 32);
        assert!(value["ciphertext"]
            .as_str()
            .unwrap()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let restored = ProfileFile::from_json(&profile.to_json().unwrap()).unwrap();
        assert_eq!(restored, profile);
    }

    #[test]
    fn test_store_new_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().join("nested").join("vault");
        let profile = ProfileFile::seal(b"pw", &fast_params()).unwrap();

        profile.store_new(&vault).unwrap();
        assert!(ProfileFile::exists(&vault));
        assert!(matches!(profile.store_new(&vault), Err(Error::ProfileExists)));
        assert_eq!(ProfileFile::load(&vault).unwrap(), profile);
    }

    #[cfg(unix)]
    #[test]
    fn test_store_new_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().join("vault");
        ProfileFile::seal(b"pw", &fast_params())
            .unwrap()
            .store_new(&vault)
            .unwrap();

        let dir_mode = fs::metadata(&vault).unwrap().permissions().mode();
        let file_mode = fs::metadata(vault.join(PROFILE_FILENAME))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        assert_eq!(file_mode & 0o777, 0o600);
    }
}
