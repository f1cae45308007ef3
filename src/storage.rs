use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::{
    decrypt_with_key, derive_key_with_params, encrypt_with_key, random_bytes, CryptoError,
    KdfParams,
};
use crate::models::{Database, EncryptedBlob};

const VAULT_FORMAT_VERSION: u8 = 2;
const KDF_SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed vault file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("Unsupported vault format version: {0}")]
    UnsupportedVersion(u8),
    #[error("Invalid wrapped key length in vault")]
    WrappedKeyLength,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("Atomic write failed: {0}")]
    Persist(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Encrypted persistence of a [`Database`].
pub trait VaultStore {
    fn load(&self, passphrase: &str) -> Result<Database, StoreError>;
    fn save(&self, passphrase: &str, database: &Database) -> Result<(), StoreError>;
}

#[derive(Serialize, Deserialize)]
struct KdfSpec {
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
}

#[derive(Serialize, Deserialize)]
struct WrappedVaultFile {
    version: u8,
    kdf: KdfSpec,
    kdf_salt: String,
    wrapped_key: EncryptedBlob,
    vault: EncryptedBlob,
}

/// Vault file on disk: an Argon2id key wraps a random data key that seals the database.
pub struct FileStore {
    path: PathBuf,
    kdf: KdfParams,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kdf: KdfParams::default(),
        }
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VaultStore for FileStore {
    fn load(&self, passphrase: &str) -> Result<Database, StoreError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let wrapped: WrappedVaultFile = serde_json::from_str(&raw)?;
        if wrapped.version != VAULT_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion(wrapped.version));
        }
        let salt = base64::engine::general_purpose::STANDARD
            .decode(wrapped.kdf_salt)
            .map_err(CryptoError::from)?;
        let params = KdfParams {
            m_cost: wrapped.kdf.m_cost,
            t_cost: wrapped.kdf.t_cost,
            p_cost: wrapped.kdf.p_cost,
        };
        let mut kek = derive_key_with_params(passphrase, &salt, params)?;
        let dek = decrypt_with_key(&kek, &wrapped.wrapped_key);
        kek.zeroize();
        let mut dek: [u8; 32] = dek?
            .try_into()
            .map_err(|_| StoreError::WrappedKeyLength)?;
        let decrypted = decrypt_with_key(&dek, &wrapped.vault);
        dek.zeroize();
        let mut decrypted = decrypted?;
        let database: Result<Database, serde_json::Error> = serde_json::from_slice(&decrypted);
        decrypted.zeroize();
        Ok(database?)
    }

    fn save(&self, passphrase: &str, database: &Database) -> Result<(), StoreError> {
        let salt: [u8; KDF_SALT_LEN] = random_bytes();
        let mut kek = derive_key_with_params(passphrase, &salt, self.kdf)?;
        let mut dek: [u8; 32] = random_bytes();

        let wrapped_key = encrypt_with_key(&kek, &dek);
        kek.zeroize();
        let mut plaintext = serde_json::to_vec(database)?;
        let vault = encrypt_with_key(&dek, &plaintext);
        plaintext.zeroize();
        dek.zeroize();

        let wrapped = WrappedVaultFile {
            version: VAULT_FORMAT_VERSION,
            kdf: KdfSpec {
                m_cost: self.kdf.m_cost,
                t_cost: self.kdf.t_cost,
                p_cost: self.kdf.p_cost,
            },
            kdf_salt: base64::engine::general_purpose::STANDARD.encode(salt),
            wrapped_key: wrapped_key?,
            vault: vault?,
        };
        let serialized = serde_json::to_string_pretty(&wrapped)?;
        atomic_write(&self.path, serialized.as_bytes())?;
        restrict_file(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
    temp.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    temp.flush().map_err(|e| StoreError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(path, e))?;
    temp.persist(path)
        .map_err(|e| StoreError::Persist(e.error.to_string()))?;
    Ok(())
}

fn restrict_file(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if path.exists() {
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms)?;
        }
    }
    // On non-Unix platforms we skip explicit chmod; rely on platform defaults.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entry;

    const TEST_KDF: KdfParams = KdfParams {
        m_cost: 8,
        t_cost: 1,
        p_cost: 1,
    };

    fn sample_database() -> Database {
        let mut db = Database::with_root_group();
        db.push_entry(Entry::with_fields("Site", "bob", "Xy9!", "http://site"));
        db.push_entry(Entry::with_fields("Mail", "alice", "hunter2", ""));
        db
    }

    #[test]
    fn save_then_load_with_correct_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("vault.json")).with_kdf(TEST_KDF);
        let db = sample_database();
        store.save("correct horse", &db).unwrap();

        let loaded = store.load("correct horse").unwrap();
        assert_eq!(loaded, db);
    }

    #[test]
    fn wrong_passphrase_is_a_decrypt_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("vault.json")).with_kdf(TEST_KDF);
        store.save("right", &sample_database()).unwrap();

        let err = store.load("wrong").unwrap_err();
        assert!(matches!(err, StoreError::Crypto(CryptoError::Decrypt)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load("pw"), Err(StoreError::Io { .. })));
    }

    #[test]
    fn garbage_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        fs::write(&path, "not json").unwrap();
        let store = FileStore::new(&path);
        assert!(matches!(store.load("pw"), Err(StoreError::Format(_))));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let store = FileStore::new(&path).with_kdf(TEST_KDF);
        store.save("pw", &sample_database()).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        value["version"] = serde_json::json!(9);
        fs::write(&path, value.to_string()).unwrap();

        assert!(matches!(
            store.load("pw"),
            Err(StoreError::UnsupportedVersion(9))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        FileStore::new(&path)
            .with_kdf(TEST_KDF)
            .save("pw", &sample_database())
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
