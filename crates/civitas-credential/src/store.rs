//! Client-side credential persistence keyed by user id.
//!
//! Credentials are stored as JSON so every field element keeps its canonical
//! hex form. Sealed entropy and schema metadata use bincode.

use crate::credential::SessionCredential;
use crate::secret::SealedEntropy;
use chrono::{DateTime, Utc};
use civitas_crypto::{random_bytes, RandomSource};
use civitas_types::{CivitasError, CivitasResult, UserEntropy, USER_ENTROPY_SIZE};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_KEY: &[u8] = b"__schema_version__";

pub trait CredentialStore: Send + Sync {
    fn put(&self, user_id: &str, credential: &SessionCredential) -> CivitasResult<()>;

    fn get(&self, user_id: &str) -> CivitasResult<Option<SessionCredential>>;

    /// Returns whether an entry was removed.
    fn delete(&self, user_id: &str) -> CivitasResult<bool>;

    /// Like [`get`](Self::get), but an expired credential is deleted and
    /// reported as absent.
    fn load_valid(&self, user_id: &str) -> CivitasResult<Option<SessionCredential>> {
        self.load_valid_at(user_id, Utc::now())
    }

    fn load_valid_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> CivitasResult<Option<SessionCredential>> {
        match self.get(user_id)? {
            Some(credential) if credential.is_expired_at(now) => {
                warn!(
                    expired_at = %credential.expires_at,
                    "Dropping expired credential; it must be regenerated"
                );
                self.delete(user_id)?;
                Ok(None)
            }
            other => Ok(other),
        }
    }
}

fn encode_credential(credential: &SessionCredential) -> CivitasResult<Vec<u8>> {
    serde_json::to_vec(credential)
        .map_err(|e| CivitasError::Serialization(format!("Failed to encode credential: {}", e)))
}

fn decode_credential(bytes: &[u8]) -> CivitasResult<SessionCredential> {
    serde_json::from_slice(bytes)
        .map_err(|e| CivitasError::Serialization(format!("Failed to decode credential: {}", e)))
}

#[derive(Debug, Serialize, Deserialize)]
struct SchemaInfo {
    version: u32,
    created_at: i64,
}

pub struct SledCredentialStore {
    db: Db,
    schema: Tree,
    credentials: Tree,
    entropy: Tree,
}

impl SledCredentialStore {
    pub fn open(path: impl AsRef<Path>) -> CivitasResult<Self> {
        let path = path.as_ref();
        info!("Opening credential store at {:?}", path);

        let db = sled::Config::new()
            .path(path)
            .open()
            .map_err(|e| CivitasError::Storage(format!("Failed to open database: {}", e)))?;
        Self::from_db(db)
    }

    pub fn temporary() -> CivitasResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| CivitasError::Storage(format!("Failed to open temp database: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> CivitasResult<Self> {
        let store = Self {
            schema: Self::open_tree(&db, "schema")?,
            credentials: Self::open_tree(&db, "credentials")?,
            entropy: Self::open_tree(&db, "entropy")?,
            db,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn open_tree(db: &Db, name: &str) -> CivitasResult<Tree> {
        db.open_tree(name)
            .map_err(|e| CivitasError::Storage(format!("Failed to open {} tree: {}", name, e)))
    }

    fn ensure_schema(&self) -> CivitasResult<()> {
        let stored = self
            .schema
            .get(SCHEMA_KEY)
            .map_err(|e| CivitasError::Storage(format!("Failed to read schema: {}", e)))?;

        match stored {
            Some(bytes) => {
                let info: SchemaInfo = bincode::deserialize(&bytes).map_err(|e| {
                    CivitasError::Storage(format!("Failed to deserialize schema: {}", e))
                })?;
                if info.version > CURRENT_SCHEMA_VERSION {
                    return Err(CivitasError::Storage(format!(
                        "Database schema version {} is newer than supported {}",
                        info.version, CURRENT_SCHEMA_VERSION
                    )));
                }
                Ok(())
            }
            None => {
                let info = SchemaInfo {
                    version: CURRENT_SCHEMA_VERSION,
                    created_at: Utc::now().timestamp(),
                };
                let bytes = bincode::serialize(&info).map_err(|e| {
                    CivitasError::Storage(format!("Failed to serialize schema: {}", e))
                })?;
                self.schema
                    .insert(SCHEMA_KEY, bytes)
                    .map_err(|e| CivitasError::Storage(format!("Failed to store schema: {}", e)))?;
                self.flush()
            }
        }
    }

    pub fn flush(&self) -> CivitasResult<()> {
        self.db
            .flush()
            .map_err(|e| CivitasError::Storage(format!("Failed to flush: {}", e)))?;
        Ok(())
    }

    pub fn put_sealed_entropy(&self, user_id: &str, sealed: &SealedEntropy) -> CivitasResult<()> {
        let bytes = bincode::serialize(sealed)
            .map_err(|e| CivitasError::Serialization(format!("Failed to encode entropy: {}", e)))?;
        self.entropy
            .insert(user_id.as_bytes(), bytes)
            .map_err(|e| CivitasError::Storage(format!("Failed to store entropy: {}", e)))?;
        self.flush()
    }

    pub fn get_sealed_entropy(&self, user_id: &str) -> CivitasResult<Option<SealedEntropy>> {
        let stored = self
            .entropy
            .get(user_id.as_bytes())
            .map_err(|e| CivitasError::Storage(format!("Failed to read entropy: {}", e)))?;
        stored
            .map(|bytes| {
                bincode::deserialize(&bytes).map_err(|e| {
                    CivitasError::Serialization(format!("Failed to decode entropy: {}", e))
                })
            })
            .transpose()
    }

    /// Opens the user's sealed entropy, drawing and sealing fresh entropy
    /// on first use. The flag is true when the entropy was just created.
    pub fn load_or_create_entropy(
        &self,
        user_id: &str,
        device_secret: &[u8],
        rng: &dyn RandomSource,
    ) -> CivitasResult<(UserEntropy, bool)> {
        if let Some(sealed) = self.get_sealed_entropy(user_id)? {
            return Ok((sealed.open(device_secret)?, false));
        }

        let entropy = UserEntropy::from_bytes(random_bytes::<USER_ENTROPY_SIZE>(rng)?);
        let sealed = SealedEntropy::seal(&entropy, device_secret, rng)?;
        self.put_sealed_entropy(user_id, &sealed)?;
        info!("Created sealed entropy for a new user");
        Ok((entropy, true))
    }

    pub fn user_ids(&self) -> CivitasResult<Vec<String>> {
        self.credentials
            .iter()
            .keys()
            .map(|key| {
                key.map(|k| String::from_utf8_lossy(&k).into_owned())
                    .map_err(|e| CivitasError::Storage(format!("Failed to scan credentials: {}", e)))
            })
            .collect()
    }
}

impl CredentialStore for SledCredentialStore {
    fn put(&self, user_id: &str, credential: &SessionCredential) -> CivitasResult<()> {
        let bytes = encode_credential(credential)?;
        self.credentials
            .insert(user_id.as_bytes(), bytes)
            .map_err(|e| CivitasError::Storage(format!("Failed to store credential: {}", e)))?;
        self.flush()?;
        debug!(
            fingerprint = %credential.identity_commitment.fingerprint(),
            "Stored credential"
        );
        Ok(())
    }

    fn get(&self, user_id: &str) -> CivitasResult<Option<SessionCredential>> {
        let stored = self
            .credentials
            .get(user_id.as_bytes())
            .map_err(|e| CivitasError::Storage(format!("Failed to read credential: {}", e)))?;
        stored.map(|bytes| decode_credential(&bytes)).transpose()
    }

    fn delete(&self, user_id: &str) -> CivitasResult<bool> {
        let removed = self
            .credentials
            .remove(user_id.as_bytes())
            .map_err(|e| CivitasError::Storage(format!("Failed to delete credential: {}", e)))?;
        self.flush()?;
        Ok(removed.is_some())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn put(&self, user_id: &str, credential: &SessionCredential) -> CivitasResult<()> {
        let bytes = encode_credential(credential)?;
        self.entries.write().insert(user_id.to_string(), bytes);
        Ok(())
    }

    fn get(&self, user_id: &str) -> CivitasResult<Option<SessionCredential>> {
        self.entries
            .read()
            .get(user_id)
            .map(|bytes| decode_credential(bytes))
            .transpose()
    }

    fn delete(&self, user_id: &str) -> CivitasResult<bool> {
        Ok(self.entries.write().remove(user_id).is_some())
    }
}
