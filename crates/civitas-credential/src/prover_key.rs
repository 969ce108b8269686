//! Remote proving-enclave public key: fetching and caching.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use civitas_types::{CivitasError, CivitasResult, ProverPublicKey, PROVER_KEY_CACHE_TTL_SECS};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProverKey {
    pub key_id: String,
    pub public_key: ProverPublicKey,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Body of the key endpoint. Every field is optional on the wire so that a
/// missing one surfaces as a fetch error rather than a decode error.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResponse {
    pub key_id: Option<String>,
    pub public_key: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<KeyResponse> for ProverKey {
    type Error = CivitasError;

    fn try_from(response: KeyResponse) -> Result<Self, Self::Error> {
        let key_id = response
            .key_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| CivitasError::KeyFetch("response has no keyId".into()))?;
        let public_key = response
            .public_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CivitasError::KeyFetch("response has no publicKey".into()))?;
        let public_key = ProverPublicKey::from_hex(&public_key)
            .map_err(|e| CivitasError::KeyFetch(format!("malformed publicKey: {}", e)))?;

        Ok(Self {
            key_id,
            public_key,
            expires_at: response.expires_at,
        })
    }
}

#[async_trait]
pub trait ProverKeySource: Send + Sync {
    async fn fetch(&self) -> CivitasResult<ProverKey>;
}

pub struct HttpKeySource {
    client: Client,
    url: String,
}

impl HttpKeySource {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> CivitasResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CivitasError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ProverKeySource for HttpKeySource {
    async fn fetch(&self) -> CivitasResult<ProverKey> {
        debug!("HTTP GET: {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CivitasError::KeyFetch(format!("HTTP GET failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CivitasError::KeyFetch(format!(
                "key endpoint returned {}",
                status
            )));
        }

        let body: KeyResponse = response
            .json()
            .await
            .map_err(|e| CivitasError::KeyFetch(format!("malformed key response: {}", e)))?;

        let key = ProverKey::try_from(body)?;
        info!(key_id = %key.key_id, "Fetched prover public key");
        Ok(key)
    }
}

/// A key known ahead of time, e.g. pinned in configuration.
pub struct StaticKeySource {
    key: ProverKey,
}

impl StaticKeySource {
    pub fn new(key: ProverKey) -> Self {
        Self { key }
    }
}

#[async_trait]
impl ProverKeySource for StaticKeySource {
    async fn fetch(&self) -> CivitasResult<ProverKey> {
        Ok(self.key.clone())
    }
}

/// Last fetched key and when it was fetched. Entries are checked against the
/// TTL and the key's own expiry on read; nothing invalidates them eagerly.
#[derive(Debug)]
pub struct KeyCache {
    ttl: Duration,
    entry: Option<(ProverKey, DateTime<Utc>)>,
}

impl KeyCache {
    /// TTLs above one hour are clamped to one hour.
    pub fn new(ttl_secs: u64) -> Self {
        let secs = ttl_secs.min(PROVER_KEY_CACHE_TTL_SECS) as i64;
        Self {
            ttl: Duration::seconds(secs),
            entry: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self) -> Option<ProverKey> {
        self.get_at(Utc::now())
    }

    pub fn get_at(&self, now: DateTime<Utc>) -> Option<ProverKey> {
        let (key, fetched_at) = self.entry.as_ref()?;
        if now >= *fetched_at + self.ttl {
            return None;
        }
        if matches!(key.expires_at, Some(expires_at) if now >= expires_at) {
            return None;
        }
        Some(key.clone())
    }

    pub fn store(&mut self, key: ProverKey) {
        self.store_at(key, Utc::now());
    }

    pub fn store_at(&mut self, key: ProverKey, now: DateTime<Utc>) {
        self.entry = Some((key, now));
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(PROVER_KEY_CACHE_TTL_SECS)
    }
}
