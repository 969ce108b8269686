//! Sealing witnesses for the remote proving enclave.
//!
//! A witness is sealed to the enclave's X25519 key with a fresh ephemeral key
//! pair and nonce per call. Any failure along the way, key fetch included,
//! surfaces as [`CivitasError::EncryptionFailed`] and no partial result is
//! returned, so callers retry the whole step.

use crate::prover_key::{KeyCache, ProverKey, ProverKeySource};
use crate::witness::WitnessData;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use civitas_crypto::{open, seal, RandomSource, SealedPayload};
use civitas_types::{CivitasError, CivitasResult, X25519_PUBLIC_KEY_SIZE, XCHACHA_NONCE_SIZE};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Wire form: `{ ciphertext, nonce, ephemeralPublicKey, teeKeyId }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedWitness {
    /// Base64 XChaCha20-Poly1305 output, tag included.
    pub ciphertext: String,
    /// Base64, 24 bytes.
    pub nonce: String,
    /// Hex, 32 bytes.
    pub ephemeral_public_key: String,
    pub tee_key_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    ciphertext: Option<String>,
    nonce: Option<String>,
    ephemeral_public_key: Option<String>,
    tee_key_id: Option<String>,
}

fn required(field: &str, value: Option<String>) -> CivitasResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CivitasError::MalformedWitness(format!("missing {}", field))),
    }
}

impl EncryptedWitness {
    fn from_sealed(sealed: SealedPayload, key_id: String) -> Self {
        Self {
            ciphertext: BASE64.encode(&sealed.ciphertext),
            nonce: BASE64.encode(sealed.nonce),
            ephemeral_public_key: hex::encode(sealed.ephemeral_public),
            tee_key_id: key_id,
        }
    }

    /// Parses and validates a wire message. Every field must be present and
    /// decodable.
    pub fn from_json(json: &str) -> CivitasResult<Self> {
        let wire: WireMessage = serde_json::from_str(json)
            .map_err(|e| CivitasError::MalformedWitness(format!("not a JSON object: {}", e)))?;

        let message = Self {
            ciphertext: required("ciphertext", wire.ciphertext)?,
            nonce: required("nonce", wire.nonce)?,
            ephemeral_public_key: required("ephemeralPublicKey", wire.ephemeral_public_key)?,
            tee_key_id: required("teeKeyId", wire.tee_key_id)?,
        };
        message.to_sealed()?;
        Ok(message)
    }

    pub fn to_json(&self) -> CivitasResult<String> {
        serde_json::to_string(self).map_err(|e| CivitasError::Serialization(e.to_string()))
    }

    pub fn to_sealed(&self) -> CivitasResult<SealedPayload> {
        if self.tee_key_id.trim().is_empty() {
            return Err(CivitasError::MalformedWitness("missing teeKeyId".into()));
        }

        let ciphertext = BASE64
            .decode(&self.ciphertext)
            .map_err(|e| CivitasError::MalformedWitness(format!("ciphertext: {}", e)))?;
        if ciphertext.is_empty() {
            return Err(CivitasError::MalformedWitness("missing ciphertext".into()));
        }

        let nonce = BASE64
            .decode(&self.nonce)
            .map_err(|e| CivitasError::MalformedWitness(format!("nonce: {}", e)))?;
        let nonce: [u8; XCHACHA_NONCE_SIZE] = nonce.as_slice().try_into().map_err(|_| {
            CivitasError::MalformedWitness(format!(
                "nonce must be {} bytes, got {}",
                XCHACHA_NONCE_SIZE,
                nonce.len()
            ))
        })?;

        let ephemeral = hex::decode(self.ephemeral_public_key.trim())
            .map_err(|e| CivitasError::MalformedWitness(format!("ephemeralPublicKey: {}", e)))?;
        let ephemeral_public: [u8; X25519_PUBLIC_KEY_SIZE] =
            ephemeral.as_slice().try_into().map_err(|_| {
                CivitasError::MalformedWitness(format!(
                    "ephemeralPublicKey must be {} bytes, got {}",
                    X25519_PUBLIC_KEY_SIZE,
                    ephemeral.len()
                ))
            })?;

        Ok(SealedPayload {
            ciphertext,
            nonce,
            ephemeral_public,
        })
    }
}

pub struct WitnessEncryptor {
    source: Arc<dyn ProverKeySource>,
    cache: Mutex<KeyCache>,
    rng: Arc<dyn RandomSource>,
}

impl WitnessEncryptor {
    pub fn new(source: Arc<dyn ProverKeySource>, rng: Arc<dyn RandomSource>) -> Self {
        Self::with_cache(source, KeyCache::default(), rng)
    }

    pub fn with_cache(
        source: Arc<dyn ProverKeySource>,
        cache: KeyCache,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            source,
            cache: Mutex::new(cache),
            rng,
        }
    }

    /// Cached key if still fresh, otherwise a new fetch. Concurrent callers
    /// racing past an expired entry each fetch.
    async fn current_key(&self) -> CivitasResult<ProverKey> {
        let cached = self.cache.lock().get();
        if let Some(key) = cached {
            debug!(key_id = %key.key_id, "Prover key cache hit");
            return Ok(key);
        }

        let key = self.source.fetch().await?;
        self.cache.lock().store(key.clone());
        Ok(key)
    }

    pub async fn encrypt(&self, witness: &WitnessData) -> CivitasResult<EncryptedWitness> {
        match self.seal_witness(witness).await {
            Ok(encrypted) => {
                info!(key_id = %encrypted.tee_key_id, "Sealed witness for prover");
                Ok(encrypted)
            }
            Err(e) => {
                warn!("Witness encryption failed: {}", e);
                Err(CivitasError::encryption_failed(e))
            }
        }
    }

    async fn seal_witness(&self, witness: &WitnessData) -> CivitasResult<EncryptedWitness> {
        let key = self.current_key().await?;
        let plaintext = witness.to_canonical_bytes()?;
        let sealed = seal(&key.public_key, &plaintext, self.rng.as_ref())?;
        Ok(EncryptedWitness::from_sealed(sealed, key.key_id))
    }
}

/// Enclave side of [`WitnessEncryptor::encrypt`].
pub fn open_witness(
    recipient_secret: &[u8; 32],
    encrypted: &EncryptedWitness,
) -> CivitasResult<WitnessData> {
    let sealed = encrypted.to_sealed()?;
    let plaintext = open(recipient_secret, &sealed)?;
    WitnessData::from_canonical_bytes(&plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_credential;
    use crate::prover_key::StaticKeySource;
    use crate::witness::assemble;
    use async_trait::async_trait;
    use civitas_crypto::{DeterministicRandom, EphemeralKeypair, FieldElement, OsRandom};
    use civitas_types::ProverPublicKey;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ENCLAVE_SECRET: [u8; 32] = [0x42; 32];

    fn enclave_key(id: &str) -> ProverKey {
        ProverKey {
            key_id: id.to_string(),
            public_key: ProverPublicKey::from_bytes(
                EphemeralKeypair::from_secret(ENCLAVE_SECRET).public_key(),
            ),
            expires_at: None,
        }
    }

    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ProverKeySource for CountingSource {
        async fn fetch(&self) -> CivitasResult<ProverKey> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(enclave_key(&format!("tee-{}", n)))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ProverKeySource for FailingSource {
        async fn fetch(&self) -> CivitasResult<ProverKey> {
            Err(CivitasError::KeyFetch("connection refused".into()))
        }
    }

    fn witness() -> WitnessData {
        assemble(&sample_credential(), FieldElement::from_u64(0xac7))
    }

    #[tokio::test]
    async fn test_encrypt_open_roundtrip() {
        let encryptor = WitnessEncryptor::new(
            Arc::new(StaticKeySource::new(enclave_key("tee-a"))),
            Arc::new(OsRandom),
        );
        let witness = witness();
        let encrypted = encryptor.encrypt(&witness).await.unwrap();
        assert_eq!(encrypted.tee_key_id, "tee-a");

        let opened = open_witness(&ENCLAVE_SECRET, &encrypted).unwrap();
        assert_eq!(opened, witness);
        assert!(open_witness(&[0x43; 32], &encrypted).is_err());
    }

    #[tokio::test]
    async fn test_nondeterministic_with_stable_key_id() {
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
        });
        let encryptor = WitnessEncryptor::new(source.clone(), Arc::new(OsRandom));
        let witness = witness();

        let first = encryptor.encrypt(&witness).await.unwrap();
        let second = encryptor.encrypt(&witness).await.unwrap();

        assert_ne!(first.ciphertext, second.ciphertext);
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ephemeral_public_key, second.ephemeral_public_key);
        assert_eq!(first.tee_key_id, second.tee_key_id);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refetches_after_cache_expiry() {
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
        });
        let encryptor =
            WitnessEncryptor::with_cache(source.clone(), KeyCache::new(0), Arc::new(OsRandom));
        let witness = witness();

        let first = encryptor.encrypt(&witness).await.unwrap();
        let second = encryptor.encrypt(&witness).await.unwrap();
        assert_ne!(first.tee_key_id, second.tee_key_id);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_seeded_rng_reproduces_output() {
        let witness = witness();
        let mut outputs = Vec::new();
        for _ in 0..2 {
            let encryptor = WitnessEncryptor::new(
                Arc::new(StaticKeySource::new(enclave_key("tee-a"))),
                Arc::new(DeterministicRandom::from_seed(5)),
            );
            outputs.push(encryptor.encrypt(&witness).await.unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_wrapped() {
        let encryptor = WitnessEncryptor::new(Arc::new(FailingSource), Arc::new(OsRandom));
        match encryptor.encrypt(&witness()).await {
            Err(CivitasError::EncryptionFailed(inner)) => {
                assert!(matches!(*inner, CivitasError::KeyFetch(_)))
            }
            other => panic!("expected wrapped fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_low_order_key_is_wrapped() {
        let bad = ProverKey {
            key_id: "tee-bad".into(),
            public_key: ProverPublicKey::from_bytes([0u8; 32]),
            expires_at: None,
        };
        let encryptor =
            WitnessEncryptor::new(Arc::new(StaticKeySource::new(bad)), Arc::new(OsRandom));
        let err = encryptor.encrypt(&witness()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, CivitasError::EncryptionFailed(inner) if matches!(*inner, CivitasError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_wire_json_roundtrip() {
        let encryptor = WitnessEncryptor::new(
            Arc::new(StaticKeySource::new(enclave_key("tee-a"))),
            Arc::new(OsRandom),
        );
        let encrypted = encryptor.encrypt(&witness()).await.unwrap();
        let json = encrypted.to_json().unwrap();
        assert!(json.contains("\"ephemeralPublicKey\""));
        assert!(json.contains("\"teeKeyId\":\"tee-a\""));

        let parsed = EncryptedWitness::from_json(&json).unwrap();
        assert_eq!(parsed, encrypted);
        assert_eq!(open_witness(&ENCLAVE_SECRET, &parsed).unwrap(), witness());
    }

    #[test]
    fn test_wire_rejects_missing_fields() {
        let valid = EncryptedWitness {
            ciphertext: BASE64.encode([1u8; 40]),
            nonce: BASE64.encode([2u8; 24]),
            ephemeral_public_key: hex::encode([3u8; 32]),
            tee_key_id: "tee-a".into(),
        };
        let full: serde_json::Value = serde_json::to_value(&valid).unwrap();
        assert!(EncryptedWitness::from_json(&full.to_string()).is_ok());

        for field in ["ciphertext", "nonce", "ephemeralPublicKey", "teeKeyId"] {
            let mut missing = full.clone();
            missing.as_object_mut().unwrap().remove(field);
            let err = EncryptedWitness::from_json(&missing.to_string()).unwrap_err();
            assert!(
                matches!(&err, CivitasError::MalformedWitness(msg) if msg.contains(field)),
                "{} -> {:?}",
                field,
                err
            );

            let mut empty = full.clone();
            empty[field] = serde_json::Value::String(String::new());
            assert!(EncryptedWitness::from_json(&empty.to_string()).is_err());
        }
    }

    #[test]
    fn test_wire_rejects_bad_encodings() {
        let base = EncryptedWitness {
            ciphertext: BASE64.encode([1u8; 40]),
            nonce: BASE64.encode([2u8; 24]),
            ephemeral_public_key: hex::encode([3u8; 32]),
            tee_key_id: "tee-a".into(),
        };

        let mut bad_b64 = base.clone();
        bad_b64.ciphertext = "***".into();
        assert!(bad_b64.to_sealed().is_err());

        let mut short_nonce = base.clone();
        short_nonce.nonce = BASE64.encode([2u8; 12]);
        assert!(short_nonce.to_sealed().is_err());

        let mut bad_hex = base.clone();
        bad_hex.ephemeral_public_key = "zz".repeat(32);
        assert!(bad_hex.to_sealed().is_err());

        let mut short_key = base;
        short_key.ephemeral_public_key = hex::encode([3u8; 16]);
        assert!(matches!(
            short_key.to_sealed(),
            Err(CivitasError::MalformedWitness(_))
        ));
    }
}
