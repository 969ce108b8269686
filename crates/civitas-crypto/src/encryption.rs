use crate::random::{random_bytes, RandomSource};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use civitas_types::{CivitasError, CivitasResult, SymmetricKey};
use serde::{Deserialize, Serialize};

const NONCE_SIZE: usize = 12;

const TAG_SIZE: usize = 16;

pub const AT_REST_ALGORITHM: &str = "AES-256-GCM";

pub fn encrypt_with_aad(
    key: &SymmetricKey,
    plaintext: &[u8],
    aad: &[u8],
    rng: &dyn RandomSource,
) -> CivitasResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CivitasError::Crypto(e.to_string()))?;

    let nonce_bytes = random_bytes::<NONCE_SIZE>(rng)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| CivitasError::Crypto(e.to_string()))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

pub fn decrypt_with_aad(key: &SymmetricKey, encrypted: &[u8], aad: &[u8]) -> CivitasResult<Vec<u8>> {
    if encrypted.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CivitasError::Crypto("Encrypted data too short".into()));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CivitasError::Crypto(e.to_string()))?;

    let nonce = Nonce::from_slice(&encrypted[..NONCE_SIZE]);
    let ciphertext = &encrypted[NONCE_SIZE..];

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|e| CivitasError::Crypto(format!("Decryption failed: {}", e)))
}

/// Versioned envelope for secrets kept on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedData {
    pub version: u8,
    pub algorithm: String,
    pub payload: Vec<u8>,
}

impl EncryptedData {
    pub fn seal(
        key: &SymmetricKey,
        plaintext: &[u8],
        aad: &[u8],
        rng: &dyn RandomSource,
    ) -> CivitasResult<Self> {
        let payload = encrypt_with_aad(key, plaintext, aad, rng)?;
        Ok(Self {
            version: 1,
            algorithm: AT_REST_ALGORITHM.to_string(),
            payload,
        })
    }

    pub fn open(&self, key: &SymmetricKey, aad: &[u8]) -> CivitasResult<Vec<u8>> {
        if self.version != 1 {
            return Err(CivitasError::Crypto(format!(
                "Unsupported encryption version: {}",
                self.version
            )));
        }
        if self.algorithm != AT_REST_ALGORITHM {
            return Err(CivitasError::Crypto(format!(
                "Unsupported algorithm: {}",
                self.algorithm
            )));
        }
        decrypt_with_aad(key, &self.payload, aad)
    }
}
