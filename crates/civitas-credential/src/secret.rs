//! Per-person user secret and the entropy behind it.
//!
//! `secret = hash2(commitment, entropy)`. The entropy is drawn once when the
//! identity is first verified and kept only in sealed form; the secret itself
//! is recomputed on demand, so every login method that reaches the same
//! commitment and entropy arrives at the same secret.

use civitas_crypto::{
    derive_entropy_vault_key, hash2, random_bytes, EncryptedData, FieldElement, RandomSource,
};
use civitas_types::{CivitasError, CivitasResult, UserEntropy, USER_ENTROPY_SIZE};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ENTROPY_AAD: &[u8] = b"civitas:user-entropy";

/// Canonical `0x`-prefixed lowercase form of a hex argument.
fn normalize_hex(field: &'static str, raw: &str) -> CivitasResult<String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(CivitasError::InvalidInput(format!("{} is empty", field)));
    }
    Ok(format!("0x{}", digits.to_lowercase()))
}

pub fn derive_user_secret(commitment: &str, entropy: &str) -> CivitasResult<FieldElement> {
    let commitment = normalize_hex("identity commitment", commitment)?;
    let entropy = normalize_hex("user entropy", entropy)?;

    let commitment = FieldElement::from_hex_reduced(&commitment)
        .map_err(|_| CivitasError::InvalidInput("identity commitment is not hex".into()))?;
    let entropy = FieldElement::from_hex_reduced(&entropy)
        .map_err(|_| CivitasError::InvalidInput("user entropy is not hex".into()))?;

    Ok(hash2(&commitment, &entropy))
}

/// Fresh 32-byte entropy, hex encoded. Called once per identity.
pub fn generate_entropy(rng: &dyn RandomSource) -> CivitasResult<String> {
    let bytes = random_bytes::<USER_ENTROPY_SIZE>(rng)?;
    Ok(UserEntropy::from_bytes(bytes).to_hex())
}

/// User entropy sealed with AES-256-GCM under a device key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SealedEntropy {
    envelope: EncryptedData,
}

impl SealedEntropy {
    pub fn seal(
        entropy: &UserEntropy,
        device_secret: &[u8],
        rng: &dyn RandomSource,
    ) -> CivitasResult<Self> {
        let key = derive_entropy_vault_key(device_secret);
        let envelope = EncryptedData::seal(&key, entropy.as_bytes(), ENTROPY_AAD, rng)?;
        debug!("Sealed user entropy");
        Ok(Self { envelope })
    }

    pub fn open(&self, device_secret: &[u8]) -> CivitasResult<UserEntropy> {
        let key = derive_entropy_vault_key(device_secret);
        let plaintext = self.envelope.open(&key, ENTROPY_AAD)?;
        let bytes: [u8; USER_ENTROPY_SIZE] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| CivitasError::Crypto("sealed entropy has the wrong length".into()))?;
        Ok(UserEntropy::from_bytes(bytes))
    }
}
