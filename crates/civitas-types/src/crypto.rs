use crate::error::{CivitasError, CivitasResult};
use crate::{SYMMETRIC_KEY_SIZE, USER_ENTROPY_SIZE, X25519_PUBLIC_KEY_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

fn decode_fixed<const N: usize>(s: &str, what: &str) -> CivitasResult<[u8; N]> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped)
        .map_err(|e| CivitasError::InvalidKey(format!("{} is not valid hex: {}", what, e)))?;
    if bytes.len() != N {
        return Err(CivitasError::InvalidKey(format!(
            "{} must be {} bytes, got {}",
            what,
            N,
            bytes.len()
        )));
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SymmetricKey(pub [u8; SYMMETRIC_KEY_SIZE]);

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey([REDACTED])")
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// X25519 public key published by the remote proving enclave.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProverPublicKey(pub [u8; X25519_PUBLIC_KEY_SIZE]);

impl ProverPublicKey {
    pub fn from_bytes(bytes: [u8; X25519_PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; X25519_PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> CivitasResult<Self> {
        decode_fixed(s.trim(), "prover public key").map(Self)
    }
}

impl fmt::Debug for ProverPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProverPublicKey({})", self.to_hex())
    }
}

impl fmt::Display for ProverPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Per-identity random value mixed into the user secret. Generated once at
/// verification time; regenerating it changes every derived secret.
#[derive(Clone, PartialEq, Eq)]
pub struct UserEntropy(pub [u8; USER_ENTROPY_SIZE]);

impl UserEntropy {
    pub fn from_bytes(bytes: [u8; USER_ENTROPY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; USER_ENTROPY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> CivitasResult<Self> {
        let stripped = s.trim();
        let stripped = stripped.strip_prefix("0x").unwrap_or(stripped);
        let bytes = hex::decode(stripped)
            .map_err(|e| CivitasError::InvalidInput(format!("entropy is not valid hex: {}", e)))?;
        if bytes.len() != USER_ENTROPY_SIZE {
            return Err(CivitasError::InvalidInput(format!(
                "entropy must be {} bytes, got {}",
                USER_ENTROPY_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; USER_ENTROPY_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for UserEntropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserEntropy([REDACTED])")
    }
}

impl Drop for UserEntropy {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
