use civitas_types::SymmetricKey;

/// Context for the witness sealing key. Bump the version suffix, never edit
/// it in place, when the sealing protocol changes.
pub const WITNESS_KDF_CONTEXT: &str = "civitas 2025-01 witness-encryption v1";

/// Context for the device key that protects stored user entropy.
pub const ENTROPY_VAULT_CONTEXT: &str = "civitas 2025-01 entropy-vault v1";

pub fn blake3_derive_key(context: &str, seed: &[u8]) -> SymmetricKey {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(seed);
    let output = hasher.finalize();
    SymmetricKey::from_bytes(*output.as_bytes())
}

/// Symmetric key for sealing a witness, from an X25519 shared secret.
pub fn derive_witness_key(shared_secret: &[u8; 32]) -> SymmetricKey {
    blake3_derive_key(WITNESS_KDF_CONTEXT, shared_secret)
}

pub fn derive_entropy_vault_key(device_secret: &[u8]) -> SymmetricKey {
    blake3_derive_key(ENTROPY_VAULT_CONTEXT, device_secret)
}
