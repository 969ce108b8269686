#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod encryption;
pub mod field;
pub mod kdf;
pub mod merkle;
pub mod poseidon;
pub mod random;
pub mod sealed_box;

pub use encryption::{decrypt_with_aad, encrypt_with_aad, EncryptedData};
pub use field::FieldElement;
pub use kdf::{
    blake3_derive_key, derive_entropy_vault_key, derive_witness_key,
    ENTROPY_VAULT_CONTEXT, WITNESS_KDF_CONTEXT,
};
pub use merkle::{
    climb_by_bits, climb_by_index, index_to_bits, path_bits_for_key, IndexedMerkleTree,
    MerklePath, SparseMerkleTree, SparsePath,
};
pub use poseidon::{hash1, hash2, hash3, hash4, hash_hex, sponge24, sponge_fixed};
pub use random::{random_bytes, DeterministicRandom, OsRandom, RandomSource};
pub use sealed_box::{open, seal, EphemeralKeypair, SealedPayload};

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
