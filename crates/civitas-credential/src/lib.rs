//! Credential and proof-input construction for verified-identity civic
//! actions.
//!
//! Flow: [`compute_identity_commitment`] → [`derive_user_secret`] →
//! [`classify`] → [`CredentialBuilder::build`] → [`assemble`] →
//! [`WitnessEncryptor::encrypt`], with [`CredentialStore`] keeping the
//! finished credential between sessions.

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod builder;
pub mod classifier;
pub mod commitment;
pub mod config;
pub mod credential;
pub mod encryptor;
pub mod prover_key;
pub mod secret;
pub mod store;
pub mod witness;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use builder::{
    cell_map_leaf, district_commitment, engagement_commitment, engagement_leaf, pad_districts,
    user_leaf, CredentialBuilder, CredentialInputs, EngagementInputs, ExpectedRoots,
};
pub use classifier::{
    authority_level, classify, meets_policy, trust_tier, trust_tier_to_authority_level,
    Classification, VerificationState,
};
pub use commitment::{
    compute_identity_commitment, compute_identity_commitment_at, fingerprint, is_age_eligible,
    is_age_eligible_now, IdentityCommitment,
};
pub use config::{CredentialConfig, RedactedConfig};
pub use credential::SessionCredential;
pub use encryptor::{open_witness, EncryptedWitness, WitnessEncryptor};
pub use prover_key::{HttpKeySource, KeyCache, ProverKey, ProverKeySource, StaticKeySource};
pub use secret::{derive_user_secret, generate_entropy, SealedEntropy};
pub use store::{CredentialStore, MemoryCredentialStore, SledCredentialStore};
pub use witness::{assemble, WitnessData};
