#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod authority;
mod crypto;
mod error;
mod identity;

pub use authority::{AuthorityLevel, TrustTier};
pub use crypto::{ProverPublicKey, SymmetricKey, UserEntropy};
pub use error::{CivitasError, CivitasResult};
pub use identity::{DocumentType, IdentityProof, VerificationMethod};

/// Depth of all three credential trees.
pub const TREE_DEPTH: usize = 20;

/// Number of district slots reachable from one geographic cell.
pub const DISTRICT_SLOTS: usize = 24;

pub const FIELD_ELEMENT_SIZE: usize = 32;

pub const USER_ENTROPY_SIZE: usize = 32;

pub const SYMMETRIC_KEY_SIZE: usize = 32;

pub const X25519_PUBLIC_KEY_SIZE: usize = 32;

pub const XCHACHA_NONCE_SIZE: usize = 24;

pub const MIN_BIRTH_YEAR: i32 = 1900;

pub const MINIMUM_AGE: i32 = 18;

/// Trust score at which an unverified account earns authority level 2.
pub const ESTABLISHED_TRUST_SCORE: i64 = 100;

pub const PROVER_KEY_CACHE_TTL_SECS: u64 = 3_600;

pub const DEFAULT_CREDENTIAL_TTL_DAYS: i64 = 180;

/// Longest credential lifetime accepted from configuration.
pub const MAX_CREDENTIAL_TTL_DAYS: i64 = 3_650;
