//! Single-leaf credential fixtures.
//!
//! Every tree holds one leaf at index 0 with all-zero siblings. Compiled
//! only for tests and the `test-fixtures` feature; constructors panic on
//! failure.

use crate::builder::{CredentialBuilder, CredentialInputs, EngagementInputs, ExpectedRoots};
use crate::commitment::{compute_identity_commitment_at, IdentityCommitment};
use crate::credential::SessionCredential;
use crate::secret::derive_user_secret;
use civitas_crypto::FieldElement;
use civitas_types::{AuthorityLevel, IdentityProof, VerificationMethod, TREE_DEPTH};

pub const FIXTURE_SALT: &str = "test-salt";

const FIXTURE_ENTROPY: &str = "a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5";

pub fn fixture_commitment() -> IdentityCommitment {
    let proof = IdentityProof::new("X1234567", "us", 1990, "passport");
    compute_identity_commitment_at(&proof, Some(FIXTURE_SALT), 2025)
        .expect("fixture identity is valid")
}

/// Builder inputs for a lone credential at index 0 of every tree.
pub fn single_leaf_inputs() -> CredentialInputs {
    let identity_commitment = fixture_commitment();
    let user_secret = derive_user_secret(&identity_commitment.to_hex(), FIXTURE_ENTROPY)
        .expect("fixture entropy is valid hex");

    CredentialInputs {
        identity_commitment,
        user_secret,
        registration_salt: FieldElement::from_u64(0x5a17),
        authority_level: AuthorityLevel::IdentityVerified,
        verification_method: VerificationMethod::DocumentScan,
        cell_id: FieldElement::from_u64(0x0c_e1_1d),
        districts: (1..=3).map(FieldElement::from_u64).collect(),
        leaf_index: 0,
        user_path: vec![FieldElement::zero(); TREE_DEPTH],
        cell_map_path: vec![FieldElement::zero(); TREE_DEPTH],
        engagement: EngagementInputs {
            tier: 1,
            action_count: 4,
            diversity_score: 2,
            leaf_index: 0,
            path: vec![FieldElement::zero(); TREE_DEPTH],
        },
        expected_roots: ExpectedRoots::default(),
    }
}

pub fn sample_credential() -> SessionCredential {
    CredentialBuilder::default()
        .build(&single_leaf_inputs())
        .expect("single-leaf inputs always build")
}
