//! Proof-generator input packaging.
//!
//! [`assemble`] copies what the circuit needs out of a credential and binds
//! it to one action domain. Nullifiers are derived by the prover, not here.

use crate::credential::SessionCredential;
use civitas_crypto::FieldElement;
use civitas_types::{CivitasError, CivitasResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessData {
    // Public inputs
    pub user_root: FieldElement,
    pub cell_map_root: FieldElement,
    pub engagement_root: FieldElement,
    pub districts: Vec<FieldElement>,
    pub authority_level: u8,
    pub engagement_tier: u8,
    pub action_domain: FieldElement,

    // Private inputs
    pub user_secret: FieldElement,
    pub registration_salt: FieldElement,
    pub cell_id: FieldElement,
    pub identity_commitment: FieldElement,
    pub leaf_index: u64,
    pub user_path: Vec<FieldElement>,
    pub cell_map_path: Vec<FieldElement>,
    pub cell_map_path_bits: Vec<bool>,
    pub engagement_index: u64,
    pub engagement_path: Vec<FieldElement>,
    pub action_count: u64,
    pub diversity_score: u64,
}

impl WitnessData {
    /// Canonical byte form fed to the sealing step.
    pub fn to_canonical_bytes(&self) -> CivitasResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CivitasError::Serialization(e.to_string()))
    }

    pub fn from_canonical_bytes(bytes: &[u8]) -> CivitasResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CivitasError::Serialization(e.to_string()))
    }
}

impl fmt::Debug for WitnessData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WitnessData")
            .field("user_root", &self.user_root)
            .field("cell_map_root", &self.cell_map_root)
            .field("engagement_root", &self.engagement_root)
            .field("authority_level", &self.authority_level)
            .field("engagement_tier", &self.engagement_tier)
            .field("action_domain", &self.action_domain)
            .finish_non_exhaustive()
    }
}

pub fn assemble(credential: &SessionCredential, action_domain: FieldElement) -> WitnessData {
    WitnessData {
        user_root: credential.user_root,
        cell_map_root: credential.cell_map_root,
        engagement_root: credential.engagement_root,
        districts: credential.districts.clone(),
        authority_level: credential.authority_level.as_u8(),
        engagement_tier: credential.engagement_tier,
        action_domain,
        user_secret: credential.user_secret,
        registration_salt: credential.registration_salt,
        cell_id: credential.cell_id,
        identity_commitment: credential.identity_commitment.to_field(),
        leaf_index: credential.leaf_index,
        user_path: credential.user_path.clone(),
        cell_map_path: credential.cell_map_path.clone(),
        cell_map_path_bits: credential.cell_map_path_bits.clone(),
        engagement_index: credential.engagement_index,
        engagement_path: credential.engagement_path.clone(),
        action_count: credential.action_count,
        diversity_score: credential.diversity_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{engagement_commitment, engagement_leaf};
    use crate::fixtures::sample_credential;

    #[test]
    fn test_assemble_copies_credential() {
        let credential = sample_credential();
        let domain = FieldElement::from_u64(0xd0_4a_1e);
        let witness = assemble(&credential, domain);

        assert_eq!(witness.user_root, credential.user_root);
        assert_eq!(witness.cell_map_root, credential.cell_map_root);
        assert_eq!(witness.engagement_root, credential.engagement_root);
        assert_eq!(witness.districts, credential.districts);
        assert_eq!(witness.authority_level, 3);
        assert_eq!(witness.action_domain, domain);
        assert_eq!(witness.user_secret, credential.user_secret);
        assert_eq!(witness.user_path.len(), credential.user_path.len());
        assert_eq!(witness.cell_map_path_bits, credential.cell_map_path_bits);
    }

    #[test]
    fn test_witness_recomputes_engagement_root() {
        let credential = sample_credential();
        let witness = assemble(&credential, FieldElement::from_u64(1));
        let leaf = engagement_leaf(
            &witness.identity_commitment,
            &engagement_commitment(witness.engagement_tier, witness.action_count, witness.diversity_score),
        );
        let root = civitas_crypto::climb_by_index(&leaf, witness.engagement_index, &witness.engagement_path)
            .unwrap();
        assert_eq!(root, witness.engagement_root);
    }

    #[test]
    fn test_domain_changes_only_domain() {
        let credential = sample_credential();
        let a = assemble(&credential, FieldElement::from_u64(1));
        let mut b = assemble(&credential, FieldElement::from_u64(2));
        assert_ne!(a, b);
        b.action_domain = a.action_domain;
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_bytes_roundtrip_and_debug() {
        let witness = assemble(&sample_credential(), FieldElement::from_u64(7));
        let bytes = witness.to_canonical_bytes().unwrap();
        assert_eq!(bytes, witness.to_canonical_bytes().unwrap());
        assert_eq!(WitnessData::from_canonical_bytes(&bytes).unwrap(), witness);

        let rendered = format!("{:?}", witness);
        assert!(!rendered.contains(&witness.user_secret.to_hex()));
    }
}
