//! Construction of the three credential trees.
//!
//! Tree 1 binds the user secret to a cell and authority level, Tree 2 maps
//! the cell to the districts it belongs to, and Tree 3 carries the user's
//! engagement record. All three have depth [`TREE_DEPTH`]. Sibling paths come
//! from the registry; this module only recomputes leaves and roots from them
//! so that a proof generator sees a self-consistent witness.

use crate::commitment::IdentityCommitment;
use crate::credential::SessionCredential;
use chrono::{DateTime, Duration, Utc};
use civitas_crypto::{
    climb_by_bits, climb_by_index, constant_time_eq, hash2, hash3, hash4, path_bits_for_key,
    sponge24, FieldElement,
};
use civitas_types::{
    AuthorityLevel, CivitasError, CivitasResult, VerificationMethod, DEFAULT_CREDENTIAL_TTL_DAYS,
    DISTRICT_SLOTS, MAX_CREDENTIAL_TTL_DAYS, TREE_DEPTH,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Registry-published roots to check the recomputed roots against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpectedRoots {
    pub user_root: Option<FieldElement>,
    pub cell_map_root: Option<FieldElement>,
    pub engagement_root: Option<FieldElement>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementInputs {
    pub tier: u8,
    pub action_count: u64,
    pub diversity_score: u64,
    pub leaf_index: u64,
    pub path: Vec<FieldElement>,
}

impl fmt::Debug for EngagementInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngagementInputs")
            .field("tier", &self.tier)
            .field("action_count", &self.action_count)
            .field("diversity_score", &self.diversity_score)
            .field("leaf_index", &self.leaf_index)
            .field("path_len", &self.path.len())
            .finish()
    }
}

/// Inputs for one credential build.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialInputs {
    pub identity_commitment: IdentityCommitment,
    pub user_secret: FieldElement,
    pub registration_salt: FieldElement,
    pub authority_level: AuthorityLevel,
    pub verification_method: VerificationMethod,

    pub cell_id: FieldElement,
    pub districts: Vec<FieldElement>,

    pub leaf_index: u64,
    pub user_path: Vec<FieldElement>,
    pub cell_map_path: Vec<FieldElement>,
    pub engagement: EngagementInputs,

    #[serde(default)]
    pub expected_roots: ExpectedRoots,
}

impl fmt::Debug for CredentialInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInputs")
            .field("identity_commitment", &self.identity_commitment)
            .field("authority_level", &self.authority_level)
            .field("verification_method", &self.verification_method)
            .field("districts", &self.districts.len())
            .field("leaf_index", &self.leaf_index)
            .field("engagement", &self.engagement)
            .field("user_secret", &"[REDACTED]")
            .field("registration_salt", &"[REDACTED]")
            .finish()
    }
}

/// Pads a district list with the zero element to exactly
/// [`DISTRICT_SLOTS`] entries.
pub fn pad_districts(districts: &[FieldElement]) -> CivitasResult<[FieldElement; DISTRICT_SLOTS]> {
    if districts.len() > DISTRICT_SLOTS {
        return Err(CivitasError::validation(
            "districts",
            format!(
                "{} districts given, a cell maps to at most {}",
                districts.len(),
                DISTRICT_SLOTS
            ),
        ));
    }
    let mut padded = [FieldElement::zero(); DISTRICT_SLOTS];
    padded[..districts.len()].copy_from_slice(districts);
    Ok(padded)
}

pub fn user_leaf(
    user_secret: &FieldElement,
    cell_id: &FieldElement,
    registration_salt: &FieldElement,
    authority_level: AuthorityLevel,
) -> FieldElement {
    hash4(
        user_secret,
        cell_id,
        registration_salt,
        &FieldElement::from_u64(u64::from(authority_level.as_u8())),
    )
}

pub fn district_commitment(districts: &[FieldElement; DISTRICT_SLOTS]) -> FieldElement {
    sponge24(districts)
}

pub fn cell_map_leaf(cell_id: &FieldElement, district_commitment: &FieldElement) -> FieldElement {
    hash2(cell_id, district_commitment)
}

pub fn engagement_commitment(tier: u8, action_count: u64, diversity_score: u64) -> FieldElement {
    hash3(
        &FieldElement::from_u64(u64::from(tier)),
        &FieldElement::from_u64(action_count),
        &FieldElement::from_u64(diversity_score),
    )
}

pub fn engagement_leaf(
    identity_commitment: &FieldElement,
    engagement_commitment: &FieldElement,
) -> FieldElement {
    hash2(identity_commitment, engagement_commitment)
}

fn check_depth(tree: &str, path: &[FieldElement]) -> CivitasResult<()> {
    if path.len() != TREE_DEPTH {
        return Err(CivitasError::Construction(format!(
            "{} path has {} siblings, expected {}",
            tree,
            path.len(),
            TREE_DEPTH
        )));
    }
    Ok(())
}

fn check_root(tree: &str, computed: &FieldElement, expected: Option<&FieldElement>) -> CivitasResult<()> {
    match expected {
        Some(expected) if !constant_time_eq(&computed.to_be_bytes(), &expected.to_be_bytes()) => {
            Err(CivitasError::Construction(format!(
                "{} root does not match the published root",
                tree
            )))
        }
        _ => Ok(()),
    }
}

fn abbreviated(root: &FieldElement) -> String {
    root.to_hex()[..18].to_string()
}

pub struct CredentialBuilder {
    ttl: Duration,
}

impl CredentialBuilder {
    pub fn new(ttl_days: i64) -> CivitasResult<Self> {
        if !(1..=MAX_CREDENTIAL_TTL_DAYS).contains(&ttl_days) {
            return Err(CivitasError::Config(format!(
                "credential ttl must be between 1 and {} days, got {}",
                MAX_CREDENTIAL_TTL_DAYS, ttl_days
            )));
        }
        let ttl = Duration::try_days(ttl_days).ok_or_else(|| {
            CivitasError::Config(format!("credential ttl of {} days is out of range", ttl_days))
        })?;
        Ok(Self { ttl })
    }

    pub fn build(&self, inputs: &CredentialInputs) -> CivitasResult<SessionCredential> {
        self.build_at(inputs, Utc::now())
    }

    pub fn build_at(
        &self,
        inputs: &CredentialInputs,
        now: DateTime<Utc>,
    ) -> CivitasResult<SessionCredential> {
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            CivitasError::Construction("credential expiry is past the representable range".into())
        })?;

        check_depth("user tree", &inputs.user_path)?;
        check_depth("cell map", &inputs.cell_map_path)?;
        check_depth("engagement tree", &inputs.engagement.path)?;

        let leaf = user_leaf(
            &inputs.user_secret,
            &inputs.cell_id,
            &inputs.registration_salt,
            inputs.authority_level,
        );
        let user_root = climb_by_index(&leaf, inputs.leaf_index, &inputs.user_path)?;
        check_root("user tree", &user_root, inputs.expected_roots.user_root.as_ref())?;

        let districts = pad_districts(&inputs.districts)?;
        let cell_leaf = cell_map_leaf(&inputs.cell_id, &district_commitment(&districts));
        let cell_map_path_bits = path_bits_for_key(&inputs.cell_id, TREE_DEPTH);
        let cell_map_root = climb_by_bits(&cell_leaf, &cell_map_path_bits, &inputs.cell_map_path)?;
        check_root("cell map", &cell_map_root, inputs.expected_roots.cell_map_root.as_ref())?;

        let engagement = &inputs.engagement;
        let commitment_field = inputs.identity_commitment.to_field();
        let eleaf = engagement_leaf(
            &commitment_field,
            &engagement_commitment(engagement.tier, engagement.action_count, engagement.diversity_score),
        );
        let engagement_root = climb_by_index(&eleaf, engagement.leaf_index, &engagement.path)?;
        check_root(
            "engagement tree",
            &engagement_root,
            inputs.expected_roots.engagement_root.as_ref(),
        )?;

        debug!(
            user_root = %abbreviated(&user_root),
            cell_map_root = %abbreviated(&cell_map_root),
            engagement_root = %abbreviated(&engagement_root),
            "Computed credential roots"
        );
        info!(
            fingerprint = %inputs.identity_commitment.fingerprint(),
            authority_level = %inputs.authority_level,
            "Built session credential"
        );

        Ok(SessionCredential {
            identity_commitment: inputs.identity_commitment.clone(),
            leaf_index: inputs.leaf_index,
            user_root,
            user_path: inputs.user_path.clone(),
            cell_id: inputs.cell_id,
            cell_map_root,
            cell_map_path: inputs.cell_map_path.clone(),
            cell_map_path_bits,
            districts: districts.to_vec(),
            authority_level: inputs.authority_level,
            user_secret: inputs.user_secret,
            registration_salt: inputs.registration_salt,
            engagement_root,
            engagement_path: engagement.path.clone(),
            engagement_index: engagement.leaf_index,
            engagement_tier: engagement.tier,
            action_count: engagement.action_count,
            diversity_score: engagement.diversity_score,
            verification_method: inputs.verification_method,
            created_at: now,
            expires_at,
        })
    }
}

impl Default for CredentialBuilder {
    fn default() -> Self {
        Self {
            ttl: Duration::days(DEFAULT_CREDENTIAL_TTL_DAYS),
        }
    }
}
