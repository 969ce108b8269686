//! Authority level and trust tier classification.
//!
//! Both functions are total and side-effect free. The first matching rule
//! wins, checked from the strongest level down.

use chrono::{DateTime, Utc};
use civitas_types::{
    AuthorityLevel, DocumentType, TrustTier, VerificationMethod, ESTABLISHED_TRUST_SCORE,
};
use serde::{Deserialize, Serialize};

/// What the platform knows about a user's verification so far.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationState {
    pub identity_commitment: Option<String>,
    pub document_type: Option<DocumentType>,
    pub verification_method: Option<VerificationMethod>,
    pub trust_score: i64,
    pub district_verified: bool,
    pub district_verified_at: Option<DateTime<Utc>>,
}

impl VerificationState {
    pub fn has_identity_commitment(&self) -> bool {
        self.identity_commitment
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }

    fn holds_government_credential(&self) -> bool {
        self.has_identity_commitment()
            && self.document_type == Some(DocumentType::MobileDriversLicense)
    }

    fn holds_scanned_passport(&self) -> bool {
        self.has_identity_commitment()
            && self.document_type == Some(DocumentType::Passport)
            && self
                .verification_method
                .map(|m| m.is_passport_scan())
                .unwrap_or(false)
    }

    fn district_attested(&self) -> bool {
        self.district_verified && self.district_verified_at.is_some()
    }
}

pub fn authority_level(state: &VerificationState) -> AuthorityLevel {
    if state.holds_government_credential() {
        AuthorityLevel::GovernmentCredential
    } else if state.holds_scanned_passport() {
        AuthorityLevel::PassportVerified
    } else if state.has_identity_commitment() {
        AuthorityLevel::IdentityVerified
    } else if state.trust_score >= ESTABLISHED_TRUST_SCORE {
        AuthorityLevel::Established
    } else {
        AuthorityLevel::Basic
    }
}

/// Tier for an authenticated user. [`TrustTier::Anonymous`] is never
/// returned; it only appears in policy thresholds.
pub fn trust_tier(state: &VerificationState) -> TrustTier {
    if state.holds_government_credential() {
        TrustTier::GovernmentCredential
    } else if state.holds_scanned_passport() {
        TrustTier::PassportVerified
    } else if state.has_identity_commitment() {
        TrustTier::IdentityVerified
    } else if state.district_attested() {
        TrustTier::DistrictAttested
    } else {
        TrustTier::Authenticated
    }
}

pub fn trust_tier_to_authority_level(tier: TrustTier) -> AuthorityLevel {
    match tier {
        TrustTier::Anonymous | TrustTier::Authenticated => AuthorityLevel::Basic,
        TrustTier::DistrictAttested => AuthorityLevel::Established,
        TrustTier::IdentityVerified => AuthorityLevel::IdentityVerified,
        TrustTier::PassportVerified => AuthorityLevel::PassportVerified,
        TrustTier::GovernmentCredential => AuthorityLevel::GovernmentCredential,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub authority_level: AuthorityLevel,
    pub trust_tier: TrustTier,
}

pub fn classify(state: &VerificationState) -> Classification {
    Classification {
        authority_level: authority_level(state),
        trust_tier: trust_tier(state),
    }
}

/// Policy gate over the two ordinals.
pub fn meets_policy(
    state: &VerificationState,
    min_authority: AuthorityLevel,
    min_tier: TrustTier,
) -> bool {
    let classification = classify(state);
    classification.authority_level.meets(min_authority)
        && classification.trust_tier.meets(min_tier)
}
