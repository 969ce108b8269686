use crate::commitment::IdentityCommitment;
use chrono::{DateTime, Duration, Utc};
use civitas_crypto::FieldElement;
use civitas_types::{
    AuthorityLevel, CivitasError, CivitasResult, VerificationMethod, FIELD_ELEMENT_SIZE,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Everything a client needs to request proofs for one verified identity.
///
/// Field elements, and the integer counters alongside them, serialize as
/// canonical field-element hex strings, so the JSON form is lossless. The user secret and registration salt are private proof inputs
/// and never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredential {
    pub identity_commitment: IdentityCommitment,

    // Tree 1: user identity
    #[serde(with = "field_hex")]
    pub leaf_index: u64,
    pub user_root: FieldElement,
    pub user_path: Vec<FieldElement>,

    // Tree 2: cell to district mapping
    pub cell_id: FieldElement,
    pub cell_map_root: FieldElement,
    pub cell_map_path: Vec<FieldElement>,
    pub cell_map_path_bits: Vec<bool>,
    pub districts: Vec<FieldElement>,

    pub authority_level: AuthorityLevel,
    pub user_secret: FieldElement,
    pub registration_salt: FieldElement,

    // Tree 3: engagement
    pub engagement_root: FieldElement,
    pub engagement_path: Vec<FieldElement>,
    #[serde(with = "field_hex")]
    pub engagement_index: u64,
    #[serde(with = "field_hex")]
    pub engagement_tier: u8,
    #[serde(with = "field_hex")]
    pub action_count: u64,
    #[serde(with = "field_hex")]
    pub diversity_score: u64,

    pub verification_method: VerificationMethod,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionCredential {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Errors with [`CivitasError::Expired`] once the credential must be
    /// regenerated.
    pub fn ensure_valid_at(&self, now: DateTime<Utc>) -> CivitasResult<()> {
        if self.is_expired_at(now) {
            return Err(CivitasError::Expired(self.expires_at));
        }
        Ok(())
    }

    pub fn remaining_validity(&self) -> Duration {
        self.remaining_validity_at(Utc::now())
    }

    pub fn remaining_validity_at(&self, now: DateTime<Utc>) -> Duration {
        let remaining = self.expires_at - now;
        if remaining < Duration::zero() {
            Duration::zero()
        } else {
            remaining
        }
    }
}

/// Integers written as field-element hex. Values above 64 bits, or above the
/// target type's range, are rejected on read.
mod field_hex {
    use super::*;
    use serde::de::Error;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Copy + Into<u64>,
        S: Serializer,
    {
        FieldElement::from_u64((*value).into()).serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: TryFrom<u64>,
        D: Deserializer<'de>,
    {
        let bytes = FieldElement::deserialize(deserializer)?.to_be_bytes();
        let (high, low) = bytes.split_at(FIELD_ELEMENT_SIZE - 8);
        if high.iter().any(|b| *b != 0) {
            return Err(D::Error::custom("integer field does not fit in 64 bits"));
        }
        let mut word = [0u8; 8];
        word.copy_from_slice(low);
        T::try_from(u64::from_be_bytes(word))
            .map_err(|_| D::Error::custom("integer field is out of range"))
    }
}

fn short(value: &FieldElement) -> String {
    let hex = value.to_hex();
    format!("{}…", &hex[..18])
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("identity_commitment", &self.identity_commitment)
            .field("leaf_index", &self.leaf_index)
            .field("user_root", &short(&self.user_root))
            .field("cell_map_root", &short(&self.cell_map_root))
            .field("engagement_root", &short(&self.engagement_root))
            .field("districts", &self.districts.iter().filter(|d| !d.is_zero()).count())
            .field("authority_level", &self.authority_level)
            .field("engagement_tier", &self.engagement_tier)
            .field("verification_method", &self.verification_method)
            .field("user_secret", &"[REDACTED]")
            .field("registration_salt", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
