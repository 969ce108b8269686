//! Identity commitment derivation.
//!
//! Turns the facts of a verified identity document into a salted SHA-256
//! digest. The same person presenting the same document always lands on the
//! same commitment, which is what lets the registry refuse a second account.
//! The platform salt must never change once commitments have been issued.

use chrono::Datelike;
use civitas_crypto::FieldElement;
use civitas_types::{
    CivitasError, CivitasResult, DocumentType, IdentityProof, MINIMUM_AGE, MIN_BIRTH_YEAR,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use zeroize::Zeroize;

const MAX_DOCUMENT_NUMBER_LEN: usize = 32;
const FINGERPRINT_LEN: usize = 16;

/// SHA-256 output; its text form is 64 lowercase hex characters.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityCommitment([u8; 32]);

impl IdentityCommitment {
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Truncated form safe to write to logs.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.to_hex())
    }

    /// The commitment reduced into the scalar field, for use as a hash input.
    pub fn to_field(&self) -> FieldElement {
        FieldElement::from_be_bytes_reduced(&self.0)
    }
}

impl FromStr for IdentityCommitment {
    type Err = CivitasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits)
            .ok()
            .and_then(|b| <[u8; 32]>::try_from(b.as_slice()).ok())
            .ok_or_else(|| {
                CivitasError::validation("identity_commitment", "expected 64 hex characters")
            })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for IdentityCommitment {
    type Error = CivitasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IdentityCommitment> for String {
    fn from(value: IdentityCommitment) -> String {
        value.to_hex()
    }
}

impl fmt::Debug for IdentityCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityCommitment({}…)", self.fingerprint())
    }
}

impl fmt::Display for IdentityCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub fn fingerprint(commitment: &str) -> String {
    commitment.chars().take(FINGERPRINT_LEN).collect()
}

struct NormalizedIdentity {
    document_number: String,
    nationality: String,
    birth_year: i32,
    document_type: DocumentType,
}

impl Drop for NormalizedIdentity {
    fn drop(&mut self) {
        self.document_number.zeroize();
        self.nationality.zeroize();
        self.birth_year.zeroize();
    }
}

pub fn normalize_document_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn normalize_nationality(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn normalize(proof: &IdentityProof, current_year: i32) -> CivitasResult<NormalizedIdentity> {
    let document_number = normalize_document_number(&proof.document_number);
    if document_number.is_empty() {
        return Err(CivitasError::validation("document_number", "missing"));
    }
    if document_number.len() > MAX_DOCUMENT_NUMBER_LEN {
        return Err(CivitasError::validation(
            "document_number",
            format!("longer than {} characters", MAX_DOCUMENT_NUMBER_LEN),
        ));
    }
    if !document_number.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CivitasError::validation(
            "document_number",
            "may only contain letters and digits",
        ));
    }

    let nationality = normalize_nationality(&proof.nationality);
    if nationality.is_empty() {
        return Err(CivitasError::validation("nationality", "missing"));
    }
    if nationality.len() != 2 || !nationality.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CivitasError::validation(
            "nationality",
            "must be a 2-letter country code",
        ));
    }

    if proof.birth_year < MIN_BIRTH_YEAR || proof.birth_year > current_year {
        return Err(CivitasError::validation(
            "birth_year",
            format!("must be between {} and {}", MIN_BIRTH_YEAR, current_year),
        ));
    }

    let document_type = proof.parsed_document_type()?;
    if !document_type.is_physical() {
        return Err(CivitasError::validation(
            "document_type",
            format!("{} cannot be presented as an identity proof", document_type),
        ));
    }

    Ok(NormalizedIdentity {
        document_number,
        nationality,
        birth_year: proof.birth_year,
        document_type,
    })
}

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

pub fn compute_identity_commitment(
    proof: &IdentityProof,
    platform_salt: Option<&str>,
) -> CivitasResult<IdentityCommitment> {
    compute_identity_commitment_at(proof, platform_salt, current_year())
}

/// As [`compute_identity_commitment`] with an explicit reference year for
/// the birth-year bound.
pub fn compute_identity_commitment_at(
    proof: &IdentityProof,
    platform_salt: Option<&str>,
    current_year: i32,
) -> CivitasResult<IdentityCommitment> {
    let salt = match platform_salt {
        Some(salt) if !salt.is_empty() => salt,
        _ => {
            return Err(CivitasError::Config(
                "platform salt is not configured; refusing to issue commitments".into(),
            ))
        }
    };

    let identity = normalize(proof, current_year)?;

    let mut preimage = format!(
        "{}:{}:{}:{}:{}",
        salt,
        identity.document_number,
        identity.nationality,
        identity.birth_year,
        identity.document_type.as_str()
    );
    let digest: [u8; 32] = Sha256::digest(preimage.as_bytes()).into();
    preimage.zeroize();

    let commitment = IdentityCommitment::from_digest(digest);
    debug!(fingerprint = %commitment.fingerprint(), "Derived identity commitment");
    Ok(commitment)
}

pub fn is_age_eligible(birth_year: i32, current_year: i32) -> bool {
    current_year
        .checked_sub(birth_year)
        .is_some_and(|age| age >= MINIMUM_AGE)
}

pub fn is_age_eligible_now(birth_year: i32) -> bool {
    is_age_eligible(birth_year, current_year())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: Option<&str> = Some("test-salt");

    fn proof() -> IdentityProof {
        IdentityProof::new("X1234567", "us", 1990, "passport")
    }

    #[test]
    fn test_end_to_end_commitment_shape() {
        let commitment = compute_identity_commitment(&proof(), SALT).unwrap();
        assert_eq!(commitment.to_hex().len(), 64);
        assert!(commitment.to_hex().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(commitment, compute_identity_commitment(&proof(), SALT).unwrap());
        assert!(!commitment.to_field().is_zero());
    }

    #[test]
    fn test_known_commitment() {
        let commitment = compute_identity_commitment_at(&proof(), SALT, 2025).unwrap();
        assert_eq!(
            commitment.to_hex(),
            "a8f3a2b3a506e1f5a18ebc84d8365bb636ae6e09a780a8c2c09df93900477d1b"
        );
        assert_eq!(
            commitment.to_field().to_hex(),
            "0x17c6b75b01720178789deb6153b2529ebe12b5303a54570ef4f8187d30477d18"
        );
    }

    #[test]
    fn test_cosmetic_variation_ignored() {
        let spaced = IdentityProof::new("a1 234567", "US", 1990, "passport");
        let plain = IdentityProof::new("A1234567", "us", 1990, "passport");
        let hyphenated = IdentityProof::new("a1-234-567", " us ", 1990, "Passport");

        let expected = compute_identity_commitment(&plain, SALT).unwrap();
        assert_eq!(compute_identity_commitment(&spaced, SALT).unwrap(), expected);
        assert_eq!(compute_identity_commitment(&hyphenated, SALT).unwrap(), expected);
    }

    #[test]
    fn test_each_field_changes_commitment() {
        let base = compute_identity_commitment(&proof(), SALT).unwrap();

        let mut year = proof();
        year.birth_year = 1991;
        assert_ne!(compute_identity_commitment(&year, SALT).unwrap(), base);

        let mut nationality = proof();
        nationality.nationality = "CA".into();
        assert_ne!(compute_identity_commitment(&nationality, SALT).unwrap(), base);

        let mut document_type = proof();
        document_type.document_type = "national_id".into();
        assert_ne!(compute_identity_commitment(&document_type, SALT).unwrap(), base);

        let mut number = proof();
        number.document_number = "X1234568".into();
        assert_ne!(compute_identity_commitment(&number, SALT).unwrap(), base);

        assert_ne!(compute_identity_commitment(&proof(), Some("other-salt")).unwrap(), base);
    }

    #[test]
    fn test_missing_salt_is_config_error() {
        assert!(matches!(
            compute_identity_commitment(&proof(), None),
            Err(CivitasError::Config(_))
        ));
        assert!(matches!(
            compute_identity_commitment(&proof(), Some("")),
            Err(CivitasError::Config(_))
        ));
    }

    #[test]
    fn test_validation_errors_name_the_field() {
        let cases: Vec<(IdentityProof, &str)> = vec![
            (IdentityProof::new("", "US", 1990, "passport"), "document_number"),
            (IdentityProof::new("X12$4567", "US", 1990, "passport"), "document_number"),
            (IdentityProof::new("X1234567", "USA", 1990, "passport"), "nationality"),
            (IdentityProof::new("X1234567", "U1", 1990, "passport"), "nationality"),
            (IdentityProof::new("X1234567", "US", 1899, "passport"), "birth_year"),
            (IdentityProof::new("X1234567", "US", current_year() + 1, "passport"), "birth_year"),
            (IdentityProof::new("X1234567", "US", 1990, "library_card"), "document_type"),
            (IdentityProof::new("X1234567", "US", 1990, ""), "document_type"),
            (IdentityProof::new("X1234567", "US", 1990, "mdl"), "document_type"),
        ];

        for (proof, expected_field) in cases {
            match compute_identity_commitment(&proof, SALT) {
                Err(CivitasError::Validation { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected validation error on {}, got {:?}", expected_field, other),
            }
        }
    }

    #[test]
    fn test_error_messages_do_not_echo_document() {
        let proof = IdentityProof::new("SECRET#99", "US", 1990, "passport");
        let err = compute_identity_commitment(&proof, SALT).unwrap_err();
        assert!(!err.to_string().contains("SECRET"));
    }

    #[test]
    fn test_age_boundary() {
        let year = current_year();
        assert!(is_age_eligible_now(year - 18));
        assert!(!is_age_eligible_now(year - 17));
        assert!(is_age_eligible(2000, 2018));
        assert!(!is_age_eligible(2001, 2018));
        assert!(!is_age_eligible(i32::MAX, i32::MIN));
        assert!(!is_age_eligible(1, i32::MIN));
        assert!(!is_age_eligible(i32::MIN, i32::MAX));
    }

    #[test]
    fn test_fingerprint_truncates() {
        let commitment = compute_identity_commitment(&proof(), SALT).unwrap();
        let hex = commitment.to_hex();
        assert_eq!(commitment.fingerprint().len(), 16);
        assert!(hex.starts_with(&commitment.fingerprint()));
        assert_eq!(fingerprint(&hex), commitment.fingerprint());
        assert!(!format!("{:?}", commitment).contains(&hex));
    }

    #[test]
    fn test_commitment_parse() {
        let commitment = compute_identity_commitment(&proof(), SALT).unwrap();
        let prefixed = format!("0x{}", commitment.to_hex().to_uppercase());
        assert_eq!(prefixed.parse::<IdentityCommitment>().unwrap(), commitment);
        assert!("abc".parse::<IdentityCommitment>().is_err());

        let json = serde_json::to_string(&commitment).unwrap();
        assert_eq!(json, format!("\"{}\"", commitment.to_hex()));
        assert_eq!(serde_json::from_str::<IdentityCommitment>(&json).unwrap(), commitment);
    }

    proptest::proptest! {
        #[test]
        fn prop_spacing_and_case_never_matter(number in "[A-Z][0-9]{7}", split in 1usize..7) {
            let (head, tail) = number.split_at(split);
            let messy = format!("{} {}", head.to_lowercase(), tail);
            let clean = compute_identity_commitment(&IdentityProof::new(number.clone(), "US", 1990, "passport"), SALT).unwrap();
            let noisy = compute_identity_commitment(&IdentityProof::new(messy, "us", 1990, "passport"), SALT).unwrap();
            proptest::prop_assert_eq!(clean, noisy);
        }
    }
}
