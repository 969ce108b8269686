use super::commands::OutputFormat;
use super::credential::open_store;
use super::utils::emit;
use anyhow::Context;
use chrono::{DateTime, Utc};
use civitas_credential::{
    classify, compute_identity_commitment, derive_user_secret, is_age_eligible_now,
    CredentialConfig, VerificationState,
};
use civitas_crypto::OsRandom;
use civitas_types::{DocumentType, IdentityProof, VerificationMethod};
use serde_json::json;
use zeroize::Zeroizing;

pub fn derive_commitment(
    config: &CredentialConfig,
    proof: IdentityProof,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let salt = config.require_platform_salt()?;
    let commitment = compute_identity_commitment(&proof, Some(salt))?;
    let age_eligible = is_age_eligible_now(proof.birth_year);

    emit(
        format,
        &json!({
            "identityCommitment": commitment.to_hex(),
            "fingerprint": commitment.fingerprint(),
            "ageEligible": age_eligible,
        }),
        &[
            format!("Identity commitment: {}", commitment),
            format!("Age eligible: {}", if age_eligible { "yes" } else { "no" }),
        ],
    )
}

pub fn new_entropy(config: &CredentialConfig, user: &str, format: OutputFormat) -> anyhow::Result<()> {
    let device_secret = config.require_device_secret()?;
    let store = open_store(config)?;
    let (_, created) = store.load_or_create_entropy(user, device_secret, &OsRandom)?;

    emit(
        format,
        &json!({ "user": user, "created": created }),
        &[if created {
            format!("Sealed new entropy for {}", user)
        } else {
            format!("Entropy for {} already exists; left unchanged", user)
        }],
    )
}

pub fn derive_secret(
    config: &CredentialConfig,
    user: &str,
    commitment: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let device_secret = config.require_device_secret()?;
    let sealed = open_store(config)?
        .get_sealed_entropy(user)?
        .with_context(|| format!("No entropy stored for {}; run `civitas entropy` first", user))?;
    let entropy = Zeroizing::new(sealed.open(device_secret)?.to_hex());

    let secret = derive_user_secret(commitment, &entropy)?;
    emit(
        format,
        &json!({ "userSecret": secret }),
        &[format!("User secret: {}", secret)],
    )
}

fn verification_state(
    commitment: Option<String>,
    document_type: Option<String>,
    method: Option<String>,
    trust_score: i64,
    district_verified: bool,
    district_verified_at: Option<DateTime<Utc>>,
) -> anyhow::Result<VerificationState> {
    let document_type = document_type
        .map(|d| d.parse::<DocumentType>())
        .transpose()?;
    let verification_method = method
        .map(|m| m.parse::<VerificationMethod>())
        .transpose()?;

    Ok(VerificationState {
        identity_commitment: commitment,
        document_type,
        verification_method,
        trust_score,
        district_verified,
        district_verified_at,
    })
}

pub fn classify_state(
    commitment: Option<String>,
    document_type: Option<String>,
    method: Option<String>,
    trust_score: i64,
    district_verified: bool,
    district_verified_at: Option<DateTime<Utc>>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let state = verification_state(
        commitment,
        document_type,
        method,
        trust_score,
        district_verified,
        district_verified_at,
    )?;
    let classification = classify(&state);

    emit(
        format,
        &classification,
        &[
            format!("Authority level: {}", classification.authority_level),
            format!("Trust tier: {}", classification.trust_tier),
        ],
    )
}
