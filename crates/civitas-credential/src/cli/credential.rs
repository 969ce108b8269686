use super::commands::OutputFormat;
use super::utils::emit;
use anyhow::Context;
use chrono::Utc;
use civitas_credential::{
    assemble, CredentialBuilder, CredentialConfig, CredentialInputs, CredentialStore,
    HttpKeySource, KeyCache, SledCredentialStore, WitnessEncryptor,
};
use civitas_crypto::{FieldElement, OsRandom};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub(super) fn open_store(config: &CredentialConfig) -> anyhow::Result<SledCredentialStore> {
    Ok(SledCredentialStore::open(&config.storage.path)?)
}

pub fn build_credential(
    config: &CredentialConfig,
    user: &str,
    inputs_path: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(inputs_path)
        .with_context(|| format!("Failed to read {:?}", inputs_path))?;
    let inputs: CredentialInputs =
        serde_json::from_str(&raw).context("Failed to parse credential inputs")?;

    let credential = CredentialBuilder::new(config.credential.ttl_days)?.build(&inputs)?;
    open_store(config)?.put(user, &credential)?;

    emit(
        format,
        &json!({
            "userRoot": credential.user_root,
            "cellMapRoot": credential.cell_map_root,
            "engagementRoot": credential.engagement_root,
            "authorityLevel": credential.authority_level,
            "expiresAt": credential.expires_at,
        }),
        &[
            format!("Credential stored for {}", user),
            format!("User root:       {}", credential.user_root),
            format!("Cell map root:   {}", credential.cell_map_root),
            format!("Engagement root: {}", credential.engagement_root),
            format!("Authority level: {}", credential.authority_level),
            format!("Expires:         {}", credential.expires_at),
        ],
    )
}

pub fn show_credential(
    config: &CredentialConfig,
    user: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let Some(credential) = store.load_valid(user)? else {
        anyhow::bail!("No valid credential for {}; build a new one", user);
    };

    let remaining = credential.remaining_validity();
    emit(
        format,
        &json!({
            "identityFingerprint": credential.identity_commitment.fingerprint(),
            "userRoot": credential.user_root,
            "cellMapRoot": credential.cell_map_root,
            "engagementRoot": credential.engagement_root,
            "authorityLevel": credential.authority_level,
            "engagementTier": credential.engagement_tier,
            "verificationMethod": credential.verification_method,
            "createdAt": credential.created_at,
            "expiresAt": credential.expires_at,
            "remainingDays": remaining.num_days(),
        }),
        &[
            format!("Credential for {}", user),
            format!("Identity:        {}…", credential.identity_commitment.fingerprint()),
            format!("User root:       {}", credential.user_root),
            format!("Cell map root:   {}", credential.cell_map_root),
            format!("Engagement root: {}", credential.engagement_root),
            format!("Authority level: {}", credential.authority_level),
            format!("Engagement tier: {}", credential.engagement_tier),
            format!("Verified via:    {}", credential.verification_method),
            format!("Expires:         {} ({} days left)", credential.expires_at, remaining.num_days()),
        ],
    )
}

pub async fn seal_witness(
    config: &CredentialConfig,
    user: &str,
    action_domain: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let action_domain = FieldElement::from_hex(action_domain).context("Invalid action domain")?;

    let store = open_store(config)?;
    let Some(credential) = store.get(user)? else {
        anyhow::bail!("No credential for {}; build one first", user);
    };
    credential.ensure_valid_at(Utc::now())?;

    let source = HttpKeySource::new(config.require_key_url()?, config.prover.request_timeout())?;
    let encryptor = WitnessEncryptor::with_cache(
        Arc::new(source),
        KeyCache::new(config.prover.key_cache_ttl_secs),
        Arc::new(OsRandom),
    );

    let witness = assemble(&credential, action_domain);
    let sealed = encryptor.encrypt(&witness).await?;
    let json = serde_json::to_string_pretty(&sealed)?;

    match output {
        Some(path) => {
            std::fs::write(path, &json).with_context(|| format!("Failed to write {:?}", path))?;
            info!(key_id = %sealed.tee_key_id, "Sealed witness written to {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn show_config(config: &CredentialConfig, format: OutputFormat) -> anyhow::Result<()> {
    let redacted = config.redacted();
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "platformSaltSet": redacted.platform_salt_set,
                "proverKeyUrl": redacted.key_url,
                "requestTimeoutSecs": redacted.request_timeout_secs,
                "keyCacheTtlSecs": redacted.key_cache_ttl_secs,
                "credentialTtlDays": redacted.ttl_days,
                "storagePath": redacted.storage_path,
                "logLevel": redacted.log_level,
                "logJson": redacted.log_json,
            }))?
        ),
        OutputFormat::Text => print!("{}", redacted),
    }
    Ok(())
}
