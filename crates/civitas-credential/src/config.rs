use civitas_types::{
    CivitasError, CivitasResult, DEFAULT_CREDENTIAL_TTL_DAYS, MAX_CREDENTIAL_TTL_DAYS,
    PROVER_KEY_CACHE_TTL_SECS,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    pub key_url: Option<String>,
    pub request_timeout_secs: u64,
    pub key_cache_ttl_secs: u64,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            key_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            key_cache_ttl_secs: PROVER_KEY_CACHE_TTL_SECS,
        }
    }
}

impl ProverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialPolicyConfig {
    pub ttl_days: i64,
}

impl Default for CredentialPolicyConfig {
    fn default() -> Self {
        Self {
            ttl_days: DEFAULT_CREDENTIAL_TTL_DAYS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: home.join(".civitas").join("credentials"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Salt mixed into every identity commitment. Must never change once
    /// commitments have been issued.
    pub platform_salt: Option<String>,
    /// Device secret that user entropy is sealed under at rest.
    pub device_secret: Option<String>,
    pub prover: ProverConfig,
    pub credential: CredentialPolicyConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl CredentialConfig {
    pub fn load(path: impl AsRef<Path>) -> CivitasResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| CivitasError::Config(format!("Failed to read config: {}", e)))?;

            toml::from_str(&contents)
                .map_err(|e| CivitasError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> CivitasResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CivitasError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CivitasError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| CivitasError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".civitas")
            .join("config.toml")
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(salt) = lookup("CIVITAS_PLATFORM_SALT") {
            self.platform_salt = Some(salt);
        }

        if let Some(secret) = lookup("CIVITAS_DEVICE_SECRET") {
            self.device_secret = Some(secret);
        }

        if let Some(url) = lookup("CIVITAS_PROVER_KEY_URL") {
            self.prover.key_url = Some(url);
        }

        if let Some(dir) = lookup("CIVITAS_DATA_DIR") {
            self.storage.path = PathBuf::from(dir);
        }

        if let Some(level) = lookup("CIVITAS_LOG_LEVEL") {
            let level = level.to_lowercase();
            if LOG_LEVELS.contains(&level.as_str()) {
                self.logging.level = level;
            } else {
                warn!("Ignoring unknown CIVITAS_LOG_LEVEL '{}'", level);
            }
        }

        if lookup("CIVITAS_LOG_JSON").is_some() {
            self.logging.json = true;
        }
    }

    pub fn validate(&self) -> CivitasResult<()> {
        if let Some(salt) = &self.platform_salt {
            if salt.is_empty() {
                return Err(CivitasError::Config("platform_salt is set but empty".into()));
            }
        }

        if let Some(secret) = &self.device_secret {
            if secret.is_empty() {
                return Err(CivitasError::Config("device_secret is set but empty".into()));
            }
        }

        if let Some(url) = &self.prover.key_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(CivitasError::Config(format!(
                    "prover.key_url must be an http(s) URL, got '{}'",
                    url
                )));
            }
            if url.starts_with("http://") {
                warn!("prover.key_url is not HTTPS; the enclave key is fetched in the clear");
            }
        }

        if self.prover.request_timeout_secs == 0 {
            return Err(CivitasError::Config(
                "prover.request_timeout_secs cannot be 0".into(),
            ));
        }

        if self.prover.key_cache_ttl_secs == 0
            || self.prover.key_cache_ttl_secs > PROVER_KEY_CACHE_TTL_SECS
        {
            return Err(CivitasError::Config(format!(
                "prover.key_cache_ttl_secs must be between 1 and {}",
                PROVER_KEY_CACHE_TTL_SECS
            )));
        }

        if !(1..=MAX_CREDENTIAL_TTL_DAYS).contains(&self.credential.ttl_days) {
            return Err(CivitasError::Config(format!(
                "credential.ttl_days must be between 1 and {}",
                MAX_CREDENTIAL_TTL_DAYS
            )));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(CivitasError::Config(format!(
                "logging.level must be one of {:?}",
                LOG_LEVELS
            )));
        }

        Ok(())
    }

    /// The platform salt, or a configuration error if none is set.
    pub fn require_platform_salt(&self) -> CivitasResult<&str> {
        match self.platform_salt.as_deref() {
            Some(salt) if !salt.is_empty() => Ok(salt),
            _ => Err(CivitasError::Config(
                "platform_salt is not configured (set CIVITAS_PLATFORM_SALT)".into(),
            )),
        }
    }

    /// The device secret, or a configuration error if none is set.
    pub fn require_device_secret(&self) -> CivitasResult<&[u8]> {
        match self.device_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(secret.as_bytes()),
            _ => Err(CivitasError::Config(
                "device_secret is not configured (set CIVITAS_DEVICE_SECRET)".into(),
            )),
        }
    }

    pub fn require_key_url(&self) -> CivitasResult<&str> {
        self.prover.key_url.as_deref().ok_or_else(|| {
            CivitasError::Config(
                "prover.key_url is not configured (set CIVITAS_PROVER_KEY_URL)".into(),
            )
        })
    }

    pub fn redacted(&self) -> RedactedConfig {
        RedactedConfig {
            platform_salt_set: self.platform_salt.is_some(),
            device_secret_set: self.device_secret.is_some(),
            key_url: self.prover.key_url.clone(),
            request_timeout_secs: self.prover.request_timeout_secs,
            key_cache_ttl_secs: self.prover.key_cache_ttl_secs,
            ttl_days: self.credential.ttl_days,
            storage_path: self.storage.path.clone(),
            log_level: self.logging.level.clone(),
            log_json: self.logging.json,
        }
    }
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.redacted(), f)
    }
}

#[derive(Debug)]
pub struct RedactedConfig {
    pub platform_salt_set: bool,
    pub device_secret_set: bool,
    pub key_url: Option<String>,
    pub request_timeout_secs: u64,
    pub key_cache_ttl_secs: u64,
    pub ttl_days: i64,
    pub storage_path: PathBuf,
    pub log_level: String,
    pub log_json: bool,
}

impl fmt::Display for RedactedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Civitas Credential Configuration")?;
        writeln!(f, "================================")?;
        writeln!(
            f,
            "Platform salt: {}",
            if self.platform_salt_set { "[SET]" } else { "[MISSING]" }
        )?;
        writeln!(
            f,
            "Device secret: {}",
            if self.device_secret_set { "[SET]" } else { "[MISSING]" }
        )?;
        writeln!(
            f,
            "Prover key URL: {}",
            self.key_url.as_deref().unwrap_or("(not configured)")
        )?;
        writeln!(f, "Request timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "Key cache TTL: {}s", self.key_cache_ttl_secs)?;
        writeln!(f, "Credential TTL: {} days", self.ttl_days)?;
        writeln!(f, "Storage: {:?}", self.storage_path)?;
        writeln!(f, "Logging: {} (json: {})", self.log_level, self.log_json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config_validation() {
        let config = CredentialConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.prover.key_cache_ttl_secs, 3600);
        assert_eq!(config.credential.ttl_days, 180);
        assert!(config.storage.path.ends_with(".civitas/credentials"));
    }

    #[test]
    fn test_missing_salt_is_config_error() {
        let config = CredentialConfig::default();
        assert!(matches!(
            config.require_platform_salt(),
            Err(CivitasError::Config(_))
        ));
        assert!(matches!(config.require_key_url(), Err(CivitasError::Config(_))));
        assert!(matches!(
            config.require_device_secret(),
            Err(CivitasError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CredentialConfig::default();
        config.apply_overrides(env(&[
            ("CIVITAS_PLATFORM_SALT", "pepper"),
            ("CIVITAS_DEVICE_SECRET", "laptop-key"),
            ("CIVITAS_PROVER_KEY_URL", "https://prover.example/key"),
            ("CIVITAS_DATA_DIR", "/tmp/civitas"),
            ("CIVITAS_LOG_LEVEL", "DEBUG"),
            ("CIVITAS_LOG_JSON", "1"),
        ]));

        assert_eq!(config.require_platform_salt().unwrap(), "pepper");
        assert_eq!(config.require_device_secret().unwrap(), b"laptop-key");
        assert_eq!(config.require_key_url().unwrap(), "https://prover.example/key");
        assert_eq!(config.storage.path, PathBuf::from("/tmp/civitas"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_log_level_ignored() {
        let mut config = CredentialConfig::default();
        config.apply_overrides(env(&[("CIVITAS_LOG_LEVEL", "loud")]));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = CredentialConfig::default();
        config.prover.key_cache_ttl_secs = 7200;
        assert!(config.validate().is_err());

        let mut config = CredentialConfig::default();
        config.prover.key_url = Some("ftp://prover".into());
        assert!(config.validate().is_err());

        let mut config = CredentialConfig::default();
        config.credential.ttl_days = 0;
        assert!(config.validate().is_err());

        let mut config = CredentialConfig::default();
        config.credential.ttl_days = 1_000_000_000;
        assert!(config.validate().is_err());
        config.credential.ttl_days = MAX_CREDENTIAL_TTL_DAYS;
        assert!(config.validate().is_ok());

        let mut config = CredentialConfig::default();
        config.platform_salt = Some(String::new());
        assert!(config.validate().is_err());

        let mut config = CredentialConfig::default();
        config.device_secret = Some(String::new());
        assert!(config.validate().is_err());

        let mut config = CredentialConfig::default();
        config.prover.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CredentialConfig = toml::from_str(
            r#"
            platform_salt = "s3cret"

            [prover]
            key_url = "https://prover.example/key"
            "#,
        )
        .unwrap();
        assert_eq!(config.prover.key_cache_ttl_secs, 3600);
        assert_eq!(config.credential.ttl_days, 180);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("civitas-config-test-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut config = CredentialConfig::default();
        config.credential.ttl_days = 30;
        config.prover.key_url = Some("https://prover.example/key".into());
        config.save(&path).unwrap();

        let loaded = CredentialConfig::load(&path).unwrap();
        assert_eq!(loaded.credential.ttl_days, 30);
        assert_eq!(
            loaded.prover.key_url.as_deref(),
            Some("https://prover.example/key")
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_redacted_hides_salt() {
        let mut config = CredentialConfig::default();
        config.platform_salt = Some("do-not-print".into());
        config.device_secret = Some("keep-this-quiet".into());
        let shown = config.redacted().to_string();
        assert!(shown.contains("[SET]"));
        assert!(!shown.contains("do-not-print"));
        assert!(!shown.contains("keep-this-quiet"));
        assert!(!format!("{:?}", config).contains("do-not-print"));
        assert!(!format!("{:?}", config).contains("keep-this-quiet"));
    }
}
