//! Configuration management infrastructure.
//!
//! Signing preferences (default digest, packaging, timestamp authority,
//! keystore location and certificate checks) are kept in a TOML file under
//! the user's config directory and can be exported to or imported from TOML,
//! JSON or YAML.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::crypto::DigestAlgorithm;
use crate::domain::parameters::SignaturePackaging;
use crate::domain::types::TimestampUrl;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::timestamp::TimestampConfig;

/// Environment variable consulted for the keystore password or token PIN.
pub const DEFAULT_PIN_ENV_VAR: &str = "TOKEN_SIGNER_PIN";

/// Application configuration with all signing preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfiguration {
    /// Digest algorithm used when none is given on the command line
    pub default_digest_algorithm: String,

    /// Detached or enveloping output
    pub packaging: SignaturePackaging,

    /// PKCS#12 keystore used when no other token is selected
    pub keystore_path: Option<PathBuf>,

    /// Environment variable holding the PIN or keystore password
    pub pin_env_var: String,

    /// Whether to show verbose output
    pub verbose: bool,

    /// Timestamp authority settings
    pub timestamp: TimestampSettings,

    /// Certificate validation preferences
    pub certificate_validation: CertificateValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampSettings {
    /// Timestamp authority; no timestamp is requested when unset
    pub url: Option<String>,

    /// Request timeout
    pub timeout_seconds: u64,

    /// Optional `reqPolicy` OID
    pub policy_oid: Option<String>,
}

/// Certificate validation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateValidationConfig {
    /// Check the signing certificate before the token is used
    pub enabled: bool,

    /// Whether to allow self-signed certificates
    pub allow_self_signed: bool,

    /// Minimum days before expiry to warn about
    pub expiry_warning_days: u32,
}

impl Default for SigningConfiguration {
    fn default() -> Self {
        Self {
            default_digest_algorithm: "sha256".to_string(),
            packaging: SignaturePackaging::Detached,
            keystore_path: None,
            pin_env_var: DEFAULT_PIN_ENV_VAR.to_string(),
            verbose: false,
            timestamp: TimestampSettings::default(),
            certificate_validation: CertificateValidationConfig::default(),
        }
    }
}

impl Default for TimestampSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_seconds: 30,
            policy_oid: None,
        }
    }
}

impl Default for CertificateValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_self_signed: true, // development keystores are usually self-signed
            expiry_warning_days: 30,
        }
    }
}

impl SigningConfiguration {
    pub fn digest_algorithm(&self) -> SigningResult<DigestAlgorithm> {
        self.default_digest_algorithm.parse().map_err(|_| {
            SigningError::ConfigurationError(format!(
                "Invalid digest algorithm: {}",
                self.default_digest_algorithm
            ))
        })
    }

    /// Timestamp settings as a client configuration, `None` when no authority is set.
    pub fn timestamp_config(&self) -> SigningResult<Option<TimestampConfig>> {
        let Some(url) = &self.timestamp.url else {
            return Ok(None);
        };
        let mut config = TimestampConfig::new(TimestampUrl::new(url)?)
            .with_timeout(Duration::from_secs(self.timestamp.timeout_seconds));
        if let Some(oid) = &self.timestamp.policy_oid {
            config = config.with_policy_oid(oid.clone());
        }
        Ok(Some(config))
    }

    /// Validate configuration values
    pub fn validate(&self) -> SigningResult<()> {
        self.digest_algorithm()?;
        if let Some(url) = &self.timestamp.url {
            TimestampUrl::new(url)?;
        }
        if self.timestamp.timeout_seconds == 0 {
            return Err(SigningError::ConfigurationError(
                "Timestamp timeout must be greater than 0".to_string(),
            ));
        }
        if self.pin_env_var.trim().is_empty() {
            return Err(SigningError::ConfigurationError(
                "PIN environment variable name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> SigningResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> SigningResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("token-signer").join("config.toml"))
        } else {
            Ok(PathBuf::from("token-signer-config.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> SigningResult<SigningConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = SigningConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load the file if present, otherwise defaults without touching disk.
    pub fn load_or_default(&self) -> SigningResult<SigningConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            Ok(SigningConfiguration::default())
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> SigningResult<SigningConfiguration> {
        log::debug!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: SigningConfiguration = toml::from_str(&content).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &SigningConfiguration) -> SigningResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigningError::ConfigurationError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;
        Ok(())
    }

    /// Update a specific configuration value
    pub fn update_value(&self, key: &str, value: &str) -> SigningResult<()> {
        let mut config = self.load_or_default()?;

        match key {
            "default_digest_algorithm" => {
                value.parse::<DigestAlgorithm>().map_err(|_| {
                    SigningError::ConfigurationError(format!("Invalid digest algorithm: {value}"))
                })?;
                config.default_digest_algorithm = value.to_ascii_lowercase();
            }
            "packaging" => {
                config.packaging = value
                    .parse()
                    .map_err(|e: SigningError| SigningError::ConfigurationError(e.to_string()))?;
            }
            "timestamp.url" => {
                config.timestamp.url = if value.is_empty() {
                    None
                } else {
                    TimestampUrl::new(value)?;
                    Some(value.to_string())
                };
            }
            "timestamp.timeout_seconds" => {
                config.timestamp.timeout_seconds = parse_value(value)?;
            }
            "timestamp.policy_oid" => {
                config.timestamp.policy_oid = (!value.is_empty()).then(|| value.to_string());
            }
            "keystore_path" => {
                config.keystore_path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "pin_env_var" => {
                config.pin_env_var = value.to_string();
            }
            "certificate_validation.enabled" => {
                config.certificate_validation.enabled = parse_value(value)?;
            }
            "certificate_validation.allow_self_signed" => {
                config.certificate_validation.allow_self_signed = parse_value(value)?;
            }
            "certificate_validation.expiry_warning_days" => {
                config.certificate_validation.expiry_warning_days = parse_value(value)?;
            }
            "verbose" => {
                config.verbose = parse_value(value)?;
            }
            _ => {
                return Err(SigningError::ConfigurationError(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        config.validate()?;
        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> SigningResult<String> {
        let config = self.load_or_default()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("TOML export failed: {e}"))),
            ExportFormat::Json => serde_json::to_string_pretty(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("JSON export failed: {e}"))),
            ExportFormat::Yaml => serde_yaml::to_string(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("YAML export failed: {e}"))),
        }
    }

    /// Import configuration from a string
    pub fn import_config(&self, content: &str, format: ExportFormat) -> SigningResult<()> {
        let config: SigningConfiguration = match format {
            ExportFormat::Toml => toml::from_str(content).map_err(|e| {
                SigningError::ConfigurationError(format!("TOML import failed: {e}"))
            })?,
            ExportFormat::Json => serde_json::from_str(content).map_err(|e| {
                SigningError::ConfigurationError(format!("JSON import failed: {e}"))
            })?,
            ExportFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                SigningError::ConfigurationError(format!("YAML import failed: {e}"))
            })?,
        };

        config.validate()?;
        self.save(&config)
    }
}

/// Configuration export/import formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Toml,
    Json,
    Yaml,
}

impl std::str::FromStr for ExportFormat {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(ExportFormat::Toml),
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            other => Err(SigningError::ConfigurationError(format!(
                "Unknown export format: {other}"
            ))),
        }
    }
}

fn parse_value<T: std::str::FromStr>(value: &str) -> SigningResult<T> {
    value
        .parse()
        .map_err(|_| SigningError::ConfigurationError(format!("Invalid value: {value}")))
}
