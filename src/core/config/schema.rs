//! core::config::schema
//!
//! Configuration schema types.
//!
//! The global and repo files share one shape; repo values override global
//! ones key by key.
//!
//! # Example
//!
//! ```toml
//! [azure]
//! org_url = "https://dev.azure.com/contoso"
//! api_version = "6.0"
//!
//! [timeouts]
//! git_secs = 120
//! http_secs = 30
//!
//! [pr]
//! strict_branch_match = true
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: the organization URL must be an
//! absolute http(s) URL and timeouts must be positive.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Every settable key, in display order.
pub const KEYS: &[&str] = &[
    "azure.org_url",
    "azure.api_version",
    "timeouts.git_secs",
    "timeouts.http_secs",
    "pr.strict_branch_match",
];

/// Contents of one config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub azure: Option<AzureConfig>,
    pub timeouts: Option<TimeoutConfig>,
    pub pr: Option<PrConfig>,
}

/// Hosted-API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AzureConfig {
    /// Organization URL, e.g. `https://dev.azure.com/contoso`
    pub org_url: Option<String>,

    /// REST `api-version` query value
    pub api_version: Option<String>,
}

/// Timeouts in seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    pub git_secs: Option<u64>,
    pub http_secs: Option<u64>,
}

/// Pull request defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PrConfig {
    /// Require both branches to exist on the matched repository
    pub strict_branch_match: Option<bool>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(azure) = &self.azure {
            if let Some(org_url) = &azure.org_url {
                validate_org_url(org_url)?;
            }
            if let Some(version) = &azure.api_version {
                if version.trim().is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "azure.api_version cannot be empty".to_string(),
                    ));
                }
            }
        }

        if let Some(timeouts) = &self.timeouts {
            for (key, value) in [
                ("timeouts.git_secs", timeouts.git_secs),
                ("timeouts.http_secs", timeouts.http_secs),
            ] {
                if value == Some(0) {
                    return Err(ConfigError::InvalidValue(format!(
                        "{} must be greater than zero",
                        key
                    )));
                }
            }
        }

        Ok(())
    }

    /// Read a value by dotted key. `Ok(None)` means the key is unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownKey` for keys outside [`KEYS`].
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let azure = self.azure.as_ref();
        let timeouts = self.timeouts.as_ref();
        let value = match key {
            "azure.org_url" => azure.and_then(|a| a.org_url.clone()),
            "azure.api_version" => azure.and_then(|a| a.api_version.clone()),
            "timeouts.git_secs" => timeouts.and_then(|t| t.git_secs).map(|v| v.to_string()),
            "timeouts.http_secs" => timeouts.and_then(|t| t.http_secs).map(|v| v.to_string()),
            "pr.strict_branch_match" => self
                .pr
                .as_ref()
                .and_then(|p| p.strict_branch_match)
                .map(|v| v.to_string()),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set a value by dotted key, parsing it for the key's type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` or `InvalidValue`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "azure.org_url" => {
                validate_org_url(value)?;
                self.azure.get_or_insert_with(Default::default).org_url = Some(value.to_string());
            }
            "azure.api_version" => {
                self.azure.get_or_insert_with(Default::default).api_version =
                    Some(value.to_string());
            }
            "timeouts.git_secs" => {
                self.timeouts.get_or_insert_with(Default::default).git_secs =
                    Some(parse_secs(key, value)?);
            }
            "timeouts.http_secs" => {
                self.timeouts.get_or_insert_with(Default::default).http_secs =
                    Some(parse_secs(key, value)?);
            }
            "pr.strict_branch_match" => {
                let flag = value.parse::<bool>().map_err(|_| {
                    ConfigError::InvalidValue(format!("{} must be true or false", key))
                })?;
                self.pr.get_or_insert_with(Default::default).strict_branch_match = Some(flag);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        self.validate()
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} must be a whole number of seconds", key)))
}

fn validate_org_url(value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::InvalidValue(format!("invalid azure.org_url '{}': {}", value, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidValue(format!(
            "azure.org_url must use http or https, not '{}'",
            other
        ))),
    }
}
