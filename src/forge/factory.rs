//! forge::factory
//!
//! Forge selection and creation.
//!
//! # Design
//!
//! Commands call [`create_forge`] rather than constructing a forge directly.
//! The provider is detected from the origin URL:
//!
//! - Azure DevOps origins (`dev.azure.com`, `ssh.dev.azure.com`,
//!   `*.visualstudio.com`) → `AzureDevOpsForge`
//! - GitHub origins → `NotImplemented` (only compare links are supported)
//! - Anything else → `NotFound`
//!
//! A configured organization URL skips detection and always selects Azure
//! DevOps.

use std::time::Duration;

use tracing::debug;

use super::azure::{AzureDevOpsForge, DEFAULT_API_VERSION, DEFAULT_HTTP_TIMEOUT};
use super::traits::{Forge, ForgeError};
use crate::git::remote::{HostProvider, RemoteUrl};

/// Settings for building a forge.
#[derive(Debug, Clone)]
pub struct ForgeOptions {
    /// Organization URL; derived from the origin when `None`.
    pub org_url: Option<String>,
    pub api_version: String,
    pub http_timeout: Duration,
}

impl Default for ForgeOptions {
    fn default() -> Self {
        Self {
            org_url: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Detect the hosting provider of an origin URL.
///
/// Returns `HostProvider::Unknown` for URLs that cannot be parsed.
///
/// # Example
///
/// ```
/// use gitops_scaffold::forge::detect_provider;
/// use gitops_scaffold::git::HostProvider;
///
/// assert_eq!(
///     detect_provider("git@ssh.dev.azure.com:v3/org/project/repo"),
///     HostProvider::AzureDevOps
/// );
/// assert_eq!(detect_provider("https://example.com/x.git"), HostProvider::Unknown);
/// ```
pub fn detect_provider(origin_url: &str) -> HostProvider {
    RemoteUrl::parse(origin_url)
        .map(|r| r.provider())
        .unwrap_or(HostProvider::Unknown)
}

/// Create a forge for the repository behind `origin_url`.
///
/// # Errors
///
/// - `NotImplemented` for GitHub origins
/// - `NotFound` when the provider or organization cannot be determined
/// - `AuthRequired` when `token` is empty
pub fn create_forge(
    origin_url: &str,
    token: &str,
    options: &ForgeOptions,
) -> Result<Box<dyn Forge>, ForgeError> {
    let org_url = match &options.org_url {
        Some(url) => url.clone(),
        None => derive_org_url(origin_url)?,
    };
    debug!(%org_url, "selected Azure DevOps organization");

    let forge = AzureDevOpsForge::new(&org_url, token, options.http_timeout)?
        .with_api_version(options.api_version.clone());
    Ok(Box::new(forge))
}

fn derive_org_url(origin_url: &str) -> Result<String, ForgeError> {
    let remote = RemoteUrl::parse(origin_url).map_err(|e| ForgeError::NotFound(e.to_string()))?;

    match remote.provider() {
        HostProvider::AzureDevOps => remote.azure_org_url().ok_or_else(|| {
            ForgeError::NotFound(format!(
                "Could not determine the Azure DevOps organization from '{}'. \
                 Pass --org-url or set azure.org_url.",
                origin_url
            ))
        }),
        HostProvider::GitHub => Err(ForgeError::NotImplemented(
            "automated pull requests are only supported for Azure DevOps; \
             use `gops pr link` to get a compare link for GitHub"
                .into(),
        )),
        HostProvider::Unknown => Err(ForgeError::NotFound(format!(
            "Could not detect a supported provider from remote URL: {}. \
             Supported: azure-devops",
            origin_url
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn azure_origin_creates_forge() {
        let forge = create_forge(
            "git@ssh.dev.azure.com:v3/contoso/p/r",
            "token1234",
            &ForgeOptions::default(),
        )
        .unwrap();
        assert_eq!(forge.name(), "azure-devops");
    }

    #[test]
    fn org_url_derived_from_origin() {
        assert_eq!(
            derive_org_url("https://contoso@dev.azure.com/contoso/p/_git/r").unwrap(),
            "https://dev.azure.com/contoso"
        );
        assert_eq!(
            derive_org_url("https://contoso.visualstudio.com/p/_git/r").unwrap(),
            "https://dev.azure.com/contoso"
        );
    }

    #[test]
    fn explicit_org_url_skips_detection() {
        let options = ForgeOptions {
            org_url: Some("https://dev.azure.com/contoso".into()),
            ..Default::default()
        };
        assert!(create_forge("https://example.com/anything.git", "token", &options).is_ok());
    }

    #[test]
    fn github_not_implemented() {
        let err = create_forge("https://github.com/o/r.git", "t", &ForgeOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, ForgeError::NotImplemented(_)));
    }

    #[test]
    fn unknown_not_found() {
        let err = create_forge("https://gitlab.com/o/r.git", "t", &ForgeOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, ForgeError::NotFound(_)));
    }

    #[test]
    fn empty_token_auth_required() {
        let err = create_forge(
            "git@ssh.dev.azure.com:v3/contoso/p/r",
            "",
            &ForgeOptions::default(),
        )
        .err()
        .unwrap();
        assert_eq!(err, ForgeError::AuthRequired);
    }
}
