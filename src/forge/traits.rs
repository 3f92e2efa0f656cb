//! forge::traits
//!
//! Forge trait definition for the hosted git API.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is network I/O. It
//! covers exactly what automated pull request creation needs: list the
//! repositories visible to the token, list one repository's branches, and
//! open a pull request.
//!
//! Forge calls happen only after the branch was pushed, so a forge failure
//! never affects the local repository.
//!
//! # Example
//!
//! ```ignore
//! use gitops_scaffold::forge::{CreatePrRequest, Forge, ForgeError};
//!
//! async fn open(forge: &dyn Forge, repo_id: &str) -> Result<(), ForgeError> {
//!     let pr = forge.create_pr(CreatePrRequest {
//!         repository_id: repo_id.to_string(),
//!         source: "gops-1a2b3c4d".parse().unwrap(),
//!         target: "main".parse().unwrap(),
//!         title: "Add west cluster".to_string(),
//!         description: None,
//!     }).await?;
//!     println!("Created PR #{}: {}", pr.id, pr.url);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{BranchName, RefName};

/// Errors from forge operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but no token is available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network, timeout or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The operation is not supported for this provider.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

/// A repository record returned by the hosted API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Opaque repository id.
    pub id: String,
    pub name: String,
    /// API URL of the repository.
    pub url: String,
    pub ssh_url: Option<String>,
    pub web_url: Option<String>,
    /// Clone URL over HTTPS.
    pub remote_url: Option<String>,
}

impl Repository {
    /// All URLs under which this repository is known.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(
            [&self.ssh_url, &self.web_url, &self.remote_url]
                .into_iter()
                .filter_map(|u| u.as_deref()),
        )
    }

    /// Whether any of the repository's URLs equals `origin` exactly.
    pub fn matches_origin(&self, origin: &str) -> bool {
        self.urls().any(|u| u == origin)
    }
}

/// Request to create a pull request.
#[derive(Debug, Clone)]
pub struct CreatePrRequest {
    /// Repository the pull request is opened in.
    pub repository_id: String,
    /// Branch with the changes.
    pub source: BranchName,
    /// Branch to merge into.
    pub target: BranchName,
    pub title: String,
    pub description: Option<String>,
}

impl CreatePrRequest {
    pub fn source_ref(&self) -> RefName {
        RefName::for_branch(&self.source)
    }

    pub fn target_ref(&self) -> RefName {
        RefName::for_branch(&self.target)
    }
}

/// Pull request status as reported by the hosted API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrStatus {
    Active,
    Completed,
    Abandoned,
    Other(String),
}

impl PrStatus {
    pub fn from_api(status: &str) -> Self {
        match status {
            "active" => PrStatus::Active,
            "completed" => PrStatus::Completed,
            "abandoned" => PrStatus::Abandoned,
            other => PrStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for PrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrStatus::Active => write!(f, "active"),
            PrStatus::Completed => write!(f, "completed"),
            PrStatus::Abandoned => write!(f, "abandoned"),
            PrStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub id: u64,
    /// Web URL for viewing.
    pub url: String,
    pub status: PrStatus,
    pub source_ref: String,
    pub target_ref: String,
    pub title: String,
}

/// The Forge trait for the hosted git API.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: ask for a valid token
/// - `NotFound`: the organization or repository does not exist
/// - `RateLimited`: back off and retry
/// - `ApiError`: display the message to the user
/// - `NetworkError`: check connectivity
#[async_trait]
pub trait Forge: Send + Sync {
    /// Forge name (e.g. "azure-devops").
    fn name(&self) -> &'static str;

    /// All repositories visible to the credentials.
    async fn list_repositories(&self) -> Result<Vec<Repository>, ForgeError>;

    /// Branch names (without `refs/heads/`) of one repository.
    async fn list_branches(&self, repository_id: &str) -> Result<Vec<String>, ForgeError>;

    /// Open a pull request.
    ///
    /// # Errors
    ///
    /// - `AuthFailed` if the token lacks permission to contribute
    /// - `ApiError` if the API rejects the request (e.g. an active pull
    ///   request for the same branches already exists)
    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Repository {
        Repository {
            id: "1".into(),
            name: "infra".into(),
            url: "https://dev.azure.com/o/_apis/git/repositories/1".into(),
            ssh_url: Some("git@ssh.dev.azure.com:v3/o/p/infra".into()),
            web_url: Some("https://dev.azure.com/o/p/_git/infra".into()),
            remote_url: None,
        }
    }

    #[test]
    fn matches_any_url_exactly() {
        let r = repo();
        assert!(r.matches_origin("git@ssh.dev.azure.com:v3/o/p/infra"));
        assert!(r.matches_origin("https://dev.azure.com/o/p/_git/infra"));
        assert!(!r.matches_origin("https://dev.azure.com/o/p/_git/infra.git"));
        assert!(!r.matches_origin(""));
    }

    #[test]
    fn urls_skip_absent() {
        assert_eq!(repo().urls().count(), 3);
    }

    #[test]
    fn request_refs() {
        let req = CreatePrRequest {
            repository_id: "1".into(),
            source: BranchName::new("gops-1").unwrap(),
            target: BranchName::new("main").unwrap(),
            title: "t".into(),
            description: None,
        };
        assert_eq!(req.source_ref().as_str(), "refs/heads/gops-1");
        assert_eq!(req.target_ref().as_str(), "refs/heads/main");
    }

    #[test]
    fn pr_status_from_api() {
        assert_eq!(PrStatus::from_api("active"), PrStatus::Active);
        assert_eq!(PrStatus::from_api("notSet").to_string(), "notSet");
    }

    #[test]
    fn forge_error_display() {
        assert_eq!(
            format!("{}", ForgeError::AuthRequired),
            "authentication required"
        );
        assert_eq!(
            format!(
                "{}",
                ForgeError::ApiError {
                    status: 409,
                    message: "conflict".into()
                }
            ),
            "API error: 409 - conflict"
        );
        assert_eq!(format!("{}", ForgeError::RateLimited), "rate limited");
    }
}
