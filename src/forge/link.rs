//! forge::link
//!
//! Pull request links for the pure-git path (no API calls).
//!
//! # Formats
//!
//! - Azure DevOps: `https://dev.azure.com/<org>/<project>/_git/<repo>/pullrequestcreate?sourceRef=<new>&targetRef=<base>`
//! - GitHub: `https://github.com/<org>/<repo>/compare/<base>...<new>?expand=1`
//!
//! An origin on any other host produces [`PullRequestLink::Manual`] with an
//! instructional message; a link is a convenience and never an error.

use std::fmt;

use tracing::debug;

use crate::core::types::BranchName;
use crate::git::remote::{HostProvider, RemoteUrl, RemoteUrlError};

/// Message shown when no link can be built for the origin.
pub const MANUAL_PR_MESSAGE: &str = "Could not determine origin repository, or it is not a supported provider. Please check for the newly pushed branch and open a PR manually.";

/// Outcome of link generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestLink {
    /// A URL that opens the provider's create-PR page.
    Url(String),
    /// Instructions for opening the pull request by hand.
    Manual(String),
}

impl PullRequestLink {
    pub fn url(&self) -> Option<&str> {
        match self {
            PullRequestLink::Url(url) => Some(url),
            PullRequestLink::Manual(_) => None,
        }
    }
}

impl fmt::Display for PullRequestLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullRequestLink::Url(url) => f.write_str(url),
            PullRequestLink::Manual(msg) => f.write_str(msg),
        }
    }
}

/// Build the create-PR link for merging `new_branch` into `base`.
///
/// # Errors
///
/// Only an origin that is not a URL at all is an error; unknown providers
/// and unexpected path shapes produce [`PullRequestLink::Manual`].
///
/// # Example
///
/// ```
/// use gitops_scaffold::core::types::BranchName;
/// use gitops_scaffold::forge::link::{pull_request_link, PullRequestLink};
///
/// let link = pull_request_link(
///     "https://github.com/org/repo.git",
///     &BranchName::new("master").unwrap(),
///     &BranchName::new("feature-x").unwrap(),
/// )
/// .unwrap();
/// assert_eq!(
///     link,
///     PullRequestLink::Url("https://github.com/org/repo/compare/master...feature-x?expand=1".into())
/// );
/// ```
pub fn pull_request_link(
    origin_url: &str,
    base: &BranchName,
    new_branch: &BranchName,
) -> Result<PullRequestLink, RemoteUrlError> {
    let remote = RemoteUrl::parse(origin_url)?;
    let provider = remote.provider();
    debug!(%provider, host = remote.host(), "building pull request link");

    let link = match (provider, remote.web_url()) {
        (HostProvider::AzureDevOps, Some(web)) => PullRequestLink::Url(format!(
            "{web}/pullrequestcreate?sourceRef={new_branch}&targetRef={base}"
        )),
        (HostProvider::GitHub, Some(web)) => PullRequestLink::Url(format!(
            "{web}/compare/{base}...{new_branch}?expand=1"
        )),
        _ => PullRequestLink::Manual(MANUAL_PR_MESSAGE.to_string()),
    };

    Ok(link)
}
