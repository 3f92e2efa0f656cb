//! git::remote
//!
//! Structured parsing of `origin` URLs.
//!
//! # Supported forms
//!
//! | Form | Example |
//! |---|---|
//! | HTTPS | `https://github.com/org/repo.git` |
//! | HTTPS (Azure) | `https://org@dev.azure.com/org/project/_git/repo` |
//! | HTTPS (legacy Azure) | `https://org.visualstudio.com/project/_git/repo` |
//! | SSH | `ssh://git@ssh.dev.azure.com/v3/org/project/repo` |
//! | scp-like | `git@github.com:org/repo.git` |
//!
//! Provider detection compares the parsed host exactly (or by domain suffix
//! for `*.visualstudio.com`), so `notgithub.com` or `github.com.evil.io` are
//! never taken for a known provider.
//!
//! # Example
//!
//! ```
//! use gitops_scaffold::git::remote::{HostProvider, RemoteUrl};
//!
//! let remote = RemoteUrl::parse("git@github.com:org/repo.git").unwrap();
//! assert_eq!(remote.provider(), HostProvider::GitHub);
//!
//! let coords = remote.coordinates().unwrap();
//! assert_eq!(coords.org, "org");
//! assert_eq!(coords.repo, "repo");
//! ```

use std::fmt;

use thiserror::Error;
use url::Url;

/// Errors from origin URL parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemoteUrlError {
    #[error("origin URL is empty")]
    Empty,

    #[error("cannot parse origin URL '{url}': {reason}")]
    Invalid { url: String, reason: String },
}

/// The hosting providers this tool knows how to link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostProvider {
    /// Azure DevOps, the hosted API used for automated pull requests.
    AzureDevOps,
    /// github.com, supported for compare links only.
    GitHub,
    /// Anything else.
    Unknown,
}

impl HostProvider {
    /// Classify a lowercase host name.
    pub fn from_host(host: &str) -> Self {
        match host {
            "github.com" | "www.github.com" => HostProvider::GitHub,
            "dev.azure.com" | "ssh.dev.azure.com" | "vs-ssh.visualstudio.com" => {
                HostProvider::AzureDevOps
            }
            h if legacy_azure_org(h).is_some() => HostProvider::AzureDevOps,
            _ => HostProvider::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostProvider::AzureDevOps => "azure-devops",
            HostProvider::GitHub => "github",
            HostProvider::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HostProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<org>` of a `<org>.visualstudio.com` host.
fn legacy_azure_org(host: &str) -> Option<&str> {
    let org = host.strip_suffix(".visualstudio.com")?;
    if org.is_empty() || org.contains('.') || org == "vs-ssh" {
        return None;
    }
    Some(org)
}

/// Organization, project and repository named by an origin URL.
///
/// `project` is only present for Azure DevOps, which nests repositories
/// inside projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    pub org: String,
    pub project: Option<String>,
    pub repo: String,
}

/// A parsed origin URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    raw: String,
    host: String,
    segments: Vec<String>,
}

impl RemoteUrl {
    /// Parse an origin URL in any of the supported forms.
    pub fn parse(raw: &str) -> Result<Self, RemoteUrlError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RemoteUrlError::Empty);
        }

        let normalized = normalize_scp(raw);
        let url = Url::parse(&normalized).map_err(|e| RemoteUrlError::Invalid {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| RemoteUrlError::Invalid {
                url: raw.to_string(),
                reason: "no host".into(),
            })?
            .to_ascii_lowercase();

        let segments = url
            .path_segments()
            .map(|s| {
                s.filter(|seg| !seg.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            raw: raw.to_string(),
            host,
            segments,
        })
    }

    /// The URL as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lowercased host.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn provider(&self) -> HostProvider {
        HostProvider::from_host(&self.host)
    }

    /// Organization, project and repository, if the path has the shape the
    /// provider uses.
    pub fn coordinates(&self) -> Option<RepoCoordinates> {
        let segs: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        match self.provider() {
            HostProvider::GitHub => match segs.as_slice() {
                [org, repo] => Some(RepoCoordinates {
                    org: org.to_string(),
                    project: None,
                    repo: strip_git_suffix(repo).to_string(),
                }),
                _ => None,
            },
            HostProvider::AzureDevOps => self.azure_coordinates(&segs),
            HostProvider::Unknown => None,
        }
    }

    fn azure_coordinates(&self, segs: &[&str]) -> Option<RepoCoordinates> {
        let coords = |org: &str, project: &str, repo: &str| {
            Some(RepoCoordinates {
                org: org.to_string(),
                project: Some(project.to_string()),
                repo: strip_git_suffix(repo).to_string(),
            })
        };

        if let Some(org) = legacy_azure_org(&self.host) {
            return match segs {
                [project, "_git", repo] => coords(org, project, repo),
                ["DefaultCollection", project, "_git", repo] => coords(org, project, repo),
                _ => None,
            };
        }

        match segs {
            // https://dev.azure.com/org/project/_git/repo
            [org, project, "_git", repo] => coords(org, project, repo),
            // ssh://git@ssh.dev.azure.com/v3/org/project/repo
            ["v3", org, project, repo] => coords(org, project, repo),
            _ => None,
        }
    }

    /// Azure DevOps organization URL (`https://dev.azure.com/<org>`).
    pub fn azure_org_url(&self) -> Option<String> {
        if self.provider() != HostProvider::AzureDevOps {
            return None;
        }
        self.coordinates()
            .map(|c| format!("https://dev.azure.com/{}", c.org))
    }

    /// Browser URL of the repository.
    pub fn web_url(&self) -> Option<String> {
        let c = self.coordinates()?;
        match (self.provider(), &c.project) {
            (HostProvider::GitHub, _) => Some(format!("https://github.com/{}/{}", c.org, c.repo)),
            (HostProvider::AzureDevOps, Some(project)) => Some(format!(
                "https://dev.azure.com/{}/{}/_git/{}",
                c.org, project, c.repo
            )),
            _ => None,
        }
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Rewrite `user@host:path` into `ssh://user@host/path`.
fn normalize_scp(raw: &str) -> String {
    if raw.contains("://") {
        return raw.to_string();
    }
    match raw.split_once(':') {
        Some((authority, path)) if !authority.contains('/') && !path.starts_with("//") => {
            format!("ssh://{}/{}", authority, path.trim_start_matches('/'))
        }
        _ => raw.to_string(),
    }
}

fn strip_git_suffix(repo: &str) -> &str {
    repo.strip_suffix(".git").unwrap_or(repo)
}
