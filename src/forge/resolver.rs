//! forge::resolver
//!
//! Maps the working copy's origin URL to exactly one hosted repository and
//! opens a pull request there.
//!
//! # Algorithm
//!
//! 1. Resolve the origin URL (explicit, or `git config --get remote.origin.url`).
//!    An empty origin fails fast with [`ResolveError::NoOrigin`].
//! 2. List every repository visible to the token and keep those where one of
//!    `url`, `sshUrl`, `webUrl` or `remoteUrl` equals the origin exactly.
//! 3. For each surviving candidate, list its branches and intersect them with
//!    `{source, target}`.
//! 4. Exactly one origin match is required; zero and several are distinct
//!    errors. Under [`BranchMatchPolicy::Strict`] the match must also carry
//!    both branches.
//! 5. Create the pull request against that repository with `refs/heads/`
//!    ref names.
//!
//! Exact string equality is deliberate: the hosted API reports every URL
//! form it accepts, so the origin as configured locally matches one of them.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::traits::{CreatePrRequest, Forge, ForgeError, PullRequest};
use crate::core::types::BranchName;
use crate::git::{GitError, GitOps};

/// Whether the branch intersection gates resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchMatchPolicy {
    /// The single origin match must contain both branches.
    #[default]
    Strict,
    /// Branch presence is logged but does not affect the outcome.
    Informational,
}

/// Errors from repository resolution and pull request creation.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no origin found for the current git repository; pass --origin or add an 'origin' remote")]
    NoOrigin,

    #[error("failed to read origin URL: {0}")]
    OriginLookup(#[source] GitError),

    #[error(
        "no repository with remote URL '{origin}' found; cannot automate the pull request, open it manually"
    )]
    NoMatchingRepository { origin: String },

    #[error(
        "{count} repositories ({}) match remote URL '{origin}'; cannot automate the pull request, open it manually",
        .names.join(", ")
    )]
    AmbiguousRepository {
        origin: String,
        count: usize,
        names: Vec<String>,
    },

    #[error(
        "repository '{repository}' is missing branch(es) {}; push them first or open the pull request manually",
        .missing.join(", ")
    )]
    BranchesMissing {
        repository: String,
        missing: Vec<String>,
    },

    #[error(transparent)]
    Forge(#[from] ForgeError),
}

/// A repository matching the origin, with the requested branches it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCandidate {
    pub id: String,
    pub name: String,
    pub urls: BTreeSet<String>,
    /// Subset of `{source, target}` present in the repository.
    pub matching_branches: BTreeSet<String>,
}

impl RemoteCandidate {
    /// Whether both requested branches exist in the repository.
    pub fn has_branches(&self, source: &BranchName, target: &BranchName) -> bool {
        self.matching_branches.contains(source.as_str())
            && self.matching_branches.contains(target.as_str())
    }

    fn missing(&self, source: &BranchName, target: &BranchName) -> Vec<String> {
        [source, target]
            .into_iter()
            .filter(|b| !self.matching_branches.contains(b.as_str()))
            .map(|b| format!("'{b}'"))
            .collect()
    }
}

/// What to open.
#[derive(Debug, Clone)]
pub struct PullRequestSpec {
    pub title: String,
    pub description: Option<String>,
    /// Branch with the changes.
    pub source: BranchName,
    /// Branch to merge into.
    pub target: BranchName,
    /// Origin URL; read from git when `None`.
    pub origin_url: Option<String>,
}

/// The explicit origin, or `remote.origin.url`. Empty is an error.
pub async fn resolve_origin(
    git: &dyn GitOps,
    explicit: Option<&str>,
) -> Result<String, ResolveError> {
    let origin = match explicit {
        Some(url) => url.trim().to_string(),
        None => match git.origin_url().await {
            Ok(url) => url,
            Err(err) if err.is_unset_config() => String::new(),
            Err(err) => return Err(ResolveError::OriginLookup(err)),
        },
    };

    if origin.is_empty() {
        return Err(ResolveError::NoOrigin);
    }
    Ok(origin)
}

/// Resolves the target repository and creates pull requests.
pub struct RemoteRepositoryResolver<'a> {
    forge: &'a dyn Forge,
    git: &'a dyn GitOps,
    policy: BranchMatchPolicy,
}

impl<'a> RemoteRepositoryResolver<'a> {
    pub fn new(forge: &'a dyn Forge, git: &'a dyn GitOps) -> Self {
        Self {
            forge,
            git,
            policy: BranchMatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BranchMatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The explicit origin, or the one configured in git.
    pub async fn resolve_origin(&self, explicit: Option<&str>) -> Result<String, ResolveError> {
        resolve_origin(self.git, explicit).await
    }

    /// Repositories whose URLs contain `origin`, with their branch intersection.
    pub async fn candidates(
        &self,
        origin: &str,
        source: &BranchName,
        target: &BranchName,
    ) -> Result<Vec<RemoteCandidate>, ResolveError> {
        let repositories = self.forge.list_repositories().await?;
        let matching: Vec<_> = repositories
            .into_iter()
            .filter(|r| r.matches_origin(origin))
            .collect();
        info!(
            count = matching.len(),
            origin,
            "repositories with matching remote URL"
        );

        let wanted = [source.as_str(), target.as_str()];
        let mut candidates = Vec::with_capacity(matching.len());
        for repo in matching {
            debug!(repository = %repo.name, "retrieving branches");
            let branches = self.forge.list_branches(&repo.id).await?;
            let matching_branches = branches
                .into_iter()
                .filter(|b| wanted.contains(&b.as_str()))
                .collect();

            candidates.push(RemoteCandidate {
                urls: repo.urls().map(str::to_string).collect(),
                id: repo.id,
                name: repo.name,
                matching_branches,
            });
        }

        Ok(candidates)
    }

    /// Pick the single repository to open the pull request in.
    pub fn select(
        &self,
        origin: &str,
        mut candidates: Vec<RemoteCandidate>,
        source: &BranchName,
        target: &BranchName,
    ) -> Result<RemoteCandidate, ResolveError> {
        match candidates.len() {
            0 => Err(ResolveError::NoMatchingRepository {
                origin: origin.to_string(),
            }),
            1 => {
                let candidate = candidates.remove(0);
                if !candidate.has_branches(source, target) {
                    let missing = candidate.missing(source, target);
                    match self.policy {
                        BranchMatchPolicy::Strict => {
                            return Err(ResolveError::BranchesMissing {
                                repository: candidate.name,
                                missing,
                            })
                        }
                        BranchMatchPolicy::Informational => warn!(
                            repository = %candidate.name,
                            missing = %missing.join(", "),
                            "repository is missing requested branches; continuing"
                        ),
                    }
                }
                Ok(candidate)
            }
            count => Err(ResolveError::AmbiguousRepository {
                origin: origin.to_string(),
                count,
                names: candidates.into_iter().map(|c| c.name).collect(),
            }),
        }
    }

    /// Resolve the repository and open the pull request.
    pub async fn create_pull_request(
        &self,
        spec: PullRequestSpec,
    ) -> Result<PullRequest, ResolveError> {
        let origin = self.resolve_origin(spec.origin_url.as_deref()).await?;
        let candidates = self.candidates(&origin, &spec.source, &spec.target).await?;
        let repository = self.select(&origin, candidates, &spec.source, &spec.target)?;

        info!(
            repository = %repository.name,
            source = %spec.source,
            target = %spec.target,
            "creating pull request"
        );

        let pr = self
            .forge
            .create_pr(CreatePrRequest {
                repository_id: repository.id,
                source: spec.source,
                target: spec.target,
                title: spec.title,
                description: spec.description,
            })
            .await?;

        info!(id = pr.id, url = %pr.url, "pull request created");
        Ok(pr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockForge, MockOperation};
    use crate::git::mock::MockGit;

    const ORIGIN: &str = "git@ssh.dev.azure.com:v3/o/p/infra";

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    fn spec(origin: Option<&str>) -> PullRequestSpec {
        PullRequestSpec {
            title: "Add west".into(),
            description: Some("generated".into()),
            source: branch("gops-1"),
            target: branch("main"),
            origin_url: origin.map(str::to_string),
        }
    }

    mod origin {
        use super::*;

        #[tokio::test]
        async fn explicit_origin_wins() {
            let forge = MockForge::new();
            let git = MockGit::new("main").with_origin("https://other");
            let resolver = RemoteRepositoryResolver::new(&forge, &git);
            assert_eq!(resolver.resolve_origin(Some(ORIGIN)).await.unwrap(), ORIGIN);
        }

        #[tokio::test]
        async fn falls_back_to_git() {
            let forge = MockForge::new();
            let git = MockGit::new("main").with_origin(ORIGIN);
            let resolver = RemoteRepositoryResolver::new(&forge, &git);
            assert_eq!(resolver.resolve_origin(None).await.unwrap(), ORIGIN);
        }

        #[tokio::test]
        async fn empty_origin_fails_fast() {
            let forge = MockForge::new();
            let git = MockGit::new("main");
            let resolver = RemoteRepositoryResolver::new(&forge, &git);

            assert!(matches!(
                resolver.resolve_origin(None).await,
                Err(ResolveError::NoOrigin)
            ));
            assert!(matches!(
                resolver.resolve_origin(Some("  ")).await,
                Err(ResolveError::NoOrigin)
            ));

            let err = resolver.create_pull_request(spec(None)).await.unwrap_err();
            assert!(matches!(err, ResolveError::NoOrigin));
            assert!(forge.operations().is_empty());
        }
    }

    mod resolution {
        use super::*;

        #[tokio::test]
        async fn single_match_creates_exactly_one_pr() {
            let forge = MockForge::new()
                .with_repository(MockForge::repository("1", "infra", ORIGIN), &["main", "gops-1"])
                .with_repository(MockForge::repository("2", "other", "git@elsewhere"), &["main"]);
            let git = MockGit::new("main");
            let resolver = RemoteRepositoryResolver::new(&forge, &git);

            let pr = resolver.create_pull_request(spec(Some(ORIGIN))).await.unwrap();
            assert_eq!(pr.source_ref, "refs/heads/gops-1");
            assert_eq!(pr.target_ref, "refs/heads/main");
            assert_eq!(forge.create_pr_calls(), 1);
            assert!(forge.operations().contains(&MockOperation::CreatePr {
                repository_id: "1".into(),
                source_ref: "refs/heads/gops-1".into(),
                target_ref: "refs/heads/main".into(),
                title: "Add west".into(),
            }));
        }

        #[tokio::test]
        async fn only_matching_repositories_fetch_branches() {
            let forge = MockForge::new()
                .with_repository(MockForge::repository("1", "infra", ORIGIN), &["main", "gops-1"])
                .with_repository(MockForge::repository("2", "other", "git@elsewhere"), &["main"]);
            let git = MockGit::new("main");
            let resolver = RemoteRepositoryResolver::new(&forge, &git);

            resolver.create_pull_request(spec(Some(ORIGIN))).await.unwrap();
            let branch_calls: Vec<_> = forge
                .operations()
                .into_iter()
                .filter(|op| matches!(op, MockOperation::ListBranches { .. }))
                .collect();
            assert_eq!(
                branch_calls,
                vec![MockOperation::ListBranches {
                    repository_id: "1".into()
                }]
            );
        }

        #[tokio::test]
        async fn zero_matches_error() {
            let forge = MockForge::new()
                .with_repository(MockForge::repository("2", "other", "git@elsewhere"), &["main"]);
            let git = MockGit::new("main");
            let resolver = RemoteRepositoryResolver::new(&forge, &git);

            let err = resolver.create_pull_request(spec(Some(ORIGIN))).await.unwrap_err();
            assert!(matches!(err, ResolveError::NoMatchingRepository { .. }));
            assert!(err.to_string().contains("no repository"));
            assert_eq!(forge.create_pr_calls(), 0);
        }

        #[tokio::test]
        async fn multiple_matches_error() {
            let forge = MockForge::new()
                .with_repository(MockForge::repository("1", "infra", ORIGIN), &["main", "gops-1"])
                .with_repository(MockForge::repository("2", "infra-fork", ORIGIN), &["main", "gops-1"]);
            let git = MockGit::new("main");
            let resolver = RemoteRepositoryResolver::new(&forge, &git);

            let err = resolver.create_pull_request(spec(Some(ORIGIN))).await.unwrap_err();
            match &err {
                ResolveError::AmbiguousRepository { count, names, .. } => {
                    assert_eq!(*count, 2);
                    assert_eq!(names, &vec!["infra".to_string(), "infra-fork".to_string()]);
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert!(err.to_string().contains("2 repositories"));
            assert_eq!(forge.create_pr_calls(), 0);
        }

        #[tokio::test]
        async fn strict_policy_requires_both_branches() {
            let forge = MockForge::new()
                .with_repository(MockForge::repository("1", "infra", ORIGIN), &["main"]);
            let git = MockGit::new("main");
            let resolver = RemoteRepositoryResolver::new(&forge, &git);

            let err = resolver.create_pull_request(spec(Some(ORIGIN))).await.unwrap_err();
            match err {
                ResolveError::BranchesMissing { repository, missing } => {
                    assert_eq!(repository, "infra");
                    assert_eq!(missing, vec!["'gops-1'".to_string()]);
                }
                other => panic!("unexpected error: {other:?}"),
            }
            assert_eq!(forge.create_pr_calls(), 0);
        }

        #[tokio::test]
        async fn informational_policy_proceeds() {
            let forge = MockForge::new()
                .with_repository(MockForge::repository("1", "infra", ORIGIN), &[]);
            let git = MockGit::new("main");
            let resolver = RemoteRepositoryResolver::new(&forge, &git)
                .with_policy(BranchMatchPolicy::Informational);

            resolver.create_pull_request(spec(Some(ORIGIN))).await.unwrap();
            assert_eq!(forge.create_pr_calls(), 1);
        }

        #[tokio::test]
        async fn forge_errors_propagate() {
            let forge = MockForge::new()
                .with_repository(MockForge::repository("1", "infra", ORIGIN), &["main", "gops-1"])
                .fail_on(FailOn::CreatePr(ForgeError::ApiError {
                    status: 409,
                    message: "An active pull request already exists".into(),
                }));
            let git = MockGit::new("main");
            let resolver = RemoteRepositoryResolver::new(&forge, &git);

            let err = resolver.create_pull_request(spec(Some(ORIGIN))).await.unwrap_err();
            assert!(matches!(err, ResolveError::Forge(ForgeError::ApiError { status: 409, .. })));
        }
    }

    mod candidate {
        use super::*;

        #[test]
        fn has_branches_requires_both() {
            let mut c = RemoteCandidate {
                id: "1".into(),
                name: "r".into(),
                urls: BTreeSet::new(),
                matching_branches: BTreeSet::from(["main".to_string()]),
            };
            assert!(!c.has_branches(&branch("gops-1"), &branch("main")));
            c.matching_branches.insert("gops-1".into());
            assert!(c.has_branches(&branch("gops-1"), &branch("main")));
        }
    }
}
