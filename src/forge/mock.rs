//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge holds a fixed list of repositories, each with its branch
//! names, stores created pull requests in memory, and records every call.
//! Any operation can be configured to fail.
//!
//! # Example
//!
//! ```
//! use gitops_scaffold::forge::mock::MockForge;
//! use gitops_scaffold::forge::{Forge, Repository};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let forge = MockForge::new().with_repository(
//!     MockForge::repository("1", "infra", "git@ssh.dev.azure.com:v3/o/p/infra"),
//!     &["main", "gops-1"],
//! );
//!
//! let repos = forge.list_repositories().await.unwrap();
//! assert_eq!(repos.len(), 1);
//! assert_eq!(forge.list_branches("1").await.unwrap(), vec!["main", "gops-1"]);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{CreatePrRequest, Forge, ForgeError, PrStatus, PullRequest, Repository};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

#[derive(Debug)]
struct MockForgeInner {
    repositories: Vec<Repository>,
    branches: HashMap<String, Vec<String>>,
    prs: Vec<PullRequest>,
    next_pr_id: u64,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    ListRepositories(ForgeError),
    ListBranches(ForgeError),
    CreatePr(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ListRepositories,
    ListBranches {
        repository_id: String,
    },
    CreatePr {
        repository_id: String,
        source_ref: String,
        target_ref: String,
        title: String,
    },
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                repositories: Vec::new(),
                branches: HashMap::new(),
                prs: Vec::new(),
                next_pr_id: 1,
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Repository record whose SSH URL is `origin`.
    pub fn repository(id: &str, name: &str, origin: &str) -> Repository {
        Repository {
            id: id.to_string(),
            name: name.to_string(),
            url: format!("https://mock.invalid/_apis/git/repositories/{id}"),
            ssh_url: Some(origin.to_string()),
            web_url: Some(format!("https://mock.invalid/_git/{name}")),
            remote_url: None,
        }
    }

    /// Add a repository and its branches.
    pub fn with_repository(self, repository: Repository, branches: &[&str]) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.branches.insert(
                repository.id.clone(),
                branches.iter().map(|b| b.to_string()).collect(),
            );
            inner.repositories.push(repository);
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Number of create calls recorded, failed ones included.
    pub fn create_pr_calls(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::CreatePr { .. }))
            .count()
    }

    /// All created pull requests.
    pub fn all_prs(&self) -> Vec<PullRequest> {
        let inner = self.inner.lock().unwrap();
        inner.prs.clone()
    }

    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Result<(), ForgeError> {
        let inner = self.inner.lock().unwrap();
        match &inner.fail_on {
            Some(FailOn::ListRepositories(e)) if expected == "list_repositories" => Err(e.clone()),
            Some(FailOn::ListBranches(e)) if expected == "list_branches" => Err(e.clone()),
            Some(FailOn::CreatePr(e)) if expected == "create_pr" => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>, ForgeError> {
        self.record(MockOperation::ListRepositories);
        self.check_fail("list_repositories")?;
        Ok(self.inner.lock().unwrap().repositories.clone())
    }

    async fn list_branches(&self, repository_id: &str) -> Result<Vec<String>, ForgeError> {
        self.record(MockOperation::ListBranches {
            repository_id: repository_id.to_string(),
        });
        self.check_fail("list_branches")?;
        self.inner
            .lock()
            .unwrap()
            .branches
            .get(repository_id)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("repository {repository_id}")))
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePr {
            repository_id: request.repository_id.clone(),
            source_ref: request.source_ref().to_string(),
            target_ref: request.target_ref().to_string(),
            title: request.title.clone(),
        });
        self.check_fail("create_pr")?;

        let mut inner = self.inner.lock().unwrap();
        let repo_web = inner
            .repositories
            .iter()
            .find(|r| r.id == request.repository_id)
            .and_then(|r| r.web_url.clone())
            .ok_or_else(|| ForgeError::NotFound(format!("repository {}", request.repository_id)))?;

        let id = inner.next_pr_id;
        inner.next_pr_id += 1;

        let pr = PullRequest {
            id,
            url: format!("{repo_web}/pullrequest/{id}"),
            status: PrStatus::Active,
            source_ref: request.source_ref().to_string(),
            target_ref: request.target_ref().to_string(),
            title: request.title,
        };
        inner.prs.push(pr.clone());
        Ok(pr)
    }
}
