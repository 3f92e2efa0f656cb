//! git::mock
//!
//! In-memory git double for deterministic testing.
//!
//! # Design
//!
//! `MockGit` keeps a set of local branches and the checked-out branch, and
//! records every primitive call in order. Any operation can be configured to
//! fail, which is how the saga's compensation paths are exercised without a
//! real repository.
//!
//! # Example
//!
//! ```
//! use gitops_scaffold::core::types::BranchName;
//! use gitops_scaffold::git::mock::{MockGit, GitCall};
//! use gitops_scaffold::git::{GitOperation, GitOps};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let git = MockGit::new("main").fail_on(GitOperation::PushBranch);
//! let branch = BranchName::new("gops-1").unwrap();
//!
//! git.checkout_new_branch(&branch).await.unwrap();
//! assert!(git.push_branch(&branch).await.is_err());
//! assert_eq!(git.current_branch_sync(), "gops-1");
//! assert!(git.calls().contains(&GitCall::PushBranch("gops-1".into())));
//! # });
//! ```

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::driver::{GitError, GitOperation, GitOps, UserIdentity};
use crate::core::types::BranchName;

/// Mock git driver.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockGit {
    inner: Arc<Mutex<MockGitInner>>,
}

#[derive(Debug)]
struct MockGitInner {
    current: String,
    branches: BTreeSet<String>,
    origin_url: Option<String>,
    identity: UserIdentity,
    fail_on: HashSet<GitOperation>,
    calls: Vec<GitCall>,
    commits: Vec<MockCommit>,
    pushed: Vec<String>,
}

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    CurrentBranch,
    CheckoutBranch(String),
    CheckoutNewBranch(String),
    DeleteBranch(String),
    CommitDirectory { dir: PathBuf, message: String },
    PushBranch(String),
    OriginUrl,
    UserIdentity,
}

/// A commit made through the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    pub branch: String,
    pub dir: PathBuf,
    pub message: String,
}

impl MockGit {
    /// Repository with a single branch `current`, checked out.
    pub fn new(current: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockGitInner {
                current: current.to_string(),
                branches: BTreeSet::from([current.to_string()]),
                origin_url: None,
                identity: UserIdentity::default(),
                fail_on: HashSet::new(),
                calls: Vec::new(),
                commits: Vec::new(),
                pushed: Vec::new(),
            })),
        }
    }

    /// Set the `origin` URL.
    pub fn with_origin(self, url: &str) -> Self {
        self.inner.lock().unwrap().origin_url = Some(url.to_string());
        self
    }

    /// Set the configured identity.
    pub fn with_identity(self, name: &str, email: &str) -> Self {
        self.inner.lock().unwrap().identity = UserIdentity {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
        };
        self
    }

    /// Make `operation` fail every time it runs.
    pub fn fail_on(self, operation: GitOperation) -> Self {
        self.inner.lock().unwrap().fail_on.insert(operation);
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<GitCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&GitCall) -> bool) -> usize {
        self.inner.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn current_branch_sync(&self) -> String {
        self.inner.lock().unwrap().current.clone()
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.inner.lock().unwrap().branches.contains(branch)
    }

    pub fn commits(&self) -> Vec<MockCommit> {
        self.inner.lock().unwrap().commits.clone()
    }

    pub fn pushed(&self) -> Vec<String> {
        self.inner.lock().unwrap().pushed.clone()
    }

    /// Record `call` and fail if `operation` is configured to fail.
    fn enter(&self, call: GitCall, operation: GitOperation) -> Result<(), GitError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        if inner.fail_on.contains(&operation) {
            return Err(failure(operation, "mock failure"));
        }
        Ok(())
    }
}

fn failure(operation: GitOperation, stderr: &str) -> GitError {
    GitError::CommandFailed {
        operation,
        status: Some(128),
        stderr: stderr.to_string(),
    }
}

#[async_trait]
impl GitOps for MockGit {
    async fn current_branch(&self) -> Result<String, GitError> {
        self.enter(GitCall::CurrentBranch, GitOperation::CurrentBranch)?;
        Ok(self.current_branch_sync())
    }

    async fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let name = branch.to_string();
        self.enter(GitCall::CheckoutBranch(name.clone()), GitOperation::CheckoutBranch)?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.branches.contains(&name) {
            return Err(failure(
                GitOperation::CheckoutBranch,
                &format!("error: pathspec '{name}' did not match any file(s) known to git"),
            ));
        }
        inner.current = name;
        Ok(())
    }

    async fn checkout_new_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let name = branch.to_string();
        self.enter(
            GitCall::CheckoutNewBranch(name.clone()),
            GitOperation::CheckoutNewBranch,
        )?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.branches.insert(name.clone()) {
            return Err(failure(
                GitOperation::CheckoutNewBranch,
                &format!("fatal: a branch named '{name}' already exists"),
            ));
        }
        inner.current = name;
        Ok(())
    }

    async fn delete_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let name = branch.to_string();
        self.enter(GitCall::DeleteBranch(name.clone()), GitOperation::DeleteBranch)?;
        let mut inner = self.inner.lock().unwrap();
        if inner.current == name {
            return Err(failure(
                GitOperation::DeleteBranch,
                &format!("error: cannot delete branch '{name}' used by worktree"),
            ));
        }
        if !inner.branches.remove(&name) {
            return Err(failure(
                GitOperation::DeleteBranch,
                &format!("error: branch '{name}' not found"),
            ));
        }
        Ok(())
    }

    async fn commit_directory(&self, dir: &Path, message: &str) -> Result<(), GitError> {
        let call = GitCall::CommitDirectory {
            dir: dir.to_path_buf(),
            message: message.to_string(),
        };
        self.enter(call, GitOperation::Commit)?;
        let mut inner = self.inner.lock().unwrap();
        let branch = inner.current.clone();
        inner.commits.push(MockCommit {
            branch,
            dir: dir.to_path_buf(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn push_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let name = branch.to_string();
        self.enter(GitCall::PushBranch(name.clone()), GitOperation::PushBranch)?;
        self.inner.lock().unwrap().pushed.push(name);
        Ok(())
    }

    async fn origin_url(&self) -> Result<String, GitError> {
        self.enter(GitCall::OriginUrl, GitOperation::OriginUrl)?;
        self.inner
            .lock()
            .unwrap()
            .origin_url
            .clone()
            .ok_or_else(|| GitError::CommandFailed {
                operation: GitOperation::OriginUrl,
                status: Some(1),
                stderr: String::new(),
            })
    }

    async fn user_identity(&self) -> Result<UserIdentity, GitError> {
        self.enter(GitCall::UserIdentity, GitOperation::UserName)?;
        Ok(self.inner.lock().unwrap().identity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    #[tokio::test]
    async fn checkout_new_then_back_then_delete() {
        let git = MockGit::new("main");
        git.checkout_new_branch(&branch("tmp")).await.unwrap();
        assert_eq!(git.current_branch().await.unwrap(), "tmp");

        git.checkout_branch(&branch("main")).await.unwrap();
        git.delete_branch(&branch("tmp")).await.unwrap();
        assert!(!git.has_branch("tmp"));
    }

    #[tokio::test]
    async fn cannot_delete_checked_out_branch() {
        let git = MockGit::new("main");
        git.checkout_new_branch(&branch("tmp")).await.unwrap();
        assert!(git.delete_branch(&branch("tmp")).await.is_err());
    }

    #[tokio::test]
    async fn commit_recorded_on_current_branch() {
        let git = MockGit::new("main");
        git.checkout_new_branch(&branch("tmp")).await.unwrap();
        git.commit_directory(Path::new("west"), "msg").await.unwrap();
        assert_eq!(
            git.commits(),
            vec![MockCommit {
                branch: "tmp".into(),
                dir: PathBuf::from("west"),
                message: "msg".into()
            }]
        );
    }

    #[tokio::test]
    async fn configured_failure_is_still_recorded() {
        let git = MockGit::new("main").fail_on(GitOperation::Commit);
        assert!(git.commit_directory(Path::new("d"), "m").await.is_err());
        assert_eq!(git.count_calls(|c| matches!(c, GitCall::CommitDirectory { .. })), 1);
        assert!(git.commits().is_empty());
    }

    #[tokio::test]
    async fn missing_origin_is_unset_config() {
        let git = MockGit::new("main");
        let err = git.origin_url().await.unwrap_err();
        assert!(err.is_unset_config());
    }
}
