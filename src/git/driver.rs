//! git::driver
//!
//! Process driver for the git command-line tool.
//!
//! # Contract
//!
//! Each primitive invokes `git` with a fixed argument vector (never through a
//! shell) and returns its trimmed standard output. A non-zero exit is the
//! only error signal; it surfaces as [`GitError::CommandFailed`] carrying the
//! [`GitOperation`] and git's standard error text. Every invocation runs
//! under a timeout, and a timed-out child is killed.
//!
//! The driver never retries. Deciding what to do after a failure belongs to
//! the caller (see [`crate::engine::saga`]).
//!
//! # Example
//!
//! ```no_run
//! use gitops_scaffold::git::{GitCli, GitOps};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), gitops_scaffold::git::GitError> {
//! let git = GitCli::new(".").with_timeout(Duration::from_secs(30));
//! let branch = git.current_branch().await?;
//! println!("on {branch}");
//! # Ok(())
//! # }
//! ```

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::core::types::BranchName;

/// Default timeout for a single git invocation.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(120);

/// The primitive operations the driver performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitOperation {
    CurrentBranch,
    CheckoutBranch,
    CheckoutNewBranch,
    DeleteBranch,
    StageDirectory,
    Commit,
    PushBranch,
    OriginUrl,
    UserName,
    UserEmail,
}

impl GitOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            GitOperation::CurrentBranch => "get current branch",
            GitOperation::CheckoutBranch => "checkout branch",
            GitOperation::CheckoutNewBranch => "create branch",
            GitOperation::DeleteBranch => "delete branch",
            GitOperation::StageDirectory => "stage directory",
            GitOperation::Commit => "commit",
            GitOperation::PushBranch => "push branch",
            GitOperation::OriginUrl => "get origin url",
            GitOperation::UserName => "get user name",
            GitOperation::UserEmail => "get user email",
        }
    }
}

impl fmt::Display for GitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from git invocations.
#[derive(Debug, Error)]
pub enum GitError {
    /// git exited non-zero.
    #[error("git {operation} failed{}: {stderr}", .status.map(|c| format!(" (exit {c})")).unwrap_or_default())]
    CommandFailed {
        operation: GitOperation,
        status: Option<i32>,
        stderr: String,
    },

    /// git did not finish in time and was killed.
    #[error("git {operation} timed out after {timeout:?}")]
    Timeout {
        operation: GitOperation,
        timeout: Duration,
    },

    /// git could not be started.
    #[error("failed to run git for {operation}: {source}")]
    Spawn {
        operation: GitOperation,
        source: std::io::Error,
    },
}

impl GitError {
    /// The operation that failed.
    pub fn operation(&self) -> GitOperation {
        match self {
            GitError::CommandFailed { operation, .. }
            | GitError::Timeout { operation, .. }
            | GitError::Spawn { operation, .. } => *operation,
        }
    }

    /// Whether git ran and reported "not found" (`git config --get` exits 1
    /// for an unset key).
    pub fn is_unset_config(&self) -> bool {
        matches!(
            self,
            GitError::CommandFailed {
                operation: GitOperation::OriginUrl | GitOperation::UserName | GitOperation::UserEmail,
                status: Some(1),
                ..
            }
        )
    }
}

/// Configured author identity. Either part may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdentity {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => write!(f, "{name} <{email}>"),
            (Some(name), None) => f.write_str(name),
            (None, Some(email)) => f.write_str(email),
            (None, None) => f.write_str("unknown user"),
        }
    }
}

/// The git primitives the publish workflow needs.
///
/// # Implementors
///
/// - [`GitCli`] runs the real git binary
/// - [`crate::git::mock::MockGit`] is an in-memory double for tests
#[async_trait]
pub trait GitOps: Send + Sync {
    /// Name of the checked-out branch (`HEAD` when detached).
    async fn current_branch(&self) -> Result<String, GitError>;

    /// Check out an existing branch.
    async fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError>;

    /// Create a branch from `HEAD` and check it out.
    async fn checkout_new_branch(&self, branch: &BranchName) -> Result<(), GitError>;

    /// Force-delete a local branch.
    async fn delete_branch(&self, branch: &BranchName) -> Result<(), GitError>;

    /// Stage `dir` and commit it with `message`.
    async fn commit_directory(&self, dir: &Path, message: &str) -> Result<(), GitError>;

    /// Push `branch` to `origin` and set its upstream.
    async fn push_branch(&self, branch: &BranchName) -> Result<(), GitError>;

    /// URL of the `origin` remote.
    async fn origin_url(&self) -> Result<String, GitError>;

    /// Configured `user.name` and `user.email`.
    async fn user_identity(&self) -> Result<UserIdentity, GitError>;
}

/// Driver that shells out to `git`.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    program: OsString,
    timeout: Duration,
}

impl GitCli {
    /// Driver running in `workdir` with the default timeout.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            program: OsString::from("git"),
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a different git executable.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run one git invocation and return trimmed stdout.
    async fn run<I, S>(&self, operation: GitOperation, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        debug!(%operation, ?args, workdir = %self.workdir.display(), "running git");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(GitError::Spawn { operation, source }),
            Err(_) => {
                return Err(GitError::Timeout {
                    operation,
                    timeout: self.timeout,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(%operation, status = ?output.status.code(), %stderr, "git failed");
            return Err(GitError::CommandFailed {
                operation,
                status: output.status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn config_value(&self, operation: GitOperation, key: &str) -> Result<Option<String>, GitError> {
        match self.run(operation, ["config", key]).await {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_unset_config() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl GitOps for GitCli {
    async fn current_branch(&self) -> Result<String, GitError> {
        self.run(GitOperation::CurrentBranch, ["rev-parse", "--abbrev-ref", "HEAD"])
            .await
    }

    async fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        self.run(GitOperation::CheckoutBranch, ["checkout", branch.as_str()])
            .await
            .map(drop)
    }

    async fn checkout_new_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        self.run(GitOperation::CheckoutNewBranch, ["checkout", "-b", branch.as_str()])
            .await
            .map(drop)
    }

    async fn delete_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        self.run(GitOperation::DeleteBranch, ["branch", "-D", branch.as_str()])
            .await
            .map(drop)
    }

    async fn commit_directory(&self, dir: &Path, message: &str) -> Result<(), GitError> {
        let add: [&OsStr; 3] = ["add".as_ref(), "--".as_ref(), dir.as_os_str()];
        self.run(GitOperation::StageDirectory, add).await?;
        self.run(GitOperation::Commit, ["commit", "-m", message])
            .await
            .map(drop)
    }

    async fn push_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        self.run(GitOperation::PushBranch, ["push", "-u", "origin", branch.as_str()])
            .await
            .map(drop)
    }

    async fn origin_url(&self) -> Result<String, GitError> {
        self.run(GitOperation::OriginUrl, ["config", "--get", "remote.origin.url"])
            .await
    }

    async fn user_identity(&self) -> Result<UserIdentity, GitError> {
        Ok(UserIdentity {
            name: self.config_value(GitOperation::UserName, "user.name").await?,
            email: self.config_value(GitOperation::UserEmail, "user.email").await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod errors {
        use super::*;

        #[test]
        fn command_failed_names_operation_and_stderr() {
            let err = GitError::CommandFailed {
                operation: GitOperation::PushBranch,
                status: Some(128),
                stderr: "fatal: could not read from remote".into(),
            };
            assert_eq!(
                err.to_string(),
                "git push branch failed (exit 128): fatal: could not read from remote"
            );
            assert_eq!(err.operation(), GitOperation::PushBranch);
        }

        #[test]
        fn timeout_message() {
            let err = GitError::Timeout {
                operation: GitOperation::Commit,
                timeout: Duration::from_secs(5),
            };
            assert_eq!(err.to_string(), "git commit timed out after 5s");

            let err = GitError::Timeout {
                operation: GitOperation::PushBranch,
                timeout: Duration::from_millis(300),
            };
            assert_eq!(err.to_string(), "git push branch timed out after 300ms");
        }

        #[test]
        fn unset_config_only_for_config_reads() {
            let unset = GitError::CommandFailed {
                operation: GitOperation::OriginUrl,
                status: Some(1),
                stderr: String::new(),
            };
            assert!(unset.is_unset_config());

            let commit = GitError::CommandFailed {
                operation: GitOperation::Commit,
                status: Some(1),
                stderr: "nothing to commit".into(),
            };
            assert!(!commit.is_unset_config());
        }
    }

    mod identity {
        use super::*;

        #[test]
        fn display_forms() {
            let full = UserIdentity {
                name: Some("Ada".into()),
                email: Some("ada@example.com".into()),
            };
            assert_eq!(full.to_string(), "Ada <ada@example.com>");
            assert_eq!(UserIdentity::default().to_string(), "unknown user");
        }
    }

    mod process {
        use super::*;

        #[tokio::test]
        async fn missing_program_is_spawn_error() {
            let git = GitCli::new(".").with_program("gops-no-such-git-binary");
            let err = git.current_branch().await.unwrap_err();
            assert!(matches!(
                err,
                GitError::Spawn {
                    operation: GitOperation::CurrentBranch,
                    ..
                }
            ));
        }

        #[cfg(unix)]
        #[tokio::test]
        async fn slow_git_is_killed_after_timeout() {
            use std::os::unix::fs::PermissionsExt;

            let temp = tempfile::TempDir::new().unwrap();
            let script = temp.path().join("slow-git");
            std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

            let git = GitCli::new(temp.path())
                .with_program(script.clone())
                .with_timeout(Duration::from_millis(300));

            let started = std::time::Instant::now();
            let err = git.current_branch().await.unwrap_err();

            assert!(started.elapsed() < Duration::from_secs(10));
            assert!(matches!(
                err,
                GitError::Timeout {
                    operation: GitOperation::CurrentBranch,
                    timeout,
                } if timeout == Duration::from_millis(300)
            ));
            assert!(err.to_string().ends_with("timed out after 300ms"));
        }

        #[tokio::test]
        async fn outside_repository_is_command_failed() {
            let temp = tempfile::TempDir::new().unwrap();
            let git = GitCli::new(temp.path()).with_timeout(Duration::from_secs(30));
            let err = git.current_branch().await.unwrap_err();
            assert!(matches!(err, GitError::CommandFailed { .. }));
        }
    }
}
