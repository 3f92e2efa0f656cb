//! git
//!
//! Single doorway to the git command-line tool.
//!
//! # Architecture
//!
//! All repository writes flow through the [`GitOps`] trait. The production
//! implementation, [`GitCli`], spawns `git` with fixed argument vectors; no
//! other module starts a git process or reads `.git` internals directly.
//!
//! # Modules
//!
//! - [`driver`] - `GitOps`, `GitCli`, typed errors
//! - [`mock`] - in-memory `MockGit` for tests
//! - [`remote`] - origin URL parsing and provider detection
//!
//! # Invariants
//!
//! - Arguments are never shell-interpolated
//! - Branch names are validated [`BranchName`](crate::core::types::BranchName)s
//! - Every invocation is bounded by a timeout

pub mod driver;
pub mod mock;
pub mod remote;

pub use driver::{GitCli, GitError, GitOperation, GitOps, UserIdentity, DEFAULT_GIT_TIMEOUT};
pub use remote::{HostProvider, RemoteUrl, RemoteUrlError, RepoCoordinates};
