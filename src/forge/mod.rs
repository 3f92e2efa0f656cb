//! forge
//!
//! Hosted git API access and pull request links.
//!
//! # Architecture
//!
//! The `Forge` trait defines the interface to the hosting service. Commands
//! use the [`create_forge`] factory rather than importing an implementation
//! directly, and go through [`RemoteRepositoryResolver`] to pick the
//! repository a pull request is opened in.
//!
//! Forge operations run only after the branch was pushed; a forge failure
//! never compromises the local repository.
//!
//! # Modules
//!
//! - `traits`: core `Forge` trait and request/response types
//! - [`azure`]: Azure DevOps implementation over the REST API
//! - [`mock`]: mock implementation for deterministic testing
//! - [`resolver`]: origin to repository resolution and PR creation
//! - [`link`]: compare/create-PR links without API calls
//! - `factory`: forge selection and creation

pub mod azure;
mod factory;
pub mod link;
pub mod mock;
pub mod resolver;
mod traits;

pub use factory::{create_forge, detect_provider, ForgeOptions};
pub use link::{pull_request_link, PullRequestLink, MANUAL_PR_MESSAGE};
pub use resolver::{
    resolve_origin, BranchMatchPolicy, PullRequestSpec, RemoteCandidate, RemoteRepositoryResolver,
    ResolveError,
};
pub use traits::*;
