//! engine
//!
//! Orchestrates the publish workflow on top of the git driver.
//!
//! # Architecture
//!
//! Commands never sequence git primitives themselves. They build a
//! [`SagaRequest`] and hand it to [`BranchSaga`], which owns ordering,
//! compensation and reporting:
//!
//! ```text
//! Start -> BranchCreated -> Committed -> Pushed -> LinkGenerated -> CleanedUp
//! ```
//!
//! # Invariants
//!
//! - Push and link generation never run after a failed commit
//! - Each compensation runs at most once per invocation
//! - Saga state lives only for one call; nothing is persisted

pub mod saga;

pub use saga::{
    BranchSaga, Compensation, SagaReport, SagaRequest, SagaStage, SagaState, StepFailure,
};

use std::path::PathBuf;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Interactive mode enabled.
    pub interactive: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            cwd: None,
            debug: false,
            quiet: false,
            interactive: true,
        }
    }
}

impl Context {
    /// Directory commands operate in.
    pub fn workdir(&self) -> std::io::Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod context {
        use super::*;

        #[test]
        fn default_values() {
            let ctx = Context::default();
            assert!(ctx.cwd.is_none());
            assert!(!ctx.debug);
            assert!(!ctx.quiet);
            assert!(ctx.interactive);
        }

        #[test]
        fn cwd_override_wins() {
            let ctx = Context {
                cwd: Some(PathBuf::from("/custom")),
                ..Default::default()
            };
            assert_eq!(ctx.workdir().unwrap(), PathBuf::from("/custom"));
        }
    }
}
