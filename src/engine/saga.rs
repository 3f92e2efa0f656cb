//! engine::saga
//!
//! Best-effort branch publishing saga.
//!
//! # Stages
//!
//! ```text
//! Start -> BranchCreated -> Committed -> Pushed -> LinkGenerated -> CleanedUp
//! ```
//!
//! Each forward step consumes the [`SagaState`] and returns the next one, so
//! the set of eligible compensations is always derived from explicit flags.
//! A failure at any stage ends the forward path; the saga then runs whatever
//! compensations the state allows and reports. It never returns an error:
//! every failure becomes a [`StepFailure`] carrying a manual remedy.
//!
//! # Compensation
//!
//! - Checking out the original branch is attempted whenever the temporary
//!   branch was created.
//! - Deleting the temporary branch is attempted when it was pushed or when
//!   nothing was committed on it. A committed but unpushed branch is kept so
//!   the commit is not lost. This intentionally departs from an unconditional
//!   delete of the temporary branch.
//!
//! The two compensations are independent: a failed checkout does not prevent
//! the delete attempt, and each runs at most once.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::core::types::BranchName;
use crate::forge::link::{pull_request_link, PullRequestLink, MANUAL_PR_MESSAGE};
use crate::git::GitOps;

/// Saga stages in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SagaStage {
    Start,
    BranchCreated,
    Committed,
    Pushed,
    LinkGenerated,
    CleanedUp,
}

impl SagaStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStage::Start => "start",
            SagaStage::BranchCreated => "branch-created",
            SagaStage::Committed => "committed",
            SagaStage::Pushed => "pushed",
            SagaStage::LinkGenerated => "link-generated",
            SagaStage::CleanedUp => "cleaned-up",
        }
    }
}

impl fmt::Display for SagaStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compensating actions run after the forward path ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    CheckoutOriginal,
    DeleteTempBranch,
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compensation::CheckoutOriginal => f.write_str("checkout original branch"),
            Compensation::DeleteTempBranch => f.write_str("delete temporary branch"),
        }
    }
}

/// Per-step completion flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaState {
    /// Last forward stage reached.
    pub stage: SagaStage,
    pub branch_created: bool,
    pub directory_committed: bool,
    pub branch_pushed: bool,
    pub link_generated: bool,
    pub branch_checked_out: bool,
    pub temp_branch_deleted: bool,
}

impl Default for SagaState {
    fn default() -> Self {
        Self {
            stage: SagaStage::Start,
            branch_created: false,
            directory_committed: false,
            branch_pushed: false,
            link_generated: false,
            branch_checked_out: false,
            temp_branch_deleted: false,
        }
    }
}

impl SagaState {
    /// Record that `stage` completed.
    pub fn advance(mut self, stage: SagaStage) -> Self {
        match stage {
            SagaStage::Start => {}
            SagaStage::BranchCreated => self.branch_created = true,
            SagaStage::Committed => self.directory_committed = true,
            SagaStage::Pushed => self.branch_pushed = true,
            SagaStage::LinkGenerated => self.link_generated = true,
            SagaStage::CleanedUp => {}
        }
        self.stage = stage;
        self
    }

    /// Compensations this state allows, in the order they must run.
    pub fn eligible_compensations(&self) -> Vec<Compensation> {
        let mut out = Vec::new();
        if !self.branch_created {
            return out;
        }
        if !self.branch_checked_out {
            out.push(Compensation::CheckoutOriginal);
        }
        if !self.temp_branch_deleted && (self.branch_pushed || !self.directory_committed) {
            out.push(Compensation::DeleteTempBranch);
        }
        out
    }

    fn compensated(mut self, compensation: Compensation) -> Self {
        match compensation {
            Compensation::CheckoutOriginal => self.branch_checked_out = true,
            Compensation::DeleteTempBranch => self.temp_branch_deleted = true,
        }
        self
    }
}

/// Input to one saga run.
#[derive(Debug, Clone)]
pub struct SagaRequest {
    /// Directory to stage, relative to the working tree.
    pub dir: PathBuf,
    /// Temporary branch to create and push.
    pub new_branch: BranchName,
    pub message: String,
}

/// One failed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// Stage whose transition failed; compensations report `CleanedUp`.
    pub stage: SagaStage,
    pub compensation: Option<Compensation>,
    pub error: String,
    /// What the user can do by hand.
    pub remedy: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.compensation {
            Some(c) => write!(f, "{} failed: {} ({})", c, self.error, self.remedy),
            None => write!(f, "{} failed: {} ({})", self.stage, self.error, self.remedy),
        }
    }
}

/// Outcome of a saga run.
#[derive(Debug, Clone)]
pub struct SagaReport {
    pub original_branch: Option<BranchName>,
    pub branch: BranchName,
    pub state: SagaState,
    pub link: Option<PullRequestLink>,
    pub failures: Vec<StepFailure>,
}

impl SagaReport {
    fn new(branch: BranchName) -> Self {
        Self {
            original_branch: None,
            branch,
            state: SagaState::default(),
            link: None,
            failures: Vec::new(),
        }
    }

    /// The stage whose forward transition failed, if any.
    pub fn failed_at(&self) -> Option<SagaStage> {
        self.failures
            .iter()
            .find(|f| f.compensation.is_none())
            .map(|f| f.stage)
    }

    /// Whether the branch reached the remote.
    pub fn is_published(&self) -> bool {
        self.state.branch_pushed
    }

    /// Whether every attempted step succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn compensation_failures(&self) -> impl Iterator<Item = &StepFailure> {
        self.failures.iter().filter(|f| f.compensation.is_some())
    }

    fn fail(&mut self, stage: SagaStage, error: impl fmt::Display, remedy: impl Into<String>) {
        let failure = StepFailure {
            stage,
            compensation: None,
            error: error.to_string(),
            remedy: remedy.into(),
        };
        warn!(stage = %stage, branch = %self.branch, error = %failure.error, "saga step failed");
        self.failures.push(failure);
    }
}

/// Sequences git primitives into the publish workflow.
pub struct BranchSaga<'a> {
    git: &'a dyn GitOps,
}

impl<'a> BranchSaga<'a> {
    pub fn new(git: &'a dyn GitOps) -> Self {
        Self { git }
    }

    /// Run the saga to completion.
    pub async fn run(&self, request: &SagaRequest) -> SagaReport {
        let mut report = SagaReport::new(request.new_branch.clone());
        let branch = &request.new_branch;
        let state = SagaState::default();

        let original = match self.start().await {
            Ok(original) => original,
            Err(e) => {
                report.fail(SagaStage::Start, e, "check out a named branch and retry");
                return report;
            }
        };
        info!(original = %original, "saga started");
        report.original_branch = Some(original.clone());

        if let Err(e) = self.git.checkout_new_branch(branch).await {
            report.fail(
                SagaStage::BranchCreated,
                e,
                format!("create branch '{branch}' by hand or choose another name"),
            );
            return report;
        }
        let mut state = state.advance(SagaStage::BranchCreated);
        info!(branch = %branch, "branch created");

        state = self.forward(request, &original, state, &mut report).await;
        state = self.compensate(&original, state, &mut report).await;

        if report.failures.is_empty() {
            state = state.advance(SagaStage::CleanedUp);
            info!(branch = %branch, "saga completed");
        }
        report.state = state;
        report
    }

    async fn start(&self) -> Result<BranchName, String> {
        let current = self.git.current_branch().await.map_err(|e| e.to_string())?;
        if current == "HEAD" {
            return Err("HEAD is detached".to_string());
        }
        BranchName::new(current).map_err(|e| e.to_string())
    }

    /// Commit, push and link. Stops at the first failure.
    async fn forward(
        &self,
        request: &SagaRequest,
        original: &BranchName,
        state: SagaState,
        report: &mut SagaReport,
    ) -> SagaState {
        let branch = &request.new_branch;

        if let Err(e) = self.git.commit_directory(&request.dir, &request.message).await {
            report.fail(
                SagaStage::Committed,
                e,
                format!(
                    "stage and commit '{}' manually on a new branch",
                    request.dir.display()
                ),
            );
            return state;
        }
        let state = state.advance(SagaStage::Committed);
        info!(branch = %branch, dir = %request.dir.display(), "directory committed");

        if let Err(e) = self.git.push_branch(branch).await {
            report.fail(
                SagaStage::Pushed,
                e,
                format!("branch '{branch}' was kept; push manually with `git push -u origin {branch}`"),
            );
            return state;
        }
        let state = state.advance(SagaStage::Pushed);
        info!(branch = %branch, "branch pushed");

        match self.link(original, branch).await {
            Ok(link) => {
                debug!(link = %link, "pull request link");
                report.link = Some(link);
                let state = state.advance(SagaStage::LinkGenerated);
                info!(branch = %branch, "link generated");
                state
            }
            Err(e) => {
                report.fail(SagaStage::LinkGenerated, e, MANUAL_PR_MESSAGE);
                state
            }
        }
    }

    async fn link(&self, base: &BranchName, new: &BranchName) -> Result<PullRequestLink, String> {
        let origin = self.git.origin_url().await.map_err(|e| e.to_string())?;
        pull_request_link(&origin, base, new).map_err(|e| e.to_string())
    }

    async fn compensate(
        &self,
        original: &BranchName,
        mut state: SagaState,
        report: &mut SagaReport,
    ) -> SagaState {
        let branch = &report.branch.clone();

        for compensation in state.eligible_compensations() {
            let result = match compensation {
                Compensation::CheckoutOriginal => self.git.checkout_branch(original).await,
                Compensation::DeleteTempBranch => self.git.delete_branch(branch).await,
            };
            match result {
                Ok(()) => {
                    debug!(%compensation, "compensation applied");
                    state = state.compensated(compensation);
                }
                Err(e) => {
                    error!(%compensation, branch = %branch, error = %e, "compensation failed");
                    let remedy = match compensation {
                        Compensation::CheckoutOriginal => {
                            format!("run `git checkout {original}`")
                        }
                        Compensation::DeleteTempBranch => {
                            format!("run `git branch -D {branch}`")
                        }
                    };
                    report.failures.push(StepFailure {
                        stage: SagaStage::CleanedUp,
                        compensation: Some(compensation),
                        error: e.to_string(),
                        remedy,
                    });
                }
            }
        }

        if state.directory_committed && !state.branch_pushed {
            warn!(branch = %branch, "temporary branch kept with unpushed commit");
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mock::{GitCall, MockGit};
    use crate::git::GitOperation;

    const ORIGIN: &str = "https://github.com/org/repo.git";

    fn request() -> SagaRequest {
        SagaRequest {
            dir: PathBuf::from("west"),
            new_branch: BranchName::new("gops-1").unwrap(),
            message: "Adding new service: gops-1".into(),
        }
    }

    fn count(git: &MockGit, pred: impl Fn(&GitCall) -> bool) -> usize {
        git.count_calls(pred)
    }

    fn checkouts(git: &MockGit) -> usize {
        count(git, |c| matches!(c, GitCall::CheckoutBranch(_)))
    }

    fn deletes(git: &MockGit) -> usize {
        count(git, |c| matches!(c, GitCall::DeleteBranch(_)))
    }

    mod state {
        use super::*;

        #[test]
        fn nothing_to_compensate_before_branch() {
            assert!(SagaState::default().eligible_compensations().is_empty());
        }

        #[test]
        fn uncommitted_branch_is_deleted() {
            let s = SagaState::default().advance(SagaStage::BranchCreated);
            assert_eq!(
                s.eligible_compensations(),
                vec![Compensation::CheckoutOriginal, Compensation::DeleteTempBranch]
            );
        }

        #[test]
        fn unpushed_commit_is_kept() {
            let s = SagaState::default()
                .advance(SagaStage::BranchCreated)
                .advance(SagaStage::Committed);
            assert_eq!(s.eligible_compensations(), vec![Compensation::CheckoutOriginal]);
        }

        #[test]
        fn pushed_branch_is_deleted() {
            let s = SagaState::default()
                .advance(SagaStage::BranchCreated)
                .advance(SagaStage::Committed)
                .advance(SagaStage::Pushed);
            assert_eq!(s.eligible_compensations().len(), 2);
            assert_eq!(s.stage, SagaStage::Pushed);
        }
    }

    mod run {
        use super::*;

        #[tokio::test]
        async fn success_path() {
            let git = MockGit::new("main").with_origin(ORIGIN);
            let report = BranchSaga::new(&git).run(&request()).await;

            assert!(report.is_clean(), "{:?}", report.failures);
            assert!(report.is_published());
            assert_eq!(report.state.stage, SagaStage::CleanedUp);
            assert_eq!(
                report.link.as_ref().and_then(|l| l.url()),
                Some("https://github.com/org/repo/compare/main...gops-1?expand=1")
            );
            assert_eq!(git.current_branch_sync(), "main");
            assert!(!git.has_branch("gops-1"));
            assert_eq!(git.pushed(), vec!["gops-1".to_string()]);
            assert_eq!(git.commits()[0].branch, "gops-1");
        }

        #[tokio::test]
        async fn start_failure_mutates_nothing() {
            let git = MockGit::new("main").fail_on(GitOperation::CurrentBranch);
            let report = BranchSaga::new(&git).run(&request()).await;

            assert_eq!(report.failed_at(), Some(SagaStage::Start));
            assert_eq!(git.calls(), vec![GitCall::CurrentBranch]);
        }

        #[tokio::test]
        async fn detached_head_fails_at_start() {
            let git = MockGit::new("HEAD");
            let report = BranchSaga::new(&git).run(&request()).await;
            assert_eq!(report.failed_at(), Some(SagaStage::Start));
            assert!(report.failures[0].error.contains("detached"));
        }

        #[tokio::test]
        async fn branch_creation_failure_has_no_compensation() {
            let git = MockGit::new("main").fail_on(GitOperation::CheckoutNewBranch);
            let report = BranchSaga::new(&git).run(&request()).await;

            assert_eq!(report.failed_at(), Some(SagaStage::BranchCreated));
            assert_eq!(checkouts(&git), 0);
            assert_eq!(deletes(&git), 0);
        }

        #[tokio::test]
        async fn commit_failure_skips_push_and_link_but_cleans_up_once() {
            let git = MockGit::new("main")
                .with_origin(ORIGIN)
                .fail_on(GitOperation::Commit);
            let report = BranchSaga::new(&git).run(&request()).await;

            assert_eq!(report.failed_at(), Some(SagaStage::Committed));
            assert_eq!(count(&git, |c| matches!(c, GitCall::PushBranch(_))), 0);
            assert_eq!(count(&git, |c| matches!(c, GitCall::OriginUrl)), 0);
            assert!(report.link.is_none());
            assert_eq!(checkouts(&git), 1);
            assert_eq!(deletes(&git), 1);
            assert_eq!(git.current_branch_sync(), "main");
            assert!(!git.has_branch("gops-1"));
        }

        #[tokio::test]
        async fn push_failure_keeps_branch() {
            let git = MockGit::new("main")
                .with_origin(ORIGIN)
                .fail_on(GitOperation::PushBranch);
            let report = BranchSaga::new(&git).run(&request()).await;

            assert_eq!(report.failed_at(), Some(SagaStage::Pushed));
            assert!(!report.is_published());
            assert!(report.failures[0].remedy.contains("push manually"));
            assert_eq!(count(&git, |c| matches!(c, GitCall::OriginUrl)), 0);
            assert_eq!(checkouts(&git), 1);
            assert_eq!(deletes(&git), 0);
            assert!(git.has_branch("gops-1"));
            assert_eq!(git.current_branch_sync(), "main");
        }

        #[tokio::test]
        async fn link_failure_does_not_block_cleanup() {
            let git = MockGit::new("main");
            let report = BranchSaga::new(&git).run(&request()).await;

            assert!(report.is_published());
            assert_eq!(report.failed_at(), Some(SagaStage::LinkGenerated));
            assert_eq!(report.failures[0].remedy, MANUAL_PR_MESSAGE);
            assert_eq!(checkouts(&git), 1);
            assert_eq!(deletes(&git), 1);
        }

        #[tokio::test]
        async fn unknown_provider_is_manual_link_not_failure() {
            let git = MockGit::new("main").with_origin("https://gitlab.com/o/r.git");
            let report = BranchSaga::new(&git).run(&request()).await;

            assert!(report.is_clean());
            assert_eq!(report.link, Some(PullRequestLink::Manual(MANUAL_PR_MESSAGE.into())));
        }

        #[tokio::test]
        async fn checkout_failure_still_attempts_delete() {
            let git = MockGit::new("main")
                .with_origin(ORIGIN)
                .fail_on(GitOperation::CheckoutBranch);
            let report = BranchSaga::new(&git).run(&request()).await;

            assert!(report.is_published());
            assert_eq!(report.failed_at(), None);
            assert_eq!(checkouts(&git), 1);
            assert_eq!(deletes(&git), 1);
            // Still on the temp branch, so the delete fails too.
            let failed: Vec<_> = report.compensation_failures().map(|f| f.compensation).collect();
            assert_eq!(
                failed,
                vec![
                    Some(Compensation::CheckoutOriginal),
                    Some(Compensation::DeleteTempBranch)
                ]
            );
            assert_ne!(report.state.stage, SagaStage::CleanedUp);
        }
    }
}
