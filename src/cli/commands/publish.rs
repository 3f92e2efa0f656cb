//! git publish command - Commit a directory on a new branch, push it, link a PR
//!
//! # Exit status
//!
//! The command fails when the changes did not reach the remote (the saga
//! stopped at start, branch creation, commit or push). Link and cleanup
//! failures are reported as warnings with the manual remedy.

use anyhow::{bail, Context as _, Result};
use uuid::Uuid;

use super::{git_driver, open_pull_request, show_link, verbosity, workspace};
use crate::cli::args::PublishArgs;
use crate::core::types::{BranchName, TypeError};
use crate::engine::{BranchSaga, Context, SagaReport, SagaRequest, SagaStage};
use crate::forge::PullRequestSpec;
use crate::git::GitOps;
use crate::ui::output::{self, Verbosity};

/// Prefix of generated branch names.
const BRANCH_PREFIX: &str = "gops-";

/// `gops-` followed by eight hex characters of a v4 UUID.
pub fn generated_branch_name() -> Result<BranchName, TypeError> {
    let id = Uuid::new_v4().simple().to_string();
    BranchName::new(format!("{}{}", BRANCH_PREFIX, &id[..8]))
}

/// Commit message used when none is given.
pub fn default_message(branch: &BranchName) -> String {
    format!("Adding new service: {}", branch)
}

pub async fn publish(ctx: &Context, args: PublishArgs) -> Result<()> {
    let (workdir, config) = workspace(ctx)?;
    let verbosity = verbosity(ctx);

    if !workdir.join(&args.dir).is_dir() {
        bail!("Directory '{}' does not exist.", args.dir.display());
    }

    let branch = match &args.branch {
        Some(name) => BranchName::new(name.as_str()).context("Invalid branch name")?,
        None => generated_branch_name()?,
    };
    let message = args
        .message
        .clone()
        .unwrap_or_else(|| default_message(&branch));

    let git = git_driver(workdir, &config);
    let request = SagaRequest {
        dir: args.dir.clone(),
        new_branch: branch.clone(),
        message,
    };
    let report = BranchSaga::new(&git).run(&request).await;

    render_report(&report, verbosity);

    if let Some(stage) = report.failed_at() {
        if stage <= SagaStage::Pushed {
            bail!(
                "Publishing '{}' failed at {}; see messages above.",
                args.dir.display(),
                stage
            );
        }
    }

    if let Some(link) = &report.link {
        show_link(link, args.open, verbosity);
    }

    if args.create_pr {
        let Some(target) = report.original_branch.clone() else {
            bail!("Original branch unknown; cannot open a pull request.");
        };
        let identity = git.user_identity().await.unwrap_or_default();
        let spec = PullRequestSpec {
            title: args
                .title
                .clone()
                .unwrap_or_else(|| default_message(&branch)),
            description: Some(format!(
                "Automated pull request for '{}' created by {} with gops.",
                args.dir.display(),
                identity
            )),
            source: branch,
            target,
            origin_url: None,
        };
        let pr = open_pull_request(ctx, &config, &git, &args.api, spec)
            .await
            .context("Branch was pushed but the pull request could not be created")?;
        output::result(&pr.url);
    }

    Ok(())
}

fn render_report(report: &SagaReport, verbosity: Verbosity) {
    if report.is_published() {
        output::print(format!("Pushed branch '{}'.", report.branch), verbosity);
    }
    for failure in &report.failures {
        if failure.compensation.is_some() || failure.stage > SagaStage::Pushed {
            output::warn(failure, verbosity);
        } else {
            output::error(failure);
        }
    }
}
