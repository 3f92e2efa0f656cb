//! pr commands - Create a pull request through the API, or print a link
//!
//! # Example
//!
//! ```bash
//! # Open a PR for an already pushed branch
//! gops pr create --source gops-1a2b3c4d --target main --title "Add west"
//!
//! # Print the create-PR page for the current branch
//! gops pr link --base main --open
//! ```

use anyhow::{Context as _, Result};

use super::{git_driver, open_pull_request, show_link, verbosity, workspace};
use crate::cli::args::ApiArgs;
use crate::core::types::BranchName;
use crate::engine::Context;
use crate::forge::{pull_request_link, resolve_origin, PullRequestSpec};
use crate::git::GitOps;
use crate::ui::output;

/// Create a pull request from `source` into `target`.
pub async fn create(
    ctx: &Context,
    source: &str,
    target: &str,
    title: String,
    description: Option<String>,
    origin: Option<String>,
    api: &ApiArgs,
) -> Result<()> {
    let (workdir, config) = workspace(ctx)?;
    let git = git_driver(workdir, &config);

    let source = BranchName::new(source).context("Invalid source branch")?;
    let target = BranchName::new(target).context("Invalid target branch")?;

    let description = match description {
        Some(d) => d,
        None => {
            let identity = git.user_identity().await.unwrap_or_default();
            format!("Pull request created by {} with gops.", identity)
        }
    };

    let spec = PullRequestSpec {
        title,
        description: Some(description),
        source,
        target,
        origin_url: origin,
    };
    let pr = open_pull_request(ctx, &config, &git, api, spec)
        .await
        .context("Failed to create pull request")?;

    output::print(format!("Created pull request #{} ({})", pr.id, pr.status), verbosity(ctx));
    output::result(&pr.url);
    Ok(())
}

/// Print the create-PR link for `branch` (default: current) into `base`.
pub async fn link(
    ctx: &Context,
    base: &str,
    branch: Option<&str>,
    origin: Option<&str>,
    open: bool,
) -> Result<()> {
    let (workdir, config) = workspace(ctx)?;
    let git = git_driver(workdir, &config);

    let base = BranchName::new(base).context("Invalid base branch")?;
    let branch = match branch {
        Some(b) => BranchName::new(b).context("Invalid branch name")?,
        None => {
            let current = git
                .current_branch()
                .await
                .context("Failed to read current branch")?;
            BranchName::new(current).context("Not on a branch. Pass --branch.")?
        }
    };

    let origin = resolve_origin(&git, origin).await?;
    let link = pull_request_link(&origin, &base, &branch)
        .with_context(|| format!("Invalid origin URL '{}'", origin))?;

    show_link(&link, open, verbosity(ctx));
    Ok(())
}
