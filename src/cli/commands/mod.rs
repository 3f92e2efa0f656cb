//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the library (terraform, engine, forge) to do the work
//! 3. Formats and displays output
//!
//! Handlers never run git themselves; they go through [`GitCli`] and the
//! saga.

mod completion;
mod config_cmd;
mod pr;
mod publish;
mod scaffold;

pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use pr::{create as pr_create, link as pr_link};
pub use publish::publish;
pub use scaffold::scaffold;

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use tracing::{debug, info};

use crate::cli::args::{ApiArgs, Command, ConfigAction, GitAction, InfraAction, PrAction, TOKEN_ENV};
use crate::core::config::Config;
use crate::engine::Context;
use crate::forge::azure::mask_token;
use crate::forge::{
    create_forge, resolve_origin, BranchMatchPolicy, ForgeOptions, PullRequest, PullRequestLink,
    PullRequestSpec, RemoteRepositoryResolver,
};
use crate::git::GitCli;
use crate::ui::output::{self, Verbosity};
use crate::ui::prompts::{self, PromptError};

/// Dispatch a command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Infra {
            action:
                InfraAction::Scaffold {
                    name,
                    source,
                    template_version,
                    template,
                },
        } => scaffold::scaffold(ctx, &name, &source, &template_version, template),
        Command::Git {
            action: GitAction::Publish(args),
        } => publish::publish(ctx, args).await,
        Command::Pr { action } => match action {
            PrAction::Create {
                source,
                target,
                title,
                description,
                origin,
                api,
            } => pr::create(ctx, &source, &target, title, description, origin, &api).await,
            PrAction::Link {
                base,
                branch,
                origin,
                open,
            } => pr::link(ctx, &base, branch.as_deref(), origin.as_deref(), open).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
            ConfigAction::List => config_cmd::list(ctx),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

fn verbosity(ctx: &Context) -> Verbosity {
    Verbosity::from_flags(ctx.quiet, ctx.debug)
}

/// Working directory and the configuration that applies to it.
fn workspace(ctx: &Context) -> Result<(PathBuf, Config)> {
    let workdir = ctx
        .workdir()
        .context("Failed to determine working directory")?;
    let config = Config::load(Some(&workdir)).context("Failed to load config")?;
    Ok((workdir, config))
}

fn git_driver(workdir: PathBuf, config: &Config) -> GitCli {
    GitCli::new(workdir).with_timeout(config.git_timeout())
}

/// Token from `--token`/`AZURE_DEVOPS_EXT_PAT`, else a masked prompt.
fn resolve_token(ctx: &Context, token: Option<&str>) -> Result<String> {
    if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
        debug!(token = %mask_token(token), "using access token from flag or environment");
        return Ok(token.to_string());
    }

    match prompts::password("Azure DevOps personal access token: ", ctx.interactive) {
        Ok(token) => Ok(token),
        Err(PromptError::NotInteractive) | Err(PromptError::Cancelled) => bail!(
            "An access token is required. Use --token <TOKEN> or set {}.",
            TOKEN_ENV
        ),
        Err(e) => Err(e).context("Failed to read token"),
    }
}

/// Resolve the repository from the origin and open a pull request.
async fn open_pull_request(
    ctx: &Context,
    config: &Config,
    git: &GitCli,
    api: &ApiArgs,
    mut spec: PullRequestSpec,
) -> Result<PullRequest> {
    let origin = resolve_origin(git, spec.origin_url.as_deref()).await?;
    spec.origin_url = Some(origin.clone());

    let token = resolve_token(ctx, api.token.as_deref())?;
    let options = ForgeOptions {
        org_url: api.org_url.clone().or_else(|| config.org_url()),
        api_version: config.api_version(),
        http_timeout: config.http_timeout(),
    };
    let forge = create_forge(&origin, &token, &options)?;

    let policy = if api.allow_missing_branches || !config.strict_branch_match() {
        BranchMatchPolicy::Informational
    } else {
        BranchMatchPolicy::Strict
    };

    let pr = RemoteRepositoryResolver::new(forge.as_ref(), git)
        .with_policy(policy)
        .create_pull_request(spec)
        .await?;
    Ok(pr)
}

/// Print a link and optionally open it in a browser.
fn show_link(link: &PullRequestLink, open: bool, verbosity: Verbosity) {
    match link {
        PullRequestLink::Url(url) => {
            output::result(url);
            if open {
                info!(%url, "opening browser");
                if let Err(e) = open::that(url) {
                    output::warn(format!("Could not open browser: {}", e), verbosity);
                }
            }
        }
        PullRequestLink::Manual(message) => output::warn(message, verbosity),
    }
}
