//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--no-interactive`: Never prompt
//! - `--quiet` / `-q`: Minimal output

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Environment variable holding the Azure DevOps access token.
pub const TOKEN_ENV: &str = "AZURE_DEVOPS_EXT_PAT";

/// gops - scaffold GitOps cluster definitions and publish them as pull requests
#[derive(Parser, Debug)]
#[command(name = "gops")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Global config is read from $GOPS_CONFIG when set.")]
pub struct Cli {
    /// Run as if gops was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Interactive unless `--no-interactive` or `--quiet` was set or stdin
    /// is not a terminal.
    pub fn interactive(&self) -> bool {
        !(self.no_interactive || self.quiet) && std::io::stdin().is_terminal()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Terraform cluster definitions
    Infra {
        #[command(subcommand)]
        action: InfraAction,
    },

    /// Publish a directory through a branch and pull request link
    Git {
        #[command(subcommand)]
        action: GitAction,
    },

    /// Pull requests on the hosted git service
    Pr {
        #[command(subcommand)]
        action: PrAction,
    },

    /// Get, set, or list configuration values
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(after_help = "\
EXAMPLES:
    # Bash
    gops completion bash > /etc/bash_completion.d/gops

    # Zsh
    gops completion zsh > \"${fpath[1]}/_gops\"")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Infra subcommands
#[derive(Subcommand, Debug)]
pub enum InfraAction {
    /// Create initial scaffolding for a cluster deployment
    #[command(
        long_about = "Create initial scaffolding for a cluster deployment.\n\n\
            Copies the Terraform template into <NAME>/, reads variables.tf and the \
            optional backend.tfvars, and writes <NAME>/definition.json. Variables \
            without a default are written as \"<insert value>\" and must be filled in."
    )]
    Scaffold {
        /// Name of the cluster definition directory
        #[arg(short, long)]
        name: String,

        /// Source repository URL of the Terraform template
        #[arg(short, long)]
        source: String,

        /// Template version (tag, branch or commit)
        #[arg(short = 'v', long = "version")]
        template_version: String,

        /// Path to the Terraform template directory
        #[arg(short, long)]
        template: PathBuf,
    },
}

/// Git subcommands
#[derive(Subcommand, Debug)]
pub enum GitAction {
    /// Commit a directory on a new branch, push it and print a PR link
    #[command(
        long_about = "Commit a directory on a new branch, push it and print a PR link.\n\n\
            The branch is created from the current branch. After pushing, gops checks \
            out the original branch again and deletes the local temporary branch. If \
            the push fails the temporary branch is kept so the commit is not lost."
    )]
    Publish(PublishArgs),
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Directory to commit, relative to the working tree
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Branch to create (default: gops-<random>)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Commit message (default: "Adding new service: <branch>")
    #[arg(short, long)]
    pub message: Option<String>,

    /// Open the pull request link in a browser
    #[arg(long)]
    pub open: bool,

    /// Also open the pull request through the hosted API
    #[arg(long)]
    pub create_pr: bool,

    /// Pull request title (with --create-pr)
    #[arg(long, requires = "create_pr")]
    pub title: Option<String>,

    #[command(flatten)]
    pub api: ApiArgs,
}

/// Hosted API connection flags.
#[derive(Args, Debug, Clone, Default)]
pub struct ApiArgs {
    /// Personal access token
    #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
    pub token: Option<String>,

    /// Organization URL (default: derived from origin)
    #[arg(long)]
    pub org_url: Option<String>,

    /// Proceed even if the matched repository lacks the source or target branch
    #[arg(long)]
    pub allow_missing_branches: bool,
}

/// PR subcommands
#[derive(Subcommand, Debug)]
pub enum PrAction {
    /// Create a pull request through the hosted API
    Create {
        /// Source branch
        #[arg(short, long)]
        source: String,

        /// Target branch
        #[arg(short, long)]
        target: String,

        /// Pull request title
        #[arg(long)]
        title: String,

        /// Pull request description (default: names the git user)
        #[arg(long)]
        description: Option<String>,

        /// Origin URL (default: remote.origin.url)
        #[arg(long)]
        origin: Option<String>,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// Print the create-PR link for a branch without calling any API
    Link {
        /// Branch to merge into
        #[arg(long, default_value = "main")]
        base: String,

        /// Branch to merge (default: current branch)
        #[arg(long)]
        branch: Option<String>,

        /// Origin URL (default: remote.origin.url)
        #[arg(long)]
        origin: Option<String>,

        /// Open the link in a browser
        #[arg(long)]
        open: bool,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value in the global file
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// List all configuration values
    List,
}
