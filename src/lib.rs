//! gops - GitOps scaffolding and publishing
//!
//! gops synthesizes cluster definition documents from Terraform templates
//! and publishes directories through short-lived branches and pull requests.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates)
//! - [`terraform`] - `variables.tf` / `backend.tfvars` parsing and `definition.json` synthesis
//! - [`engine`] - The branch publishing saga with compensation
//! - [`git`] - Process driver for the git binary and origin URL parsing
//! - [`forge`] - Hosted git API (Azure DevOps), repository resolution, PR links
//! - [`core`] - Strong types and configuration
//! - [`ui`] - User-facing output and prompts
//!
//! # Invariants
//!
//! 1. Git is only ever invoked with argument vectors, never through a shell
//! 2. Access tokens never appear in logs or errors in cleartext
//! 3. A failed publish always reports which branch is left behind and how to recover

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod git;
pub mod terraform;
pub mod ui;
