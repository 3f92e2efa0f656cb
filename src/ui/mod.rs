//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`prompts`] - Masked token prompt
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing output and prompts go through this module so quiet and
//! non-interactive modes are handled in one place. Diagnostics go through
//! `tracing` instead.

pub mod output;
pub mod prompts;
