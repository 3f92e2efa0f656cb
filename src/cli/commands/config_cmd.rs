//! config command - Get, set, or list configuration values
//!
//! `get` and `list` show the resolved value (repo over global over default);
//! `set` writes the global file.

use anyhow::{Context as _, Result};

use super::{verbosity, workspace};
use crate::core::config::{Config, ConfigFile, KEYS};
use crate::engine::Context;
use crate::ui::output;

/// Get a configuration value. Unset keys print nothing.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let (_, config) = workspace(ctx)?;
    if let Some(value) = config.get(key)? {
        output::result(value);
    }
    Ok(())
}

/// Set a configuration value in the global config file.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let (_, config) = workspace(ctx)?;

    let path = config.global_write_path()?;
    let mut file = if path.exists() {
        Config::read_file(&path)?
    } else {
        ConfigFile::default()
    };

    file.set(key, value)?;
    Config::write_atomic(&path, &file)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    output::print(format!("Set {} = {}", key, value), verbosity(ctx));
    Ok(())
}

/// List every known key with its resolved value.
pub fn list(ctx: &Context) -> Result<()> {
    let (_, config) = workspace(ctx)?;

    if let Some(path) = config.global_config_loaded_from() {
        output::print(format!("# global: {}", path.display()), verbosity(ctx));
    }
    if let Some(path) = config.repo_config_loaded_from() {
        output::print(format!("# repo: {}", path.display()), verbosity(ctx));
    }

    for key in KEYS {
        let line = match config.get(key)? {
            Some(value) => format!("{} = {}", key, value),
            None => format!("{} = (not set)", key),
        };
        output::result(line);
    }
    Ok(())
}
