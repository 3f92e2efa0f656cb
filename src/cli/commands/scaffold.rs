//! infra scaffold command - Create a cluster definition from a Terraform template

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::{verbosity, workspace};
use crate::engine::Context;
use crate::terraform::{Scaffold, PLACEHOLDER};
use crate::ui::output;

/// Copy the template into `<name>/` and write `definition.json`.
pub fn scaffold(
    ctx: &Context,
    name: &str,
    source: &str,
    version: &str,
    template: PathBuf,
) -> Result<()> {
    let (root, _config) = workspace(ctx)?;
    let verbosity = verbosity(ctx);

    let outcome = Scaffold {
        root,
        name: name.to_string(),
        source: source.to_string(),
        version: version.to_string(),
        template,
    }
    .run()
    .with_context(|| format!("Failed to scaffold cluster '{}'", name))?;

    if outcome.skipped_blocks > 0 {
        output::warn(
            format!(
                "{} malformed variable block(s) in variables.tf were skipped",
                outcome.skipped_blocks
            ),
            verbosity,
        );
    }

    let unset = outcome.definition.unset_variables();
    if !unset.is_empty() {
        output::print(
            format!(
                "Fill in the {} variable(s) marked \"{}\":\n{}",
                unset.len(),
                PLACEHOLDER,
                output::format_list(&unset, "  - ")
            ),
            verbosity,
        );
    }

    output::print(
        format!("Wrote {}", outcome.definition_path.display()),
        verbosity,
    );
    Ok(())
}
