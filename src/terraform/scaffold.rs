//! terraform::scaffold
//!
//! The file-level scaffold operation.
//!
//! # Steps
//!
//! 1. Require `<template>/variables.tf` (otherwise [`ScaffoldError::ConfigurationMissing`])
//! 2. Copy the Terraform template directory into `<root>/<name>/`
//! 3. Read `<name>/backend.tfvars` when present
//! 4. Build the [`ClusterDefinition`] and write `<name>/definition.json`
//! 5. Remove the copied top-level template files, keeping `definition.json`
//!
//! Subdirectories of the template are copied but never pruned. The
//! destination must not exist yet and must not lie inside the template, so
//! pruning can only ever remove files this operation copied. If any step
//! after the copy starts fails, the destination is removed again.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::definition::{ClusterDefinition, DefinitionSource};
use super::variables::parse_variables;

/// Name of the written definition document.
pub const DEFINITION_FILE: &str = "definition.json";

const VARIABLES_FILE: &str = "variables.tf";
const BACKEND_FILE: &str = "backend.tfvars";

/// Errors from the scaffold operation.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// A file or directory the operation needs is absent.
    #[error("{what} not found: {}", .path.display())]
    ConfigurationMissing { what: &'static str, path: PathBuf },

    /// The destination would be created inside the template being copied.
    #[error("cannot scaffold into '{}': it is inside the template directory '{}'", .destination.display(), .template.display())]
    DestinationInsideTemplate { template: PathBuf, destination: PathBuf },

    /// The destination directory already exists.
    #[error("destination '{}' already exists; remove it or choose another cluster name", .path.display())]
    DestinationExists { path: PathBuf },

    #[error("cluster name '{0}' must be a single directory name")]
    InvalidName(String),

    #[error("failed to {action} '{}': {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize definition: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ScaffoldError {
    fn io(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| ScaffoldError::Io {
            action,
            path,
            source,
        }
    }
}

/// Inputs to one scaffold invocation.
#[derive(Debug, Clone)]
pub struct Scaffold {
    /// Directory in which `<name>/` is created.
    pub root: PathBuf,
    /// Cluster name; also the destination directory name.
    pub name: String,
    /// Source repository URL recorded in the definition.
    pub source: String,
    /// Source repository version recorded in the definition.
    pub version: String,
    /// Template directory to copy.
    pub template: PathBuf,
}

/// Result of a successful scaffold.
#[derive(Debug)]
pub struct ScaffoldOutcome {
    /// Path of the written `definition.json`.
    pub definition_path: PathBuf,
    /// The written definition.
    pub definition: ClusterDefinition,
    /// Malformed variable blocks that were left out.
    pub skipped_blocks: usize,
    /// Top-level template files removed after writing the definition.
    pub removed_files: Vec<PathBuf>,
}

impl Scaffold {
    /// Destination directory (`<root>/<name>`).
    pub fn destination(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// Run the scaffold.
    pub fn run(&self) -> Result<ScaffoldOutcome, ScaffoldError> {
        self.check_name()?;

        let template = self.resolve_template();
        if !template.is_dir() {
            return Err(ScaffoldError::ConfigurationMissing {
                what: "template directory",
                path: template,
            });
        }

        let destination = self.destination();
        if destination.exists() {
            return Err(ScaffoldError::DestinationExists { path: destination });
        }

        let variables_path = template.join(VARIABLES_FILE);
        if !variables_path.is_file() {
            return Err(ScaffoldError::ConfigurationMissing {
                what: VARIABLES_FILE,
                path: variables_path,
            });
        }

        self.check_outside_template(&template)?;

        let result = copy_tree(&template, &destination).and_then(|()| {
            info!(
                template = %template.display(),
                destination = %destination.display(),
                "copied terraform template"
            );
            self.write_definition(&destination)
        });

        if result.is_err() {
            match fs::remove_dir_all(&destination) {
                Ok(()) => debug!(path = %destination.display(), "removed partial destination"),
                Err(e) => warn!(
                    path = %destination.display(),
                    error = %e,
                    "failed to remove partial destination"
                ),
            }
        }
        result
    }

    fn write_definition(&self, destination: &Path) -> Result<ScaffoldOutcome, ScaffoldError> {
        let variables_path = destination.join(VARIABLES_FILE);
        let variables_text = fs::read_to_string(&variables_path)
            .map_err(ScaffoldError::io("read", &variables_path))?;

        let backend_path = destination.join(BACKEND_FILE);
        let backend_text = if backend_path.is_file() {
            info!(path = %backend_path.display(), "found remote backend configuration");
            fs::read_to_string(&backend_path).map_err(ScaffoldError::io("read", &backend_path))?
        } else {
            debug!("no remote backend configuration");
            String::new()
        };

        let parsed = parse_variables(&variables_text);
        let definition = ClusterDefinition::from_parsed(
            DefinitionSource {
                name: self.name.clone(),
                source: self.source.clone(),
                template: self.template.display().to_string(),
                version: self.version.clone(),
            },
            &backend_text,
            &parsed,
        );

        let definition_path = destination.join(DEFINITION_FILE);
        let mut json = definition.to_json_pretty()?;
        json.push('\n');
        write_atomic(&definition_path, json.as_bytes())?;
        info!(path = %definition_path.display(), "wrote cluster definition");

        let removed_files = prune_template_files(destination)?;

        Ok(ScaffoldOutcome {
            definition_path,
            definition,
            skipped_blocks: parsed.skipped,
            removed_files,
        })
    }

    /// Refuse a destination that the template walk would copy into itself.
    fn check_outside_template(&self, template: &Path) -> Result<(), ScaffoldError> {
        let template = template
            .canonicalize()
            .map_err(ScaffoldError::io("resolve", template))?;
        let destination = self
            .root
            .canonicalize()
            .map_err(ScaffoldError::io("resolve", &self.root))?
            .join(&self.name);

        if destination.starts_with(&template) {
            return Err(ScaffoldError::DestinationInsideTemplate {
                template,
                destination,
            });
        }
        Ok(())
    }

    fn check_name(&self) -> Result<(), ScaffoldError> {
        let mut components = Path::new(&self.name).components();
        match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(_)), None) => Ok(()),
            _ => Err(ScaffoldError::InvalidName(self.name.clone())),
        }
    }

    fn resolve_template(&self) -> PathBuf {
        if self.template.is_absolute() {
            self.template.clone()
        } else {
            self.root.join(&self.template)
        }
    }
}

/// Recursively copy `from` into a new directory `to`.
fn copy_tree(from: &Path, to: &Path) -> Result<(), ScaffoldError> {
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            ScaffoldError::Io {
                action: "read template",
                path,
                source: e.into(),
            }
        })?;

        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(ScaffoldError::io("create directory", &target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(ScaffoldError::io("copy", entry.path()))?;
        }
    }
    Ok(())
}

/// Remove top-level regular files other than the definition.
fn prune_template_files(destination: &Path) -> Result<Vec<PathBuf>, ScaffoldError> {
    let mut removed = Vec::new();
    let entries =
        fs::read_dir(destination).map_err(ScaffoldError::io("read directory", destination))?;

    for entry in entries {
        let entry = entry.map_err(ScaffoldError::io("read directory", destination))?;
        let path = entry.path();
        if !path.is_file() || entry.file_name() == DEFINITION_FILE {
            continue;
        }
        fs::remove_file(&path).map_err(ScaffoldError::io("remove", &path))?;
        debug!(path = %path.display(), "removed template file");
        removed.push(path);
    }

    removed.sort();
    Ok(removed)
}

/// Write a file via temp file and rename.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ScaffoldError> {
    let temp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path).map_err(ScaffoldError::io("create", &temp_path))?;
    file.write_all(contents)
        .map_err(ScaffoldError::io("write", &temp_path))?;
    file.sync_all()
        .map_err(ScaffoldError::io("write", &temp_path))?;
    fs::rename(&temp_path, path).map_err(ScaffoldError::io("write", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terraform::PLACEHOLDER;
    use tempfile::TempDir;

    fn template(root: &Path, with_backend: bool) -> PathBuf {
        let dir = root.join("templates/azure-simple");
        fs::create_dir_all(dir.join("modules")).unwrap();
        fs::write(
            dir.join("variables.tf"),
            "variable \"foo\" {}\nvariable \"bar\" {\n  default = \"1234\"\n}\n",
        )
        .unwrap();
        fs::write(dir.join("main.tf"), "module \"aks\" {}\n").unwrap();
        fs::write(dir.join("modules/readme.md"), "nested\n").unwrap();
        if with_backend {
            fs::write(dir.join("backend.tfvars"), "key = \"tfstate\"\n").unwrap();
        }
        dir
    }

    fn scaffold(root: &Path, template: PathBuf) -> Scaffold {
        Scaffold {
            root: root.to_path_buf(),
            name: "west".into(),
            source: "https://github.com/org/infra.git".into(),
            version: "v1.0.0".into(),
            template,
        }
    }

    #[test]
    fn writes_definition_and_prunes_files() {
        let temp = TempDir::new().unwrap();
        let tpl = template(temp.path(), true);

        let outcome = scaffold(temp.path(), tpl.clone()).run().unwrap();

        let dest = temp.path().join("west");
        assert_eq!(outcome.definition_path, dest.join(DEFINITION_FILE));
        assert!(outcome.definition_path.is_file());
        assert!(!dest.join("variables.tf").exists());
        assert!(!dest.join("main.tf").exists());
        assert!(!dest.join("backend.tfvars").exists());
        assert!(dest.join("modules/readme.md").is_file());
        assert_eq!(outcome.removed_files.len(), 3);

        // template itself untouched
        assert!(tpl.join("variables.tf").is_file());
    }

    #[test]
    fn definition_contents() {
        let temp = TempDir::new().unwrap();
        let tpl = template(temp.path(), true);

        let outcome = scaffold(temp.path(), tpl).run().unwrap();
        let text = fs::read_to_string(&outcome.definition_path).unwrap();
        assert!(text.ends_with("}\n"));

        let written: ClusterDefinition = serde_json::from_str(&text).unwrap();
        assert_eq!(written, outcome.definition);
        assert_eq!(written.name, "west");
        assert_eq!(written.backend.unwrap().get("key"), Some("tfstate"));
        let variables = written.variables.unwrap();
        assert_eq!(variables.get("foo"), Some(PLACEHOLDER));
        assert_eq!(variables.get("bar"), Some("1234"));
    }

    #[test]
    fn no_backend_file_omits_backend() {
        let temp = TempDir::new().unwrap();
        let tpl = template(temp.path(), false);

        let outcome = scaffold(temp.path(), tpl).run().unwrap();
        assert!(outcome.definition.backend.is_none());
    }

    #[test]
    fn missing_variables_is_configuration_missing() {
        let temp = TempDir::new().unwrap();
        let tpl = template(temp.path(), false);
        fs::remove_file(tpl.join("variables.tf")).unwrap();

        let err = scaffold(temp.path(), tpl).run().unwrap_err();
        assert!(matches!(
            err,
            ScaffoldError::ConfigurationMissing { what: "variables.tf", .. }
        ));
    }

    #[test]
    fn missing_variables_leaves_nothing_behind_and_retry_succeeds() {
        let temp = TempDir::new().unwrap();
        let tpl = template(temp.path(), false);
        let text = fs::read_to_string(tpl.join("variables.tf")).unwrap();
        fs::remove_file(tpl.join("variables.tf")).unwrap();

        let err = scaffold(temp.path(), tpl.clone()).run().unwrap_err();
        assert!(matches!(err, ScaffoldError::ConfigurationMissing { .. }));
        assert!(!temp.path().join("west").exists());

        fs::write(tpl.join("variables.tf"), text).unwrap();
        let outcome = scaffold(temp.path(), tpl).run().unwrap();
        assert!(outcome.definition_path.is_file());
    }

    #[test]
    fn failure_after_copy_removes_destination() {
        let temp = TempDir::new().unwrap();
        let tpl = template(temp.path(), false);
        fs::write(tpl.join("variables.tf"), [0xff, 0xfe, 0xfd]).unwrap();

        let err = scaffold(temp.path(), tpl.clone()).run().unwrap_err();
        assert!(matches!(err, ScaffoldError::Io { action: "read", .. }));
        assert!(!temp.path().join("west").exists());

        fs::write(tpl.join("variables.tf"), "variable \"foo\" {}\n").unwrap();
        assert!(scaffold(temp.path(), tpl).run().is_ok());
    }

    #[test]
    fn template_containing_destination_refused() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("variables.tf"), "variable \"foo\" {}\n").unwrap();

        let err = scaffold(temp.path(), PathBuf::from(".")).run().unwrap_err();

        assert!(matches!(err, ScaffoldError::DestinationInsideTemplate { .. }));
        assert!(err.to_string().contains("inside the template directory"));
        assert!(!temp.path().join("west").exists());
        assert!(temp.path().join("variables.tf").is_file());
    }

    #[test]
    fn sibling_template_is_not_mistaken_for_parent() {
        let temp = TempDir::new().unwrap();
        let tpl = temp.path().join("we");
        fs::create_dir(&tpl).unwrap();
        fs::write(tpl.join("variables.tf"), "variable \"foo\" {}\n").unwrap();

        let outcome = scaffold(temp.path(), tpl).run().unwrap();
        assert!(outcome.definition_path.is_file());
    }

    #[test]
    fn missing_template_is_configuration_missing() {
        let temp = TempDir::new().unwrap();
        let err = scaffold(temp.path(), temp.path().join("nope"))
            .run()
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::ConfigurationMissing { .. }));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn existing_destination_refused() {
        let temp = TempDir::new().unwrap();
        let tpl = template(temp.path(), false);
        fs::create_dir(temp.path().join("west")).unwrap();
        fs::write(temp.path().join("west/keep.txt"), "mine").unwrap();

        let err = scaffold(temp.path(), tpl).run().unwrap_err();
        assert!(matches!(err, ScaffoldError::DestinationExists { .. }));
        assert!(temp.path().join("west/keep.txt").is_file());
    }

    #[test]
    fn name_with_separator_refused() {
        let temp = TempDir::new().unwrap();
        let tpl = template(temp.path(), false);
        let mut s = scaffold(temp.path(), tpl);
        s.name = "../escape".into();
        assert!(matches!(s.run(), Err(ScaffoldError::InvalidName(_))));
    }

    #[test]
    fn skipped_blocks_reported() {
        let temp = TempDir::new().unwrap();
        let tpl = template(temp.path(), false);
        fs::write(
            tpl.join("variables.tf"),
            "variable \"ok\" {}\nvariable broken\n",
        )
        .unwrap();

        let outcome = scaffold(temp.path(), tpl).run().unwrap();
        assert_eq!(outcome.skipped_blocks, 1);
    }
}
