//! terraform::definition
//!
//! Synthesis of the cluster definition document.
//!
//! A [`ClusterDefinition`] is built once per scaffold from the parsed
//! `variables.tf` and optional `backend.tfvars` plus caller metadata, and
//! serialized as `definition.json`:
//!
//! ```json
//! {
//!   "name": "west",
//!   "source": "https://github.com/org/infra.git",
//!   "template": "cluster/environments/azure-simple",
//!   "version": "v1.2.0",
//!   "backend": { "key": "tfstate" },
//!   "variables": { "foo": "<insert value>", "bar": "1234" }
//! }
//! ```
//!
//! `backend` and `variables` are omitted (not `null`) when empty. A variable
//! without a default is never dropped: it carries [`PLACEHOLDER`] so the
//! operator sees what still needs a value.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::backend::{parse_backend, BackendConfig};
use super::variables::{parse_variables, ParsedVariables};
use super::OrderedMap;

/// Marker written for variables that have no default value.
pub const PLACEHOLDER: &str = "<insert value>";

/// Caller-supplied metadata for a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSource {
    /// Cluster name.
    pub name: String,
    /// Origin repository URL of the Terraform template.
    pub source: String,
    /// Template identifier.
    pub template: String,
    /// Tag, branch or commit of the source repository.
    pub version: String,
}

/// Variable name to value, placeholders substituted, in declaration order.
pub type VariableSet = OrderedMap;

/// The synthesized cluster definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDefinition {
    pub name: String,
    pub source: String,
    pub template: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<VariableSet>,
}

impl ClusterDefinition {
    /// Build a definition from raw file contents.
    ///
    /// `backend_text` is only parsed when non-empty. Empty variable defaults
    /// are replaced with [`PLACEHOLDER`].
    ///
    /// # Example
    ///
    /// ```
    /// use gitops_scaffold::terraform::{ClusterDefinition, DefinitionSource, PLACEHOLDER};
    ///
    /// let source = DefinitionSource {
    ///     name: "west".into(),
    ///     source: "https://github.com/org/infra.git".into(),
    ///     template: "azure-simple".into(),
    ///     version: "v1.0.0".into(),
    /// };
    /// let def = ClusterDefinition::build(source, "", "variable \"foo\" {}");
    /// assert!(def.backend.is_none());
    /// assert_eq!(def.variables.unwrap().get("foo"), Some(PLACEHOLDER));
    /// ```
    pub fn build(source: DefinitionSource, backend_text: &str, variables_text: &str) -> Self {
        Self::from_parsed(source, backend_text, &parse_variables(variables_text))
    }

    /// Build a definition from an already parsed `variables.tf`.
    pub fn from_parsed(
        source: DefinitionSource,
        backend_text: &str,
        parsed: &ParsedVariables,
    ) -> Self {
        if parsed.skipped > 0 {
            warn!(
                skipped = parsed.skipped,
                "some variable blocks could not be parsed and were left out of the definition"
            );
        }

        let backend = if backend_text.is_empty() {
            None
        } else {
            Some(parse_backend(backend_text)).filter(|b| !b.is_empty())
        };

        let variables = if parsed.values.is_empty() {
            None
        } else {
            let mut fields = VariableSet::new();
            for (name, value) in parsed.values.iter() {
                let value = if value.is_empty() { PLACEHOLDER } else { value };
                fields.insert(name.to_string(), value.to_string());
            }
            Some(fields)
        };

        debug!(
            name = %source.name,
            variables = variables.as_ref().map_or(0, |v| v.len()),
            backend = backend.is_some(),
            "built cluster definition"
        );

        ClusterDefinition {
            name: source.name,
            source: source.source,
            template: source.template,
            version: source.version,
            backend,
            variables,
        }
    }

    /// Names of variables still carrying [`PLACEHOLDER`].
    pub fn unset_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .flat_map(|v| v.iter())
            .filter(|(_, value)| *value == PLACEHOLDER)
            .map(|(name, _)| name)
            .collect()
    }

    /// Render as 2-space indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
