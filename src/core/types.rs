//! core::types
//!
//! Strong types for branch and reference names.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name, used for the temporary
//!   publish branch and for pull request source/target branches
//! - [`RefName`] - Validated Git reference name (`refs/heads/<branch>`), the
//!   form the hosted API expects when creating pull requests
//!
//! # Validation
//!
//! Both types enforce validity at construction time. A branch name that git
//! would reject never reaches the process driver, so `git checkout -b` cannot
//! be handed something like `--force` or `a..b`.
//!
//! # Examples
//!
//! ```
//! use gitops_scaffold::core::types::{BranchName, RefName};
//!
//! let branch = BranchName::new("cluster/west-2").unwrap();
//! let refname = RefName::for_branch(&branch);
//! assert_eq!(refname.as_str(), "refs/heads/cluster/west-2");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(BranchName::new("--force").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),
}

/// Characters git forbids anywhere in a refname.
const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Check the refname rules shared by branch and ref names.
///
/// Returns a description of the first violated rule. `what` names the kind
/// of name in the message ("branch name" or "ref name").
fn check_refname_rules(name: &str, what: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    if name.starts_with('/') {
        return Err(format!("{what} cannot start with '/'"));
    }
    if name.ends_with('/') {
        return Err(format!("{what} cannot end with '/'"));
    }
    if name.ends_with(".lock") {
        return Err(format!("{what} cannot end with '.lock'"));
    }

    for forbidden in ["..", "@{", "//"] {
        if name.contains(forbidden) {
            return Err(format!("{what} cannot contain '{forbidden}'"));
        }
    }

    for c in INVALID_CHARS {
        if name.contains(c) {
            return Err(format!("{what} cannot contain '{c}'"));
        }
    }

    if name.chars().any(|c| c.is_ascii_control()) {
        return Err(format!("{what} cannot contain control characters"));
    }

    for component in name.split('/') {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }

    Ok(())
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.`, `-` or `/`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// The leading `-` rule matters here more than anywhere else: branch names
/// are passed to the git binary as arguments.
///
/// # Example
///
/// ```
/// use gitops_scaffold::core::types::BranchName;
///
/// let name = BranchName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("-D").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        check_refname_rules(name, "branch name").map_err(TypeError::InvalidBranchName)
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl std::str::FromStr for BranchName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name.
///
/// # Example
///
/// ```
/// use gitops_scaffold::core::types::{BranchName, RefName};
///
/// let branch = BranchName::new("main").unwrap();
/// let refname = RefName::for_branch(&branch);
/// assert_eq!(refname.as_str(), "refs/heads/main");
/// assert_eq!(refname.strip_prefix("refs/heads/"), Some("main"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Prefix shared by all local branch refs.
    pub const HEADS_PREFIX: &'static str = "refs/heads/";

    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_refname_rules(&name, "ref name").map_err(TypeError::InvalidRefName)?;
        Ok(Self(name))
    }

    /// Create a ref name for a branch (`refs/heads/<branch>`).
    pub fn for_branch(branch: &BranchName) -> Self {
        // Branch names are validated and the prefix is a valid path
        Self(format!("{}{}", Self::HEADS_PREFIX, branch.as_str()))
    }

    /// Strip a prefix from the ref name and return the remainder.
    ///
    /// Returns `None` if the ref doesn't start with the given prefix.
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        self.0.strip_prefix(prefix)
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("feature/foo").is_ok());
            assert!(BranchName::new("fix-123").is_ok());
            assert!(BranchName::new("user@feature").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
            assert!(BranchName::new("gops-1a2b3c4d").is_ok());
        }

        #[test]
        fn empty_name_rejected() {
            assert!(BranchName::new("").is_err());
        }

        #[test]
        fn option_like_names_rejected() {
            assert!(BranchName::new("-D").is_err());
            assert!(BranchName::new("--force").is_err());
        }

        #[test]
        fn hidden_components_rejected() {
            assert!(BranchName::new(".hidden").is_err());
            assert!(BranchName::new("foo/.hidden").is_err());
        }

        #[test]
        fn lock_suffix_rejected() {
            assert!(BranchName::new("branch.lock").is_err());
            assert!(BranchName::new("foo.lock/bar").is_err());
        }

        #[test]
        fn forbidden_sequences_rejected() {
            assert!(BranchName::new("a..b").is_err());
            assert!(BranchName::new("a@{b").is_err());
            assert!(BranchName::new("a//b").is_err());
            assert!(BranchName::new("trailing/").is_err());
        }

        #[test]
        fn forbidden_characters_rejected() {
            for name in ["has space", "a~b", "a^b", "a:b", "a\\b", "a?b", "a*b", "a[b"] {
                assert!(BranchName::new(name).is_err(), "{name} should be rejected");
            }
            assert!(BranchName::new("tab\there").is_err());
        }

        #[test]
        fn at_alone_rejected() {
            assert!(BranchName::new("@").is_err());
        }

        #[test]
        fn error_message_names_the_rule() {
            let err = BranchName::new("a..b").unwrap_err();
            assert_eq!(
                err,
                TypeError::InvalidBranchName("branch name cannot contain '..'".into())
            );
        }

        #[test]
        fn parses_from_str() {
            let name: BranchName = "release/1.0".parse().unwrap();
            assert_eq!(name.as_str(), "release/1.0");
        }

        #[test]
        fn serde_roundtrip_validates() {
            let json = serde_json::to_string(&BranchName::new("main").unwrap()).unwrap();
            assert_eq!(json, "\"main\"");
            assert!(serde_json::from_str::<BranchName>("\"a..b\"").is_err());
        }
    }

    mod ref_name {
        use super::*;

        #[test]
        fn for_branch_prefixes_heads() {
            let branch = BranchName::new("feature/foo").unwrap();
            let refname = RefName::for_branch(&branch);
            assert_eq!(refname.as_str(), "refs/heads/feature/foo");
        }

        #[test]
        fn strip_prefix() {
            let refname = RefName::new("refs/heads/main").unwrap();
            assert_eq!(refname.strip_prefix(RefName::HEADS_PREFIX), Some("main"));
            assert_eq!(refname.strip_prefix("refs/tags/"), None);
        }

        #[test]
        fn invalid_refs_rejected() {
            assert!(RefName::new("").is_err());
            assert!(RefName::new("/refs/heads/x").is_err());
            assert!(RefName::new("refs/heads/a..b").is_err());
        }
    }
}
