//! terraform::variables
//!
//! Extraction of variable names and defaults from a `variables.tf` file.
//!
//! # Grammar
//!
//! Only the narrow shape below is understood; this is not an HCL parser.
//!
//! ```text
//! variable "foo" {
//! }
//!
//! variable "bar" {
//!     default = "1234"
//! }
//! ```
//!
//! The input is split on every line that starts with the `variable` keyword.
//! Each segment is split once on `"` followed by optional whitespace and `{`,
//! which separates the quoted name from the body. The body is searched for a
//! `default = <value>` assignment whose value runs to the end of that line.
//!
//! # Lossy by contract
//!
//! Segments without the name/brace separator, or whose name is empty, are
//! skipped without error. The number of skipped segments is reported in
//! [`ParsedVariables::skipped`] so callers can surface it. Text before the
//! first `variable` keyword is preamble and is never counted.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::OrderedMap;

/// Split point between blocks: `variable` at the start of any line.
fn block_split_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^variable").expect("static regex"))
}

/// Separator between the quoted name and the block body.
fn name_body_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""\s*\{"#).expect("static regex"))
}

/// A `default = <value>` assignment; the value runs to end of line.
fn default_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"default\s*=\s*(.*)").expect("static regex"))
}

/// One `variable "<name>" { ... }` segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBlock {
    /// Declared variable name, quotes removed. Never empty.
    pub name: String,
    /// Everything after the opening brace, untouched.
    pub raw_body: String,
}

impl VariableBlock {
    /// The default value declared in the body, if any.
    ///
    /// When the captured value is wrapped in double quotes exactly one pair
    /// is removed; any other value (numbers, lists, `{`) is returned as
    /// written. `None` means no `default` assignment was found.
    pub fn default_value(&self) -> Option<String> {
        let captures = default_regex().captures(self.raw_body.trim())?;
        let value = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        // `.` stops at '\n' but not at '\r'
        let value = value.trim_end();
        Some(strip_one_quote_pair(value).to_string())
    }
}

/// Remove one pair of surrounding double quotes, if present.
fn strip_one_quote_pair(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Result of parsing a `variables.tf` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedVariables {
    /// Variable name to default value, in declaration order.
    ///
    /// A variable without a `default` maps to the empty string.
    pub values: OrderedMap,
    /// Number of malformed segments that were dropped.
    pub skipped: usize,
}

impl ParsedVariables {
    /// Whether no variable was found.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Split `variables.tf` text into its variable blocks.
///
/// Returns the well-formed blocks in order together with the number of
/// malformed segments that were skipped.
pub fn variable_blocks(text: &str) -> (Vec<VariableBlock>, usize) {
    let mut blocks = Vec::new();
    let mut skipped = 0;

    for (index, segment) in block_split_regex().split(text).enumerate() {
        let segment = segment.trim();
        let is_preamble = index == 0;

        let Some((name, body)) = split_name_and_body(segment) else {
            if !is_preamble && !segment.is_empty() {
                debug!(segment = %first_line(segment), "skipping malformed variable block");
                skipped += 1;
            }
            continue;
        };

        if name.is_empty() {
            if !is_preamble {
                debug!(segment = %first_line(segment), "skipping variable block without a name");
                skipped += 1;
            }
            continue;
        }

        blocks.push(VariableBlock {
            name,
            raw_body: body.to_string(),
        });
    }

    (blocks, skipped)
}

/// Parse `variables.tf` text into a name to default-value mapping.
///
/// Later declarations of the same name replace the earlier value but keep
/// the original position.
///
/// # Example
///
/// ```
/// use gitops_scaffold::terraform::parse_variables;
///
/// let parsed = parse_variables("variable \"foo\" {}\nvariable \"bar\" {\n  default = \"1234\"\n}");
/// assert_eq!(parsed.values.get("foo"), Some(""));
/// assert_eq!(parsed.values.get("bar"), Some("1234"));
/// assert_eq!(parsed.skipped, 0);
/// ```
pub fn parse_variables(text: &str) -> ParsedVariables {
    let (blocks, skipped) = variable_blocks(text);

    let mut values = OrderedMap::new();
    for block in blocks {
        let value = block.default_value().unwrap_or_default();
        values.insert(block.name, value);
    }

    if skipped > 0 {
        debug!(skipped, "variables.tf contained malformed blocks");
    }

    ParsedVariables { values, skipped }
}

/// Split a trimmed segment into its name and body at the first `"{`.
fn split_name_and_body(segment: &str) -> Option<(String, &str)> {
    let separator = name_body_regex().find(segment)?;
    let raw_name = segment[..separator.start()].trim();
    let name = raw_name.strip_prefix('"').unwrap_or(raw_name).trim();
    Some((name.to_string(), &segment[separator.end()..]))
}

fn first_line(segment: &str) -> &str {
    segment.lines().next().unwrap_or_default()
}
