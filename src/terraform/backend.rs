//! terraform::backend
//!
//! Parsing of flat `backend.tfvars` files.
//!
//! Each line is a `key = "value"` (or `key = value`, or `key: value`)
//! assignment. Lines are split once at the first `=` or `:`; the key is
//! trimmed and lines with an empty key or no separator are ignored. One pair
//! of surrounding double quotes is removed from the value. Nested structures
//! are not supported.

use super::OrderedMap;

/// Parsed backend configuration: key to value, in file order.
pub type BackendConfig = OrderedMap;

/// Parse `backend.tfvars` text.
///
/// # Example
///
/// ```
/// use gitops_scaffold::terraform::parse_backend;
///
/// let backend = parse_backend("storage_account_name = \"tfstate\"\ncontainer_name = \"state\"\n");
/// assert_eq!(backend.get("storage_account_name"), Some("tfstate"));
/// assert_eq!(backend.get("container_name"), Some("state"));
/// ```
pub fn parse_backend(text: &str) -> BackendConfig {
    let mut backend = BackendConfig::new();

    for line in text.lines() {
        let Some(separator) = line.find(['=', ':']) else {
            continue;
        };

        let key = line[..separator].trim();
        if key.is_empty() {
            continue;
        }

        let value = line[separator + 1..].trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        backend.insert(key.to_string(), value.to_string());
    }

    backend
}
