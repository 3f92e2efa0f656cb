//! ui::prompts
//!
//! Interactive prompts.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode. In non-interactive mode,
//! operations requiring user input must either have defaults or fail
//! with a clear error message.

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Prompt for masked input (e.g., access tokens).
///
/// The input is not echoed to the terminal. Empty input counts as a cancel.
pub fn password(message: &str, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    let value = rpassword::prompt_password(message)?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(PromptError::Cancelled);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_never_prompts() {
        assert!(matches!(
            password("Token: ", false),
            Err(PromptError::NotInteractive)
        ));
    }
}
