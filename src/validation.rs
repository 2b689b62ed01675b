use crate::error::{CompareError, Result};
use crate::models::Source;

const MAX_SOURCE_ID_LEN: usize = 128;

/// Validate a prompt before any request is issued
pub fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(CompareError::InvalidRequest(
            "Prompt cannot be empty".into(),
        ));
    }

    Ok(())
}

/// Validate a source identifier
///
/// Ids are routed upstream verbatim, so they must be non-empty tokens.
pub fn validate_source(source: &Source) -> Result<()> {
    if source.id.is_empty() {
        return Err(CompareError::InvalidRequest(
            "Source id cannot be empty".into(),
        ));
    }

    if source.id.len() > MAX_SOURCE_ID_LEN {
        return Err(CompareError::InvalidRequest(format!(
            "Source id too long: {} (max {} characters)",
            source.id.len(),
            MAX_SOURCE_ID_LEN
        )));
    }

    if source
        .id
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(CompareError::InvalidRequest(format!(
            "Source id contains whitespace or control characters: {:?}",
            source.id
        )));
    }

    Ok(())
}
