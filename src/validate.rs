//! Input validation run before any request is issued.

use thiserror::Error;

use crate::model::RunInput;

/// Reasons a run is rejected before it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Website URL is required!")]
    MissingWebsite,

    #[error("Enter either Figma URL or CSS selectors!")]
    MissingReference,
}

/// Check that a run has a website and at least one reference to compare against.
///
/// The website rule is checked first and the first failure wins.
pub fn validate(input: &RunInput) -> Result<(), ValidationError> {
    if is_blank(Some(&input.website_url)) {
        return Err(ValidationError::MissingWebsite);
    }
    if is_blank(input.design_reference_url.as_ref()) && is_blank(input.selectors.as_ref()) {
        return Err(ValidationError::MissingReference);
    }
    Ok(())
}

fn is_blank(value: Option<&String>) -> bool {
    value.is_none_or(|s| s.trim().is_empty())
}
