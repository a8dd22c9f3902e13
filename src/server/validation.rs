use crate::server::response::ApiError;
use crate::types::Visibility;

const MAX_USERNAME_LEN: usize = 64;
const MAX_PROMPT_LEN: usize = 2000;
const MAX_COMMENT_LEN: usize = 2000;

// ~20MB decoded; inline payloads larger than this are rejected before decode.
const MAX_IMAGE_BASE64_LEN: usize = 28 * 1024 * 1024;

pub fn validate_username(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }
    if name.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain alphanumeric characters, hyphens, and underscores",
        ));
    }
    if name.starts_with('-') || name.starts_with('_') {
        return Err(ApiError::bad_request(
            "Username cannot start with a hyphen or underscore",
        ));
    }
    Ok(())
}

/// Trims and validates a transformation prompt.
pub fn validate_prompt(prompt: &str) -> Result<&str, ApiError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("Prompt is required"));
    }
    if trimmed.len() > MAX_PROMPT_LEN {
        return Err(ApiError::bad_request(format!(
            "Prompt cannot exceed {MAX_PROMPT_LEN} characters"
        )));
    }
    Ok(trimmed)
}

/// Trims and validates comment text.
pub fn validate_comment_text(text: &str) -> Result<&str, ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("Comment text is required"));
    }
    if trimmed.len() > MAX_COMMENT_LEN {
        return Err(ApiError::bad_request(format!(
            "Comment cannot exceed {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(trimmed)
}

/// Parses a required visibility request field. Absent and unknown values
/// are both client errors, reported separately.
pub fn validate_visibility(value: Option<&str>) -> Result<Visibility, ApiError> {
    let value = value.ok_or_else(|| ApiError::bad_request("Missing visibility"))?;
    value
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid visibility value"))
}

pub fn validate_image_payload(image_base64: &str) -> Result<(), ApiError> {
    if image_base64.is_empty() {
        return Err(ApiError::bad_request("Image payload is required"));
    }
    if image_base64.len() > MAX_IMAGE_BASE64_LEN {
        return Err(ApiError::bad_request("Image payload too large"));
    }
    Ok(())
}
