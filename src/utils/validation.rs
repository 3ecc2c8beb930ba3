// src/utils/validation.rs

use std::sync::LazyLock;

use regex::Regex;
use url::Url;
use validator::ValidationError;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug pattern"));

/// Validates that a string is a correctly formatted http(s) URL.
pub fn validate_url_string(url: &str) -> Result<(), ValidationError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::new("invalid_url").with_message("must be an http(s) URL".into())),
    }
}

/// Lowercase letters and digits, separated by single hyphens.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if !SLUG_RE.is_match(slug) {
        return Err(ValidationError::new("invalid_slug")
            .with_message("use lowercase letters, digits and single hyphens".into()));
    }
    Ok(())
}

/// Rejects strings made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("physics-2082").is_ok());
        assert!(validate_slug("Physics").is_err());
        assert!(validate_slug("double--hyphen").is_err());
        assert!(validate_slug("-leading").is_err());
    }

    #[test]
    fn test_url_requires_http_scheme() {
        assert!(validate_url_string("https://meet.example.com/abc").is_ok());
        assert!(validate_url_string("ftp://files.example.com/notes.pdf").is_err());
        assert!(validate_url_string("not a url").is_err());
    }

    #[test]
    fn test_blank_rejected() {
        assert!(validate_not_blank("  ").is_err());
        assert!(validate_not_blank(" x ").is_ok());
    }
}
