// src/utils/html.rs

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: keeps safe tags (like <b>, <p>, <a>) and strips <script>,
/// <iframe>, event-handler attributes and the like. Applied to lesson bodies
/// and question explanations before they are stored.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes an optional rich-text field; blank input becomes `None`.
pub fn clean_optional_html(input: Option<&str>) -> Option<String> {
    input
        .map(clean_html)
        .filter(|cleaned| !cleaned.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_removed() {
        let cleaned = clean_html("<p>Ohm's law</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>Ohm's law</p>");
    }

    #[test]
    fn test_blank_optional_becomes_none() {
        assert_eq!(clean_optional_html(Some("<script>x</script>")), None);
        assert_eq!(clean_optional_html(None), None);
        assert_eq!(clean_optional_html(Some("<b>V = IR</b>")).as_deref(), Some("<b>V = IR</b>"));
    }
}
