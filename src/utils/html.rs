// src/utils/html.rs

/// Sanitizes admin-entered question text with ammonia's whitelist.
///
/// Safe formatting tags (`<b>`, `<p>`) survive; `<script>` is removed with its
/// content and event-handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Same as `clean_html` for optional fields.
pub fn clean_optional(input: Option<String>) -> Option<String> {
    input.map(|text| clean_html(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_keeps_formatting() {
        let cleaned = clean_html("<b>Wear a helmet</b><script>alert(1)</script>");
        assert_eq!(cleaned, "<b>Wear a helmet</b>");
    }

    #[test]
    fn strips_event_handlers() {
        let cleaned = clean_html(r#"<p onclick="steal()">Check the scaffold</p>"#);
        assert_eq!(cleaned, "<p>Check the scaffold</p>");
        assert_eq!(clean_optional(None), None);
    }
}
