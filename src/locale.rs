/// Resolve a requested locale against the supported set
///
/// The identifier is tried as given, then with underscores replaced by
/// hyphens. Returns the matching entry of `supported`.
pub fn resolve_locale<'a>(requested: &str, supported: &'a [String]) -> Option<&'a str> {
    let normalized = requested.replace('_', "-");

    supported
        .iter()
        .find(|locale| locale.as_str() == requested)
        .or_else(|| supported.iter().find(|locale| locale.as_str() == normalized))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> Vec<String> {
        vec!["en-US".to_string(), "fr-FR".to_string(), "zh_Hans".to_string()]
    }

    #[test]
    fn test_hyphenated_and_underscored_resolve_alike() {
        let supported = supported();
        assert_eq!(resolve_locale("en-US", &supported), Some("en-US"));
        assert_eq!(resolve_locale("en_US", &supported), Some("en-US"));
    }

    #[test]
    fn test_literal_match_wins() {
        let supported = supported();
        assert_eq!(resolve_locale("zh_Hans", &supported), Some("zh_Hans"));
    }

    #[test]
    fn test_unknown_locale() {
        let supported = supported();
        assert_eq!(resolve_locale("de-DE", &supported), None);
        assert_eq!(resolve_locale("de_DE", &supported), None);
        assert_eq!(resolve_locale("", &supported), None);
    }
}
