//! Whole-word keyword matching shared by the fallback generator and the
//! ambiguity detector.

use regex::Regex;

/// A set of alternative keywords; the group matches when any one of them
/// appears as a whole word (an optional trailing plural `s` is accepted).
pub struct KeywordGroup {
    keywords: &'static [&'static str],
    regex: Regex,
}

impl KeywordGroup {
    pub fn new(keywords: &'static [&'static str]) -> Self {
        let alternatives = keywords
            .iter()
            .map(|kw| regex::escape(&kw.to_lowercase()))
            .collect::<Vec<_>>()
            .join("|");
        // Escaped literals joined by `|` always form a valid pattern.
        let regex = Regex::new(&format!(r"\b(?:{alternatives})s?\b")).unwrap();
        Self { keywords, regex }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        self.keywords
    }

    /// `text` must already be lower-cased.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The first matched keyword occurrence, for logging.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.find(text).map(|m| m.as_str())
    }
}

impl std::fmt::Debug for KeywordGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("KeywordGroup").field(&self.keywords).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_only() {
        let age = KeywordGroup::new(&["age"]);
        assert!(age.matches("your age please"));
        assert!(age.matches("ages 18+"));
        assert!(!age.matches("leave a message"));
        assert!(!age.matches("page one"));
    }

    #[test]
    fn test_phrases_and_punctuation() {
        let email = KeywordGroup::new(&["email", "e-mail", "email address"]);
        assert!(email.matches("contact form: name, e-mail, subject"));
        assert!(email.matches("(email)"));
        assert!(!email.matches("emailer"));

        let shirt = KeywordGroup::new(&["t-shirt", "shirt size"]);
        assert!(shirt.matches("pick your t-shirt"));
        assert!(shirt.matches("shirt sizes available"));
    }

    #[test]
    fn test_find_reports_matched_text() {
        let group = KeywordGroup::new(&["interest", "hobby", "hobbies"]);
        assert_eq!(group.find("list your hobbies"), Some("hobbies"));
        assert_eq!(group.find("nothing here"), None);
    }
}
