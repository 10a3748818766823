//! Ambiguity Detection: contradictory intents in a form description
//!
//! Each rule is a data record: keyword groups that must all appear, plus the
//! clarification to emit. Rules are evaluated in declaration order by one loop.

use std::sync::OnceLock;

use crate::keywords::KeywordGroup;
use crate::schema::{ClarificationKind, ClarificationOption, ClarificationRequest};

/// `(id, label, description)` of a resolution option.
type OptionRow = (&'static str, &'static str, &'static str);

struct ContradictionRule {
    name: &'static str,
    groups: Vec<KeywordGroup>,
    message: &'static str,
    options: &'static [OptionRow],
    field: Option<&'static str>,
}

impl ContradictionRule {
    fn fires(&self, lowered: &str) -> bool {
        self.groups.iter().all(|group| group.matches(lowered))
    }

    fn request(&self) -> ClarificationRequest {
        ClarificationRequest {
            kind: ClarificationKind::Contradiction,
            message: self.message.to_string(),
            options: self
                .options
                .iter()
                .map(|(id, label, description)| ClarificationOption {
                    id: id.to_string(),
                    label: label.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            field: self.field.map(str::to_string),
        }
    }
}

const ANONYMOUS: &[&str] = &["anonymous", "anonymously", "anonymized"];

/// Detects contradictory requirements in a description.
pub struct AmbiguityDetector {
    rules: Vec<ContradictionRule>,
}

impl AmbiguityDetector {
    pub fn new() -> Self {
        Self {
            rules: vec![
                ContradictionRule {
                    name: "anonymous_phone",
                    groups: vec![
                        KeywordGroup::new(ANONYMOUS),
                        KeywordGroup::new(&["phone", "contact number", "mobile"]),
                    ],
                    message: "You asked for anonymous responses and to collect phone numbers. How should we handle this?",
                    options: &[
                        (
                            "mask",
                            "Mask phone (store last 4 digits)",
                            "Phone numbers will be partially hidden in responses",
                        ),
                        (
                            "encrypt",
                            "Encrypt & store (PII)",
                            "Full phone numbers stored securely",
                        ),
                        ("remove", "Don't collect phone", "Remove phone field from form"),
                    ],
                    field: Some("phone"),
                },
                ContradictionRule {
                    name: "anonymous_email",
                    groups: vec![
                        KeywordGroup::new(ANONYMOUS),
                        KeywordGroup::new(&["email", "e-mail"]),
                    ],
                    message: "You asked for anonymous responses and to collect email addresses. How should we handle this?",
                    options: &[
                        (
                            "hash",
                            "Store a hashed email",
                            "Responses can be deduplicated without revealing the address",
                        ),
                        (
                            "keep",
                            "Collect email anyway",
                            "Responses will no longer be anonymous",
                        ),
                        ("remove", "Don't collect email", "Remove email field from form"),
                    ],
                    field: Some("email"),
                },
                ContradictionRule {
                    name: "anonymous_name",
                    groups: vec![
                        KeywordGroup::new(ANONYMOUS),
                        KeywordGroup::new(&["name", "full name", "first name", "last name"]),
                    ],
                    message: "You asked for anonymous responses and to collect names. How should we handle this?",
                    options: &[
                        (
                            "initials",
                            "Initials only",
                            "Only the respondent's initials are stored",
                        ),
                        (
                            "keep",
                            "Collect full name",
                            "Responses will no longer be anonymous",
                        ),
                        ("remove", "Don't collect name", "Remove name field from form"),
                    ],
                    field: Some("name"),
                },
            ],
        }
    }

    /// Scan `description` and return one request per firing rule.
    pub fn detect(&self, description: &str) -> Vec<ClarificationRequest> {
        let lowered = description.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.fires(&lowered))
            .inspect(|rule| tracing::debug!(rule = rule.name, "contradiction detected"))
            .map(ContradictionRule::request)
            .collect()
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name)
    }
}

impl Default for AmbiguityDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn shared() -> &'static AmbiguityDetector {
    static DETECTOR: OnceLock<AmbiguityDetector> = OnceLock::new();
    DETECTOR.get_or_init(AmbiguityDetector::new)
}

/// Detect with the built-in rule table.
pub fn detect(description: &str) -> Vec<ClarificationRequest> {
    shared().detect(description)
}
