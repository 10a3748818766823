//! Keyword Fallback Generator
//!
//! Deterministic description → document rules used when the AI path is
//! unavailable. Detectors are independent: every matching rule contributes its
//! field. Two rules may target the same key; the later rule in the table then
//! replaces the earlier one's field, hint and requirement.

use std::sync::OnceLock;

use crate::ambiguity;
use crate::keywords::KeywordGroup;
use crate::schema::{FieldSpec, SchemaDocument, StringFormat, UiHint, Widget};

/// Whether a detector marks its field as required.
enum Requirement {
    Always,
    /// Required unless any of these keywords is present.
    UnlessMentioned(KeywordGroup),
    Never,
}

struct FieldRule {
    key: &'static str,
    triggers: KeywordGroup,
    requirement: Requirement,
    build: fn() -> (FieldSpec, UiHint),
}

impl FieldRule {
    fn new(key: &'static str, keywords: &'static [&'static str], build: fn() -> (FieldSpec, UiHint)) -> Self {
        Self {
            key,
            triggers: KeywordGroup::new(keywords),
            requirement: Requirement::Always,
            build,
        }
    }

    fn optional_when(mut self, keywords: &'static [&'static str]) -> Self {
        self.requirement = Requirement::UnlessMentioned(KeywordGroup::new(keywords));
        self
    }

    fn never_required(mut self) -> Self {
        self.requirement = Requirement::Never;
        self
    }

    fn is_required(&self, lowered: &str) -> bool {
        match &self.requirement {
            Requirement::Always => true,
            Requirement::UnlessMentioned(escape) => !escape.matches(lowered),
            Requirement::Never => false,
        }
    }
}

/// Keyword rule engine producing a document without network access.
pub struct FallbackGenerator {
    rules: Vec<FieldRule>,
}

impl FallbackGenerator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                FieldRule::new("name", &["name", "full name", "first name", "last name"], || {
                    (FieldSpec::string("Name"), UiHint::placeholder("Enter your full name"))
                }),
                FieldRule::new("email", &["email", "e-mail", "email address"], || {
                    (
                        FieldSpec::string("Email").with_format(StringFormat::Email),
                        UiHint::placeholder("Enter your email address"),
                    )
                }),
                FieldRule::new(
                    "phone",
                    &["phone", "mobile", "phone number", "contact number"],
                    || {
                        (
                            FieldSpec::string("Phone Number"),
                            UiHint::placeholder("Enter your phone number"),
                        )
                    },
                )
                .optional_when(&["optional"]),
                FieldRule::new(
                    "college",
                    &["college", "university", "school", "institution"],
                    || {
                        (
                            FieldSpec::string("College/University"),
                            UiHint::placeholder("Enter your college or university"),
                        )
                    },
                ),
                FieldRule::new("github", &["github", "git", "username"], || {
                    (
                        FieldSpec::string("GitHub Username"),
                        UiHint::placeholder("Enter your GitHub username"),
                    )
                }),
                FieldRule::new(
                    "tshirt_size",
                    &["t-shirt", "tshirt", "shirt size", "size"],
                    || {
                        (
                            FieldSpec::single_select("T-shirt Size", ["S", "M", "L", "XL", "XXL"]),
                            UiHint::widget(Widget::Select),
                        )
                    },
                ),
                FieldRule::new("rating", &["rating", "rate", "score"], || {
                    (
                        FieldSpec::integer("Rating").with_bounds(1.0, 5.0),
                        UiHint::widget(Widget::Range),
                    )
                }),
                FieldRule::new("comments", &["comment", "feedback", "suggestion"], || {
                    (
                        FieldSpec::string("Comments"),
                        UiHint::widget(Widget::Textarea)
                            .with_placeholder("Enter your comments or feedback"),
                    )
                }),
                FieldRule::new("message", &["message"], || {
                    (
                        FieldSpec::string("Message"),
                        UiHint::widget(Widget::Textarea).with_placeholder("Enter your message"),
                    )
                }),
                FieldRule::new("would_recommend", &["recommend"], || {
                    (
                        FieldSpec::boolean("Would you recommend this to others?"),
                        UiHint::widget(Widget::Radio),
                    )
                }),
                FieldRule::new("improvements", &["improvement", "improve", "better"], || {
                    (
                        FieldSpec::string("What could be improved?"),
                        UiHint::widget(Widget::Textarea)
                            .with_placeholder("What improvements would you suggest?"),
                    )
                }),
                FieldRule::new("age", &["age"], || {
                    (
                        FieldSpec::integer("Age").with_bounds(1.0, 120.0),
                        UiHint::placeholder("Enter your age"),
                    )
                }),
                FieldRule::new("gender", &["gender"], || {
                    (
                        FieldSpec::single_select(
                            "Gender",
                            ["Male", "Female", "Other", "Prefer not to say"],
                        ),
                        UiHint::widget(Widget::Select),
                    )
                }),
                FieldRule::new("interests", &["interest", "hobby", "hobbies"], || {
                    (
                        FieldSpec::multi_select(
                            "Interests",
                            [
                                "Technology", "Sports", "Music", "Art", "Reading", "Travel",
                                "Gaming", "Cooking",
                            ],
                        ),
                        UiHint::widget(Widget::Checkboxes),
                    )
                }),
                FieldRule::new(
                    "favorite_color",
                    &["favorite color", "favourite colour", "color", "colour"],
                    || {
                        (
                            FieldSpec::single_select(
                                "Favorite Color",
                                [
                                    "Red", "Blue", "Green", "Yellow", "Purple", "Orange", "Pink",
                                    "Black", "White",
                                ],
                            ),
                            UiHint::widget(Widget::Select),
                        )
                    },
                ),
                FieldRule::new("newsletter_signup", &["newsletter", "subscribe", "updates"], || {
                    (
                        FieldSpec::boolean("Subscribe to newsletter"),
                        UiHint::widget(Widget::Checkbox),
                    )
                })
                .never_required(),
                // Shares the `rating` key: a satisfaction scale replaces the
                // numeric rating when both are mentioned.
                FieldRule::new("rating", &["satisfaction", "satisfied"], || {
                    (
                        FieldSpec::single_select(
                            "Satisfaction",
                            [
                                "Very dissatisfied",
                                "Dissatisfied",
                                "Neutral",
                                "Satisfied",
                                "Very satisfied",
                            ],
                        ),
                        UiHint::widget(Widget::Radio),
                    )
                }),
            ],
        }
    }

    /// Build a document from `description`. Never fails; no match yields an
    /// empty document.
    pub fn generate(&self, description: &str) -> SchemaDocument {
        let lowered = description.to_lowercase();
        let mut doc = SchemaDocument::empty();

        for rule in &self.rules {
            let Some(keyword) = rule.triggers.find(&lowered) else {
                continue;
            };
            tracing::debug!(field = rule.key, keyword, "fallback rule matched");

            let (spec, hint) = (rule.build)();
            let key = rule.key.to_string();
            // `insert` keeps the position of an existing key and replaces its value.
            doc.schema.properties.insert(key.clone(), spec);
            if hint.is_empty() {
                doc.ui_schema.remove(&key);
            } else {
                doc.ui_schema.insert(key.clone(), hint);
            }
            if rule.is_required(&lowered) {
                doc.schema.required.insert(key);
            } else {
                doc.schema.required.remove(&key);
            }
        }

        doc.followups = ambiguity::detect(description);
        doc
    }

    /// Field keys the rule table can produce, in evaluation order.
    pub fn rule_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.key)
    }
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn shared() -> &'static FallbackGenerator {
    static GENERATOR: OnceLock<FallbackGenerator> = OnceLock::new();
    GENERATOR.get_or_init(FallbackGenerator::new)
}

/// Generate with the built-in rule table.
pub fn generate(description: &str) -> SchemaDocument {
    shared().generate(description)
}
