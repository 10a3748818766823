//! Field Editor (Reconciler)
//!
//! Pure, key-addressed edits over a [`SchemaDocument`]. Every operation takes
//! the current document by reference and returns a new one; on failure the
//! input is untouched. Each result keeps `properties`, `required` and
//! `uiSchema` referentially consistent.

use std::collections::BTreeSet;

use crate::schema::{FieldSpec, SchemaDocument, UiHint};
use crate::validate::{is_valid_field_key, IntegrityViolation};

mod batch;
mod draft;
mod resolve;

pub use batch::{apply_edits, BatchEditError, FieldEdit};
pub use draft::{add_draft, FieldDraft, FieldKind};
pub use resolve::{resolve_clarification, Resolution};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("field {0:?} already exists")]
    DuplicateFieldKey(String),
    #[error("no field named {0:?}")]
    UnknownFieldKey(String),
    #[error("field order must be a permutation of the current fields (missing: {missing:?}, unexpected: {unexpected:?}, repeated: {repeated:?})")]
    FieldSetMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
        repeated: Vec<String>,
    },
    #[error("field key {0:?} must match [a-z0-9_]+ after normalization")]
    InvalidFieldKey(String),
    #[error("invalid field: {0}")]
    InvalidField(IntegrityViolation),
    #[error("incomplete field draft: {0}")]
    IncompleteDraft(&'static str),
    #[error("no clarification at index {0}")]
    UnknownClarification(usize),
    #[error("clarification has no option {0:?}")]
    UnknownOption(String),
    #[error("custom clarification answer is empty")]
    EmptyCustomAnswer,
}

// ============================================================================
// Operations
// ============================================================================

/// Lower-case `key` and strip all whitespace.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn ensure_field(doc: &SchemaDocument, key: &str) -> Result<(), EditError> {
    if doc.contains_field(key) {
        Ok(())
    } else {
        Err(EditError::UnknownFieldKey(key.to_string()))
    }
}

/// Append a field. The UI hint is stored only when it carries something.
pub fn add_field(
    doc: &SchemaDocument,
    key: &str,
    spec: FieldSpec,
    hint: UiHint,
    required: bool,
) -> Result<SchemaDocument, EditError> {
    let key = normalize_key(key);
    if doc.contains_field(&key) {
        return Err(EditError::DuplicateFieldKey(key));
    }
    if !is_valid_field_key(&key) {
        return Err(EditError::InvalidFieldKey(key));
    }
    if let Err(violation) = spec.shape() {
        return Err(EditError::InvalidField(IntegrityViolation::Shape {
            key,
            violation,
        }));
    }
    if let Some(widget) = hint.widget {
        if widget.requires_options() && !spec.has_options() {
            return Err(EditError::InvalidField(IntegrityViolation::WidgetWithoutOptions {
                key,
                widget,
            }));
        }
    }

    let mut next = doc.clone();
    next.schema.properties.insert(key.clone(), spec);
    if required {
        next.schema.required.insert(key.clone());
    }
    if !hint.is_empty() {
        next.ui_schema.insert(key, hint);
    }
    Ok(next)
}

/// Remove a field from `properties`, `required` and `uiSchema`.
pub fn remove_field(doc: &SchemaDocument, key: &str) -> Result<SchemaDocument, EditError> {
    ensure_field(doc, key)?;

    let mut next = doc.clone();
    next.schema.properties.shift_remove(key);
    next.schema.required.remove(key);
    next.ui_schema.remove(key);
    Ok(next)
}

/// Rebuild `properties` in `ordered_keys` order, which must be a permutation
/// of the current keys.
pub fn reorder_fields<S: AsRef<str>>(
    doc: &SchemaDocument,
    ordered_keys: &[S],
) -> Result<SchemaDocument, EditError> {
    let mut seen = BTreeSet::new();
    let mut repeated = Vec::new();
    let mut unexpected = Vec::new();
    for key in ordered_keys.iter().map(AsRef::as_ref) {
        if !seen.insert(key) {
            repeated.push(key.to_string());
        } else if !doc.contains_field(key) {
            unexpected.push(key.to_string());
        }
    }
    let missing: Vec<String> = doc
        .field_keys()
        .filter(|key| !seen.contains(key))
        .map(str::to_string)
        .collect();

    if !(missing.is_empty() && unexpected.is_empty() && repeated.is_empty()) {
        return Err(EditError::FieldSetMismatch {
            missing,
            unexpected,
            repeated,
        });
    }

    let mut next = doc.clone();
    next.schema.properties = ordered_keys
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|key| {
            doc.schema
                .properties
                .get(key)
                .map(|spec| (key.to_string(), spec.clone()))
        })
        .collect();
    Ok(next)
}

/// Move one field to position `to` (clamped to the last position).
pub fn move_field(doc: &SchemaDocument, key: &str, to: usize) -> Result<SchemaDocument, EditError> {
    ensure_field(doc, key)?;

    let mut order: Vec<&str> = doc.field_keys().filter(|k| *k != key).collect();
    order.insert(to.min(order.len()), key);
    reorder_fields(doc, order.as_slice())
}

/// Flip whether `key` is required.
pub fn toggle_required(doc: &SchemaDocument, key: &str) -> Result<SchemaDocument, EditError> {
    ensure_field(doc, key)?;

    let mut next = doc.clone();
    if !next.schema.required.remove(key) {
        next.schema.required.insert(key.to_string());
    }
    Ok(next)
}

/// Replace a field's title; key, type and hints are untouched.
pub fn rename_title(doc: &SchemaDocument, key: &str, title: &str) -> Result<SchemaDocument, EditError> {
    ensure_field(doc, key)?;

    let mut next = doc.clone();
    if let Some(spec) = next.schema.properties.get_mut(key) {
        spec.title = Some(title.to_string());
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use crate::schema::{FieldType, StringFormat, Widget};
    use crate::validate::ShapeViolation;

    fn contact() -> SchemaDocument {
        fallback::generate("Contact form: name, email, subject, message")
    }

    fn keys(doc: &SchemaDocument) -> Vec<&str> {
        doc.field_keys().collect()
    }

    #[test]
    fn test_add_appends_and_normalizes() {
        let doc = add_field(
            &contact(),
            " Company Name ",
            FieldSpec::string("Company"),
            UiHint::placeholder("ACME Inc."),
            true,
        )
        .unwrap();
        assert_eq!(keys(&doc), vec!["name", "email", "message", "companyname"]);
        assert!(doc.is_required("companyname"));
        assert_eq!(doc.hint("companyname").unwrap().placeholder.as_deref(), Some("ACME Inc."));
        assert!(doc.is_consistent());
    }

    #[test]
    fn test_add_skips_empty_hint() {
        let doc = add_field(&contact(), "notes", FieldSpec::string("Notes"), UiHint::default(), false).unwrap();
        assert!(doc.contains_field("notes"));
        assert!(doc.hint("notes").is_none());
        assert!(!doc.is_required("notes"));
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let doc = contact();
        let before = doc.clone();
        let err = add_field(&doc, "EMAIL", FieldSpec::string("Email 2"), UiHint::default(), false)
            .unwrap_err();
        assert_eq!(err, EditError::DuplicateFieldKey("email".to_string()));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_add_rejects_invalid_key_and_shapes() {
        let doc = contact();
        assert_eq!(
            add_field(&doc, "e-mail", FieldSpec::string("E"), UiHint::default(), false),
            Err(EditError::InvalidFieldKey("e-mail".to_string()))
        );
        assert_eq!(
            add_field(&doc, "", FieldSpec::string("E"), UiHint::default(), false),
            Err(EditError::InvalidFieldKey(String::new()))
        );
        assert_eq!(
            add_field(
                &doc,
                "color",
                FieldSpec::string("Color"),
                UiHint::widget(Widget::Select),
                false
            ),
            Err(EditError::InvalidField(IntegrityViolation::WidgetWithoutOptions {
                key: "color".to_string(),
                widget: Widget::Select,
            }))
        );
        assert_eq!(
            add_field(
                &doc,
                "flag",
                FieldSpec::boolean("Flag").with_format(StringFormat::Url),
                UiHint::default(),
                false
            ),
            Err(EditError::InvalidField(IntegrityViolation::Shape {
                key: "flag".to_string(),
                violation: ShapeViolation::FormatOnNonString(FieldType::Boolean),
            }))
        );
    }

    #[test]
    fn test_remove_clears_all_three() {
        let doc = remove_field(&contact(), "email").unwrap();
        assert!(!doc.contains_field("email"));
        assert!(!doc.is_required("email"));
        assert!(doc.hint("email").is_none());
        assert_eq!(keys(&doc), vec!["name", "message"]);
    }

    #[test]
    fn test_remove_unknown() {
        assert_eq!(
            remove_field(&contact(), "subject"),
            Err(EditError::UnknownFieldKey("subject".to_string()))
        );
    }

    #[test]
    fn test_add_then_remove_roundtrip() {
        let doc = contact();
        let added = add_field(
            &doc,
            "subject",
            FieldSpec::string("Subject"),
            UiHint::placeholder("What is this about?"),
            true,
        )
        .unwrap();
        let back = remove_field(&added, "subject").unwrap();
        assert_eq!(back, doc);
        assert_eq!(keys(&back), keys(&doc));
    }

    #[test]
    fn test_reorder() {
        let doc = contact();
        let reordered = reorder_fields(&doc, &["message", "name", "email"]).unwrap();
        assert_eq!(keys(&reordered), vec!["message", "name", "email"]);
        assert_eq!(reordered.schema.required, doc.schema.required);
        assert_eq!(reordered.ui_schema, doc.ui_schema);
        assert_eq!(reordered.field("email"), doc.field("email"));
    }

    #[test]
    fn test_reorder_mismatch() {
        let doc = contact();
        let err = reorder_fields(&doc, &["name", "name", "phone"]).unwrap_err();
        assert_eq!(
            err,
            EditError::FieldSetMismatch {
                missing: vec!["email".to_string(), "message".to_string()],
                unexpected: vec!["phone".to_string()],
                repeated: vec!["name".to_string()],
            }
        );
        let empty: [&str; 0] = [];
        assert!(reorder_fields(&doc, &empty).is_err());
    }

    #[test]
    fn test_move_field() {
        let doc = contact();
        assert_eq!(keys(&move_field(&doc, "message", 0).unwrap()), vec!["message", "name", "email"]);
        assert_eq!(keys(&move_field(&doc, "name", 99).unwrap()), vec!["email", "message", "name"]);
        assert!(move_field(&doc, "ghost", 0).is_err());
    }

    #[test]
    fn test_toggle_required_twice() {
        let doc = contact();
        let once = toggle_required(&doc, "message").unwrap();
        assert_ne!(once.is_required("message"), doc.is_required("message"));
        let twice = toggle_required(&once, "message").unwrap();
        assert_eq!(twice, doc);
        assert!(toggle_required(&doc, "ghost").is_err());
    }

    #[test]
    fn test_rename_title_only_touches_title() {
        let doc = contact();
        let renamed = rename_title(&doc, "email", "Work email").unwrap();
        let spec = renamed.field("email").unwrap();
        assert_eq!(spec.title.as_deref(), Some("Work email"));
        assert_eq!(spec.format, Some(StringFormat::Email));
        assert_eq!(renamed.ui_schema, doc.ui_schema);
        assert_eq!(keys(&renamed), keys(&doc));
        assert_eq!(
            rename_title(&doc, "ghost", "x"),
            Err(EditError::UnknownFieldKey("ghost".to_string()))
        );
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  First Name\t"), "firstname");
        assert_eq!(normalize_key("EMAIL"), "email");
    }
}
