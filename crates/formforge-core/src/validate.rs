//! Document integrity checks
//!
//! `SchemaDocument::validate` reports every invariant violation at once so a
//! caller (or the AI adapter) can decide whether a document is usable.

use crate::schema::{FieldType, SchemaDocument, Widget};

/// Field shape problems detected by [`crate::schema::FieldSpec::shape`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeViolation {
    #[error("`format` is only valid on string fields, found {0}")]
    FormatOnNonString(FieldType),
    #[error("`minimum`/`maximum` are only valid on numeric fields, found {0}")]
    BoundsOnNonNumeric(FieldType),
    #[error("minimum {min} is greater than maximum {max}")]
    InvertedBounds { min: f64, max: f64 },
    #[error("choice list is empty")]
    EmptyOptions,
    #[error("`enum` is only valid on string fields, found {0}")]
    OptionsOnNonString(FieldType),
    #[error("`items` is only valid on array fields, found {0}")]
    ItemsOnNonArray(FieldType),
    #[error("array fields must carry `items.enum`")]
    ArrayWithoutOptions,
    #[error("a field cannot carry both `enum` and `items`")]
    OptionsAndItems,
}

/// A broken document invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrityViolation {
    #[error("field key {0:?} must match [a-z0-9_]+")]
    InvalidKey(String),
    #[error("required key {0:?} has no property")]
    DanglingRequired(String),
    #[error("uiSchema key {0:?} has no property")]
    DanglingHint(String),
    #[error("field {key:?}: {violation}")]
    Shape {
        key: String,
        violation: ShapeViolation,
    },
    #[error("field {key:?}: widget `{widget}` needs a choice list")]
    WidgetWithoutOptions { key: String, widget: Widget },
}

/// Field keys are lower-case ASCII letters, digits and underscores.
pub fn is_valid_field_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

impl SchemaDocument {
    /// Check every invariant, collecting all violations.
    pub fn validate(&self) -> Result<(), Vec<IntegrityViolation>> {
        let mut violations = Vec::new();

        for (key, spec) in &self.schema.properties {
            if !is_valid_field_key(key) {
                violations.push(IntegrityViolation::InvalidKey(key.clone()));
            }
            if let Err(violation) = spec.shape() {
                violations.push(IntegrityViolation::Shape {
                    key: key.clone(),
                    violation,
                });
            }
        }

        for key in &self.schema.required {
            if !self.schema.properties.contains_key(key) {
                violations.push(IntegrityViolation::DanglingRequired(key.clone()));
            }
        }

        for (key, hint) in &self.ui_schema {
            let Some(spec) = self.schema.properties.get(key) else {
                violations.push(IntegrityViolation::DanglingHint(key.clone()));
                continue;
            };
            if let Some(widget) = hint.widget {
                if widget.requires_options() && !spec.has_options() {
                    violations.push(IntegrityViolation::WidgetWithoutOptions {
                        key: key.clone(),
                        widget,
                    });
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.validate().is_ok()
    }
}
