//! Schema Document Model
//!
//! The JSON Schema subset, UI hints and clarification requests exchanged with
//! the surrounding application. Wire names follow the form renderer's
//! conventions (`uiSchema`, `ui:widget`, `ui:placeholder`, `enum`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::validate::ShapeViolation;

// ============================================================================
// Document
// ============================================================================

/// A generated form: schema, per-field UI hints and pending clarifications.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub schema: ObjectSchema,
    #[serde(rename = "uiSchema", default)]
    pub ui_schema: BTreeMap<String, UiHint>,
    #[serde(default)]
    pub followups: Vec<ClarificationRequest>,
}

impl SchemaDocument {
    /// An empty document (no fields, no hints, no followups).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Field keys in display order.
    pub fn field_keys(&self) -> impl Iterator<Item = &str> {
        self.schema.properties.keys().map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.schema.properties.get(key)
    }

    pub fn hint(&self, key: &str) -> Option<&UiHint> {
        self.ui_schema.get(key)
    }

    pub fn contains_field(&self, key: &str) -> bool {
        self.schema.properties.contains_key(key)
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.schema.required.contains(key)
    }

    pub fn len(&self) -> usize {
        self.schema.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schema.properties.is_empty()
    }
}

/// The top-level object schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(rename = "type", default)]
    pub schema_type: ObjectType,
    /// Insertion order is display order.
    #[serde(default)]
    pub properties: IndexMap<String, FieldSpec>,
    #[serde(default)]
    pub required: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    #[default]
    Object,
}

// ============================================================================
// Fields
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Integer)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringFormat {
    Email,
    Date,
    Url,
}

impl StringFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "email" => Some(StringFormat::Email),
            "date" => Some(StringFormat::Date),
            "url" | "uri" => Some(StringFormat::Url),
            _ => None,
        }
    }
}

/// One form field's semantic type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
    /// Allowed values of a single-select field.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

/// Element type of an array field; its `enum` makes the field a multi-select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    #[serde(rename = "type")]
    pub item_type: FieldType,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// The three valid field shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Scalar,
    SingleSelect,
    MultiSelect,
}

impl FieldSpec {
    pub fn new(field_type: FieldType, title: impl Into<String>) -> Self {
        Self {
            field_type,
            title: Some(title.into()),
            format: None,
            options: None,
            items: None,
            minimum: None,
            maximum: None,
        }
    }

    pub fn string(title: impl Into<String>) -> Self {
        Self::new(FieldType::String, title)
    }

    pub fn integer(title: impl Into<String>) -> Self {
        Self::new(FieldType::Integer, title)
    }

    pub fn number(title: impl Into<String>) -> Self {
        Self::new(FieldType::Number, title)
    }

    pub fn boolean(title: impl Into<String>) -> Self {
        Self::new(FieldType::Boolean, title)
    }

    pub fn single_select<I, S>(title: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = Self::string(title);
        spec.options = Some(options.into_iter().map(Into::into).collect());
        spec
    }

    pub fn multi_select<I, S>(title: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = Self::new(FieldType::Array, title);
        spec.items = Some(ItemSpec {
            item_type: FieldType::String,
            options: Some(options.into_iter().map(Into::into).collect()),
        });
        spec
    }

    pub fn with_format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_bounds(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    /// Label shown to respondents; falls back to the field key.
    pub fn display_title<'a>(&'a self, key: &'a str) -> &'a str {
        self.title.as_deref().unwrap_or(key)
    }

    /// Whether the field carries a choice list, directly or through `items`.
    pub fn has_options(&self) -> bool {
        self.options.is_some()
            || self
                .items
                .as_ref()
                .map(|items| items.options.is_some())
                .unwrap_or(false)
    }

    /// Classify the field, rejecting any combination outside the three shapes.
    pub fn shape(&self) -> Result<FieldShape, ShapeViolation> {
        if self.format.is_some() && self.field_type != FieldType::String {
            return Err(ShapeViolation::FormatOnNonString(self.field_type));
        }
        if (self.minimum.is_some() || self.maximum.is_some()) && !self.field_type.is_numeric() {
            return Err(ShapeViolation::BoundsOnNonNumeric(self.field_type));
        }
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                return Err(ShapeViolation::InvertedBounds { min, max });
            }
        }

        match (&self.options, &self.items) {
            (Some(_), Some(_)) => Err(ShapeViolation::OptionsAndItems),
            (Some(options), None) => {
                if self.field_type != FieldType::String {
                    return Err(ShapeViolation::OptionsOnNonString(self.field_type));
                }
                if options.is_empty() {
                    return Err(ShapeViolation::EmptyOptions);
                }
                Ok(FieldShape::SingleSelect)
            }
            (None, Some(items)) => {
                if self.field_type != FieldType::Array {
                    return Err(ShapeViolation::ItemsOnNonArray(self.field_type));
                }
                match &items.options {
                    Some(options) if options.is_empty() => Err(ShapeViolation::EmptyOptions),
                    Some(_) => Ok(FieldShape::MultiSelect),
                    None => Err(ShapeViolation::ArrayWithoutOptions),
                }
            }
            (None, None) => {
                if self.field_type == FieldType::Array {
                    return Err(ShapeViolation::ArrayWithoutOptions);
                }
                Ok(FieldShape::Scalar)
            }
        }
    }
}

// ============================================================================
// UI Hints
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Widget {
    Select,
    Textarea,
    Checkbox,
    Checkboxes,
    Radio,
    Range,
}

impl Widget {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "select" => Some(Widget::Select),
            "textarea" => Some(Widget::Textarea),
            "checkbox" => Some(Widget::Checkbox),
            "checkboxes" => Some(Widget::Checkboxes),
            "radio" => Some(Widget::Radio),
            "range" => Some(Widget::Range),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Widget::Select => "select",
            Widget::Textarea => "textarea",
            Widget::Checkbox => "checkbox",
            Widget::Checkboxes => "checkboxes",
            Widget::Radio => "radio",
            Widget::Range => "range",
        }
    }

    /// Widgets that render a choice list and need `enum` on the paired field.
    pub fn requires_options(&self) -> bool {
        matches!(self, Widget::Select | Widget::Checkboxes)
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering hints for one field. An absent widget lets the renderer infer one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UiHint {
    #[serde(rename = "ui:placeholder", default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(rename = "ui:widget", default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<Widget>,
}

impl UiHint {
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self {
            placeholder: Some(text.into()),
            widget: None,
        }
    }

    pub fn widget(widget: Widget) -> Self {
        Self {
            placeholder: None,
            widget: Some(widget),
        }
    }

    pub fn with_placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.placeholder.as_deref().map(str::is_empty).unwrap_or(true) && self.widget.is_none()
    }
}

// ============================================================================
// Clarifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClarificationKind {
    Contradiction,
}

/// An ambiguity in the description that needs a user decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationRequest {
    #[serde(rename = "type")]
    pub kind: ClarificationKind,
    pub message: String,
    pub options: Vec<ClarificationOption>,
    /// Field the conflict concerns, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ClarificationRequest {
    pub fn option(&self, id: &str) -> Option<&ClarificationOption> {
        self.options.iter().find(|option| option.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationOption {
    pub id: String,
    pub label: String,
    pub description: String,
}

// ============================================================================
// Tests
// ============================================================================
