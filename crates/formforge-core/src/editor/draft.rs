//! Field drafts: the builder-facing description of a new field.

use serde::{Deserialize, Serialize};

use super::{add_field, EditError};
use crate::schema::{FieldSpec, FieldType, SchemaDocument, StringFormat, UiHint, Widget};

/// Input kinds offered by the form builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Email,
    Number,
    Integer,
    Checkbox,
    MultiSelect,
    Dropdown,
}

impl FieldKind {
    pub fn needs_options(&self) -> bool {
        matches!(self, FieldKind::Dropdown | FieldKind::MultiSelect)
    }

    /// Kinds rendered as a free-form input box.
    fn takes_placeholder(&self) -> bool {
        matches!(
            self,
            FieldKind::Text | FieldKind::Email | FieldKind::Number | FieldKind::Integer
        )
    }
}

/// A field as entered in the builder, before conversion to spec and hint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDraft {
    pub key: String,
    pub title: String,
    pub kind: FieldKind,
    pub required: bool,
    pub placeholder: Option<String>,
    pub options: Vec<String>,
}

impl FieldDraft {
    pub fn new(key: impl Into<String>, title: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Convert to a field spec and UI hint.
    pub fn build(&self) -> Result<(FieldSpec, UiHint), EditError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(EditError::IncompleteDraft("title is empty"));
        }
        let options: Vec<&str> = self
            .options
            .iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .collect();
        if self.kind.needs_options() && options.is_empty() {
            return Err(EditError::IncompleteDraft("choice fields need at least one option"));
        }

        let (spec, mut hint) = match self.kind {
            FieldKind::Text => (FieldSpec::string(title), UiHint::default()),
            FieldKind::Email => (
                FieldSpec::string(title).with_format(StringFormat::Email),
                UiHint::default(),
            ),
            FieldKind::Number => (FieldSpec::new(FieldType::Number, title), UiHint::default()),
            FieldKind::Integer => (FieldSpec::integer(title), UiHint::default()),
            FieldKind::Checkbox => (FieldSpec::boolean(title), UiHint::widget(Widget::Checkbox)),
            FieldKind::Dropdown => (
                FieldSpec::single_select(title, options),
                UiHint::widget(Widget::Select),
            ),
            FieldKind::MultiSelect => (
                FieldSpec::multi_select(title, options),
                UiHint::widget(Widget::Checkboxes),
            ),
        };

        if self.kind.takes_placeholder() {
            let placeholder = match self.placeholder.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => format!("Enter {}", title.to_lowercase()),
            };
            hint.placeholder = Some(placeholder);
        }
        Ok((spec, hint))
    }
}

/// Build `draft` and add it with [`add_field`].
pub fn add_draft(doc: &SchemaDocument, draft: &FieldDraft) -> Result<SchemaDocument, EditError> {
    let (spec, hint) = draft.build()?;
    add_field(doc, &draft.key, spec, hint, draft.required)
}
