//! Serializable edits and sequential batch application.

use serde::{Deserialize, Serialize};

use super::{
    add_draft, add_field, move_field, remove_field, rename_title, reorder_fields,
    resolve_clarification, toggle_required, EditError, FieldDraft, Resolution,
};
use crate::schema::{FieldSpec, SchemaDocument, UiHint};

/// One reconciler operation, as exchanged with the builder UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldEdit {
    Add {
        key: String,
        spec: FieldSpec,
        #[serde(default)]
        hint: UiHint,
        #[serde(default)]
        required: bool,
    },
    AddDraft {
        draft: FieldDraft,
    },
    Remove {
        key: String,
    },
    Reorder {
        order: Vec<String>,
    },
    Move {
        key: String,
        to: usize,
    },
    ToggleRequired {
        key: String,
    },
    RenameTitle {
        key: String,
        title: String,
    },
    Resolve {
        index: usize,
        resolution: Resolution,
    },
}

impl FieldEdit {
    pub fn apply(&self, doc: &SchemaDocument) -> Result<SchemaDocument, EditError> {
        match self {
            FieldEdit::Add {
                key,
                spec,
                hint,
                required,
            } => add_field(doc, key, spec.clone(), hint.clone(), *required),
            FieldEdit::AddDraft { draft } => add_draft(doc, draft),
            FieldEdit::Remove { key } => remove_field(doc, key),
            FieldEdit::Reorder { order } => reorder_fields(doc, order.as_slice()),
            FieldEdit::Move { key, to } => move_field(doc, key, *to),
            FieldEdit::ToggleRequired { key } => toggle_required(doc, key),
            FieldEdit::RenameTitle { key, title } => rename_title(doc, key, title),
            FieldEdit::Resolve { index, resolution } => resolve_clarification(doc, *index, resolution),
        }
    }
}

/// The edit at `index` of a batch failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("edit #{index} failed: {source}")]
pub struct BatchEditError {
    pub index: usize,
    #[source]
    pub source: EditError,
}

/// Apply `edits` in order, each against the previous result. The first
/// failure aborts the batch; the input document is never modified.
pub fn apply_edits(doc: &SchemaDocument, edits: &[FieldEdit]) -> Result<SchemaDocument, BatchEditError> {
    let mut current = doc.clone();
    for (index, edit) in edits.iter().enumerate() {
        current = edit
            .apply(&current)
            .map_err(|source| BatchEditError { index, source })?;
        tracing::debug!(index, edit = ?edit, "edit applied");
    }
    Ok(current)
}
