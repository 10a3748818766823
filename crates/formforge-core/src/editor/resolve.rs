//! Answering clarification requests.

use serde::{Deserialize, Serialize};

use super::EditError;
use crate::schema::SchemaDocument;

/// Option id that drops the conflicting field.
pub const REMOVE_OPTION: &str = "remove";

/// The user's answer to a clarification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// One of the request's offered option ids.
    Option(String),
    /// A free-text answer; the document is left as is.
    Custom(String),
}

/// Resolve the followup at `index` and drop it from the document.
///
/// Choosing `remove` on a request that names a field also removes that
/// field (with its requirement and hint) when it is still present.
pub fn resolve_clarification(
    doc: &SchemaDocument,
    index: usize,
    resolution: &Resolution,
) -> Result<SchemaDocument, EditError> {
    let request = doc
        .followups
        .get(index)
        .ok_or(EditError::UnknownClarification(index))?;

    let drop_field = match resolution {
        Resolution::Option(id) => {
            if request.option(id).is_none() {
                return Err(EditError::UnknownOption(id.clone()));
            }
            if id == REMOVE_OPTION {
                request.field.clone()
            } else {
                None
            }
        }
        Resolution::Custom(text) => {
            if text.trim().is_empty() {
                return Err(EditError::EmptyCustomAnswer);
            }
            None
        }
    };

    let mut next = doc.clone();
    next.followups.remove(index);
    if let Some(key) = drop_field {
        next.schema.properties.shift_remove(&key);
        next.schema.required.remove(&key);
        next.ui_schema.remove(&key);
    }
    tracing::debug!(index, ?resolution, "clarification resolved");
    Ok(next)
}
