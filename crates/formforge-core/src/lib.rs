//! Formforge Core: natural-language form descriptions → renderable form schemas
//!
//! Turns a free-text description ("Contact form: name, email, message") into a
//! JSON-Schema document with UI hints, flags contradictory requirements as
//! clarification requests, and reconciles user edits against the document.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      DESCRIPTION → FORM PIPELINE                    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │   description                                                       │
//! │       │                                                             │
//! │  ┌────▼────────┐  reply   ┌──────────┐  ok   ┌──────────────────┐   │
//! │  │ AiGenerator │─────────►│  Repair  │──────►│  GeneratedForm   │   │
//! │  │ (LLMProvider│          │ +validate│       │  source: "ai"    │   │
//! │  │  + timeout) │          └────┬─────┘       └────────┬─────────┘   │
//! │  └────┬────────┘               │ malformed            │             │
//! │       │ transport failure      │                      │             │
//! │  ┌────▼────────────────────────▼─┐  ┌──────────────────▼──────────┐ │
//! │  │  Fallback (keyword rules)     │  │  Editor / EditSession       │ │
//! │  │  source: "fallback"           │  │  add, remove, reorder, ...  │ │
//! │  └───────────────────────────────┘  └─────────────────────────────┘ │
//! │                                                                     │
//! │   Ambiguity detector → followups on every generated document        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - Generation never fails: any AI problem degrades to the keyword fallback.
//! - Every document handed out satisfies [`SchemaDocument::validate`].
//! - Editor operations are pure; a failed edit leaves its input untouched.

pub mod ai;
pub mod ambiguity;
pub mod editor;
pub mod fallback;
pub mod keywords;
pub mod llm;
pub mod repair;
pub mod schema;
pub mod session;
pub mod validate;

pub use ai::{AiGenerator, GeneratedForm, GenerationFailure, GenerationSettings, GenerationSource};
pub use ambiguity::AmbiguityDetector;
pub use editor::{
    add_draft, add_field, apply_edits, move_field, remove_field, rename_title, reorder_fields,
    resolve_clarification, toggle_required, BatchEditError, EditError, FieldDraft, FieldEdit,
    FieldKind, Resolution,
};
pub use fallback::FallbackGenerator;
pub use llm::{LLMConfig, LLMError, LLMProvider, UnifiedClient};
pub use repair::{parse_ai_output, AiOutputError};
pub use schema::{
    ClarificationKind, ClarificationOption, ClarificationRequest, FieldSpec, FieldType, ItemSpec,
    ObjectSchema, SchemaDocument, StringFormat, UiHint, Widget,
};
pub use session::EditSession;
pub use validate::{IntegrityViolation, ShapeViolation};
