//! AI output normalization and repair
//!
//! Two stages, tested separately:
//! 1. [`strip_code_fences`]: pure text transform removing Markdown fences.
//! 2. [`parse_ai_output`]: JSON parsing, shape repair, typed decoding and
//!    integrity validation. "Not JSON" and "JSON of the wrong shape" are
//!    distinct errors.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::schema::{SchemaDocument, StringFormat, Widget};
use crate::validate::IntegrityViolation;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AiOutputError {
    #[error("response is not JSON: {0}")]
    NotJson(String),
    #[error("response has the wrong shape: {0}")]
    WrongShape(String),
    #[error("response violates document invariants: {}", join_violations(.0))]
    Inconsistent(Vec<IntegrityViolation>),
}

fn join_violations(violations: &[IntegrityViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Stage 1: fence stripping
// ============================================================================

/// Remove a Markdown code fence (```json … ``` or ``` … ```) around, or
/// embedded in, `text`. Text without fences is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    // Skip the fence marker and its info string (`json`, `JSON`, ...).
    let after_open = &trimmed[open + 3..];
    let body = match after_open.find('\n') {
        Some(newline) if after_open[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &after_open[newline + 1..]
        }
        _ => after_open
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .trim_start(),
    };

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

// ============================================================================
// Stage 2: parse, repair, validate
// ============================================================================

/// Parse fence-stripped model output into a consistent document.
pub fn parse_ai_output(text: &str) -> Result<SchemaDocument, AiOutputError> {
    let cleaned = strip_code_fences(text);
    let value = parse_json_object(cleaned)?;
    let repaired = repair_document(value)?;

    let document: SchemaDocument = serde_json::from_value(repaired)
        .map_err(|e| AiOutputError::WrongShape(e.to_string()))?;
    document.validate().map_err(AiOutputError::Inconsistent)?;
    Ok(document)
}

/// Parse `text` as JSON, falling back to the first balanced `{…}` substring
/// when the model surrounded the object with prose.
pub fn parse_json_object(text: &str) -> Result<Value, AiOutputError> {
    let first_error = match serde_json::from_str::<Value>(text) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    let Some(start) = text.find('{') else {
        return Err(AiOutputError::NotJson(first_error));
    };

    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escape = false;
    let mut end: Option<usize> = None;

    for (idx, ch) in text.char_indices().skip_while(|(idx, _)| *idx < start) {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }

    let Some(end) = end else {
        return Err(AiOutputError::NotJson(first_error));
    };
    serde_json::from_str(&text[start..=end]).map_err(|e| AiOutputError::NotJson(e.to_string()))
}

/// Canonicalise a model-chosen key to `[a-z0-9_]+` (`tshirtSize` → `tshirt_size`).
pub fn canonical_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
            prev_lower_or_digit = true;
        } else {
            out.push('_');
            prev_lower_or_digit = false;
        }
    }

    out.split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn shape_err(message: impl Into<String>) -> AiOutputError {
    AiOutputError::WrongShape(message.into())
}

/// Rewrite a parsed value into the document grammar, dropping what cannot be
/// kept consistently.
pub fn repair_document(value: Value) -> Result<Value, AiOutputError> {
    let Value::Object(mut root) = value else {
        return Err(shape_err("expected a JSON object"));
    };

    let Some(schema) = root.remove("schema") else {
        return Err(shape_err("missing `schema`"));
    };
    let Value::Object(mut schema) = schema else {
        return Err(shape_err("`schema` is not an object"));
    };

    // Properties, keyed canonically.
    let properties = match schema.remove("properties") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(shape_err("`schema.properties` is not an object")),
    };

    let mut renames: BTreeMap<String, String> = BTreeMap::new();
    let mut fields = Map::new();
    for (raw_key, field) in properties {
        let key = canonical_key(&raw_key);
        if key.is_empty() {
            return Err(shape_err(format!("field key {raw_key:?} has no usable characters")));
        }
        if fields.contains_key(&key) {
            return Err(shape_err(format!("field keys collide on {key:?}")));
        }
        let field = repair_field(&key, field)?;
        renames.insert(raw_key, key.clone());
        fields.insert(key, field);
    }

    // Required: known keys only, no duplicates.
    let required: BTreeSet<String> = match schema.remove("required") {
        Some(Value::Array(entries)) => entries
            .into_iter()
            .filter_map(|entry| entry.as_str().map(str::to_string))
            .filter_map(|raw| resolve_key(&renames, &fields, &raw))
            .collect(),
        _ => BTreeSet::new(),
    };

    // UI hints: known keys and widgets only.
    let mut ui_schema = Map::new();
    if let Some(Value::Object(hints)) = root.remove("uiSchema") {
        for (raw_key, hint) in hints {
            let Some(key) = resolve_key(&renames, &fields, &raw_key) else {
                tracing::debug!(key = %raw_key, "dropping uiSchema entry without a property");
                continue;
            };
            let has_options = fields
                .get(&key)
                .map(field_has_options)
                .unwrap_or(false);
            if let Some(hint) = repair_hint(&key, hint, has_options) {
                ui_schema.insert(key, hint);
            }
        }
    }

    let mut repaired = Map::new();
    repaired.insert(
        "schema".to_string(),
        serde_json::json!({
            "type": "object",
            "properties": Value::Object(fields),
            "required": required,
        }),
    );
    repaired.insert("uiSchema".to_string(), Value::Object(ui_schema));
    repaired.insert("followups".to_string(), Value::Array(Vec::new()));
    Ok(Value::Object(repaired))
}

fn resolve_key(renames: &BTreeMap<String, String>, fields: &Map<String, Value>, raw: &str) -> Option<String> {
    let key = renames
        .get(raw)
        .cloned()
        .unwrap_or_else(|| canonical_key(raw));
    fields.contains_key(&key).then_some(key)
}

fn field_has_options(field: &Value) -> bool {
    field.get("enum").is_some() || field.pointer("/items/enum").is_some()
}

fn repair_field(key: &str, field: Value) -> Result<Value, AiOutputError> {
    let Value::Object(mut field) = field else {
        return Err(shape_err(format!("field {key:?} is not an object")));
    };

    let declared = field
        .get("type")
        .and_then(Value::as_str)
        .map(|t| t.to_ascii_lowercase());
    let field_type = match declared.as_deref() {
        Some(t @ ("string" | "number" | "integer" | "boolean" | "array")) => t.to_string(),
        Some("email") => {
            field
                .entry("format")
                .or_insert_with(|| Value::String("email".to_string()));
            "string".to_string()
        }
        Some("url") => {
            field
                .entry("format")
                .or_insert_with(|| Value::String("url".to_string()));
            "string".to_string()
        }
        Some("date") => {
            field
                .entry("format")
                .or_insert_with(|| Value::String("date".to_string()));
            "string".to_string()
        }
        Some("select" | "dropdown" | "radio" | "text" | "textarea") => "string".to_string(),
        Some("checkbox" | "bool") => "boolean".to_string(),
        Some("multiselect" | "checkboxes") => "array".to_string(),
        Some(other) => return Err(shape_err(format!("field {key:?} has unknown type {other:?}"))),
        None if field.contains_key("items") => "array".to_string(),
        None => "string".to_string(),
    };
    field.insert("type".to_string(), Value::String(field_type));

    let format_ok = field
        .get("format")
        .and_then(Value::as_str)
        .and_then(StringFormat::parse)
        .map(|format| serde_json::to_value(format).unwrap_or(Value::Null));
    match format_ok {
        Some(format) => {
            field.insert("format".to_string(), format);
        }
        None => {
            field.remove("format");
        }
    }

    if let Some(options) = field.remove("enum") {
        field.insert("enum".to_string(), stringify_options(key, options)?);
    }
    if let Some(Value::Object(items)) = field.get_mut("items") {
        if let Some(options) = items.remove("enum") {
            items.insert("enum".to_string(), stringify_options(key, options)?);
        }
        items
            .entry("type")
            .or_insert_with(|| Value::String("string".to_string()));
    }

    for bound in ["minimum", "maximum"] {
        if field.get(bound).map(|v| !v.is_number()).unwrap_or(false) {
            field.remove(bound);
        }
    }

    Ok(Value::Object(field))
}

fn stringify_options(key: &str, options: Value) -> Result<Value, AiOutputError> {
    let Value::Array(options) = options else {
        return Err(shape_err(format!("field {key:?} has a non-array `enum`")));
    };
    let options = options
        .into_iter()
        .map(|option| match option {
            Value::String(s) => Ok(Value::String(s)),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(shape_err(format!("field {key:?} has a non-scalar option {other}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(options))
}

fn repair_hint(key: &str, hint: Value, has_options: bool) -> Option<Value> {
    let Value::Object(hint) = hint else {
        return None;
    };

    let mut repaired = Map::new();
    if let Some(Value::String(placeholder)) = hint.get("ui:placeholder") {
        if !placeholder.is_empty() {
            repaired.insert("ui:placeholder".to_string(), Value::String(placeholder.clone()));
        }
    }
    if let Some(raw) = hint.get("ui:widget").and_then(Value::as_str) {
        match Widget::parse(raw) {
            Some(widget) if widget.requires_options() && !has_options => {
                tracing::debug!(key, widget = %widget, "dropping choice widget on a field without options");
            }
            Some(widget) => {
                repaired.insert("ui:widget".to_string(), Value::String(widget.as_str().to_string()));
            }
            None => tracing::debug!(key, widget = raw, "dropping unknown widget"),
        }
    }

    (!repaired.is_empty()).then_some(Value::Object(repaired))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```JSON\n{}\n```\n"), "{}");
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_fence_with_prose() {
        let text = "Here is your form:\n```json\n{\"schema\": {}}\n```\nEnjoy!";
        assert_eq!(strip_code_fences(text), "{\"schema\": {}}");
    }

    #[test]
    fn test_strip_unterminated_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_no_fence_is_trimmed() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_not_json_vs_wrong_shape() {
        assert!(matches!(
            parse_ai_output("I cannot help with that."),
            Err(AiOutputError::NotJson(_))
        ));
        assert!(matches!(
            parse_ai_output(r#"{"fields": []}"#),
            Err(AiOutputError::WrongShape(_))
        ));
        assert!(matches!(parse_ai_output("[1, 2]"), Err(AiOutputError::WrongShape(_))));
    }

    #[test]
    fn test_embedded_object_is_extracted() {
        let value = parse_json_object(r#"Sure! {"schema": {"note": "}"}} Hope it helps"#).unwrap();
        assert_eq!(value, json!({"schema": {"note": "}"}}));
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("tshirtSize"), "tshirt_size");
        assert_eq!(canonical_key("T-shirt Size"), "t_shirt_size");
        assert_eq!(canonical_key("firstName"), "first_name");
        assert_eq!(canonical_key("URL"), "url");
        assert_eq!(canonical_key("  email__address "), "email_address");
        assert_eq!(canonical_key("---"), "");
    }

    #[test]
    fn test_repairs_keys_consistently() {
        let doc = parse_ai_output(
            r#"{
                "schema": {
                    "type": "object",
                    "properties": {
                        "fullName": {"type": "string", "title": "Full Name"},
                        "tshirtSize": {"type": "select", "title": "Size", "enum": ["S", "M"]}
                    },
                    "required": ["fullName", "tshirtSize", "tshirtSize", "ghost"]
                },
                "uiSchema": {
                    "tshirtSize": {"ui:widget": "select"},
                    "fullName": {"ui:placeholder": "Jane Doe", "ui:autofocus": true},
                    "ghost": {"ui:widget": "textarea"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.field_keys().collect::<Vec<_>>(), vec!["full_name", "tshirt_size"]);
        assert_eq!(
            doc.schema.required.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["full_name", "tshirt_size"]
        );
        assert_eq!(doc.hint("tshirt_size").unwrap().widget, Some(Widget::Select));
        assert_eq!(doc.hint("full_name").unwrap().placeholder.as_deref(), Some("Jane Doe"));
        assert!(doc.hint("ghost").is_none());
        assert!(doc.is_consistent());
    }

    #[test]
    fn test_pseudo_types() {
        let doc = parse_ai_output(
            r#"{"schema": {"properties": {
                "email": {"type": "email"},
                "age": {"type": "integer", "minimum": 0, "maximum": "lots"},
                "tags": {"items": {"enum": [1, 2]}}
            }}}"#,
        )
        .unwrap();

        let email = doc.field("email").unwrap();
        assert_eq!(email.field_type, FieldType::String);
        assert_eq!(email.format, Some(StringFormat::Email));
        assert_eq!(doc.field("age").unwrap().maximum, None);
        let tags = doc.field("tags").unwrap();
        assert_eq!(tags.field_type, FieldType::Array);
        assert_eq!(
            tags.items.as_ref().unwrap().options,
            Some(vec!["1".to_string(), "2".to_string()])
        );
    }

    #[test]
    fn test_drops_unknown_widgets_and_unpaired_select() {
        let doc = parse_ai_output(
            r#"{"schema": {"properties": {
                "bio": {"type": "string"},
                "color": {"type": "string"}
            }},
            "uiSchema": {
                "bio": {"ui:widget": "richtext"},
                "color": {"ui:widget": "select"}
            }}"#,
        )
        .unwrap();
        assert!(doc.ui_schema.is_empty());
    }

    #[test]
    fn test_collision_is_wrong_shape() {
        let result = parse_ai_output(
            r#"{"schema": {"properties": {"firstName": {"type": "string"}, "first_name": {"type": "string"}}}}"#,
        );
        assert!(matches!(result, Err(AiOutputError::WrongShape(_))));
    }

    #[test]
    fn test_invariant_violation_is_inconsistent() {
        let result = parse_ai_output(
            r#"{"schema": {"properties": {"when": {"type": "boolean", "format": "date"}}}}"#,
        );
        assert!(matches!(result, Err(AiOutputError::Inconsistent(_))));
    }

    #[test]
    fn test_model_followups_are_discarded() {
        let doc = parse_ai_output(
            r#"{"schema": {"properties": {}}, "uiSchema": {}, "followups": [{"type": "contradiction"}]}"#,
        )
        .unwrap();
        assert!(doc.followups.is_empty());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_schema_without_ui_schema_is_accepted() {
        let doc = parse_ai_output(
            r#"{"schema": {"type": "object", "properties": {"email": {"type": "string", "format": "email"}}, "required": ["email"]}}"#,
        )
        .unwrap();
        assert!(doc.contains_field("email"));
        assert!(doc.is_required("email"));
        assert!(doc.ui_schema.is_empty());

        assert!(matches!(
            parse_ai_output(r#"{"uiSchema": {"email": {"ui:placeholder": "x"}}}"#),
            Err(AiOutputError::WrongShape(_))
        ));
    }
}
