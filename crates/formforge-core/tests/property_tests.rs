//! Property-Based Tests for the generators and the reconciler
//!
//! 1. Fallback generation is deterministic and always consistent
//! 2. add_field / remove_field roundtrip exactly
//! 3. Reordering changes only the order
//! 4. Random edit sequences never break referential integrity

use formforge_core::editor::*;
use formforge_core::fallback;
use formforge_core::schema::*;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

const PHRASES: &[&str] = &[
    "name",
    "email",
    "phone number",
    "college",
    "github username",
    "t-shirt size",
    "rating",
    "feedback",
    "message",
    "would you recommend us",
    "what to improve",
    "age",
    "gender",
    "hobbies",
    "favourite colour",
    "newsletter",
    "satisfaction",
    "optional",
    "anonymous",
];

/// Descriptions assembled from detector keywords
fn description_strategy() -> impl Strategy<Value = String> {
    prop::sample::subsequence(PHRASES.to_vec(), 0..=PHRASES.len())
        .prop_map(|parts| format!("Form with {}", parts.join(", ")))
}

fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["name", "email", "phone", "rating", "notes", "company", "age"])
        .prop_map(str::to_string)
}

fn spec_strategy() -> impl Strategy<Value = FieldSpec> {
    prop_oneof![
        Just(FieldSpec::string("Text")),
        Just(FieldSpec::string("Email").with_format(StringFormat::Email)),
        Just(FieldSpec::integer("Count").with_bounds(0.0, 10.0)),
        Just(FieldSpec::boolean("Flag")),
        Just(FieldSpec::single_select("Pick", ["A", "B"])),
        Just(FieldSpec::multi_select("Many", ["A", "B", "C"])),
    ]
}

fn hint_strategy() -> impl Strategy<Value = UiHint> {
    prop_oneof![
        Just(UiHint::default()),
        Just(UiHint::placeholder("Type here")),
        Just(UiHint::widget(Widget::Textarea)),
        Just(UiHint::widget(Widget::Select)),
    ]
}

fn edit_strategy() -> impl Strategy<Value = FieldEdit> {
    prop_oneof![
        (key_strategy(), spec_strategy(), hint_strategy(), any::<bool>()).prop_map(
            |(key, spec, hint, required)| FieldEdit::Add {
                key,
                spec,
                hint,
                required,
            }
        ),
        key_strategy().prop_map(|key| FieldEdit::Remove { key }),
        key_strategy().prop_map(|key| FieldEdit::ToggleRequired { key }),
        (key_strategy(), "[A-Za-z ]{1,12}")
            .prop_map(|(key, title)| FieldEdit::RenameTitle { key, title }),
        (key_strategy(), 0usize..8).prop_map(|(key, to)| FieldEdit::Move { key, to }),
    ]
}

// ============================================================================
// Generator Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn fallback_is_byte_identical(description in description_strategy()) {
        let first = serde_json::to_string(&fallback::generate(&description)).unwrap();
        let second = serde_json::to_string(&fallback::generate(&description)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn fallback_is_always_consistent(description in description_strategy()) {
        let doc = fallback::generate(&description);
        prop_assert!(doc.validate().is_ok(), "{:?}", doc.validate());
    }

    #[test]
    fn fallback_never_panics_on_arbitrary_text(description in "\\PC{0,120}") {
        let doc = fallback::generate(&description);
        prop_assert!(doc.is_consistent());
    }
}

// ============================================================================
// Reconciler Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn add_then_remove_restores_document(
        description in description_strategy(),
        key in "[a-z][a-z0-9_]{0,10}",
        spec in spec_strategy(),
        required in any::<bool>(),
    ) {
        let doc = fallback::generate(&description);
        prop_assume!(!doc.contains_field(&key));

        let added = add_field(&doc, &key, spec, UiHint::placeholder("x"), required).unwrap();
        prop_assert!(added.is_consistent());
        let removed = remove_field(&added, &key).unwrap();
        prop_assert_eq!(removed, doc);
    }

    #[test]
    fn reorder_changes_only_order(
        description in description_strategy(),
        seeds in prop::collection::vec(any::<u32>(), PHRASES.len()),
    ) {
        let doc = fallback::generate(&description);
        let mut order: Vec<(u32, String)> = doc
            .field_keys()
            .zip(seeds.iter().copied())
            .map(|(key, seed)| (seed, key.to_string()))
            .collect();
        order.sort();
        let order: Vec<String> = order.into_iter().map(|(_, key)| key).collect();

        let reordered = reorder_fields(&doc, order.as_slice()).unwrap();
        prop_assert_eq!(reordered.field_keys().collect::<Vec<_>>(), order.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert_eq!(&reordered.schema.required, &doc.schema.required);
        prop_assert_eq!(&reordered.ui_schema, &doc.ui_schema);
        prop_assert_eq!(&reordered.followups, &doc.followups);
        for key in doc.field_keys() {
            prop_assert_eq!(reordered.field(key), doc.field(key));
        }
    }

    #[test]
    fn random_edits_preserve_integrity(
        description in description_strategy(),
        edits in prop::collection::vec(edit_strategy(), 0..24),
    ) {
        let mut doc = fallback::generate(&description);
        for edit in &edits {
            if let Ok(next) = edit.apply(&doc) {
                doc = next;
            }
            prop_assert!(doc.validate().is_ok(), "after {:?}: {:?}", edit, doc.validate());
        }
    }

    #[test]
    fn toggle_required_is_an_involution(description in description_strategy()) {
        let doc = fallback::generate(&description);
        for key in doc.field_keys() {
            let twice = toggle_required(&toggle_required(&doc, key).unwrap(), key).unwrap();
            prop_assert_eq!(&twice, &doc);
        }
    }
}
