//! Property-based tests for userbase
//!
//! These tests verify invariants that must hold for all inputs:
//! - Parsers never panic
//! - Filled URIs never carry braces
//! - Bounded operations stay bounded
//!
//! Run with: cargo test --test property_tests

use proptest::prelude::*;

// ============================================================================
// URI TEMPLATE TESTS
// ============================================================================

mod uri_tests {
    use super::*;
    use std::collections::HashMap;
    use userbase::mcp::uri::{
        ensure_resolved, expand, fill_first, has_placeholders, placeholders, UriTemplate,
    };

    proptest! {
        /// Invariant: template parsing and matching never panic
        #[test]
        fn match_never_panics(template in "\\PC{0,60}", uri in "\\PC{0,60}") {
            let _ = UriTemplate::parse(&template).match_uri(&uri);
            let _ = placeholders(&template);
        }

        /// Invariant: filling every distinct placeholder leaves no braces behind
        #[test]
        fn filled_uri_has_no_braces(
            names in prop::collection::hash_set("[a-zA-Z][a-zA-Z0-9]{0,8}", 1..5),
            value in "[a-z0-9-]{1,12}",
        ) {
            let template = names
                .iter()
                .map(|n| format!("{{{}}}", n))
                .collect::<Vec<_>>()
                .join("/");
            let template = format!("res://{}/tail", template);

            let mut uri = template.clone();
            for name in placeholders(&template) {
                uri = fill_first(&uri, &name, &value);
            }

            prop_assert!(!has_placeholders(&uri));
            prop_assert!(!uri.contains('{') && !uri.contains('}'), "uri still contains braces: {}", uri);
            prop_assert!(ensure_resolved(&uri).is_ok());
        }

        /// Invariant: a repeated placeholder is filled once per occurrence
        #[test]
        fn repeated_placeholder_filled_in_order(a in "[a-z]{1,6}", b in "[0-9]{1,6}") {
            let template = "pair://{x}/{x}";
            let once = fill_first(template, "x", &a);
            let twice = fill_first(&once, "x", &b);
            prop_assert_eq!(twice, format!("pair://{}/{}", a, b));
        }

        /// Invariant: expanding a template and matching it back yields the values
        #[test]
        fn expand_then_match(user_id in "[A-Za-z0-9_.-]{1,20}") {
            let template = "users://{userId}/profile";
            let mut values = HashMap::new();
            values.insert("userId".to_string(), user_id.clone());

            let uri = expand(template, &values).unwrap();
            let matched = UriTemplate::parse(template).match_uri(&uri);
            prop_assert_eq!(matched, Some(values));
        }

        /// Invariant: expansion fails instead of sending an unresolved URI
        #[test]
        fn expand_with_missing_value_fails(name in "[a-z]{1,8}") {
            let template = format!("users://{{{}}}/profile", name);
            prop_assert!(expand(&template, &HashMap::new()).is_err());
        }
    }
}

// ============================================================================
// GENERATED USER PARSING TESTS
// ============================================================================

mod generated_user_tests {
    use super::*;
    use userbase::catalog::tools::{parse_generated_user, strip_code_fences};
    use userbase::types::NewUser;

    fn field() -> impl Strategy<Value = String> {
        "[A-Za-z0-9 @.,-]{1,30}"
    }

    proptest! {
        /// Invariant: parsing arbitrary model output never panics
        #[test]
        fn never_panics(s in "\\PC*") {
            let _ = parse_generated_user(&s);
            let _ = strip_code_fences(&s);
        }

        /// Invariant: a fenced payload parses to the same user as the bare one
        #[test]
        fn fence_is_transparent(
            name in field(),
            email in field(),
            address in field(),
            phone in field(),
            tag in prop::sample::select(vec!["```json", "```"]),
        ) {
            let user = NewUser { name, email, address, phone };
            let bare = serde_json::to_string(&user).unwrap();
            let fenced = format!("{}\n{}\n```", tag, bare);

            prop_assert_eq!(parse_generated_user(&bare).unwrap(), user.clone());
            prop_assert_eq!(parse_generated_user(&fenced).unwrap(), user);
        }
    }
}

// ============================================================================
// INPUT SCHEMA TESTS
// ============================================================================

mod schema_tests {
    use super::*;
    use serde_json::{Map, Value};
    use userbase::catalog::tools::user_schema;
    use userbase::mcp::{FieldType, InputSchema};

    fn numeric_schema() -> InputSchema {
        InputSchema::new()
            .required("count", FieldType::Integer, "How many")
            .optional("ratio", FieldType::Number, "Fraction")
            .optional("active", FieldType::Boolean, "Flag")
    }

    proptest! {
        /// Invariant: coercion never panics and always yields a value
        #[test]
        fn coerce_never_panics(raw in "\\PC*") {
            let schema = numeric_schema();
            for name in ["count", "ratio", "active", "unknown"] {
                let _ = schema.coerce(name, &raw);
            }
        }

        /// Invariant: integer input coerces to the same integer
        #[test]
        fn integer_coercion(n in any::<i64>()) {
            let value = numeric_schema().coerce("count", &n.to_string());
            prop_assert_eq!(value, Value::from(n));
        }

        /// Invariant: string fields keep operator input verbatim
        #[test]
        fn string_coercion_is_verbatim(raw in "\\PC*") {
            prop_assert_eq!(user_schema().coerce("name", &raw), Value::String(raw.clone()));
        }

        /// Invariant: validation rejects exactly the maps missing a required field
        #[test]
        fn validation_requires_all_user_fields(
            present in prop::collection::btree_set(
                prop::sample::select(vec!["name", "email", "address", "phone"]),
                0..=4,
            ),
        ) {
            let mut args = Map::new();
            for key in &present {
                args.insert(key.to_string(), Value::String("x".into()));
            }
            let result = user_schema().validate(&args);
            prop_assert_eq!(result.is_ok(), present.len() == 4);
        }
    }
}

// ============================================================================
// COMPLETION TESTS
// ============================================================================

mod completion_tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use userbase::catalog::prompts::{generate_fake_user, generate_fake_user_descriptor};
    use userbase::mcp::protocol::{
        CompleteParams, CompletionArgument, CompletionContext, CompletionReference,
    };
    use userbase::mcp::registry::MAX_COMPLETION_VALUES;
    use userbase::mcp::{CapabilityRegistry, Completer};

    proptest! {
        /// Invariant: at most MAX_COMPLETION_VALUES values are returned, and
        /// has_more reports the truncation
        #[test]
        fn completion_is_capped(n in 0usize..300) {
            let completer: Completer = Arc::new(move |_partial: &str, _ctx: &CompletionContext| {
                (0..n).map(|i| format!("value-{}", i)).collect()
            });
            let mut completers = HashMap::new();
            completers.insert("name".to_string(), completer);

            let mut registry = CapabilityRegistry::new();
            registry
                .register_prompt(generate_fake_user_descriptor(), completers, generate_fake_user)
                .unwrap();

            let result = registry.complete(&CompleteParams {
                reference: CompletionReference::Prompt { name: "generate-fake-user".into() },
                argument: CompletionArgument { name: "name".into(), value: String::new() },
                context: None,
            });

            prop_assert_eq!(result.completion.values.len(), n.min(MAX_COMPLETION_VALUES));
            prop_assert_eq!(result.completion.total, Some(n));
            prop_assert_eq!(result.completion.has_more, n > MAX_COMPLETION_VALUES);
        }
    }
}
