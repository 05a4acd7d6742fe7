//! JSON-schema generation for structured responses.
//!
//! Strict structured-output providers want every object closed
//! (`additionalProperties: false`), every property listed in `required`,
//! and no `$ref` indirection. [`StructuredOutput::strict_schema`] produces that
//! shape from a `schemars` derive.

use newsdesk_core::Validate;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A response type that can be requested from the generation capability.
///
/// Implemented for every `JsonSchema + DeserializeOwned + Validate` type.
pub trait StructuredOutput: JsonSchema + DeserializeOwned + Validate {
    /// Strict, fully inlined JSON schema for this type.
    fn strict_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let definitions = match &mut value {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("title");
                map.remove("definitions")
            }
            _ => None,
        };
        if let Some(defs) = definitions {
            inline_refs(&mut value, &defs);
        }
        close_objects(&mut value);
        value
    }

    /// Name sent alongside the schema.
    fn output_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned + Validate> StructuredOutput for T {}

fn inline_refs(value: &mut Value, definitions: &Value) {
    let target = value
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|path| path.strip_prefix("#/definitions/"))
        .and_then(|name| definitions.get(name))
        .cloned();
    if let Some(def) = target {
        *value = def;
        inline_refs(value, definitions);
        return;
    }

    match value {
        Value::Object(map) => {
            // schemars wraps documented refs as `allOf: [{$ref}]`.
            let single = match map.get("allOf") {
                Some(Value::Array(all_of)) if all_of.len() == 1 => Some(all_of[0].clone()),
                _ => None,
            };
            if let Some(mut inner) = single {
                inline_refs(&mut inner, definitions);
                if let Value::Object(inner_map) = inner {
                    map.remove("allOf");
                    for (k, v) in inner_map {
                        map.entry(k).or_insert(v);
                    }
                }
            }

            for v in map.values_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let is_object = map.get("type") == Some(&Value::String("object".to_string()));
            if is_object {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let required: Vec<Value> =
                        props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(required));
                }
            }
            for v in map.values_mut() {
                close_objects(v);
            }
        }
        Value::Array(items) => {
            for item in items {
                close_objects(item);
            }
        }
        _ => {}
    }
}

/// Restrict every property named `field` to the given values via `enum`.
///
/// Array-typed properties get the restriction on their `items`; nullable
/// properties keep `null` as an allowed value. Returns how many properties
/// were restricted.
pub fn restrict_field_values(schema: &mut Value, field: &str, allowed: &[Value]) -> usize {
    let mut restricted = 0;
    if let Value::Object(map) = schema {
        if let Some(Value::Object(props)) = map.get_mut("properties") {
            if let Some(Value::Object(prop)) = props.get_mut(field) {
                let target = if type_includes(prop, "array") {
                    match prop.get_mut("items") {
                        Some(Value::Object(items)) => Some(items),
                        _ => None,
                    }
                } else {
                    Some(prop)
                };
                if let Some(target) = target {
                    let mut values = allowed.to_vec();
                    if type_includes(target, "null") {
                        values.push(Value::Null);
                    }
                    target.insert("enum".to_string(), Value::Array(values));
                    restricted += 1;
                }
            }
        }
        for v in map.values_mut() {
            restricted += restrict_field_values(v, field, allowed);
        }
    } else if let Value::Array(items) = schema {
        for item in items {
            restricted += restrict_field_values(item, field, allowed);
        }
    }
    restricted
}

fn type_includes(map: &Map<String, Value>, ty: &str) -> bool {
    match map.get("type") {
        Some(Value::String(t)) => t == ty,
        Some(Value::Array(ts)) => ts.iter().any(|t| t.as_str() == Some(ty)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use newsdesk_core::ValidationError;
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize, JsonSchema)]
    struct Inner {
        article_id: Option<i64>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Outer {
        title: String,
        /// Cited items.
        article_ids: Vec<i64>,
        inner: Vec<Inner>,
    }

    impl Validate for Outer {
        fn validate(&self) -> Result<(), ValidationError> {
            Ok(())
        }
    }

    #[test]
    fn schema_is_closed_and_inlined() {
        let schema = Outer::strict_schema();
        let text = schema.to_string();
        assert!(!text.contains("$ref"), "refs must be inlined: {text}");
        assert!(!text.contains("definitions"));
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
        let inner = &schema["properties"]["inner"]["items"];
        assert_eq!(inner["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn restricts_scalar_array_and_nullable_fields() {
        let mut schema = Outer::strict_schema();
        let allowed = [Value::from(1), Value::from(2)];

        assert_eq!(restrict_field_values(&mut schema, "article_ids", &allowed), 1);
        assert_eq!(
            schema["properties"]["article_ids"]["items"]["enum"],
            serde_json::json!([1, 2])
        );

        assert_eq!(restrict_field_values(&mut schema, "article_id", &allowed), 1);
        assert_eq!(
            schema["properties"]["inner"]["items"]["properties"]["article_id"]["enum"],
            serde_json::json!([1, 2, null])
        );
    }

    #[test]
    fn unknown_field_restricts_nothing() {
        let mut schema = Outer::strict_schema();
        assert_eq!(restrict_field_values(&mut schema, "nope", &[Value::from(1)]), 0);
    }
}
