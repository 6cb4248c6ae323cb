use schemars::{JsonSchema, r#gen::SchemaSettings};
use serde_json::{Value, json};

/// JSON schema for `T`, inlined and stripped of keys chat APIs reject.
pub fn schema_for<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let generator = schemars::r#gen::SchemaGenerator::new(settings);
    let root = generator.into_root_schema_for::<T>();

    let mut value = serde_json::to_value(root.schema).unwrap_or_else(|_| json!({"type": "object"}));
    if let Value::Object(map) = &mut value {
        map.remove("title");
        map.remove("definitions");
    }
    value
}
