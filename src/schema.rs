//! Input schemas for MCP tools, derived from argument structs

use rmcp::model::Tool;
use schemars::JsonSchema;
use serde_json::{Map, Value};
use std::sync::Arc;

/// JSON schema object for `T`, suitable as a tool `inputSchema`.
pub fn input_schema<T: JsonSchema>() -> Map<String, Value> {
    let schema = schemars::schema_for!(T);
    let mut object = match serde_json::to_value(schema) {
        Ok(Value::Object(object)) => object,
        _ => Map::new(),
    };
    object.remove("$schema");
    object.remove("title");
    object
        .entry("type")
        .or_insert_with(|| Value::String("object".to_string()));
    object
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    object
}

/// Tool definition whose input schema is derived from `T`.
pub fn tool<T: JsonSchema>(name: &str, description: &str) -> Tool {
    Tool::new(
        name.to_string(),
        description.to_string(),
        Arc::new(input_schema::<T>()),
    )
}
