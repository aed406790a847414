use serde::Serialize;
use serde_json::{json, Map, Value};
use slack_sage_core::{FieldContract, ToolDescriptor};

/// Wire form of a tool as it appears in a `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListing {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

impl From<&ToolDescriptor> for ToolListing {
    fn from(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name,
            description: descriptor.description,
            input_schema: input_schema(descriptor.input_contract),
        }
    }
}

/// Renders an input contract as a JSON Schema object. `required` keeps
/// contract order.
pub fn input_schema(contract: &[FieldContract]) -> Value {
    let mut properties = Map::new();
    for field in contract {
        properties.insert(
            field.name.to_string(),
            json!({
                "type": field.kind.as_str(),
                "description": field.description
            }),
        );
    }
    let required: Vec<&str> = contract
        .iter()
        .filter(|field| field.required)
        .map(|field| field.name)
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}
