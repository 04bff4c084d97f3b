//! Tool descriptor → function-call schema normalization.
//!
//! Servers describe their tools in slightly different shapes (`inputSchema`, `parameters`, or some
//! ad-hoc schema-ish attribute). Every shape is reduced to one function-call schema whose
//! parameters always declare a required `server_credentials` object.

use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Name of the injected credentials parameter. Renaming it breaks downstream clients.
pub const CREDENTIALS_FIELD: &str = "server_credentials";

const CREDENTIALS_DESCRIPTION: &str = "Server credentials (automatically provided)";

/// A tool as reported by a server, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: Option<String>,
    /// MCP `inputSchema`.
    pub input_schema: Option<Value>,
    /// Function-calling style `parameters`.
    pub parameters: Option<Value>,
    /// Every other field the server sent.
    pub attributes: Map<String, Value>,
}

/// Where a descriptor's base schema comes from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DescriptorShape<'a> {
    InputSchema(&'a Map<String, Value>),
    Parameters(&'a Map<String, Value>),
    /// Last resort: an attribute whose key mentions "schema" or "param" and whose value looks like
    /// an object schema (has `properties`).
    RawAttributes {
        key: &'a str,
        schema: &'a Map<String, Value>,
    },
    Unknown,
}

impl ToolDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Build a descriptor from a tool's JSON form.
    ///
    /// Only `name` is mandatory; fields of an unexpected type are kept as raw attributes or
    /// ignored, never rejected.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Upstream`] if the value is not an object or has no string `name`.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(HubError::Upstream(
                "tool descriptor is not a JSON object".to_string(),
            ));
        };

        let name = match fields.remove("name") {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => {
                return Err(HubError::Upstream(
                    "tool descriptor has no name".to_string(),
                ));
            }
        };

        let description = match fields.remove("description") {
            Some(Value::String(d)) => Some(d),
            _ => None,
        };
        let input_schema = fields
            .remove("inputSchema")
            .or_else(|| fields.remove("input_schema"));
        let parameters = fields.remove("parameters");

        Ok(Self {
            name,
            description,
            input_schema,
            parameters,
            attributes: fields,
        })
    }

    /// Classify the descriptor. Empty or non-object schemas do not count as present.
    ///
    /// The attribute scan takes the first matching key in `serde_json::Map` order, which is sorted
    /// by key, not the order the server sent them in.
    #[must_use]
    pub fn shape(&self) -> DescriptorShape<'_> {
        if let Some(schema) = non_empty_object(self.input_schema.as_ref()) {
            return DescriptorShape::InputSchema(schema);
        }
        if let Some(schema) = non_empty_object(self.parameters.as_ref()) {
            return DescriptorShape::Parameters(schema);
        }

        self.attributes
            .iter()
            .find_map(|(key, value)| {
                let lowered = key.to_ascii_lowercase();
                if !lowered.contains("schema") && !lowered.contains("param") {
                    return None;
                }
                let schema = value.as_object()?;
                schema
                    .contains_key("properties")
                    .then_some(DescriptorShape::RawAttributes {
                        key: key.as_str(),
                        schema,
                    })
            })
            .unwrap_or(DescriptorShape::Unknown)
    }
}

fn non_empty_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value
        .and_then(Value::as_object)
        .filter(|schema| !schema.is_empty())
}

/// The normalized, downstream-facing tool schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTool {
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Map<String, Value>,
}

#[cfg(test)]
impl NormalizedTool {
    /// True when the parameters carry the credentials property and required entry.
    pub(crate) fn declares_credentials(&self) -> bool {
        let params = &self.function.parameters;
        let has_property = params
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(|p| p.contains_key(CREDENTIALS_FIELD));
        let is_required = params
            .get("required")
            .and_then(Value::as_array)
            .is_some_and(|r| r.iter().any(|v| v == CREDENTIALS_FIELD));
        has_property && is_required
    }
}

/// Normalize one descriptor. Never fails: unusable schemas fall back to an empty object schema.
#[must_use]
pub fn normalize(descriptor: &ToolDescriptor) -> NormalizedTool {
    let base = match descriptor.shape() {
        DescriptorShape::InputSchema(schema)
        | DescriptorShape::Parameters(schema)
        | DescriptorShape::RawAttributes { schema, .. } => schema.clone(),
        DescriptorShape::Unknown => empty_object_schema(),
    };

    let description = descriptor
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map_or_else(|| format!("Tool for {}", descriptor.name), str::to_string);

    NormalizedTool {
        kind: ToolKind::Function,
        function: FunctionSpec {
            name: descriptor.name.clone(),
            description,
            parameters: with_credentials(&base),
        },
    }
}

/// Return a copy of `schema` that declares `server_credentials` as a required object property.
///
/// Idempotent: applying it to its own output yields the same map.
#[must_use]
pub fn with_credentials(schema: &Map<String, Value>) -> Map<String, Value> {
    let mut out = schema.clone();

    let properties = out
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if !properties.is_object() {
        *properties = Value::Object(Map::new());
    }
    if let Value::Object(props) = properties {
        props
            .entry(CREDENTIALS_FIELD)
            .or_insert_with(|| json!({ "type": "object", "description": CREDENTIALS_DESCRIPTION }));
    }

    let required = out
        .entry("required")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !required.is_array() {
        *required = Value::Array(Vec::new());
    }
    if let Value::Array(req) = required
        && !req.iter().any(|v| v == CREDENTIALS_FIELD)
    {
        req.push(Value::String(CREDENTIALS_FIELD.to_string()));
    }

    out
}

fn empty_object_schema() -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), json!({}));
    schema.insert("required".to_string(), json!([]));
    schema
}
