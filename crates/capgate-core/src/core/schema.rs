// crates/capgate-core/src/core/schema.rs
// ============================================================================
// Module: Parameter Schemas
// Description: Flat and discriminated parameter schemas for operations.
// Purpose: Make action extraction and branch removal exhaustive matches.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Operation parameters are described either by a flat object schema or by a
//! tagged union of object branches that share a discriminator field
//! (conventionally `action`). Transformations only ever remove branches or
//! fields; surviving branches keep their exact validation semantics.
//! Schemas render to JSON Schema (draft 2020-12) for listing and validation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::identifiers::ActionName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Conventional discriminator field for multi-action operations.
pub const DEFAULT_DISCRIMINATOR: &str = "action";

// ============================================================================
// SECTION: Object Schema
// ============================================================================

/// Single named parameter of an object schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamField {
    /// Parameter name.
    pub name: String,
    /// JSON Schema fragment for the parameter value.
    pub schema: Value,
    /// Whether the parameter is required.
    #[serde(default)]
    pub required: bool,
}

impl ParamField {
    /// Builds a required parameter.
    #[must_use]
    pub fn required(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            required: true,
        }
    }

    /// Builds an optional parameter.
    #[must_use]
    pub fn optional(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            required: false,
        }
    }
}

/// Closed object schema made of named parameters.
///
/// # Invariants
/// - Field names are unique; rendering emits `additionalProperties: false`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// Optional schema-level description.
    #[serde(default)]
    pub description: Option<String>,
    /// Declared parameters in declaration order.
    #[serde(default)]
    pub fields: Vec<ParamField>,
}

impl ObjectSchema {
    /// Builds an object schema from fields.
    #[must_use]
    pub const fn new(fields: Vec<ParamField>) -> Self {
        Self {
            description: None,
            fields,
        }
    }

    /// Returns true when a field with the given name is declared.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }

    /// Returns a copy without the named field.
    #[must_use]
    pub fn without_field(&self, name: &str) -> Self {
        Self {
            description: self.description.clone(),
            fields: self.fields.iter().filter(|field| field.name != name).cloned().collect(),
        }
    }

    /// Renders the object as JSON Schema.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        self.render(None)
    }

    /// Renders the object, optionally pinning a discriminator literal first.
    fn render(&self, discriminator: Option<(&str, &ActionName)>) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        if let Some((field, literal)) = discriminator {
            properties.insert(field.to_string(), json!({ "type": "string", "const": literal }));
            required.push(Value::String(field.to_string()));
        }
        for field in &self.fields {
            properties.insert(field.name.clone(), field.schema.clone());
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        if let Some(description) = &self.description {
            schema.insert("description".to_string(), Value::String(description.clone()));
        }
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        schema.insert("additionalProperties".to_string(), Value::Bool(false));
        Value::Object(schema)
    }
}

// ============================================================================
// SECTION: Parameter Schema
// ============================================================================

/// One branch of a discriminated schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaBranch {
    /// Discriminator literal selecting this branch.
    pub action: ActionName,
    /// Branch body (excluding the discriminator field).
    pub body: ObjectSchema,
}

impl SchemaBranch {
    /// Builds a branch.
    #[must_use]
    pub fn new(action: impl Into<ActionName>, body: ObjectSchema) -> Self {
        Self {
            action: action.into(),
            body,
        }
    }
}

/// Parameter schema of an operation.
///
/// # Invariants
/// - Discriminated branches have unique action literals.
/// - Flat schemas carry no actions and are never subject to action denial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamSchema {
    /// Single object schema.
    Flat(ObjectSchema),
    /// Tagged union of branches sharing a discriminator field.
    Discriminated {
        /// Discriminator field name.
        field: String,
        /// Branches in declaration order.
        branches: Vec<SchemaBranch>,
    },
}

impl ParamSchema {
    /// Builds a discriminated schema keyed by the conventional `action` field.
    #[must_use]
    pub fn actions(branches: Vec<SchemaBranch>) -> Self {
        Self::Discriminated {
            field: DEFAULT_DISCRIMINATOR.to_string(),
            branches,
        }
    }

    /// Returns the discriminator field for discriminated schemas.
    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        match self {
            Self::Flat(_) => None,
            Self::Discriminated {
                field, ..
            } => Some(field.as_str()),
        }
    }

    /// Returns the action literals present in the schema (empty when flat).
    #[must_use]
    pub fn action_names(&self) -> Vec<&ActionName> {
        match self {
            Self::Flat(_) => Vec::new(),
            Self::Discriminated {
                branches, ..
            } => branches.iter().map(|branch| &branch.action).collect(),
        }
    }

    /// Returns true when the schema declares the given action.
    #[must_use]
    pub fn has_action(&self, action: &str) -> bool {
        self.action_names().iter().any(|name| name.as_str() == action)
    }

    /// Returns a copy keeping only branches accepted by `keep`.
    ///
    /// Flat schemas are returned unchanged.
    #[must_use]
    pub fn retain_actions(&self, keep: impl Fn(&ActionName) -> bool) -> Self {
        match self {
            Self::Flat(object) => Self::Flat(object.clone()),
            Self::Discriminated {
                field,
                branches,
            } => Self::Discriminated {
                field: field.clone(),
                branches: branches.iter().filter(|branch| keep(&branch.action)).cloned().collect(),
            },
        }
    }

    /// Returns true when any object in the schema declares the parameter.
    #[must_use]
    pub fn has_parameter(&self, name: &str) -> bool {
        match self {
            Self::Flat(object) => object.has_field(name),
            Self::Discriminated {
                branches, ..
            } => branches.iter().any(|branch| branch.body.has_field(name)),
        }
    }

    /// Returns a copy without the named parameter.
    ///
    /// The discriminator field itself is never removed. When `action` is set
    /// the parameter is removed from that branch only.
    #[must_use]
    pub fn without_parameter(&self, name: &str, action: Option<&ActionName>) -> Self {
        match self {
            Self::Flat(object) => Self::Flat(object.without_field(name)),
            Self::Discriminated {
                field,
                branches,
            } => {
                if field == name {
                    return self.clone();
                }
                let branches = branches
                    .iter()
                    .map(|branch| {
                        if action.is_none_or(|target| *target == branch.action) {
                            SchemaBranch {
                                action: branch.action.clone(),
                                body: branch.body.without_field(name),
                            }
                        } else {
                            branch.clone()
                        }
                    })
                    .collect();
                Self::Discriminated {
                    field: field.clone(),
                    branches,
                }
            }
        }
    }

    /// Renders the schema as JSON Schema.
    ///
    /// Discriminated schemas render as `oneOf` closed branches, each pinning
    /// the discriminator with `const`.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::Flat(object) => object.to_json_schema(),
            Self::Discriminated {
                field,
                branches,
            } => {
                let variants = branches
                    .iter()
                    .map(|branch| branch.body.render(Some((field.as_str(), &branch.action))))
                    .collect::<Vec<_>>();
                json!({
                    "type": "object",
                    "oneOf": variants,
                })
            }
        }
    }
}
