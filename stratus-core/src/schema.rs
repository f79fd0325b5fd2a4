//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type,
//! enabling validation of configuration before any API call is made.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Unordered collection; accepts lists as input
    Set(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested object with its own attributes
    Block(Vec<AttributeSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items))
            | (AttributeType::Set(inner), Value::List(items) | Value::Set(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(fields), Value::Map(map)) => {
                let errors = validate_attributes(fields.iter(), map);
                match errors.into_iter().next() {
                    Some(first) => Err(first),
                    None => Ok(()),
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// Rewrite list values into sets wherever this type expects a set
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (AttributeType::Set(inner), Value::List(items) | Value::Set(items)) => {
                Value::Set(items.into_iter().map(|v| inner.coerce(v)).collect())
            }
            (AttributeType::List(inner), Value::List(items)) => {
                Value::List(items.into_iter().map(|v| inner.coerce(v)).collect())
            }
            (AttributeType::Map(inner), Value::Map(map)) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, inner.coerce(v)))
                    .collect(),
            ),
            (AttributeType::Block(fields), Value::Map(map)) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| match fields.iter().find(|f| f.name == k) {
                        Some(field) => {
                            let v = field.attr_type.coerce(v);
                            (k, v)
                        }
                        None => (k, v),
                    })
                    .collect(),
            ),
            (_, v) => v,
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(fields) => {
                let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                format!("Block{{{}}}", names.join(", "))
            }
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}' accepts at most {max} item(s), got {got}")]
    TooManyItems { name: String, max: usize, got: usize },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Set(_) => "Set".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the provider, never by configuration
    pub computed: bool,
    /// Changing the value requires replacing the resource
    pub force_new: bool,
    /// Upper bound on list/set length
    pub max_items: Option<usize>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            max_items: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    fn check(&self, value: &Value) -> Result<(), TypeError> {
        if let (Some(max), Some(items)) = (self.max_items, value.as_items())
            && items.len() > max
        {
            return Err(TypeError::TooManyItems {
                name: self.name.clone(),
                max,
                got: items.len(),
            });
        }
        self.attr_type.validate(value)
    }
}

fn validate_attributes<'a>(
    schemas: impl Iterator<Item = &'a AttributeSchema> + Clone,
    attributes: &HashMap<String, Value>,
) -> Vec<TypeError> {
    let mut errors = Vec::new();

    for schema in schemas.clone() {
        if schema.required && !attributes.contains_key(&schema.name) {
            errors.push(TypeError::MissingRequired {
                name: schema.name.clone(),
            });
        }
    }

    for (name, value) in attributes {
        let Some(schema) = schemas.clone().find(|s| &s.name == name) else {
            errors.push(TypeError::UnknownAttribute { name: name.clone() });
            continue;
        };
        if schema.computed && !schema.required {
            errors.push(TypeError::ComputedAttribute { name: name.clone() });
            continue;
        }
        if let Err(e) = schema.check(value) {
            errors.push(match e {
                e @ TypeError::TooManyItems { .. } => e,
                e => TypeError::AttributeError {
                    name: name.clone(),
                    inner: Box::new(e),
                },
            });
        }
    }

    errors
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let errors = validate_attributes(self.attributes.values(), attributes);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Convert configuration lists into sets where the schema declares sets
    pub fn coerce(&self, attributes: HashMap<String, Value>) -> HashMap<String, Value> {
        attributes
            .into_iter()
            .map(|(name, value)| match self.attributes.get(&name) {
                Some(schema) => {
                    let value = schema.attr_type.coerce(value);
                    (name, value)
                }
                None => (name, value),
            })
            .collect()
    }

    /// Names of attributes whose change forces replacement, sorted
    pub fn force_new_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        names.sort();
        names
    }

    /// Whether the attribute is only ever set by the provider
    pub fn is_computed(&self, name: &str) -> bool {
        self.attributes
            .get(name)
            .is_some_and(|a| a.computed && !a.required)
    }

    /// Attribute names, sorted
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Non-negative integer type
    pub fn non_negative_int() -> AttributeType {
        AttributeType::Custom {
            name: "NonNegativeInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if *n >= 0 => Ok(()),
                Value::Int(_) => Err("Value must not be negative".to_string()),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Enum type from static variant names
    pub fn enumeration(variants: &[&str]) -> AttributeType {
        AttributeType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }
}
