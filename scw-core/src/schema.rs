//! Schema - Define type schemas for resources
//!
//! Providers define a schema for each resource type. Declared configuration is
//! validated against it before any remote call, and the differ reads the
//! per-attribute `force_new` and `diff_suppress` properties from it.

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
    /// Map
    Map(Box<AttributeType>),
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

            (AttributeType::List(inner), Value::List(items)) => {
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

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
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
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
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

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Equality override for an attribute whose remote form may differ from the
/// declared form without being a change
pub type DiffSuppressFn = fn(desired: &Value, current: &Value) -> bool;

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the remote API only
    pub computed: bool,
    /// Changing this attribute replaces the resource
    pub force_new: bool,
    /// Sent on create, never read back (e.g., passwords); never diffed
    pub write_only: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub diff_suppress: Option<DiffSuppressFn>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            write_only: false,
            default: None,
            description: None,
            diff_suppress: None,
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

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_diff_suppress(mut self, suppress: DiffSuppressFn) -> Self {
        self.diff_suppress = Some(suppress);
        self
    }

    /// Whether `desired` and `current` count as the same value
    pub fn values_equal(&self, desired: &Value, current: &Value) -> bool {
        desired == current || self.diff_suppress.is_some_and(|suppress| suppress(desired, current))
    }
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

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    /// Names of the attributes whose change forces replacement, sorted
    pub fn force_new_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn is_force_new(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.force_new)
    }

    /// Validate declared resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        for (name, value) in attributes {
            match self.attributes.get(name) {
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
                Some(schema) if schema.computed => {
                    errors.push(TypeError::ComputedAttribute { name: name.clone() })
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(TypeError::AttributeError {
                            name: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            errors.sort_by_key(|e| e.to_string());
            Err(errors)
        }
    }

    /// Declared attributes with schema defaults filled in
    pub fn with_defaults(&self, attributes: &HashMap<String, Value>) -> HashMap<String, Value> {
        let mut merged = attributes.clone();
        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default {
                merged.entry(name.clone()).or_insert_with(|| default.clone());
            }
        }
        merged
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    fn custom(
        name: &str,
        base: AttributeType,
        validate: fn(&Value) -> Result<(), String>,
    ) -> AttributeType {
        AttributeType::Custom {
            name: name.to_string(),
            base: Box::new(base),
            validate,
        }
    }

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        custom("PositiveInt", AttributeType::Int, |value| match value {
            Value::Int(n) if *n > 0 => Ok(()),
            Value::Int(_) => Err("Value must be positive".to_string()),
            _ => Err("Expected integer".to_string()),
        })
    }

    /// TCP/UDP port number
    pub fn port() -> AttributeType {
        custom("Port", AttributeType::Int, |value| match value {
            Value::Int(n) if (1..=65535).contains(n) => Ok(()),
            _ => Err("Port must be between 1 and 65535".to_string()),
        })
    }

    /// IPv4 CIDR block (e.g., "10.0.0.0/16")
    pub fn cidr() -> AttributeType {
        custom("Cidr", AttributeType::String, |value| {
            with_str(value, validate_cidr)
        })
    }

    /// Bare IP address or CIDR block, v4 or v6
    pub fn ip_or_cidr() -> AttributeType {
        custom("IpOrCidr", AttributeType::String, |value| {
            with_str(value, validate_ip_or_cidr)
        })
    }

    /// Zone name (e.g., "fr-par-1")
    pub fn zone() -> AttributeType {
        custom("Zone", AttributeType::String, |value| {
            with_str(value, |s| {
                crate::locality::Zone::parse(s)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
        })
    }

    /// Region name (e.g., "fr-par")
    pub fn region() -> AttributeType {
        custom("Region", AttributeType::String, |value| {
            with_str(value, |s| {
                crate::locality::Region::parse(s)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
        })
    }

    /// UUID
    pub fn uuid() -> AttributeType {
        custom("Uuid", AttributeType::String, |value| {
            with_str(value, validate_uuid)
        })
    }

    /// UUID, optionally prefixed by a zone or region (`fr-par-1/uuid`)
    pub fn uuid_or_localized_uuid() -> AttributeType {
        custom("UuidOrLocalizedUuid", AttributeType::String, |value| {
            with_str(value, |s| {
                validate_uuid(crate::identifier::expand_id(s))
            })
        })
    }

    /// List of strings
    pub fn string_list() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::String))
    }

    fn with_str(value: &Value, check: fn(&str) -> Result<(), String>) -> Result<(), String> {
        match value {
            Value::String(s) => check(s),
            _ => Err("Expected string".to_string()),
        }
    }
}

/// Common diff suppressions
pub mod suppress {
    use super::*;
    use crate::identifier::same_id_ignoring_locality;

    /// Treat `fr-par-1/uuid` and `uuid` as the same reference
    pub fn ignore_locality(desired: &Value, current: &Value) -> bool {
        match (desired, current) {
            (Value::String(a), Value::String(b)) => same_id_ignoring_locality(a, b),
            _ => false,
        }
    }

    pub fn ignore_case(desired: &Value, current: &Value) -> bool {
        match (desired, current) {
            (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

/// Validate IPv4 CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    let (ip, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| format!("Invalid CIDR format '{}': expected IP/prefix", cidr))?;

    ip.parse::<std::net::Ipv4Addr>()
        .map_err(|_| format!("Invalid IPv4 address '{}'", ip))?;

    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => Ok(()),
        Ok(p) => Err(format!("Invalid prefix length '{}': must be 0-32", p)),
        Err(_) => Err(format!(
            "Invalid prefix length '{}': must be a number",
            prefix
        )),
    }
}

/// Validate a standalone IP address or a CIDR block, v4 or v6
pub fn validate_ip_or_cidr(value: &str) -> Result<(), String> {
    let (ip, prefix) = match value.split_once('/') {
        Some((ip, prefix)) => (ip, Some(prefix)),
        None => (value, None),
    };
    let addr: std::net::IpAddr = ip
        .parse()
        .map_err(|_| format!("Invalid IP address '{}'", ip))?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    match prefix.map(str::parse::<u8>) {
        None => Ok(()),
        Some(Ok(p)) if p <= max => Ok(()),
        Some(_) => Err(format!("Invalid prefix length in '{}': must be 0-{}", value, max)),
    }
}

/// Validate a UUID in its canonical hyphenated form
pub fn validate_uuid(value: &str) -> Result<(), String> {
    match uuid::Uuid::try_parse(value) {
        Ok(_) if value.len() == 36 => Ok(()),
        _ => Err(format!("'{}' is not a valid UUID", value)),
    }
}
