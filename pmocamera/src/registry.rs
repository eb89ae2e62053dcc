//! Capability registry: the camera's declared command set
//!
//! `getMethodTypes` returns one entry per declared method:
//!
//! ```json
//! ["actTakePicture", [], ["string*"], "1.0"]
//! ["setShootMode", ["string"], ["int"], "1.0"]
//! ```
//!
//! i.e. name, parameter type tags, return type tags and (optionally) the
//! method version. The registry is built once per connection and never
//! mutated afterwards; [`available_now`] is the live view of what the camera
//! accepts in its current mode and is never cached.

use crate::error::{CameraError, Result};
use crate::rpc::RpcChannel;
use crate::{GET_AVAILABLE_API, GET_METHOD_TYPES};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Primitive type tag of a declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Double,
    String,
    Bool,
    Int,
    /// Any tag without a predicate (`string*`, `JSON*`, ...); always passes
    Untyped(std::string::String),
}

impl TypeTag {
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "double" => Self::Double,
            "string" => Self::String,
            "bool" => Self::Bool,
            "int" => Self::Int,
            other => Self::Untyped(other.to_string()),
        }
    }

    /// Does `value` satisfy this tag?
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Double => value.is_number(),
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Int => {
                value.is_i64()
                    || value.is_u64()
                    || value
                        .as_f64()
                        .is_some_and(|f| f.is_finite() && f.fract() == 0.0)
            }
            Self::Untyped(_) => true,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double => f.write_str("double"),
            Self::String => f.write_str("string"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Untyped(raw) if raw.is_empty() => f.write_str("untyped"),
            Self::Untyped(raw) => f.write_str(raw),
        }
    }
}

/// Signature of one declared method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub parameter_types: Vec<TypeTag>,
    pub return_types: Vec<String>,
    pub version: Option<String>,
}

impl MethodDescriptor {
    /// First declared return tag
    pub fn return_type(&self) -> Option<&str> {
        self.return_types.first().map(String::as_str)
    }

    /// `name(param,...) -> returns`
    pub fn signature(&self) -> String {
        let params = self
            .parameter_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({}) -> {}", self.name, params, self.return_types.join(","))
    }

    fn from_entry(entry: &Value) -> Result<Self> {
        let fields = entry
            .as_array()
            .ok_or_else(|| CameraError::Capability(format!("entry is not a list: {}", entry)))?;

        let name = fields
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| CameraError::Capability(format!("entry without a name: {}", entry)))?;

        let parameter_types = tags(fields.get(1), entry)?
            .iter()
            .map(|tag| TypeTag::parse(tag))
            .collect();

        Ok(Self {
            name: name.to_string(),
            parameter_types,
            return_types: tags(fields.get(2), entry)?,
            version: fields.get(3).and_then(Value::as_str).map(str::to_string),
        })
    }
}

/// A list of tags, a single tag or nothing
fn tags(value: Option<&Value>, entry: &Value) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(tag)) => Ok(vec![tag.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    CameraError::Capability(format!("type tag is not a string in {}", entry))
                })
            })
            .collect(),
        Some(_) => Err(CameraError::Capability(format!(
            "unexpected type list in {}",
            entry
        ))),
    }
}

/// Declared methods, indexed by name, in declaration order
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    methods: Vec<MethodDescriptor>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    /// Query `getMethodTypes` and build the registry
    pub async fn build(channel: &RpcChannel, api_version: &str) -> Result<Self> {
        let payload = channel
            .call(GET_METHOD_TYPES, &[Value::from(api_version)])
            .await?;
        let registry = Self::from_method_types(&payload)?;
        debug!("Capability registry built with {} methods", registry.len());
        Ok(registry)
    }

    /// Build from a `getMethodTypes` payload. The first declaration of a
    /// name wins.
    pub fn from_method_types(payload: &Value) -> Result<Self> {
        let entries = payload.as_array().ok_or_else(|| {
            CameraError::Capability(format!("method list is not a list: {}", payload))
        })?;

        let mut registry = Self::default();
        for entry in entries {
            let descriptor = MethodDescriptor::from_entry(entry)?;
            if registry.index.contains_key(&descriptor.name) {
                debug!(
                    "Ignoring duplicate declaration of {} (version {:?})",
                    descriptor.name, descriptor.version
                );
                continue;
            }
            registry
                .index
                .insert(descriptor.name.clone(), registry.methods.len());
            registry.methods.push(descriptor);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&MethodDescriptor> {
        self.index.get(name).map(|&i| &self.methods[i])
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Human-readable API listing, one signature per method
    pub fn signatures(&self) -> Vec<String> {
        self.methods.iter().map(MethodDescriptor::signature).collect()
    }
}

/// Methods the camera accepts right now (`getAvailableApiList`).
pub async fn available_now(channel: &RpcChannel) -> Result<HashSet<String>> {
    let payload = channel.call(GET_AVAILABLE_API, &[]).await?;
    parse_available(&payload).ok_or_else(|| {
        CameraError::rpc_protocol(GET_AVAILABLE_API, format!("unexpected payload {}", payload))
    })
}

/// Accepts `[[names...]]` (what cameras send) and `[names...]`
pub fn parse_available(payload: &Value) -> Option<HashSet<String>> {
    let items = payload.as_array()?;
    let names = match items.first() {
        Some(Value::Array(inner)) => inner,
        _ => items,
    };
    names
        .iter()
        .map(|name| name.as_str().map(str::to_string))
        .collect()
}
