//! The fixed registry of node kinds a strategy graph may use.
//!
//! The catalog is built once per process and is read-only afterwards, so a
//! `&'static NodeCatalog` can be shared freely between compilers, validators
//! and concurrently running sessions.

use crate::error::{CatalogError, ParamError};
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::sync::LazyLock;

mod definitions;
pub mod types;

pub use types::*;

static BUILTIN: LazyLock<NodeCatalog> =
    LazyLock::new(|| NodeCatalog::from_definitions(definitions::builtin_definitions()));

pub struct NodeCatalog {
    definitions: Vec<NodeDefinition>,
    index: AHashMap<&'static str, usize>,
}

impl NodeCatalog {
    /// The process-wide built-in catalog.
    pub fn global() -> &'static NodeCatalog {
        &BUILTIN
    }

    fn from_definitions(definitions: Vec<NodeDefinition>) -> Self {
        let index = definitions
            .iter()
            .enumerate()
            .map(|(i, def)| (def.id, i))
            .collect();
        Self { definitions, index }
    }

    pub fn lookup(&self, node_type: &str) -> Result<&NodeDefinition, CatalogError> {
        self.by_type(node_type)
            .ok_or_else(|| CatalogError::NotFound(node_type.to_string()))
    }

    pub fn by_type(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.index.get(node_type).map(|&i| &self.definitions[i])
    }

    pub fn by_category(&self, category: NodeCategory) -> Vec<&NodeDefinition> {
        self.definitions
            .iter()
            .filter(|def| def.category == category)
            .collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.definitions.iter()
    }

    /// Input ports of `node_type`, empty for unknown types.
    pub fn input_ports(&self, node_type: &str) -> Vec<&PortDefinition> {
        self.by_type(node_type)
            .map(|def| def.inputs().collect())
            .unwrap_or_default()
    }

    /// Output ports of `node_type`, empty for unknown types.
    pub fn output_ports(&self, node_type: &str) -> Vec<&PortDefinition> {
        self.by_type(node_type)
            .map(|def| def.outputs().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Checks a node's parameter map against its kind's schema.
    ///
    /// A missing required parameter is only an error when the schema has no
    /// default to fall back on. Unknown parameters are ignored.
    pub fn validate_parameters(
        &self,
        node_type: &str,
        values: &BTreeMap<String, serde_json::Value>,
    ) -> Vec<ParamError> {
        let Some(definition) = self.by_type(node_type) else {
            return vec![ParamError::new(
                "node_type",
                format!("unknown node type '{}'", node_type),
            )];
        };

        let mut errors = Vec::new();
        for param in &definition.parameters {
            match values.get(param.name) {
                None | Some(serde_json::Value::Null) => {
                    if param.required && param.default.is_none() {
                        errors.push(ParamError::new(param.name, "is required"));
                    }
                }
                Some(value) => {
                    if let Err(e) = check_parameter(param, value) {
                        errors.push(e);
                    }
                }
            }
        }
        errors
    }
}

fn check_parameter(param: &ParameterDefinition, value: &serde_json::Value) -> Result<(), ParamError> {
    let type_error = || {
        ParamError::new(
            param.name,
            format!("expected {}, found {}", param.param_type, value),
        )
    };

    match param.param_type {
        ParameterType::Number => {
            let n = value.as_f64().ok_or_else(type_error)?;
            check_bounds(param, n)
        }
        ParameterType::Integer => {
            let n = value
                .as_i64()
                .map(|i| i as f64)
                .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0))
                .ok_or_else(type_error)?;
            check_bounds(param, n)
        }
        ParameterType::Boolean => value.as_bool().map(|_| ()).ok_or_else(type_error),
        ParameterType::String => {
            let s = value.as_str().ok_or_else(type_error)?;
            if !param.allowed.is_empty() && !param.allowed.contains(&s) {
                return Err(ParamError::new(
                    param.name,
                    format!("'{}' is not one of [{}]", s, param.allowed.join(", ")),
                ));
            }
            Ok(())
        }
        ParameterType::NumberList => {
            let items = value.as_array().ok_or_else(type_error)?;
            if items.iter().all(|v| v.is_number()) {
                Ok(())
            } else {
                Err(type_error())
            }
        }
    }
}

fn check_bounds(param: &ParameterDefinition, n: f64) -> Result<(), ParamError> {
    if let Some(min) = param.min {
        if n < min {
            return Err(ParamError::new(
                param.name,
                format!("{} is below the minimum of {}", n, min),
            ));
        }
    }
    if let Some(max) = param.max {
        if n > max {
            return Err(ParamError::new(
                param.name,
                format!("{} is above the maximum of {}", n, max),
            ));
        }
    }
    Ok(())
}
