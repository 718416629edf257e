use serde::{Deserialize, Serialize};
use std::fmt;

/// The role a node plays in a strategy graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    DataSource,
    Indicator,
    Condition,
    Composition,
    Action,
}

/// The type of value carried over a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Price,
    Volume,
    IndicatorValue,
    Boolean,
    Signal,
}

/// Distinct port types that may still be wired together.
const COERCIONS: &[(DataType, DataType)] = &[
    (DataType::Price, DataType::IndicatorValue),
    (DataType::IndicatorValue, DataType::Price),
    (DataType::Volume, DataType::IndicatorValue),
    (DataType::IndicatorValue, DataType::Volume),
];

impl DataType {
    /// Whether an output of `self` may feed an input of type `target`.
    pub fn can_connect_to(self, target: DataType) -> bool {
        self == target || COERCIONS.contains(&(self, target))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Price => "price",
            DataType::Volume => "volume",
            DataType::IndicatorValue => "indicator_value",
            DataType::Boolean => "boolean",
            DataType::Signal => "signal",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

/// A typed connection point declared by a node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDefinition {
    pub name: &'static str,
    pub data_type: DataType,
    pub direction: PortDirection,
    pub required: bool,
}

impl PortDefinition {
    pub fn input(name: &'static str, data_type: DataType, required: bool) -> Self {
        Self {
            name,
            data_type,
            direction: PortDirection::Input,
            required,
        }
    }

    pub fn output(name: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            direction: PortDirection::Output,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    Number,
    Integer,
    Boolean,
    String,
    NumberList,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterType::Number => "number",
            ParameterType::Integer => "integer",
            ParameterType::Boolean => "boolean",
            ParameterType::String => "string",
            ParameterType::NumberList => "list of numbers",
        };
        write!(f, "{}", name)
    }
}

/// The schema of a single configurable parameter on a node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub name: &'static str,
    pub param_type: ParameterType,
    pub default: Option<serde_json::Value>,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Allowed values for string parameters. Empty means unrestricted.
    pub allowed: &'static [&'static str],
}

impl ParameterDefinition {
    fn new(name: &'static str, param_type: ParameterType) -> Self {
        Self {
            name,
            param_type,
            default: None,
            required: false,
            min: None,
            max: None,
            allowed: &[],
        }
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, ParameterType::Number)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, ParameterType::Integer)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, ParameterType::Boolean)
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, ParameterType::String)
    }

    pub fn number_list(name: &'static str) -> Self {
        Self::new(name, ParameterType::NumberList)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }
}

/// A node kind in the catalog: its category, ports and parameter schema.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefinition {
    pub id: &'static str,
    pub category: NodeCategory,
    pub description: &'static str,
    pub ports: Vec<PortDefinition>,
    pub parameters: Vec<ParameterDefinition>,
}

impl NodeDefinition {
    pub fn new(id: &'static str, category: NodeCategory, description: &'static str) -> Self {
        Self {
            id,
            category,
            description,
            ports: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn with_port(mut self, port: PortDefinition) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn inputs(&self) -> impl Iterator<Item = &PortDefinition> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &PortDefinition> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
    }

    pub fn port(&self, name: &str, direction: PortDirection) -> Option<&PortDefinition> {
        self.ports
            .iter()
            .find(|p| p.name == name && p.direction == direction)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }
}
