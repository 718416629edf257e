//! Node catalog tests

use serde_json::json;
use std::collections::BTreeMap;
use strategy_graph::catalog::{NodeCatalog, NodeCategory, ParameterType, PortDirection};
use strategy_graph::prelude::*;

#[cfg(test)]
mod catalog_tests {
    use super::*;

    #[test]
    fn test_every_category_is_populated() {
        let catalog = NodeCatalog::global();
        for category in [
            NodeCategory::DataSource,
            NodeCategory::Indicator,
            NodeCategory::Condition,
            NodeCategory::Composition,
            NodeCategory::Action,
        ] {
            assert!(
                !catalog.by_category(category).is_empty(),
                "no definitions for {:?}",
                category
            );
        }
        assert!(catalog.lookup("does_not_exist").is_err());
    }

    #[test]
    fn test_indicator_ports() {
        let sma = NodeCatalog::global().lookup("sma").unwrap();
        let input = sma.port("price", PortDirection::Input).unwrap();
        assert_eq!(input.data_type, DataType::Price);
        assert!(input.required);
        let period = sma.parameter("period").unwrap();
        assert_eq!(period.param_type, ParameterType::Integer);
    }

    #[test]
    fn test_parameter_validation() {
        let catalog = NodeCatalog::global();
        let mut params = BTreeMap::new();
        params.insert("period".to_string(), json!(0));
        let errors = catalog.validate_parameters("rsi", &params);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "period");

        params.insert("period".to_string(), json!(14));
        assert!(catalog.validate_parameters("rsi", &params).is_empty());

        let mut op = BTreeMap::new();
        op.insert("operator".to_string(), json!("=>"));
        op.insert("threshold".to_string(), json!(1));
        let errors = catalog.validate_parameters("threshold_condition", &op);
        assert!(errors.iter().any(|e| e.name == "operator"));
    }

    #[test]
    fn test_port_helpers() {
        let catalog = NodeCatalog::global();
        let inputs = catalog.input_ports("weighted_gate");
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "inputs");
        assert_eq!(catalog.output_ports("price_source")[0].data_type, DataType::Price);
        assert!(catalog.input_ports("price_source").is_empty());
        assert!(catalog.output_ports("nope").is_empty());
    }

    #[test]
    fn test_type_coercions() {
        assert!(DataType::Price.can_connect_to(DataType::IndicatorValue));
        assert!(DataType::IndicatorValue.can_connect_to(DataType::Price));
        assert!(DataType::Volume.can_connect_to(DataType::IndicatorValue));
        assert!(!DataType::Boolean.can_connect_to(DataType::Price));
        assert!(!DataType::Signal.can_connect_to(DataType::Boolean));
    }
}
