use super::types::{
    DataType, NodeCategory, NodeDefinition, ParameterDefinition, PortDefinition,
};
use serde_json::json;

const COMPARISON_OPERATORS: &[&str] = &[">", "<", ">=", "<=", "==", "!="];
const RISK_LEVELS: &[&str] = &["low", "medium", "high"];
const ALERT_LEVELS: &[&str] = &["info", "warning", "critical"];

/// Declares indicator kinds. They all consume a price series and emit one value.
macro_rules! define_indicators {
    ( $( ($id:expr, $desc:expr, $period:expr) ),* $(,)? ) => {
        fn indicator_definitions() -> Vec<NodeDefinition> {
            vec![
                $(
                    NodeDefinition::new($id, NodeCategory::Indicator, $desc)
                        .with_port(PortDefinition::input("price", DataType::Price, true))
                        .with_port(PortDefinition::output("value", DataType::IndicatorValue))
                        .with_parameter(
                            ParameterDefinition::integer("period")
                                .default_value(json!($period))
                                .bounds(1.0, 500.0),
                        ),
                )*
            ]
        }
    };
}

/// Declares order-producing actions. They share a trigger input, a signal output
/// and sizing parameters.
macro_rules! define_order_actions {
    ( $( ($id:expr, $desc:expr) ),* $(,)? ) => {
        fn order_action_definitions() -> Vec<NodeDefinition> {
            vec![
                $(
                    NodeDefinition::new($id, NodeCategory::Action, $desc)
                        .with_port(PortDefinition::input("trigger", DataType::Boolean, true))
                        .with_port(PortDefinition::output("signal", DataType::Signal))
                        .with_parameter(
                            ParameterDefinition::number("size")
                                .required()
                                .default_value(json!(100.0))
                                .min(0.0),
                        )
                        .with_parameter(
                            ParameterDefinition::number("confidence")
                                .default_value(json!(1.0))
                                .bounds(0.0, 1.0),
                        )
                        .with_parameter(
                            ParameterDefinition::string("risk_level")
                                .default_value(json!("medium"))
                                .one_of(RISK_LEVELS),
                        ),
                )*
            ]
        }
    };
}

define_indicators! {
    ("sma", "Simple moving average of price", 20),
    ("ema", "Exponential moving average of price", 20),
    ("rsi", "Relative strength index", 14),
    ("macd", "Moving average convergence divergence line", 26),
    ("atr", "Average true range", 14),
}

define_order_actions! {
    ("buy_signal", "Emit a buy signal when triggered"),
    ("sell_signal", "Emit a sell signal when triggered"),
}

fn data_source_definitions() -> Vec<NodeDefinition> {
    vec![
        NodeDefinition::new(
            "price_source",
            NodeCategory::DataSource,
            "Latest traded price for a symbol",
        )
        .with_port(PortDefinition::output("price", DataType::Price))
        .with_parameter(ParameterDefinition::string("symbol")),
        NodeDefinition::new(
            "volume_source",
            NodeCategory::DataSource,
            "Latest traded volume for a symbol",
        )
        .with_port(PortDefinition::output("volume", DataType::Volume))
        .with_parameter(ParameterDefinition::string("symbol")),
    ]
}

fn condition_definitions() -> Vec<NodeDefinition> {
    vec![
        NodeDefinition::new(
            "threshold_condition",
            NodeCategory::Condition,
            "Compare a value against a fixed threshold",
        )
        .with_port(PortDefinition::input("value", DataType::IndicatorValue, true))
        .with_port(PortDefinition::output("result", DataType::Boolean))
        .with_parameter(
            ParameterDefinition::string("operator")
                .required()
                .default_value(json!(">"))
                .one_of(COMPARISON_OPERATORS),
        )
        .with_parameter(ParameterDefinition::number("threshold").required()),
        NodeDefinition::new(
            "range_condition",
            NodeCategory::Condition,
            "True while a value stays inside [lower, upper]",
        )
        .with_port(PortDefinition::input("value", DataType::IndicatorValue, true))
        .with_port(PortDefinition::output("result", DataType::Boolean))
        .with_parameter(ParameterDefinition::number("lower").required())
        .with_parameter(ParameterDefinition::number("upper").required()),
        NodeDefinition::new(
            "duration_condition",
            NodeCategory::Condition,
            "True once its input has held continuously for a duration",
        )
        .with_port(PortDefinition::input("condition", DataType::Boolean, true))
        .with_port(PortDefinition::output("result", DataType::Boolean))
        .with_parameter(
            ParameterDefinition::number("duration_seconds")
                .required()
                .default_value(json!(60.0))
                .bounds(0.0, 86_400.0),
        )
        .with_parameter(ParameterDefinition::boolean("reset_on_false").default_value(json!(true))),
        NodeDefinition::new(
            "sequence_condition",
            NodeCategory::Condition,
            "True once enough events arrive with bounded gaps between them",
        )
        .with_port(PortDefinition::input("event", DataType::Boolean, true))
        .with_port(PortDefinition::output("result", DataType::Boolean))
        .with_parameter(
            ParameterDefinition::integer("required_events")
                .default_value(json!(3))
                .bounds(1.0, 1_000.0),
        )
        .with_parameter(
            ParameterDefinition::number("max_gap_seconds")
                .default_value(json!(300.0))
                .bounds(0.0, 86_400.0),
        ),
    ]
}

fn composition_definitions() -> Vec<NodeDefinition> {
    vec![
        NodeDefinition::new(
            "and_gate",
            NodeCategory::Composition,
            "True when every connected input is true",
        )
        .with_port(PortDefinition::input("inputs", DataType::Boolean, true))
        .with_port(PortDefinition::output("result", DataType::Boolean)),
        NodeDefinition::new(
            "or_gate",
            NodeCategory::Composition,
            "True when any connected input is true",
        )
        .with_port(PortDefinition::input("inputs", DataType::Boolean, true))
        .with_port(PortDefinition::output("result", DataType::Boolean)),
        NodeDefinition::new(
            "weighted_gate",
            NodeCategory::Composition,
            "True when the weighted share of true inputs reaches a threshold",
        )
        .with_port(PortDefinition::input("inputs", DataType::Boolean, true))
        .with_port(PortDefinition::output("result", DataType::Boolean))
        .with_parameter(ParameterDefinition::number_list("weights"))
        .with_parameter(
            ParameterDefinition::number("threshold")
                .default_value(json!(0.5))
                .bounds(0.0, 1.0),
        ),
    ]
}

fn other_action_definitions() -> Vec<NodeDefinition> {
    vec![
        NodeDefinition::new(
            "close_position",
            NodeCategory::Action,
            "Emit a signal to flatten the open position",
        )
        .with_port(PortDefinition::input("trigger", DataType::Boolean, true))
        .with_port(PortDefinition::output("signal", DataType::Signal))
        .with_parameter(
            ParameterDefinition::number("confidence")
                .default_value(json!(1.0))
                .bounds(0.0, 1.0),
        ),
        NodeDefinition::new(
            "alert_action",
            NodeCategory::Action,
            "Emit a notification without trading",
        )
        .with_port(PortDefinition::input("trigger", DataType::Boolean, false))
        .with_port(PortDefinition::output("signal", DataType::Signal))
        .with_parameter(ParameterDefinition::string("message").default_value(json!("Alert")))
        .with_parameter(
            ParameterDefinition::string("level")
                .default_value(json!("info"))
                .one_of(ALERT_LEVELS),
        ),
        NodeDefinition::new(
            "emergency_exit",
            NodeCategory::Action,
            "Close everything immediately when triggered",
        )
        .with_port(PortDefinition::input("trigger", DataType::Boolean, true))
        .with_port(PortDefinition::output("signal", DataType::Signal)),
    ]
}

/// Every built-in node kind, in catalog order.
pub(super) fn builtin_definitions() -> Vec<NodeDefinition> {
    let mut definitions = data_source_definitions();
    definitions.extend(indicator_definitions());
    definitions.extend(condition_definitions());
    definitions.extend(composition_definitions());
    definitions.extend(order_action_definitions());
    definitions.extend(other_action_definitions());
    definitions
}
