#![allow(dead_code)]

use ruleform::domain::catalog::IndicatorCatalog;
use ruleform::domain::config::RuleformConfig;
use ruleform::domain::rule::{
    Combinator, Comparator, Condition, ConditionSet, Indicator, Operand, Operation, Operator,
    Params, SafeNumber, Strategy,
};
use serde_json::{Value, json};
use std::io::Write;

pub const CATALOG_INI: &str = r#"
[limits]
max_depth = 8

[validation]
allow_unknown_fields = false

[indicators]
SMA = period
EMA = period
RSI = period
BBANDS = period, stddev
OBV =
"#;

pub fn num(value: f64) -> SafeNumber {
    SafeNumber::new(value).unwrap()
}

pub fn indicator(name: &str, params: &[(&str, f64)]) -> Indicator {
    Indicator {
        name: name.to_string(),
        params: if params.is_empty() {
            None
        } else {
            Some(
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), num(*v)))
                    .collect::<Params>(),
            )
        },
    }
}

pub fn indicator_leaf(ind: Indicator, comparator: Comparator, value: Operand) -> Condition {
    Condition::Indicator {
        indicator: ind,
        comparator,
        value,
    }
}

pub fn operation_leaf(
    left: Operand,
    operator: Operator,
    right: Operand,
    comparator: Comparator,
    value: Operand,
) -> Condition {
    Condition::Operation {
        operation: Operation {
            left,
            right,
            operator,
        },
        comparator,
        value,
    }
}

pub fn entry_only(combinator: Combinator, conditions: Vec<Condition>) -> Strategy {
    Strategy {
        entry_conditions: Some(ConditionSet {
            combinator,
            conditions,
        }),
        exit_conditions: None,
    }
}

/// Canonical SMA(14) > 30 leaf.
pub fn sma_above_30() -> Value {
    json!({
        "indicator": {"name": "SMA", "params": {"period": 14}},
        "comparator": ">",
        "value": 30
    })
}

/// UI-shaped RSI(period) < threshold row, with authoring bookkeeping.
pub fn ui_rsi_row(id: &str, period: &str, threshold: &str) -> Value {
    json!({
        "id": id,
        "type": "indicator",
        "operation": {"left": {"valueType": "number", "value": ""}},
        "indicator": {"name": "RSI", "params": {"period": period}},
        "comparator": "<",
        "value": {"valueType": "number", "value": threshold}
    })
}

pub fn catalog() -> IndicatorCatalog {
    IndicatorCatalog::new()
        .with_indicator("SMA", ["period"])
        .with_indicator("EMA", ["period"])
        .with_indicator("RSI", ["period"])
        .with_indicator("BBANDS", ["period", "stddev"])
        .with_indicator("OBV", Vec::<String>::new())
}

pub fn catalog_config() -> RuleformConfig {
    RuleformConfig::default().with_catalog(catalog())
}

pub fn write_temp_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
