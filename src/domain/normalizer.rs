//! Normalizer from the authoring (UI-shaped) tree to canonical JSON.
//!
//! The authoring form differs from canonical form in three ways:
//! - every condition and condition set carries a `type` discriminant
//! - every operand carries a `valueType` selector (`"number"` / `"indicator"`)
//! - composite children live under a flat `conditions` array
//!
//! Normalization is post-order: children first, then the parent is emitted
//! with only its semantic keys. Blank values (null, empty string, empty array)
//! are omitted at every level and composites left without children are pruned
//! from their parent. Empty objects are kept so the validator can report them.
//!
//! A node without `type` is taken as already canonical: nothing is discarded
//! from it, so canonical input passes through unchanged.

use crate::domain::config::RuleformConfig;
use crate::domain::rule::Combinator;
use crate::domain::validator::{ENTRY_CONDITIONS, EXIT_CONDITIONS};
use crate::domain::violation::{Constraint, NodePath, ViolationReport};
use serde_json::{Map, Number, Value};
use tracing::{debug, trace};

const SIDES: [&str; 2] = [ENTRY_CONDITIONS, EXIT_CONDITIONS];

/// Normalizes a UI-shaped strategy into its canonical form.
///
/// Authoring states that match no variant (unknown `type`, unselected rows,
/// unknown `valueType`) are reported rather than silently dropped.
pub fn normalize(ui: &Value, config: &RuleformConfig) -> Result<Value, ViolationReport> {
    let mut normalizer = Normalizer::new(config);
    let canonical = normalizer.strategy(ui);
    debug!(
        pruned = normalizer.pruned,
        violations = normalizer.report.len(),
        "normalized authoring tree"
    );
    normalizer.report.into_result(canonical)
}

/// The variant an authoring row has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Operation,
    Indicator,
    Composite(Combinator),
}

struct Normalizer<'a> {
    config: &'a RuleformConfig,
    report: ViolationReport,
    pruned: usize,
}

impl<'a> Normalizer<'a> {
    fn new(config: &'a RuleformConfig) -> Self {
        Self {
            config,
            report: ViolationReport::new(),
            pruned: 0,
        }
    }

    fn strategy(&mut self, value: &Value) -> Value {
        let Some(map) = value.as_object() else {
            self.report.push(
                NodePath::root(),
                Constraint::ExpectedObject,
                "Strategy must be a JSON object",
            );
            return value.clone();
        };

        let mut out = Map::new();
        for side in SIDES {
            let Some(set) = map.get(side) else {
                continue;
            };
            if let Some(normalized) = self.condition_set(set, &NodePath::root().key(side)) {
                out.insert(side.to_string(), normalized);
            }
        }
        Value::Object(out)
    }

    fn condition_set(&mut self, value: &Value, path: &NodePath) -> Option<Value> {
        if value.is_null() {
            return None;
        }
        let Some(map) = value.as_object() else {
            self.report.push(
                path.clone(),
                Constraint::ExpectedObject,
                "Condition set must be an object",
            );
            return None;
        };

        let out = match self.discriminant(map, path) {
            Discriminant::Invalid => return None,
            Discriminant::Selected(Selection::Composite(combinator)) => {
                let children = children_of(map, combinator);
                self.composite(combinator, children, path, 1)
            }
            Discriminant::Selected(_) => {
                self.report.push(
                    path.key("type"),
                    Constraint::UnknownDiscriminant,
                    "Condition set type must be 'anything' or 'everything'",
                );
                return None;
            }
            Discriminant::Untyped => {
                if map.contains_key("conditions") {
                    self.report.push(
                        path.key("type"),
                        Constraint::MissingCombinator,
                        "Either 'anything' or 'everything' must be selected",
                    );
                    return None;
                }
                if !Combinator::ALL.iter().any(|c| map.contains_key(c.key())) {
                    self.report.push(
                        path.key("anything"),
                        Constraint::MissingCombinator,
                        "Either 'anything' or 'everything' must be provided",
                    );
                    return None;
                }
                self.untyped_composite(map, path, 1)
            }
        };
        if out.is_none() {
            self.prune(path);
        }
        out
    }

    /// Normalized children of a list; pruned and failed children are left out.
    fn condition_list(&mut self, value: &Value, path: &NodePath, depth: usize) -> Vec<Value> {
        let Some(items) = value.as_array() else {
            self.report.push(
                path.clone(),
                Constraint::ExpectedArray,
                "Conditions must be an array",
            );
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.condition(item, &path.index(i), depth))
            .collect()
    }

    fn condition(&mut self, value: &Value, path: &NodePath, depth: usize) -> Option<Value> {
        if value.is_null() {
            return None;
        }
        if depth > self.config.max_depth {
            self.report.push(
                path.clone(),
                Constraint::MaxDepthExceeded,
                format!(
                    "Conditions may nest at most {} levels deep",
                    self.config.max_depth
                ),
            );
            return None;
        }
        let Some(map) = value.as_object() else {
            self.report.push(
                path.clone(),
                Constraint::ExpectedObject,
                "Condition must be an object",
            );
            return None;
        };

        match self.discriminant(map, path) {
            Discriminant::Invalid => None,
            Discriminant::Selected(Selection::Composite(combinator)) => {
                let children = children_of(map, combinator);
                let out = self.composite(combinator, children, path, depth + 1);
                if out.is_none() {
                    self.prune(path);
                }
                out
            }
            Discriminant::Selected(Selection::Operation) => Some(self.leaf(
                map,
                path,
                Some(Selection::Operation),
            )),
            Discriminant::Selected(Selection::Indicator) => Some(self.leaf(
                map,
                path,
                Some(Selection::Indicator),
            )),
            Discriminant::Untyped => self.untyped_condition(map, path, depth),
        }
    }

    /// A node without `type`: canonical composite, canonical leaf, or an unselected row.
    fn untyped_condition(
        &mut self,
        map: &Map<String, Value>,
        path: &NodePath,
        depth: usize,
    ) -> Option<Value> {
        let has_combinator = map.contains_key("anything") || map.contains_key("everything");
        let has_leaf = ["operation", "indicator", "comparator", "value"]
            .iter()
            .any(|key| map.get(*key).is_some_and(|v| !is_blank(v)));

        if !has_combinator && !has_leaf {
            self.report.push(
                path.clone(),
                Constraint::UnselectedCondition,
                "Condition type is not selected",
            );
            return None;
        }
        if !has_leaf {
            let out = self.untyped_composite(map, path, depth + 1);
            if out.is_none() {
                self.prune(path);
            }
            return out;
        }

        // Mixed composite and leaf keys are kept as-is for the validator to reject.
        let mut out = self
            .untyped_composite(map, path, depth + 1)
            .and_then(into_object)
            .unwrap_or_default();
        if let Value::Object(leaf) = self.leaf(map, path, None) {
            out.extend(leaf);
        }
        Some(Value::Object(out))
    }

    /// `child_depth` is the depth the children sit at.
    fn composite(
        &mut self,
        combinator: Combinator,
        children: Option<&Value>,
        path: &NodePath,
        child_depth: usize,
    ) -> Option<Value> {
        let key = combinator.key();
        let children = match children {
            Some(children) if !children.is_null() => {
                self.condition_list(children, &path.key(key), child_depth)
            }
            _ => Vec::new(),
        };
        if children.is_empty() {
            return None;
        }
        let mut out = Map::new();
        out.insert(key.to_string(), Value::Array(children));
        Some(Value::Object(out))
    }

    /// Canonical `anything` / `everything` keys, each normalized independently.
    fn untyped_composite(
        &mut self,
        map: &Map<String, Value>,
        path: &NodePath,
        child_depth: usize,
    ) -> Option<Value> {
        let mut out = Map::new();
        for combinator in Combinator::ALL {
            let key = combinator.key();
            if let Some(Value::Object(normalized)) =
                self.composite(combinator, map.get(key), path, child_depth)
            {
                out.extend(normalized);
            } else if map.contains_key(key) {
                self.prune(&path.key(key));
            }
        }
        (!out.is_empty()).then_some(Value::Object(out))
    }

    /// Emits the leaf keys in canonical order. With a selection, only the
    /// subject of that variant is kept; fields left from an earlier selection go.
    fn leaf(
        &mut self,
        map: &Map<String, Value>,
        path: &NodePath,
        selection: Option<Selection>,
    ) -> Value {
        let mut out = Map::new();
        let keep_operation = selection.is_none_or(|s| s == Selection::Operation);
        let keep_indicator = selection.is_none_or(|s| s == Selection::Indicator);

        if keep_operation {
            match map.get("operation") {
                Some(operation) if !operation.is_null() => {
                    out.insert(
                        "operation".to_string(),
                        self.operation(operation, &path.key("operation")),
                    );
                }
                _ if selection.is_some() => {
                    out.insert("operation".to_string(), Value::Object(Map::new()));
                }
                _ => {}
            }
        }
        if keep_indicator {
            match map.get("indicator") {
                Some(indicator) if !indicator.is_null() => {
                    out.insert("indicator".to_string(), self.indicator(indicator));
                }
                _ if selection.is_some() => {
                    out.insert("indicator".to_string(), Value::Object(Map::new()));
                }
                _ => {}
            }
        }
        if let Some(comparator) = map.get("comparator").filter(|v| !is_blank(v)) {
            out.insert("comparator".to_string(), comparator.clone());
        }
        let value = map
            .get("value")
            .and_then(|v| self.operand(v, &path.key("value")));
        if let Some(value) = value {
            out.insert("value".to_string(), value);
        }
        Value::Object(out)
    }

    fn operation(&mut self, value: &Value, path: &NodePath) -> Value {
        let Some(map) = value.as_object() else {
            return value.clone();
        };
        let mut out = Map::new();
        for side in ["left", "right"] {
            let operand = map
                .get(side)
                .and_then(|v| self.operand(v, &path.key(side)));
            if let Some(operand) = operand {
                out.insert(side.to_string(), operand);
            }
        }
        if let Some(operator) = map.get("operator").filter(|v| !is_blank(v)) {
            out.insert("operator".to_string(), operator.clone());
        }
        Value::Object(out)
    }

    /// `None` when the operand is blank and should be omitted.
    fn operand(&mut self, value: &Value, path: &NodePath) -> Option<Value> {
        let map = match value {
            Value::Null => return None,
            Value::String(s) if s.is_empty() => return None,
            Value::Object(map) => map,
            other => return Some(other.clone()),
        };

        match map.get("valueType") {
            None | Some(Value::Null) => {}
            Some(Value::String(kind)) if kind == "number" => {
                return map.get("value").and_then(coerce_number);
            }
            Some(Value::String(kind)) if kind == "indicator" => {
                let indicator = map
                    .get("value")
                    .or_else(|| map.get("indicator"))
                    .filter(|v| !v.is_null())
                    .map(|v| self.indicator(v))
                    .unwrap_or_else(|| Value::Object(Map::new()));
                return Some(indicator_ref(indicator));
            }
            Some(other) => {
                self.report.push(
                    path.key("valueType"),
                    Constraint::UnknownValueType,
                    format!("Unknown value type {other}; expected 'number' or 'indicator'"),
                );
                return None;
            }
        }

        // No selector: canonical `{"indicator": ...}`, or the form's default of "number".
        if let Some(indicator) = map.get("indicator").filter(|v| !v.is_null()) {
            return Some(indicator_ref(self.indicator(indicator)));
        }
        if map.contains_key("value") {
            return map.get("value").and_then(coerce_number);
        }
        let rest = strip_bookkeeping(map);
        (!rest.is_empty()).then_some(Value::Object(rest))
    }

    fn indicator(&mut self, value: &Value) -> Value {
        let Some(map) = value.as_object() else {
            return value.clone();
        };
        let mut out = Map::new();
        let name = map.get("name").filter(|v| !is_blank(v));
        if let Some(name) = name {
            out.insert("name".to_string(), name.clone());
        }
        match map.get("params") {
            Some(Value::Object(params)) => {
                let declared = name
                    .and_then(Value::as_str)
                    .and_then(|n| self.config.catalog.get(n))
                    .unwrap_or(&[]);
                out.insert("params".to_string(), Value::Object(order_params(params, declared)));
            }
            Some(other) if !is_blank(other) => {
                out.insert("params".to_string(), other.clone());
            }
            _ => {}
        }
        Value::Object(out)
    }

    fn discriminant(&mut self, map: &Map<String, Value>, path: &NodePath) -> Discriminant {
        match map.get("type") {
            None | Some(Value::Null) => Discriminant::Untyped,
            Some(Value::String(tag)) if tag.is_empty() => Discriminant::Untyped,
            Some(Value::String(tag)) => match tag.as_str() {
                "operation" => Discriminant::Selected(Selection::Operation),
                "indicator" => Discriminant::Selected(Selection::Indicator),
                other => match other.parse::<Combinator>() {
                    Ok(combinator) => Discriminant::Selected(Selection::Composite(combinator)),
                    Err(_) => {
                        self.report.push(
                            path.key("type"),
                            Constraint::UnknownDiscriminant,
                            format!("Unknown condition type '{other}'"),
                        );
                        Discriminant::Invalid
                    }
                },
            },
            Some(other) => {
                self.report.push(
                    path.key("type"),
                    Constraint::UnknownDiscriminant,
                    format!("Condition type must be a string, found {other}"),
                );
                Discriminant::Invalid
            }
        }
    }

    fn prune(&mut self, path: &NodePath) {
        self.pruned += 1;
        trace!(path = %path, "pruned empty branch");
    }
}

enum Discriminant {
    Untyped,
    Selected(Selection),
    Invalid,
}

/// Children of a typed composite: the flat `conditions` array, or the
/// combinator-named key the authoring form also writes to when `conditions`
/// is blank.
fn children_of(map: &Map<String, Value>, combinator: Combinator) -> Option<&Value> {
    map.get("conditions")
        .filter(|v| !is_blank(v))
        .or_else(|| map.get(combinator.key()).filter(|v| !v.is_null()))
        .or_else(|| map.get("conditions"))
}

fn indicator_ref(indicator: Value) -> Value {
    let mut out = Map::new();
    out.insert("indicator".to_string(), indicator);
    Value::Object(out)
}

fn into_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Declared keys first, in catalog order, then the rest in input order.
fn order_params(params: &Map<String, Value>, declared: &[String]) -> Map<String, Value> {
    let mut out = Map::new();
    let ordered = declared
        .iter()
        .filter_map(|key| params.get(key.as_str()).map(|value| (key, value)))
        .chain(params.iter().filter(|(k, _)| !declared.contains(*k)));
    for (key, value) in ordered {
        if let Some(number) = coerce_number(value) {
            out.insert(key.clone(), number);
        }
    }
    out
}

/// Blank values drop out; numeric text typed into a form field becomes a number.
fn coerce_number(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(parse_numeric_text(s.trim()).unwrap_or_else(|| value.clone())),
        other => Some(other.clone()),
    }
}

fn parse_numeric_text(text: &str) -> Option<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Number(Number::from(i)));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

const BOOKKEEPING_KEYS: [&str; 4] = ["id", "key", "_key", "rowId"];

fn strip_bookkeeping(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .filter(|(k, v)| !BOOKKEEPING_KEYS.contains(&k.as_str()) && !is_blank(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::IndicatorCatalog;
    use crate::domain::violation::ViolationKind;
    use serde_json::json;

    fn run(value: Value) -> Result<Value, ViolationReport> {
        normalize(&value, &RuleformConfig::default())
    }

    fn ui_sma_leaf(id: &str) -> Value {
        json!({
            "id": id,
            "type": "indicator",
            "indicator": {"name": "SMA", "params": {"period": 14}},
            "comparator": ">",
            "value": {"valueType": "number", "value": 30}
        })
    }

    #[test]
    fn strips_discriminants_and_value_types() {
        let ui = json!({
            "entry_conditions": {"type": "everything", "conditions": [ui_sma_leaf("row-1")]}
        });
        assert_eq!(
            run(ui).unwrap(),
            json!({"entry_conditions": {"everything": [
                {"indicator": {"name": "SMA", "params": {"period": 14}}, "comparator": ">", "value": 30}
            ]}})
        );
    }

    #[test]
    fn rehomes_nested_composite_children() {
        let ui = json!({
            "exit_conditions": {"type": "anything", "conditions": [
                {"type": "everything", "conditions": [ui_sma_leaf("a"), ui_sma_leaf("b")]}
            ]}
        });
        let canonical = run(ui).unwrap();
        assert_eq!(
            canonical["exit_conditions"]["anything"][0]["everything"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn accepts_children_under_combinator_key() {
        let ui = json!({
            "entry_conditions": {"type": "everything", "conditions": [
                {"type": "anything", "anything": [ui_sma_leaf("a")]}
            ]}
        });
        let canonical = run(ui).unwrap();
        assert!(canonical["entry_conditions"]["everything"][0]["anything"].is_array());
    }

    #[test]
    fn operation_operands_are_unwrapped() {
        let ui = json!({"entry_conditions": {"type": "anything", "conditions": [{
            "type": "operation",
            "operation": {
                "left": {"valueType": "indicator", "value": {"name": "RSI", "params": {"period": 14}}},
                "right": {"valueType": "number", "value": "2"},
                "operator": "*"
            },
            "comparator": "<=",
            "value": {"valueType": "number", "value": 150.5}
        }]}});
        assert_eq!(
            run(ui).unwrap(),
            json!({"entry_conditions": {"anything": [{
                "operation": {
                    "left": {"indicator": {"name": "RSI", "params": {"period": 14}}},
                    "right": 2,
                    "operator": "*"
                },
                "comparator": "<=",
                "value": 150.5
            }]}})
        );
    }

    #[test]
    fn stale_fields_from_previous_selection_are_discarded() {
        let ui = json!({"entry_conditions": {"type": "everything", "conditions": [{
            "type": "indicator",
            "operation": {"left": 1, "right": 2, "operator": "+"},
            "anything": [ui_sma_leaf("x")],
            "indicator": {"name": "SMA", "params": {"period": 5}},
            "comparator": "<",
            "value": {"valueType": "number", "value": 1}
        }]}});
        let leaf = &run(ui).unwrap()["entry_conditions"]["everything"][0];
        assert!(leaf.get("operation").is_none());
        assert!(leaf.get("anything").is_none());
        assert_eq!(leaf["indicator"]["name"], "SMA");
    }

    #[test]
    fn blank_fields_are_omitted() {
        let ui = json!({"entry_conditions": {"type": "everything", "conditions": [{
            "type": "indicator",
            "indicator": {"name": "SMA", "params": {"period": 14, "offset": ""}},
            "comparator": "",
            "value": {"valueType": "number", "value": ""}
        }]}});
        assert_eq!(
            run(ui).unwrap(),
            json!({"entry_conditions": {"everything": [
                {"indicator": {"name": "SMA", "params": {"period": 14}}}
            ]}})
        );
    }

    #[test]
    fn empty_composite_is_pruned_from_parent() {
        let ui = json!({"entry_conditions": {"type": "everything", "conditions": [
            ui_sma_leaf("keep"),
            {"type": "anything", "conditions": []}
        ]}});
        let canonical = run(ui).unwrap();
        assert_eq!(
            canonical["entry_conditions"]["everything"]
                .as_array()
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn set_with_no_surviving_children_is_removed() {
        let ui = json!({
            "entry_conditions": {"type": "everything", "conditions": [
                {"type": "anything", "conditions": []}
            ]},
            "exit_conditions": {"anything": []}
        });
        assert_eq!(run(ui).unwrap(), json!({}));
    }

    #[test]
    fn selected_indicator_without_name_keeps_empty_ref() {
        let ui = json!({"entry_conditions": {"type": "everything", "conditions": [{
            "type": "indicator",
            "indicator": {"name": "RSI", "params": {"period": 14}},
            "comparator": ">",
            "value": {"valueType": "indicator", "value": {"name": ""}}
        }]}});
        let canonical = run(ui).unwrap();
        assert_eq!(
            canonical["entry_conditions"]["everything"][0]["value"],
            json!({"indicator": {}})
        );
    }

    #[test]
    fn unknown_discriminant_is_reported() {
        let ui = json!({"entry_conditions": {"type": "everything", "conditions": [
            {"type": "sometimes", "conditions": []}
        ]}});
        let err = run(ui).unwrap_err();
        assert!(err.contains(
            ViolationKind::Structural,
            "entry_conditions.everything.0.type"
        ));
    }

    #[test]
    fn unselected_row_is_reported() {
        let ui = json!({"entry_conditions": {"type": "everything", "conditions": [
            ui_sma_leaf("a"),
            {"id": "b", "type": ""}
        ]}});
        let err = run(ui).unwrap_err();
        assert!(err.has_constraint(Constraint::UnselectedCondition));
        assert_eq!(err.at("entry_conditions.everything.1").len(), 1);
    }

    #[test]
    fn unknown_value_type_is_reported() {
        let ui = json!({"entry_conditions": {"type": "everything", "conditions": [{
            "type": "indicator",
            "indicator": {"name": "SMA"},
            "comparator": ">",
            "value": {"valueType": "percent", "value": 3}
        }]}});
        let err = run(ui).unwrap_err();
        assert!(err.has_constraint(Constraint::UnknownValueType));
    }

    #[test]
    fn set_type_must_be_a_combinator() {
        let ui = json!({"entry_conditions": {"type": "indicator", "conditions": []}});
        let err = run(ui).unwrap_err();
        assert!(err.contains(ViolationKind::Structural, "entry_conditions.type"));
    }

    #[test]
    fn params_follow_catalog_order() {
        let config = RuleformConfig::default().with_catalog(
            IndicatorCatalog::new().with_indicator("MACD", ["fast_period", "slow_period", "signal_period"]),
        );
        let ui = json!({"entry_conditions": {"type": "everything", "conditions": [{
            "type": "indicator",
            "indicator": {"name": "MACD", "params": {"signal_period": 9, "fast_period": 12, "slow_period": "26"}},
            "comparator": ">",
            "value": {"valueType": "number", "value": 0}
        }]}});
        let canonical = normalize(&ui, &config).unwrap();
        let params = canonical["entry_conditions"]["everything"][0]["indicator"]["params"]
            .as_object()
            .unwrap();
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["fast_period", "slow_period", "signal_period"]);
        assert_eq!(params["slow_period"], json!(26));
    }

    #[test]
    fn canonical_input_is_unchanged() {
        let canonical = json!({
            "entry_conditions": {"anything": [
                {"everything": [
                    {"indicator": {"name": "SMA", "params": {"period": 14}}, "comparator": ">", "value": 30},
                    {"operation": {"left": {"indicator": {"name": "RSI"}}, "right": 2, "operator": "/"}, "comparator": "!=", "value": 1.5}
                ]}
            ]},
            "exit_conditions": {"everything": [
                {"indicator": {"name": "OBV"}, "comparator": "<", "value": {"indicator": {"name": "SMA", "params": {"period": 3}}}}
            ]}
        });
        assert_eq!(run(canonical.clone()).unwrap(), canonical);
    }

    #[test]
    fn mixed_canonical_node_is_kept_for_validator() {
        let canonical = json!({"entry_conditions": {"everything": [
            {"anything": [{"indicator": {"name": "SMA"}, "comparator": ">", "value": 1}], "comparator": ">"}
        ]}});
        let out = run(canonical).unwrap();
        let node = &out["entry_conditions"]["everything"][0];
        assert!(node.get("anything").is_some());
        assert_eq!(node["comparator"], ">");
    }

    #[test]
    fn depth_limit_reported() {
        let config = RuleformConfig::default().with_max_depth(1);
        let ui = json!({"entry_conditions": {"type": "everything", "conditions": [
            {"type": "anything", "conditions": [ui_sma_leaf("deep")]}
        ]}});
        let err = normalize(&ui, &config).unwrap_err();
        assert!(err.has_constraint(Constraint::MaxDepthExceeded));
    }

    #[test]
    fn non_object_root_is_reported() {
        let err = run(json!("strategy")).unwrap_err();
        assert!(err.contains(ViolationKind::Structural, "<root>"));
    }

    #[test]
    fn sibling_order_is_preserved() {
        let ui = json!({"entry_conditions": {"type": "anything", "conditions": [
            {"type": "indicator", "indicator": {"name": "A"}, "comparator": ">", "value": 1},
            {"type": "indicator", "indicator": {"name": "B"}, "comparator": ">", "value": 2},
            {"type": "indicator", "indicator": {"name": "C"}, "comparator": ">", "value": 3}
        ]}});
        let canonical = run(ui).unwrap();
        let names: Vec<&str> = canonical["entry_conditions"]["anything"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["indicator"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn numeric_text_is_coerced() {
        use approx::assert_relative_eq;

        assert_eq!(coerce_number(&json!(" 14 ")), Some(json!(14)));
        assert_eq!(coerce_number(&json!("   ")), None);
        assert_eq!(coerce_number(&json!("fast")), Some(json!("fast")));
        let small = coerce_number(&json!("1e-3")).unwrap();
        assert_relative_eq!(small.as_f64().unwrap(), 0.001);
        let negative = coerce_number(&json!("-2.75")).unwrap();
        assert_relative_eq!(negative.as_f64().unwrap(), -2.75);
    }

    #[test]
    fn set_without_combinator_is_reported() {
        for set in [json!({"everthing": [ui_sma_leaf("a")]}), json!({})] {
            let ui = json!({
                "entry_conditions": set,
                "exit_conditions": {"anything": [ui_sma_leaf("b")]}
            });
            let err = run(ui).unwrap_err();
            assert!(err.has_constraint(Constraint::MissingCombinator));
            assert!(err.contains(ViolationKind::RootCompleteness, "entry_conditions.anything"));
        }
    }

    #[test]
    fn empty_conditions_fall_back_to_combinator_key() {
        let ui = json!({"entry_conditions": {"type": "everything", "conditions": [{
            "type": "anything",
            "conditions": [],
            "anything": [ui_sma_leaf("inner")]
        }]}});
        assert_eq!(
            run(ui).unwrap(),
            json!({"entry_conditions": {"everything": [{"anything": [
                {"indicator": {"name": "SMA", "params": {"period": 14}}, "comparator": ">", "value": 30}
            ]}]}})
        );
    }
}
