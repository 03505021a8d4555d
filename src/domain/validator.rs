//! Structural validator for canonical strategy JSON.
//!
//! Walks an untrusted `serde_json::Value` and either re-types it as a
//! [`Strategy`] or returns every violation it can locate. A malformed node does
//! not stop the walk: its well-formed-looking children are still checked.

use crate::domain::config::RuleformConfig;
use crate::domain::rule::{
    Combinator, Comparator, Condition, ConditionSet, Indicator, Operand, Operation, Operator,
    Params, SafeNumber, Strategy,
};
use crate::domain::violation::{Constraint, NodePath, PathSegment, ViolationReport};
use serde_json::{Map, Value};
use tracing::debug;

pub const ENTRY_CONDITIONS: &str = "entry_conditions";
pub const EXIT_CONDITIONS: &str = "exit_conditions";

const ROOT_FIELDS: &[&str] = &[ENTRY_CONDITIONS, EXIT_CONDITIONS];
const SET_FIELDS: &[&str] = &["anything", "everything"];
const LEAF_FIELDS: &[&str] = &["operation", "indicator", "comparator", "value"];
const CONDITION_FIELDS: &[&str] = &[
    "anything",
    "everything",
    "operation",
    "indicator",
    "comparator",
    "value",
];
const OPERATION_FIELDS: &[&str] = &["left", "right", "operator"];
const OPERAND_FIELDS: &[&str] = &["indicator"];
const INDICATOR_FIELDS: &[&str] = &["name", "params"];

/// Validates `candidate` against the canonical rule-tree invariants.
///
/// All-or-nothing: returns the typed strategy only when no violation was found.
pub fn validate(candidate: &Value, config: &RuleformConfig) -> Result<Strategy, ViolationReport> {
    let mut validator = Validator::new(config);
    let strategy = validator.strategy(candidate);
    debug!(
        violations = validator.report.len(),
        "validated strategy candidate"
    );
    match strategy {
        Some(strategy) if validator.report.is_empty() => Ok(strategy),
        _ => Err(validator.report),
    }
}

struct Validator<'a> {
    config: &'a RuleformConfig,
    report: ViolationReport,
}

impl<'a> Validator<'a> {
    fn new(config: &'a RuleformConfig) -> Self {
        Self {
            config,
            report: ViolationReport::new(),
        }
    }

    fn strategy(&mut self, value: &Value) -> Option<Strategy> {
        let root = NodePath::root();
        let map = self.object(value, &root, "Strategy must be a JSON object")?;
        self.unknown_fields(map, ROOT_FIELDS, &root);

        if !map.contains_key(ENTRY_CONDITIONS) && !map.contains_key(EXIT_CONDITIONS) {
            self.report.push(
                root.key(ENTRY_CONDITIONS),
                Constraint::NoConditionSets,
                "At least one of 'entry_conditions' or 'exit_conditions' must be provided",
            );
            return None;
        }

        let entry = self.optional_set(map, ENTRY_CONDITIONS);
        let exit = self.optional_set(map, EXIT_CONDITIONS);
        Some(Strategy {
            entry_conditions: entry?,
            exit_conditions: exit?,
        })
    }

    /// `Some(None)` when the side is absent, `None` when it is present but invalid.
    fn optional_set(&mut self, map: &Map<String, Value>, side: &str) -> Option<Option<ConditionSet>> {
        match map.get(side) {
            None => Some(None),
            Some(value) => self
                .condition_set(value, &NodePath::root().key(side))
                .map(Some),
        }
    }

    fn condition_set(&mut self, value: &Value, path: &NodePath) -> Option<ConditionSet> {
        let map = self.object(value, path, "Condition set must be an object")?;
        self.unknown_fields(map, SET_FIELDS, path);

        match (map.get("anything"), map.get("everything")) {
            (None, None) => {
                self.report.push(
                    path.key("anything"),
                    Constraint::MissingCombinator,
                    "Either 'anything' or 'everything' must be provided",
                );
                None
            }
            (Some(anything), Some(everything)) => {
                self.report.push(
                    path.clone(),
                    Constraint::MultipleCombinators,
                    "Condition set must carry exactly one of 'anything' or 'everything'",
                );
                self.condition_list(anything, &path.key("anything"), 1);
                self.condition_list(everything, &path.key("everything"), 1);
                None
            }
            (Some(children), None) => Some(ConditionSet {
                combinator: Combinator::Anything,
                conditions: self.condition_list(children, &path.key("anything"), 1)?,
            }),
            (None, Some(children)) => Some(ConditionSet {
                combinator: Combinator::Everything,
                conditions: self.condition_list(children, &path.key("everything"), 1)?,
            }),
        }
    }

    /// Validates every element even after a failure so all violations surface.
    fn condition_list(&mut self, value: &Value, path: &NodePath, depth: usize) -> Option<Vec<Condition>> {
        let Some(items) = value.as_array() else {
            self.report.push(
                path.clone(),
                Constraint::ExpectedArray,
                "Combinator must hold an array of conditions",
            );
            return None;
        };
        if items.is_empty() {
            self.report.push(
                path.clone(),
                Constraint::EmptyCombinator,
                format!(
                    "At least one condition is required for \"{}\"",
                    last_key(path)
                ),
            );
            return None;
        }

        let mut conditions = Vec::with_capacity(items.len());
        let mut valid = true;
        for (i, item) in items.iter().enumerate() {
            match self.condition(item, &path.index(i), depth) {
                Some(condition) => conditions.push(condition),
                None => valid = false,
            }
        }
        valid.then_some(conditions)
    }

    fn condition(&mut self, value: &Value, path: &NodePath, depth: usize) -> Option<Condition> {
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
        let map = self.object(value, path, "Condition must be an object")?;
        self.unknown_fields(map, CONDITION_FIELDS, path);

        let anything = map.get("anything");
        let everything = map.get("everything");
        let leaf_fields: Vec<&str> = LEAF_FIELDS
            .iter()
            .copied()
            .filter(|field| map.contains_key(*field))
            .collect();

        if anything.is_none() && everything.is_none() {
            if leaf_fields.is_empty() {
                self.report.push(
                    path.clone(),
                    Constraint::EmptyCondition,
                    "Invalid condition structure. Must have either (operation, comparator, and value) OR (indicator, comparator, and value) OR anything OR everything",
                );
                return None;
            }
            return self.leaf(map, path);
        }

        let mut valid = true;
        if !leaf_fields.is_empty() {
            self.report.push(
                path.clone(),
                Constraint::CompositeWithLeafFields,
                format!(
                    "Composite condition must not also carry {}",
                    quote_list(&leaf_fields)
                ),
            );
            valid = false;
        }
        if anything.is_some() && everything.is_some() {
            self.report.push(
                path.clone(),
                Constraint::MultipleCombinators,
                "Condition must carry only one of 'anything' or 'everything'",
            );
            valid = false;
        }

        let any_children = anything.map(|v| self.condition_list(v, &path.key("anything"), depth + 1));
        let every_children =
            everything.map(|v| self.condition_list(v, &path.key("everything"), depth + 1));
        if !valid {
            return None;
        }
        match (any_children, every_children) {
            (Some(children), None) => children.map(Condition::Anything),
            (None, Some(children)) => children.map(Condition::Everything),
            _ => None,
        }
    }

    fn leaf(&mut self, map: &Map<String, Value>, path: &NodePath) -> Option<Condition> {
        let operation = map.get("operation");
        let indicator = map.get("indicator");
        if operation.is_some() && indicator.is_some() {
            self.report.push(
                path.clone(),
                Constraint::AmbiguousLeafSubject,
                "Condition must carry either 'operation' or 'indicator', not both",
            );
        } else if operation.is_none() && indicator.is_none() {
            self.report.push(
                path.clone(),
                Constraint::MissingField,
                "Condition requires either 'operation' or 'indicator'",
            );
        }

        let operation = operation.map(|v| self.operation(v, &path.key("operation")));
        let indicator = indicator.map(|v| self.indicator(v, &path.key("indicator")));
        let comparator = self
            .required(map, "comparator", path, "Comparator is required")
            .and_then(|v| self.comparator(v, &path.key("comparator")));
        let value = self
            .required(map, "value", path, "Value is required")
            .and_then(|v| self.operand(v, &path.key("value")));

        let comparator = comparator?;
        let value = value?;
        match (operation, indicator) {
            (Some(operation), None) => Some(Condition::Operation {
                operation: operation?,
                comparator,
                value,
            }),
            (None, Some(indicator)) => Some(Condition::Indicator {
                indicator: indicator?,
                comparator,
                value,
            }),
            _ => None,
        }
    }

    fn operation(&mut self, value: &Value, path: &NodePath) -> Option<Operation> {
        let map = self.object(value, path, "Operation must be an object")?;
        self.unknown_fields(map, OPERATION_FIELDS, path);

        let left = self
            .required(map, "left", path, "Left operand is required")
            .and_then(|v| self.operand(v, &path.key("left")));
        let right = self
            .required(map, "right", path, "Right operand is required")
            .and_then(|v| self.operand(v, &path.key("right")));
        let operator = self
            .required(map, "operator", path, "Operator is required")
            .and_then(|v| self.operator(v, &path.key("operator")));
        Some(Operation {
            left: left?,
            right: right?,
            operator: operator?,
        })
    }

    fn operator(&mut self, value: &Value, path: &NodePath) -> Option<Operator> {
        let symbol = self.string(value, path, "Operator must be a string")?;
        match symbol.parse::<Operator>() {
            Ok(operator) => Some(operator),
            Err(_) => {
                self.report.push(
                    path.clone(),
                    Constraint::OperatorNotAllowed,
                    format!("Invalid operator '{symbol}'. Must be one of: +, -, *, /, %"),
                );
                None
            }
        }
    }

    fn comparator(&mut self, value: &Value, path: &NodePath) -> Option<Comparator> {
        let symbol = self.string(value, path, "Comparator must be a string")?;
        match symbol.parse::<Comparator>() {
            Ok(comparator) => Some(comparator),
            Err(_) => {
                self.report.push(
                    path.clone(),
                    Constraint::ComparatorNotAllowed,
                    format!("Invalid comparator '{symbol}'. Must be one of: >, <, >=, <=, ==, !="),
                );
                None
            }
        }
    }

    fn operand(&mut self, value: &Value, path: &NodePath) -> Option<Operand> {
        match value {
            Value::Number(_) => self.number(value, path).map(Operand::Number),
            Value::Object(map) if map.contains_key("indicator") => {
                self.unknown_fields(map, OPERAND_FIELDS, path);
                let indicator = self.indicator(&map["indicator"], &path.key("indicator"))?;
                Some(Operand::Indicator(indicator))
            }
            _ => {
                self.report.push(
                    path.clone(),
                    Constraint::InvalidOperand,
                    "Operand must be either an indicator object or a number",
                );
                None
            }
        }
    }

    fn indicator(&mut self, value: &Value, path: &NodePath) -> Option<Indicator> {
        let map = self.object(value, path, "Indicator must be an object")?;
        self.unknown_fields(map, INDICATOR_FIELDS, path);

        let name = match map.get("name") {
            Some(Value::String(name)) if !name.is_empty() => Some(name.as_str()),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                self.report.push(
                    path.key("name"),
                    Constraint::NameRequired,
                    "Indicator name is required",
                );
                None
            }
            Some(_) => {
                self.report.push(
                    path.key("name"),
                    Constraint::ExpectedString,
                    "Indicator name must be a string",
                );
                None
            }
        };

        let params = match map.get("params") {
            None => Some(None),
            Some(value) => self.params(value, name, &path.key("params")).map(Some),
        };

        if let Some(name) = name {
            self.catalog_check(name, map.get("params"), path);
        }

        Some(Indicator {
            name: name?.to_string(),
            params: params?,
        })
    }

    fn params(
        &mut self,
        value: &Value,
        name: Option<&str>,
        path: &NodePath,
    ) -> Option<Params> {
        let map = self.object(value, path, "Parameters must be a record of numbers")?;
        if map.is_empty() {
            let zero_param = name.is_some_and(|n| self.config.catalog.is_zero_param(n));
            if !zero_param {
                self.report.push(
                    path.clone(),
                    Constraint::EmptyParams,
                    "Parameters object cannot be empty",
                );
                return None;
            }
        }

        let mut params = Params::new();
        let mut valid = true;
        for (key, value) in map {
            match self.number(value, &path.key(key)) {
                Some(n) => {
                    params.insert(key.clone(), n);
                }
                None => valid = false,
            }
        }
        valid.then_some(params)
    }

    /// Catalog membership and parameter-key checks; skipped without a catalog.
    fn catalog_check(&mut self, name: &str, params: Option<&Value>, path: &NodePath) {
        let catalog = &self.config.catalog;
        if catalog.is_empty() {
            return;
        }
        let Some(declared) = catalog.get(name) else {
            self.report.push(
                path.key("name"),
                Constraint::UnknownIndicator,
                format!("Unknown indicator '{name}'"),
            );
            return;
        };

        let supplied = params.and_then(Value::as_object);
        for key in declared {
            if !supplied.is_some_and(|p| p.contains_key(key)) {
                self.report.push(
                    path.key("params"),
                    Constraint::MissingParam,
                    format!("Indicator '{name}' requires parameter '{key}'"),
                );
            }
        }
        if let Some(supplied) = supplied {
            for key in supplied.keys() {
                if !declared.contains(key) {
                    self.report.push(
                        path.key("params").key(key),
                        Constraint::UnexpectedParam,
                        format!("Indicator '{name}' does not take parameter '{key}'"),
                    );
                }
            }
        }
    }

    fn number(&mut self, value: &Value, path: &NodePath) -> Option<SafeNumber> {
        let Value::Number(number) = value else {
            self.report.push(
                path.clone(),
                Constraint::ExpectedNumber,
                "Expected a number",
            );
            return None;
        };
        let safe = SafeNumber::from_json(number);
        if safe.is_none() {
            self.report.push(
                path.clone(),
                Constraint::UnsafeNumber,
                format!("Number {number} must be finite and within ±9007199254740991"),
            );
        }
        safe
    }

    fn required<'v>(
        &mut self,
        map: &'v Map<String, Value>,
        field: &str,
        path: &NodePath,
        message: &str,
    ) -> Option<&'v Value> {
        let value = map.get(field);
        if value.is_none() {
            self.report
                .push(path.key(field), Constraint::MissingField, message);
        }
        value
    }

    fn object<'v>(
        &mut self,
        value: &'v Value,
        path: &NodePath,
        message: &str,
    ) -> Option<&'v Map<String, Value>> {
        let map = value.as_object();
        if map.is_none() {
            self.report
                .push(path.clone(), Constraint::ExpectedObject, message);
        }
        map
    }

    fn string<'v>(&mut self, value: &'v Value, path: &NodePath, message: &str) -> Option<&'v str> {
        let s = value.as_str();
        if s.is_none() {
            self.report
                .push(path.clone(), Constraint::ExpectedString, message);
        }
        s
    }

    fn unknown_fields(&mut self, map: &Map<String, Value>, allowed: &[&str], path: &NodePath) {
        if self.config.allow_unknown_fields {
            return;
        }
        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.report.push(
                    path.key(key),
                    Constraint::UnknownField,
                    format!("Unknown field '{key}'"),
                );
            }
        }
    }
}

fn last_key(path: &NodePath) -> &str {
    match path.segments().last() {
        Some(PathSegment::Key(key)) => key,
        _ => "",
    }
}

fn quote_list(fields: &[&str]) -> String {
    let quoted: Vec<String> = fields.iter().map(|f| format!("'{f}'")).collect();
    quoted.join(", ")
}
