//! Rule tree data structures.
//!
//! This module defines the canonical model for strategy conditions:
//! - `SafeNumber`: a finite number inside the exact-integer range of an f64
//! - `Indicator` / `Operand` / `Operation`: the leaf building blocks
//! - `Condition`: a leaf comparison or an `anything`/`everything` combinator
//! - `ConditionSet` / `Strategy`: the per-side containers and the root
//!
//! Values of these types are only produced by the validator, so every instance
//! satisfies the structural invariants. Serialization emits the canonical JSON
//! shape with a stable key order.

use crate::domain::error::UnknownSymbol;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Largest integer an f64 represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SafeNumber(f64);

impl SafeNumber {
    /// Returns `None` for NaN, infinities and magnitudes beyond `MAX_SAFE_INTEGER`.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value.abs() <= MAX_SAFE_INTEGER {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn from_json(number: &serde_json::Number) -> Option<Self> {
        if let Some(i) = number.as_i64() {
            return (i.unsigned_abs() <= MAX_SAFE_INTEGER as u64).then_some(Self(i as f64));
        }
        if let Some(u) = number.as_u64() {
            return (u <= MAX_SAFE_INTEGER as u64).then_some(Self(u as f64));
        }
        number.as_f64().and_then(Self::new)
    }

    pub fn get(self) -> f64 {
        self.0
    }

    fn is_integral(self) -> bool {
        self.0.fract() == 0.0
    }
}

impl Serialize for SafeNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_integral() {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl fmt::Display for SafeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integral() {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Indicator parameters in the order they were supplied. The normalizer puts
/// catalogued indicators in declaration order, and that order survives into
/// the canonical output. Equality ignores order, as for JSON objects.
#[derive(Debug, Clone, Default)]
pub struct Params(Vec<(String, SafeNumber)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, keeping its original position when it is already present.
    pub fn insert(&mut self, key: impl Into<String>, value: SafeNumber) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<SafeNumber> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SafeNumber)> {
        self.0.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(*v))
    }
}

impl<K: Into<String>> FromIterator<(K, SafeNumber)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, SafeNumber)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(params) = &self.params {
            let rendered: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, "({})", rendered.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(SafeNumber),
    Indicator(Indicator),
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Operand::Number(n) => n.serialize(serializer),
            Operand::Indicator(indicator) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("indicator", indicator)?;
                map.end()
            }
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => write!(f, "{n}"),
            Operand::Indicator(indicator) => write!(f, "{indicator}"),
        }
    }
}

/// Arithmetic operator joining the two sides of an `Operation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Operator {
    pub const ALL: [Operator; 5] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Rem,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
        }
    }
}

impl FromStr for Operator {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.symbol() == s)
            .ok_or_else(|| UnknownSymbol {
                expected: "operator",
                found: s.to_string(),
            })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// Relational comparator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl Comparator {
    pub const ALL: [Comparator; 6] = [
        Comparator::Gt,
        Comparator::Lt,
        Comparator::Ge,
        Comparator::Le,
        Comparator::Eq,
        Comparator::Ne,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
        }
    }
}

impl FromStr for Comparator {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Comparator::ALL
            .into_iter()
            .find(|cmp| cmp.symbol() == s)
            .ok_or_else(|| UnknownSymbol {
                expected: "comparator",
                found: s.to_string(),
            })
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for Comparator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub left: Operand,
    pub right: Operand,
    pub operator: Operator,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.operator, self.right)
    }
}

/// `anything` is logical OR over its children, `everything` is logical AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    Anything,
    Everything,
}

impl Combinator {
    pub const ALL: [Combinator; 2] = [Combinator::Anything, Combinator::Everything];

    pub fn key(self) -> &'static str {
        match self {
            Combinator::Anything => "anything",
            Combinator::Everything => "everything",
        }
    }
}

impl FromStr for Combinator {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Combinator::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| UnknownSymbol {
                expected: "combinator",
                found: s.to_string(),
            })
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Operation {
        operation: Operation,
        comparator: Comparator,
        value: Operand,
    },
    Indicator {
        indicator: Indicator,
        comparator: Comparator,
        value: Operand,
    },
    Anything(Vec<Condition>),
    Everything(Vec<Condition>),
}

impl Condition {
    /// Nesting depth, counting this node as 1.
    pub fn depth(&self) -> usize {
        match self {
            Condition::Anything(children) | Condition::Everything(children) => {
                1 + children.iter().map(Condition::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Condition::Anything(_) | Condition::Everything(_))
    }

    fn collect_indicators<'a>(&'a self, out: &mut Vec<&'a Indicator>) {
        match self {
            Condition::Operation {
                operation, value, ..
            } => {
                collect_operand(&operation.left, out);
                collect_operand(&operation.right, out);
                collect_operand(value, out);
            }
            Condition::Indicator {
                indicator, value, ..
            } => {
                out.push(indicator);
                collect_operand(value, out);
            }
            Condition::Anything(children) | Condition::Everything(children) => {
                for child in children {
                    child.collect_indicators(out);
                }
            }
        }
    }
}

fn collect_operand<'a>(operand: &'a Operand, out: &mut Vec<&'a Indicator>) {
    if let Operand::Indicator(indicator) = operand {
        out.push(indicator);
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Condition::Operation {
                operation,
                comparator,
                value,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("operation", operation)?;
                map.serialize_entry("comparator", comparator)?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Condition::Indicator {
                indicator,
                comparator,
                value,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("indicator", indicator)?;
                map.serialize_entry("comparator", comparator)?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Condition::Anything(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("anything", children)?;
                map.end()
            }
            Condition::Everything(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("everything", children)?;
                map.end()
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Operation {
                operation,
                comparator,
                value,
            } => write!(f, "{operation} {comparator} {value}"),
            Condition::Indicator {
                indicator,
                comparator,
                value,
            } => write!(f, "{indicator} {comparator} {value}"),
            Condition::Anything(children) => write_group(f, "ANY", children),
            Condition::Everything(children) => write_group(f, "ALL", children),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, label: &str, children: &[Condition]) -> fmt::Result {
    write!(f, "{label}(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSet {
    pub combinator: Combinator,
    pub conditions: Vec<Condition>,
}

impl Serialize for ConditionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.combinator.key(), &self.conditions)?;
        map.end()
    }
}

impl fmt::Display for ConditionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.combinator {
            Combinator::Anything => write_group(f, "ANY", &self.conditions),
            Combinator::Everything => write_group(f, "ALL", &self.conditions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_conditions: Option<ConditionSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_conditions: Option<ConditionSet>,
}

impl Strategy {
    pub fn to_canonical_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Every distinct indicator name referenced anywhere in the strategy, sorted.
    pub fn indicator_names(&self) -> Vec<String> {
        let mut found = Vec::new();
        for set in self.sets() {
            for condition in &set.conditions {
                condition.collect_indicators(&mut found);
            }
        }
        let names: BTreeSet<&str> = found.iter().map(|i| i.name.as_str()).collect();
        names.into_iter().map(str::to_string).collect()
    }

    pub fn sets(&self) -> impl Iterator<Item = &ConditionSet> {
        self.entry_conditions
            .iter()
            .chain(self.exit_conditions.iter())
    }

    pub fn condition_count(&self) -> usize {
        fn count(condition: &Condition) -> usize {
            match condition {
                Condition::Anything(children) | Condition::Everything(children) => {
                    1 + children.iter().map(count).sum::<usize>()
                }
                _ => 1,
            }
        }
        self.sets()
            .flat_map(|set| set.conditions.iter())
            .map(count)
            .sum()
    }
}
