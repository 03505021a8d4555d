//! Violation reporting for the validator and normalizer.
//!
//! - `NodePath`: location of a node, as keys and indices from the root
//! - `Constraint`: the rule a node broke, grouped into a `ViolationKind`
//! - `ViolationReport`: every violation found in one call, in discovery order

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Structural,
    Enum,
    Numeric,
    EmptyCollection,
    RootCompleteness,
    Catalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    MalformedJson,
    ExpectedObject,
    ExpectedArray,
    ExpectedString,
    ExpectedNumber,
    UnknownField,
    EmptyCondition,
    CompositeWithLeafFields,
    MultipleCombinators,
    MissingField,
    AmbiguousLeafSubject,
    InvalidOperand,
    NameRequired,
    MaxDepthExceeded,
    UnknownDiscriminant,
    UnselectedCondition,
    UnknownValueType,
    OperatorNotAllowed,
    ComparatorNotAllowed,
    UnsafeNumber,
    EmptyCombinator,
    EmptyParams,
    NoConditionSets,
    MissingCombinator,
    UnknownIndicator,
    MissingParam,
    UnexpectedParam,
    CanonicalEncoding,
}

impl Constraint {
    pub fn kind(self) -> ViolationKind {
        use Constraint::*;
        match self {
            OperatorNotAllowed | ComparatorNotAllowed => ViolationKind::Enum,
            UnsafeNumber => ViolationKind::Numeric,
            EmptyCombinator | EmptyParams => ViolationKind::EmptyCollection,
            NoConditionSets | MissingCombinator => ViolationKind::RootCompleteness,
            UnknownIndicator | MissingParam | UnexpectedParam => ViolationKind::Catalog,
            MalformedJson | ExpectedObject | ExpectedArray | ExpectedString | ExpectedNumber
            | UnknownField | EmptyCondition | CompositeWithLeafFields | MultipleCombinators
            | MissingField | AmbiguousLeafSubject | InvalidOperand | NameRequired
            | MaxDepthExceeded | UnknownDiscriminant | UnselectedCondition
            | UnknownValueType | CanonicalEncoding => ViolationKind::Structural,
        }
    }

    pub fn label(self) -> &'static str {
        use Constraint::*;
        match self {
            MalformedJson => "input is not valid JSON",
            ExpectedObject => "expected an object",
            ExpectedArray => "expected an array",
            ExpectedString => "expected a string",
            ExpectedNumber => "expected a number",
            UnknownField => "unknown field",
            EmptyCondition => "condition matches no variant",
            CompositeWithLeafFields => "composite condition must not carry leaf fields",
            MultipleCombinators => "only one combinator allowed per node",
            MissingField => "required field missing",
            AmbiguousLeafSubject => "leaf condition needs exactly one of operation/indicator",
            InvalidOperand => "operand must be a number or an indicator",
            NameRequired => "indicator name required",
            MaxDepthExceeded => "maximum nesting depth exceeded",
            UnknownDiscriminant => "unknown condition type",
            UnselectedCondition => "condition type not selected",
            UnknownValueType => "unknown value type",
            OperatorNotAllowed => "operator not in allowed set",
            ComparatorNotAllowed => "comparator not in allowed set",
            UnsafeNumber => "number not finite or not exactly representable",
            EmptyCombinator => "combinator list empty",
            EmptyParams => "params map empty",
            NoConditionSets => "entry or exit conditions required",
            MissingCombinator => "condition set needs anything or everything",
            UnknownIndicator => "indicator not in catalog",
            MissingParam => "declared parameter missing",
            UnexpectedParam => "parameter not declared for indicator",
            CanonicalEncoding => "accepted strategy could not be encoded as JSON",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a node. Renders as `entry_conditions.everything.0.value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Key(key) => f.write_str(key)?,
                PathSegment::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: NodePath,
    pub constraint: Constraint,
    pub kind: ViolationKind,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.path, self.message, self.constraint)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{}", render(.violations))]
pub struct ViolationReport {
    violations: Vec<Violation>,
}

fn render(violations: &[Violation]) -> String {
    let lines: Vec<String> = violations.iter().map(Violation::to_string).collect();
    lines.join("\n")
}

impl ViolationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: NodePath, constraint: Constraint, message: impl Into<String>) {
        self.violations.push(Violation {
            path,
            constraint,
            kind: constraint.kind(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ViolationReport) {
        self.violations.extend(other.violations);
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    pub fn kinds(&self) -> Vec<ViolationKind> {
        let mut kinds: Vec<ViolationKind> = Vec::new();
        for v in &self.violations {
            if !kinds.contains(&v.kind) {
                kinds.push(v.kind);
            }
        }
        kinds
    }

    /// True if a violation of `kind` was reported at the dotted `path`.
    pub fn contains(&self, kind: ViolationKind, path: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.kind == kind && v.path.to_string() == path)
    }

    pub fn has_constraint(&self, constraint: Constraint) -> bool {
        self.violations.iter().any(|v| v.constraint == constraint)
    }

    pub fn at(&self, path: &str) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.path.to_string() == path)
            .collect()
    }

    /// `Ok(value)` when nothing was reported, otherwise the report itself.
    pub fn into_result<T>(self, value: T) -> Result<T, ViolationReport> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl<'a> IntoIterator for &'a ViolationReport {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}
