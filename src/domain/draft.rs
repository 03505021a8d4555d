//! Authoring-time condition drafts.
//!
//! A draft is the editable form of a condition before normalization. Each row
//! moves from `Unselected` to one of the four variants; switching variants
//! throws away every field of the previous one. Drafts serialize to the
//! UI-shaped JSON the normalizer consumes (`type` tags, `conditions` arrays and
//! `valueType` selectors).

use crate::domain::rule::Combinator;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Operation,
    Indicator,
    Anything,
    Everything,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DraftIndicator {
    pub name: String,
    /// `None` is a parameter field left blank.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Option<f64>>,
}

impl DraftIndicator {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: &str, value: f64) -> Self {
        self.params.insert(key.to_string(), Some(value));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "valueType", rename_all = "lowercase")]
pub enum DraftOperand {
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
    },
    Indicator {
        value: DraftIndicator,
    },
}

impl Default for DraftOperand {
    fn default() -> Self {
        DraftOperand::Number { value: None }
    }
}

impl DraftOperand {
    pub fn number(value: f64) -> Self {
        DraftOperand::Number { value: Some(value) }
    }

    pub fn indicator(indicator: DraftIndicator) -> Self {
        DraftOperand::Indicator { value: indicator }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DraftOperation {
    pub left: DraftOperand,
    pub right: DraftOperand,
    pub operator: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DraftCondition {
    #[default]
    #[serde(rename = "")]
    Unselected,
    Operation {
        operation: DraftOperation,
        comparator: String,
        value: DraftOperand,
    },
    Indicator {
        indicator: DraftIndicator,
        comparator: String,
        value: DraftOperand,
    },
    Anything {
        conditions: Vec<DraftCondition>,
    },
    Everything {
        conditions: Vec<DraftCondition>,
    },
}

impl DraftCondition {
    pub fn kind(&self) -> Option<ConditionKind> {
        match self {
            DraftCondition::Unselected => None,
            DraftCondition::Operation { .. } => Some(ConditionKind::Operation),
            DraftCondition::Indicator { .. } => Some(ConditionKind::Indicator),
            DraftCondition::Anything { .. } => Some(ConditionKind::Anything),
            DraftCondition::Everything { .. } => Some(ConditionKind::Everything),
        }
    }

    /// Switches the row to `kind`. Re-selecting the current kind keeps the row
    /// as it is; any other transition starts from an empty variant.
    pub fn select(self, kind: ConditionKind) -> Self {
        if self.kind() == Some(kind) {
            return self;
        }
        match kind {
            ConditionKind::Operation => DraftCondition::Operation {
                operation: DraftOperation::default(),
                comparator: String::new(),
                value: DraftOperand::default(),
            },
            ConditionKind::Indicator => DraftCondition::Indicator {
                indicator: DraftIndicator::default(),
                comparator: String::new(),
                value: DraftOperand::default(),
            },
            ConditionKind::Anything => DraftCondition::Anything {
                conditions: Vec::new(),
            },
            ConditionKind::Everything => DraftCondition::Everything {
                conditions: Vec::new(),
            },
        }
    }

    /// Appends a child row. Returns false when the row is not a composite.
    pub fn push_child(&mut self, child: DraftCondition) -> bool {
        match self {
            DraftCondition::Anything { conditions } | DraftCondition::Everything { conditions } => {
                conditions.push(child);
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftConditionSet {
    #[serde(rename = "type")]
    pub combinator: Combinator,
    pub conditions: Vec<DraftCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DraftStrategy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_conditions: Option<DraftConditionSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_conditions: Option<DraftConditionSet>,
}

impl DraftStrategy {
    pub fn to_ui_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
