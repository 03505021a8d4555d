//! Domain error types.

use crate::domain::violation::ViolationReport;

/// A symbol outside one of the closed sets (operator, comparator, combinator).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {expected} '{found}'")]
pub struct UnknownSymbol {
    pub expected: &'static str,
    pub found: String,
}

/// Top-level error type for ruleform.
#[derive(Debug, thiserror::Error)]
pub enum RuleformError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("malformed JSON in {origin}: {reason}")]
    Json { origin: String, reason: String },

    #[error(transparent)]
    Violations(#[from] ViolationReport),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RuleformError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            RuleformError::Io(_) => 1,
            RuleformError::ConfigParse { .. } | RuleformError::ConfigInvalid { .. } => 2,
            RuleformError::Json { .. } => 3,
            RuleformError::Violations(_) => 4,
        }
    }
}

impl From<&RuleformError> for std::process::ExitCode {
    fn from(err: &RuleformError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::violation::{Constraint, NodePath};

    #[test]
    fn unknown_symbol_message() {
        let err = UnknownSymbol {
            expected: "operator",
            found: "^".into(),
        };
        assert_eq!(err.to_string(), "unknown operator '^'");
    }

    #[test]
    fn config_invalid_message() {
        let err = RuleformError::ConfigInvalid {
            section: "limits".into(),
            key: "max_depth".into(),
            reason: "max_depth must be at least 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [limits] max_depth: max_depth must be at least 1"
        );
    }

    #[test]
    fn violations_are_transparent() {
        let mut report = ViolationReport::new();
        report.push(
            NodePath::root(),
            Constraint::NoConditionSets,
            "At least one of 'entry_conditions' or 'exit_conditions' must be provided",
        );
        let err = RuleformError::from(report.clone());
        assert_eq!(err.to_string(), report.to_string());
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn exit_codes_by_category() {
        let io = RuleformError::from(std::io::Error::other("disk"));
        let json = RuleformError::Json {
            origin: "strategy.json".into(),
            reason: "EOF".into(),
        };
        let config = RuleformError::ConfigParse {
            file: "ruleform.ini".into(),
            reason: "bad section".into(),
        };
        assert_eq!(io.exit_code(), 1);
        assert_eq!(config.exit_code(), 2);
        assert_eq!(json.exit_code(), 3);
    }
}
