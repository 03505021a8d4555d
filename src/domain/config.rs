//! Validation and normalization settings.
//!
//! Threaded explicitly into every validate/normalize call. Values come from the
//! INI config through `ConfigPort`, or from `RuleformConfig::default()`.

use crate::domain::catalog::IndicatorCatalog;
use crate::domain::error::RuleformError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_MAX_DEPTH: usize = 32;
pub const MAX_DEPTH_CEILING: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleformConfig {
    /// Deepest Condition nesting accepted; top-level conditions sit at depth 1.
    pub max_depth: usize,
    pub allow_unknown_fields: bool,
    pub catalog: IndicatorCatalog,
}

impl Default for RuleformConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            allow_unknown_fields: false,
            catalog: IndicatorCatalog::new(),
        }
    }
}

impl RuleformConfig {
    pub fn with_catalog(mut self, catalog: IndicatorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, RuleformError> {
        let max_depth = validate_max_depth(config)?;
        let allow_unknown_fields = validate_allow_unknown_fields(config)?;
        let catalog = IndicatorCatalog::from_port(config)?;
        Ok(Self {
            max_depth,
            allow_unknown_fields,
            catalog,
        })
    }
}

fn invalid(section: &str, key: &str, reason: String) -> RuleformError {
    RuleformError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}

fn validate_max_depth(config: &dyn ConfigPort) -> Result<usize, RuleformError> {
    let Some(raw) = config.get_string("limits", "max_depth") else {
        return Ok(DEFAULT_MAX_DEPTH);
    };
    let value: i64 = raw.trim().parse().map_err(|_| {
        invalid(
            "limits",
            "max_depth",
            format!("expected an integer, got '{raw}'"),
        )
    })?;
    if value < 1 || value > MAX_DEPTH_CEILING as i64 {
        return Err(invalid(
            "limits",
            "max_depth",
            format!("max_depth must be between 1 and {MAX_DEPTH_CEILING}"),
        ));
    }
    Ok(value as usize)
}

fn validate_allow_unknown_fields(config: &dyn ConfigPort) -> Result<bool, RuleformError> {
    let Some(raw) = config.get_string("validation", "allow_unknown_fields") else {
        return Ok(false);
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(
            "validation",
            "allow_unknown_fields",
            format!("expected true/false, yes/no or 1/0, got '{raw}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn defaults_when_sections_missing() {
        let config = RuleformConfig::from_port(&make_config("")).unwrap();
        assert_eq!(config, RuleformConfig::default());
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!config.allow_unknown_fields);
        assert!(config.catalog.is_empty());
    }

    #[test]
    fn reads_all_sections() {
        let config = RuleformConfig::from_port(&make_config(
            r#"
[limits]
max_depth = 8

[validation]
allow_unknown_fields = yes

[indicators]
SMA = period, offset
"#,
        ))
        .unwrap();
        assert_eq!(config.max_depth, 8);
        assert!(config.allow_unknown_fields);
        assert_eq!(config.catalog.get("SMA").unwrap(), ["period", "offset"]);
    }

    #[test]
    fn max_depth_zero_fails() {
        let err = RuleformConfig::from_port(&make_config("[limits]\nmax_depth = 0\n")).unwrap_err();
        assert!(matches!(err, RuleformError::ConfigInvalid { key, .. } if key == "max_depth"));
    }

    #[test]
    fn max_depth_above_ceiling_fails() {
        let err =
            RuleformConfig::from_port(&make_config("[limits]\nmax_depth = 5000\n")).unwrap_err();
        assert!(matches!(err, RuleformError::ConfigInvalid { key, .. } if key == "max_depth"));
    }

    #[test]
    fn max_depth_non_numeric_fails() {
        let err =
            RuleformConfig::from_port(&make_config("[limits]\nmax_depth = abc\n")).unwrap_err();
        match err {
            RuleformError::ConfigInvalid {
                section,
                key,
                reason,
            } => {
                assert_eq!(section, "limits");
                assert_eq!(key, "max_depth");
                assert!(reason.contains("abc"));
            }
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn allow_unknown_fields_must_be_boolean() {
        let err = RuleformConfig::from_port(&make_config(
            "[validation]\nallow_unknown_fields = maybe\n",
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            RuleformError::ConfigInvalid { section, key, .. }
                if section == "validation" && key == "allow_unknown_fields"
        ));
    }

    #[test]
    fn boolean_spellings_are_accepted() {
        for (raw, expected) in [("TRUE", true), ("1", true), ("No", false), ("0", false)] {
            let config = RuleformConfig::from_port(&make_config(&format!(
                "[validation]\nallow_unknown_fields = {raw}\n"
            )))
            .unwrap();
            assert_eq!(config.allow_unknown_fields, expected, "{raw}");
        }
    }

    #[test]
    fn builders() {
        let config = RuleformConfig::default()
            .with_max_depth(3)
            .with_catalog(IndicatorCatalog::new().with_indicator("RSI", ["period"]));
        assert_eq!(config.max_depth, 3);
        assert!(config.catalog.contains("RSI"));
    }
}
