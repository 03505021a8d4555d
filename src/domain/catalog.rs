//! Indicator catalog: indicator name to its ordered parameter keys.
//!
//! An empty catalog means no catalog was supplied; indicators are then only
//! checked for shape. An entry with no keys declares a zero-parameter
//! indicator, for which an empty or absent `params` map is valid.

use crate::domain::error::RuleformError;
use crate::ports::config_port::ConfigPort;
use std::collections::BTreeMap;

pub const INDICATORS_SECTION: &str = "indicators";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorCatalog {
    entries: BTreeMap<String, Vec<String>>,
}

impl IndicatorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indicator<I, K>(mut self, name: &str, param_keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.insert(name, param_keys);
        self
    }

    pub fn insert<I, K>(&mut self, name: &str, param_keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.entries.insert(
            name.to_string(),
            param_keys.into_iter().map(Into::into).collect(),
        );
    }

    /// Declared parameter keys for `name`, in declaration order.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_zero_param(&self, name: &str) -> bool {
        self.get(name).is_some_and(<[String]>::is_empty)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, keys)| (name.as_str(), keys.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads the `[indicators]` section: `NAME = key1, key2`, or `NAME =` for
    /// an indicator without parameters.
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, RuleformError> {
        let mut catalog = Self::new();
        for name in config.section_keys(INDICATORS_SECTION) {
            let raw = config
                .get_string(INDICATORS_SECTION, &name)
                .unwrap_or_default();
            let keys = parse_param_keys(&name, &raw)?;
            catalog.insert(&name, keys);
        }
        Ok(catalog)
    }
}

fn parse_param_keys(name: &str, raw: &str) -> Result<Vec<String>, RuleformError> {
    let mut keys: Vec<String> = Vec::new();
    for key in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if keys.iter().any(|existing| existing == key) {
            return Err(RuleformError::ConfigInvalid {
                section: INDICATORS_SECTION.to_string(),
                key: name.to_string(),
                reason: format!("parameter '{key}' declared twice"),
            });
        }
        keys.push(key.to_string());
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn builder_keeps_declaration_order() {
        let catalog = IndicatorCatalog::new()
            .with_indicator("MACD", ["fast_period", "slow_period", "signal_period"])
            .with_indicator("OBV", Vec::<String>::new());
        assert_eq!(
            catalog.get("MACD").unwrap(),
            ["fast_period", "slow_period", "signal_period"]
        );
        assert!(catalog.is_zero_param("OBV"));
        assert!(!catalog.is_zero_param("MACD"));
        assert!(!catalog.is_zero_param("SMA"));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["MACD", "OBV"]);
    }

    #[test]
    fn from_port_reads_indicators_section() {
        let adapter = FileConfigAdapter::from_string(
            "[indicators]\nSMA = period, offset\nRSI = period,source\nOBV =\n",
        )
        .unwrap();
        let catalog = IndicatorCatalog::from_port(&adapter).unwrap();
        assert_eq!(catalog.get("SMA").unwrap(), ["period", "offset"]);
        assert_eq!(catalog.get("RSI").unwrap(), ["period", "source"]);
        assert!(catalog.is_zero_param("OBV"));
        assert!(!catalog.contains("MACD"));
    }

    #[test]
    fn from_port_without_section_is_empty() {
        let adapter = FileConfigAdapter::from_string("[limits]\nmax_depth = 8\n").unwrap();
        assert!(IndicatorCatalog::from_port(&adapter).unwrap().is_empty());
    }

    #[test]
    fn duplicate_param_key_rejected() {
        let adapter =
            FileConfigAdapter::from_string("[indicators]\nBB = period, period\n").unwrap();
        let err = IndicatorCatalog::from_port(&adapter).unwrap_err();
        assert!(matches!(err, RuleformError::ConfigInvalid { key, .. } if key == "BB"));
    }
}
