use std::env;

use thiserror::Error;

const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_NOTIFICATION_SHARDS: usize = 16;
const DEFAULT_NOTIFICATION_CAPACITY: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceConfig {
    pub log_filter: String,
    pub notification_shards: usize,
    pub notification_capacity: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable `{0}`")]
    InvalidVar(&'static str),
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            notification_shards: DEFAULT_NOTIFICATION_SHARDS,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}

impl GovernanceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let log_filter =
            lookup("GOVERNANCE_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let notification_shards = get_numeric_env_var(
            &lookup,
            "GOVERNANCE_NOTIFICATION_SHARDS",
            DEFAULT_NOTIFICATION_SHARDS,
        )?;
        let notification_capacity = get_numeric_env_var(
            &lookup,
            "GOVERNANCE_NOTIFICATION_CAPACITY",
            DEFAULT_NOTIFICATION_CAPACITY,
        )?;
        if notification_shards == 0 {
            return Err(ConfigError::InvalidVar("GOVERNANCE_NOTIFICATION_SHARDS"));
        }
        if notification_capacity == 0 {
            return Err(ConfigError::InvalidVar("GOVERNANCE_NOTIFICATION_CAPACITY"));
        }

        Ok(Self {
            log_filter,
            notification_shards,
            notification_capacity,
        })
    }
}

fn get_numeric_env_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var_name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidVar(var_name)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = GovernanceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, GovernanceConfig::default());
    }

    #[test]
    fn numeric_overrides_are_parsed() {
        let config = GovernanceConfig::from_lookup(lookup(&[
            ("GOVERNANCE_LOG", "governance=debug"),
            ("GOVERNANCE_NOTIFICATION_SHARDS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.log_filter, "governance=debug");
        assert_eq!(config.notification_shards, 4);
        assert_eq!(config.notification_capacity, 512);
    }

    #[test]
    fn invalid_numbers_name_the_variable() {
        let err = GovernanceConfig::from_lookup(lookup(&[(
            "GOVERNANCE_NOTIFICATION_CAPACITY",
            "lots",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar("GOVERNANCE_NOTIFICATION_CAPACITY")));
    }
}
