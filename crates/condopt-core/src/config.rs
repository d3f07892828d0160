//! Planner configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.

use crate::{
    condition::ConditionOptimization,
    error::{ErrorOrigin, InternalError},
    plan::rules::MAX_JOIN_CHAIN_LEN,
    resource::ResourceMonitor,
};
use serde::Deserialize;

///
/// PlannerConfig
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Byte cap for tracked planner allocations; `None` is unlimited.
    pub memory_limit: Option<usize>,
    pub rules: RuleConfig,
    pub join: JoinConfig,
    pub normalize: NormalizeConfig,
}

impl PlannerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, InternalError> {
        toml::from_str(text).map_err(|err| {
            InternalError::malformed_plan(ErrorOrigin::Config, "config", err.message())
        })
    }

    /// Resource monitor sized to this config.
    #[must_use]
    pub const fn resource_monitor(&self) -> ResourceMonitor {
        match self.memory_limit {
            Some(limit) => ResourceMonitor::with_limit(limit),
            None => ResourceMonitor::unlimited(),
        }
    }
}

///
/// RuleConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    pub use_indexes: bool,
    pub join_indexes: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            use_indexes: true,
            join_indexes: true,
        }
    }
}

///
/// JoinConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    max_chain_len: usize,
}

impl JoinConfig {
    /// Effective chain cap; never above [`MAX_JOIN_CHAIN_LEN`], never below 2.
    #[must_use]
    pub fn max_chain_len(&self) -> usize {
        self.max_chain_len.clamp(2, MAX_JOIN_CHAIN_LEN)
    }
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            max_chain_len: MAX_JOIN_CHAIN_LEN,
        }
    }
}

///
/// NormalizeConfig
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    pub optimization: ConditionOptimization,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    #[test]
    fn empty_document_yields_defaults() {
        let config = PlannerConfig::from_toml_str("").expect("empty config");

        assert_eq!(config, PlannerConfig::default());
        assert!(config.rules.join_indexes);
        assert_eq!(config.join.max_chain_len(), MAX_JOIN_CHAIN_LEN);
        assert_eq!(config.normalize.optimization, ConditionOptimization::Auto);
    }

    #[test]
    fn chain_length_is_capped() {
        let config = PlannerConfig::from_toml_str(
            r#"
            memory_limit = 4096

            [rules]
            use_indexes = false

            [join]
            max_chain_len = 9

            [normalize]
            optimization = "no_negation"
            "#,
        )
        .expect("config");

        assert_eq!(config.memory_limit, Some(4096));
        assert!(!config.rules.use_indexes);
        assert!(config.rules.join_indexes);
        assert_eq!(config.join.max_chain_len(), MAX_JOIN_CHAIN_LEN);
        assert_eq!(
            config.normalize.optimization,
            ConditionOptimization::NoNegation
        );
        assert_eq!(config.resource_monitor().limit(), Some(4096));
    }

    #[test]
    fn unknown_keys_are_malformed() {
        let err = PlannerConfig::from_toml_str("bogus = 1").expect_err("unknown key");

        assert_eq!(err.class, ErrorClass::MalformedPlan);
        assert_eq!(err.origin, ErrorOrigin::Config);
    }
}
