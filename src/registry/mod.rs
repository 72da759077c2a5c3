//! Rule Loader Registry
//!
//! Each rule type registers a paired config/wire codec under a load-time
//! identifier. The structured form carries the identifier in a `type` field;
//! the wire form prefixes it as a string so peers can reconstruct instances
//! without agreeing on registration order.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::formula::FormulaError;
use crate::rules::mining_speed::ConditionalMiningSpeedLoader;
use crate::rules::ToolRule;
use crate::wire::{WireError, WireReader, WireWriter};

/// Load-time configuration errors; the offending rule is not installed
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Rule config is missing the `type` field")]
    MissingType,
    #[error("Unknown rule type: {0}")]
    UnknownType(String),
    #[error("Invalid rule config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid formula: {0}")]
    Formula(#[from] FormulaError),
    #[error("Rule is not a `{expected}`")]
    WrongRuleType { expected: &'static str },
}

/// Paired encode/decode/serialize implementation for one rule type
pub trait RuleLoader: Send + Sync {
    fn id(&self) -> &'static str;
    fn from_config(&self, value: &Value) -> Result<Arc<dyn ToolRule>, ConfigError>;
    /// Serializes the rule's own fields; the registry injects the `type` field
    fn to_config(&self, rule: &dyn ToolRule) -> Result<Value, ConfigError>;
    fn decode(&self, r: &mut WireReader<'_>) -> Result<Arc<dyn ToolRule>, WireError>;
    fn encode(&self, rule: &dyn ToolRule, w: &mut WireWriter) -> Result<(), WireError>;
}

/// Rule type id → loader map
#[derive(Default)]
pub struct RuleRegistry {
    loaders: HashMap<&'static str, Arc<dyn RuleLoader>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, loader: Arc<dyn RuleLoader>) {
        let id = loader.id();
        if self.loaders.insert(id, loader).is_some() {
            tracing::warn!(rule_type = id, "rule loader replaced an earlier registration");
        }
    }

    pub fn loader(&self, id: &str) -> Option<&Arc<dyn RuleLoader>> {
        self.loaders.get(id)
    }

    /// Reconstructs a rule from its structured form (dispatch on `type`)
    pub fn rule_from_value(&self, value: &Value) -> Result<Arc<dyn ToolRule>, ConfigError> {
        let id = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ConfigError::MissingType)?;
        let loader = self
            .loaders
            .get(id)
            .ok_or_else(|| ConfigError::UnknownType(id.to_string()))?;
        loader.from_config(value)
    }

    /// Serializes a rule to its structured form, `type` field included
    pub fn rule_to_value(&self, rule: &dyn ToolRule) -> Result<Value, ConfigError> {
        let loader = self
            .loaders
            .get(rule.loader_id())
            .ok_or_else(|| ConfigError::UnknownType(rule.loader_id().to_string()))?;
        let mut value = loader.to_config(rule)?;
        if let Value::Object(map) = &mut value {
            map.insert("type".to_string(), Value::String(loader.id().to_string()));
        }
        Ok(value)
    }

    /// Writes the rule type id then the rule payload
    pub fn encode_rule(&self, rule: &dyn ToolRule, w: &mut WireWriter) -> Result<(), WireError> {
        let loader = self
            .loaders
            .get(rule.loader_id())
            .ok_or_else(|| WireError::UnknownRuleType(rule.loader_id().to_string()))?;
        w.write_str(loader.id());
        loader.encode(rule, w)
    }

    /// Inverse of [`encode_rule`]; unknown ids are protocol-fatal
    ///
    /// [`encode_rule`]: RuleRegistry::encode_rule
    pub fn decode_rule(&self, r: &mut WireReader<'_>) -> Result<Arc<dyn ToolRule>, WireError> {
        let id = r.read_str()?;
        let loader = self
            .loaders
            .get(id.as_str())
            .ok_or(WireError::UnknownRuleType(id.clone()))?;
        loader.decode(r)
    }
}

/// Registry with all built-in rule types
pub fn standard_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    registry.register(Arc::new(ConditionalMiningSpeedLoader));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockPredicate;
    use crate::rules::mining_speed::{ConditionalMiningSpeed, CONDITIONAL_MINING_SPEED};

    fn sample_rule() -> ConditionalMiningSpeed {
        ConditionalMiningSpeed::blocks(BlockPredicate::block("quarry:stone"))
            .flat(2.0)
            .build()
    }

    #[test]
    fn test_standard_registry_has_mining_speed() {
        let registry = standard_registry();
        assert!(registry.loader(CONDITIONAL_MINING_SPEED).is_some());
        assert!(registry.loader("no_such_rule").is_none());
    }

    #[test]
    fn test_value_roundtrip_via_registry() {
        let registry = standard_registry();
        let rule = sample_rule();
        let value = registry.rule_to_value(&rule).unwrap();
        assert_eq!(value["type"], CONDITIONAL_MINING_SPEED);

        let restored = registry.rule_from_value(&value).unwrap();
        let restored = restored
            .as_any()
            .downcast_ref::<ConditionalMiningSpeed>()
            .unwrap();
        assert_eq!(restored, &rule);
    }

    #[test]
    fn test_missing_type() {
        let registry = standard_registry();
        let result = registry.rule_from_value(&serde_json::json!({ "amount": 1.0 }));
        assert!(matches!(result, Err(ConfigError::MissingType)));
    }

    #[test]
    fn test_unknown_type() {
        let registry = standard_registry();
        let result = registry.rule_from_value(&serde_json::json!({
            "type": "conditional_levitation",
            "amount": 1.0
        }));
        assert!(matches!(result, Err(ConfigError::UnknownType(id)) if id == "conditional_levitation"));
    }

    #[test]
    fn test_wire_roundtrip_via_registry() {
        let registry = standard_registry();
        let rule = sample_rule();
        let mut w = WireWriter::new();
        registry.encode_rule(&rule, &mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        let restored = registry.decode_rule(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        let restored = restored
            .as_any()
            .downcast_ref::<ConditionalMiningSpeed>()
            .unwrap();
        assert_eq!(restored, &rule);
    }

    #[test]
    fn test_wire_unknown_rule_type() {
        let registry = standard_registry();
        let mut w = WireWriter::new();
        w.write_str("conditional_levitation");
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert!(matches!(
            registry.decode_rule(&mut r),
            Err(WireError::UnknownRuleType(id)) if id == "conditional_levitation"
        ));
    }
}
