//! Conditional Mining-Speed Rule
//!
//! Adjusts mining speed when an interaction passes three gates, checked in
//! order with short-circuiting: the effectiveness gate (unless the rule allows
//! ineffective tools), the generic module condition, and the block predicate.
//! On a pass the formula replaces the event's new-speed from four inputs:
//! modifier level, the speed left by earlier rules, the tool's mining-speed
//! multiplier times the incoming modifier, and the original speed.
//!
//! Percent-mode rules request a later priority so percentage boosts compound
//! on top of already-additive-adjusted speeds.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

use crate::block::BlockPredicate;
use crate::condition::ModuleCondition;
use crate::entity::{EntityPredicate, HolderState};
use crate::event::BreakSpeedEvent;
use crate::formula::{
    Expression, FallbackFormula, FormulaConfig, LeveledValue, ModifierFormula, Variables,
};
use crate::registry::{ConfigError, RuleLoader};
use crate::rules::{
    BreakSpeedHook, HookKind, ToolRule, TooltipHook, DEFAULT_PRIORITY, PERCENT_PRIORITY,
};
use crate::tool::{ModifierEntry, ToolStat, ToolView};
use crate::wire::{WireError, WireReader, WireWriter};

/// Load-time identifier for this rule type
pub const CONDITIONAL_MINING_SPEED: &str = "conditional_mining_speed";

/// Formula variable set: slot 1 is the speed being adjusted
pub const VARIABLES: Variables =
    Variables::new(&["level", "speed", "multiplier", "original_speed"]);

fn fallback_for(percent: bool) -> FallbackFormula {
    if percent {
        FallbackFormula::Percent
    } else {
        FallbackFormula::Boost
    }
}

/// Conditional mining-speed adjustment rule, immutable after construction
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalMiningSpeed {
    blocks: BlockPredicate,
    holder: EntityPredicate,
    require_effective: bool,
    formula: ModifierFormula,
    percent: bool,
    condition: ModuleCondition,
}

impl ConditionalMiningSpeed {
    /// Starts a builder matching the given blocks
    pub fn blocks(blocks: BlockPredicate) -> Builder {
        Builder::new(blocks)
    }

    pub fn block_predicate(&self) -> &BlockPredicate {
        &self.blocks
    }

    pub fn holder_predicate(&self) -> &EntityPredicate {
        &self.holder
    }

    pub fn require_effective(&self) -> bool {
        self.require_effective
    }

    pub fn percent(&self) -> bool {
        self.percent
    }

    pub fn condition(&self) -> &ModuleCondition {
        &self.condition
    }

    /// Whether this rule applies for the given tool wielder. Not part of the
    /// break-speed gate chain; hosts filter rules by wielder with this.
    pub fn matches_holder(&self, holder: &HolderState) -> bool {
        self.holder.matches(holder)
    }
}

impl ToolRule for ConditionalMiningSpeed {
    fn loader_id(&self) -> &'static str {
        CONDITIONAL_MINING_SPEED
    }

    fn hooks(&self) -> &'static [HookKind] {
        &[HookKind::BreakSpeed, HookKind::Tooltip]
    }

    fn priority(&self) -> i32 {
        // run percent multipliers after additive boosts
        if self.percent {
            PERCENT_PRIORITY
        } else {
            DEFAULT_PRIORITY
        }
    }

    fn as_break_speed(&self) -> Option<&dyn BreakSpeedHook> {
        Some(self)
    }

    fn as_tooltip(&self) -> Option<&dyn TooltipHook> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BreakSpeedHook for ConditionalMiningSpeed {
    fn on_break_speed(
        &self,
        tool: &ToolView,
        entry: &ModifierEntry,
        event: &mut BreakSpeedEvent,
        is_effective: bool,
        mining_speed_modifier: f32,
    ) {
        if (is_effective || !self.require_effective)
            && self.condition.matches(tool, entry)
            && self.blocks.matches(event.state())
        {
            let adjusted = self.formula.apply(&[
                self.formula.compute_level(entry),
                event.new_speed(),
                tool.multiplier(ToolStat::MiningSpeed) * mining_speed_modifier,
                event.original_speed(),
            ]);
            tracing::trace!(
                modifier = %entry.id,
                speed = event.new_speed(),
                adjusted,
                "mining speed rule applied"
            );
            event.set_new_speed(adjusted);
        }
    }
}

impl TooltipHook for ConditionalMiningSpeed {
    fn stat(&self) -> ToolStat {
        ToolStat::MiningSpeed
    }

    fn is_percent(&self) -> bool {
        self.percent
    }

    fn tooltip_value(&self, tool: &ToolView, entry: &ModifierEntry) -> f32 {
        // isolated contribution: baseline speeds of 1
        self.formula.apply(&[
            self.formula.compute_level(entry),
            1.0,
            tool.multiplier(ToolStat::MiningSpeed),
            1.0,
        ])
    }
}

fn default_true() -> bool {
    true
}

/// Structured-config shape; condition and formula fields are flattened in
#[derive(Debug, Serialize, Deserialize)]
struct RawConfig {
    #[serde(default)]
    blocks: BlockPredicate,
    #[serde(default)]
    entity: EntityPredicate,
    #[serde(default = "default_true")]
    require_effective: bool,
    #[serde(default)]
    percent: bool,
    #[serde(flatten)]
    condition: ModuleCondition,
    #[serde(flatten)]
    formula: FormulaConfig,
}

/// Paired codecs registered under [`CONDITIONAL_MINING_SPEED`]
#[derive(Debug)]
pub struct ConditionalMiningSpeedLoader;

impl RuleLoader for ConditionalMiningSpeedLoader {
    fn id(&self) -> &'static str {
        CONDITIONAL_MINING_SPEED
    }

    fn from_config(&self, value: &serde_json::Value) -> Result<Arc<dyn ToolRule>, ConfigError> {
        let raw = RawConfig::deserialize(value)?;
        // percent selects the formula fallback, so it must be read first
        let formula = ModifierFormula::from_config(&raw.formula, VARIABLES, fallback_for(raw.percent))?;
        Ok(Arc::new(ConditionalMiningSpeed {
            blocks: raw.blocks,
            holder: raw.entity,
            require_effective: raw.require_effective,
            formula,
            percent: raw.percent,
            condition: raw.condition,
        }))
    }

    fn to_config(&self, rule: &dyn ToolRule) -> Result<serde_json::Value, ConfigError> {
        let rule = rule
            .as_any()
            .downcast_ref::<ConditionalMiningSpeed>()
            .ok_or(ConfigError::WrongRuleType {
                expected: CONDITIONAL_MINING_SPEED,
            })?;
        let raw = RawConfig {
            blocks: rule.blocks.clone(),
            entity: rule.holder.clone(),
            require_effective: rule.require_effective,
            percent: rule.percent,
            condition: rule.condition.clone(),
            formula: rule.formula.to_config(),
        };
        Ok(serde_json::to_value(raw)?)
    }

    fn decode(&self, r: &mut WireReader<'_>) -> Result<Arc<dyn ToolRule>, WireError> {
        // fixed field order; percent first so the formula decoder knows its mode
        let percent = r.read_bool()?;
        let blocks = BlockPredicate::decode(r)?;
        let holder = EntityPredicate::decode(r)?;
        let require_effective = r.read_bool()?;
        let formula = ModifierFormula::decode(r, VARIABLES, fallback_for(percent))?;
        let condition = ModuleCondition::decode(r)?;
        Ok(Arc::new(ConditionalMiningSpeed {
            blocks,
            holder,
            require_effective,
            formula,
            percent,
            condition,
        }))
    }

    fn encode(&self, rule: &dyn ToolRule, w: &mut WireWriter) -> Result<(), WireError> {
        let rule = rule
            .as_any()
            .downcast_ref::<ConditionalMiningSpeed>()
            .ok_or(WireError::WrongRuleType {
                expected: CONDITIONAL_MINING_SPEED,
            })?;
        w.write_bool(rule.percent);
        rule.blocks.encode(w);
        rule.holder.encode(w);
        w.write_bool(rule.require_effective);
        rule.formula.encode(w);
        rule.condition.encode(w);
        Ok(())
    }
}

/// Fluent construction mirroring the config defaults
#[derive(Debug)]
pub struct Builder {
    blocks: BlockPredicate,
    holder: EntityPredicate,
    condition: ModuleCondition,
    percent: bool,
    require_effective: bool,
    amount: LeveledValue,
    expression: Option<Expression>,
}

impl Builder {
    fn new(blocks: BlockPredicate) -> Self {
        Self {
            blocks,
            holder: EntityPredicate::Any,
            condition: ModuleCondition::default(),
            percent: false,
            require_effective: true,
            amount: LeveledValue::default(),
            expression: None,
        }
    }

    pub fn holder(mut self, holder: EntityPredicate) -> Self {
        self.holder = holder;
        self
    }

    pub fn condition(mut self, condition: ModuleCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Formula acts as a percent multiplier and displays as one
    pub fn percent(mut self) -> Self {
        self.percent = true;
        self
    }

    /// Apply even when the tool type is not effective on the block
    pub fn allow_ineffective(mut self) -> Self {
        self.require_effective = false;
        self
    }

    pub fn flat(mut self, value: f32) -> Self {
        self.amount.flat = value;
        self
    }

    pub fn each_level(mut self, value: f32) -> Self {
        self.amount.each_level = value;
        self
    }

    /// Use a postfix expression instead of the leveled amount
    pub fn expression(mut self, expression: Expression) -> Self {
        self.expression = Some(expression);
        self
    }

    pub fn build(self) -> ConditionalMiningSpeed {
        let fallback = fallback_for(self.percent);
        let formula = match self.expression {
            Some(expr) => ModifierFormula::expression(expr, fallback, VARIABLES),
            None => ModifierFormula::simple(self.amount, fallback, VARIABLES),
        };
        ConditionalMiningSpeed {
            blocks: self.blocks,
            holder: self.holder,
            require_effective: self.require_effective,
            formula,
            percent: self.percent,
            condition: self.condition,
        }
    }
}
