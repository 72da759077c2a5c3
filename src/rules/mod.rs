//! Tool Rule Framework
//!
//! A rule is an immutable, configuration-driven object implementing one or
//! more capability hooks. Rather than inheritance, a rule declares the hook
//! kinds it supports and exposes each capability through an accessor; hosts
//! register the rule only under the extension points it declares.
//!
//! `RuleSet` is the priority-ordered dispatch chain for one tool: rules run
//! ascending by priority (larger values later), ties keep insertion order, and
//! each break-speed hook reads the event speed left by the previous one.

pub mod mining_speed;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::event::BreakSpeedEvent;
use crate::tool::{ModifierEntry, ToolStat, ToolView};

/// Priority for rules that do not request one
pub const DEFAULT_PRIORITY: i32 = 100;
/// Percent-mode rules run after additive ones
pub const PERCENT_PRIORITY: i32 = 150;

/// Capability hooks a rule can support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    BreakSpeed,
    Tooltip,
}

/// Adjusts mining speed during a break-speed event
pub trait BreakSpeedHook {
    fn on_break_speed(
        &self,
        tool: &ToolView,
        entry: &ModifierEntry,
        event: &mut BreakSpeedEvent,
        is_effective: bool,
        mining_speed_modifier: f32,
    );
}

/// Contributes a stat line to the tool's tooltip
pub trait TooltipHook {
    fn stat(&self) -> ToolStat;
    /// Whether the contribution displays as a percentage
    fn is_percent(&self) -> bool;
    /// The rule's isolated contribution, independent of block/entity context
    fn tooltip_value(&self, tool: &ToolView, entry: &ModifierEntry) -> f32;
}

/// A configured rule instance
pub trait ToolRule: fmt::Debug + Send + Sync {
    /// Load-time identifier this rule's codecs are registered under
    fn loader_id(&self) -> &'static str;

    /// Hook kinds this rule supports
    fn hooks(&self) -> &'static [HookKind];

    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn as_break_speed(&self) -> Option<&dyn BreakSpeedHook> {
        None
    }

    fn as_tooltip(&self) -> Option<&dyn TooltipHook> {
        None
    }

    /// Downcast support for the loader registry
    fn as_any(&self) -> &dyn Any;
}

struct RuleSlot {
    rule: Arc<dyn ToolRule>,
    entry: ModifierEntry,
    priority: i32,
}

/// Priority-ordered rule chain for a single tool
#[derive(Default)]
pub struct RuleSet {
    slots: Vec<RuleSlot>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rule: Arc<dyn ToolRule>, entry: ModifierEntry) {
        let priority = rule.priority();
        self.slots.push(RuleSlot {
            rule,
            entry,
            priority,
        });
        // Stable sort keeps insertion order within a priority tier
        self.slots.sort_by_key(|slot| slot.priority);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Runs every break-speed hook against the event, in priority order
    pub fn apply_break_speed(
        &self,
        tool: &ToolView,
        event: &mut BreakSpeedEvent,
        is_effective: bool,
        mining_speed_modifier: f32,
    ) {
        for slot in &self.slots {
            if let Some(hook) = slot.rule.as_break_speed() {
                hook.on_break_speed(tool, &slot.entry, event, is_effective, mining_speed_modifier);
            }
        }
    }

    /// Tooltip hooks with their entries, in priority order
    pub fn tooltip_hooks(&self) -> impl Iterator<Item = (&dyn TooltipHook, &ModifierEntry)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.rule.as_tooltip().map(|hook| (hook, &slot.entry)))
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.slots.len())
            .finish()
    }
}
