//! Generic Modifier Applicability Conditions
//!
//! Every rule carries a `ModuleCondition` gating whether it applies at all for
//! a given tool and modifier entry: a tool predicate plus an inclusive level
//! range. The default condition accepts everything.

use serde::{Deserialize, Serialize};

use crate::tool::{ModifierEntry, ToolPredicate, ToolView};
use crate::wire::{WireError, WireReader, WireWriter};

/// Inclusive integer range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    #[serde(default)]
    pub min: u32,
    #[serde(default = "IntRange::unbounded_max")]
    pub max: u32,
}

impl IntRange {
    fn unbounded_max() -> u32 {
        u32::MAX
    }

    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Exactly this level
    pub fn exactly(level: u32) -> Self {
        Self {
            min: level,
            max: level,
        }
    }

    pub fn min_level(min: u32) -> Self {
        Self {
            min,
            max: u32::MAX,
        }
    }

    pub fn contains(&self, level: u32) -> bool {
        (self.min..=self.max).contains(&level)
    }
}

impl Default for IntRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: u32::MAX,
        }
    }
}

/// Standard applicability condition shared by all rule types
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleCondition {
    #[serde(default)]
    pub tool: ToolPredicate,
    #[serde(default)]
    pub modifier_level: IntRange,
}

impl ModuleCondition {
    pub fn matches(&self, tool: &ToolView, entry: &ModifierEntry) -> bool {
        self.tool.matches(tool) && self.modifier_level.contains(entry.level)
    }

    pub fn encode(&self, w: &mut WireWriter) {
        self.tool.encode(w);
        w.write_u32(self.modifier_level.min);
        w.write_u32(self.modifier_level.max);
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let tool = ToolPredicate::decode(r)?;
        let min = r.read_u32()?;
        let max = r.read_u32()?;
        Ok(Self {
            tool,
            modifier_level: IntRange::new(min, max),
        })
    }
}
