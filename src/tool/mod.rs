//! Tool Views, Stats & Modifier Entries
//!
//! A `ToolView` is the read-only snapshot of a built tool that rules evaluate
//! against: per-stat multipliers from the tool's materials, the tool's tags,
//! and its installed modifiers. Rules never mutate tools.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::wire::{WireError, WireReader, WireWriter};

/// Numeric tool stats that materials and modifiers can scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStat {
    MiningSpeed,
    AttackDamage,
    AttackSpeed,
    Durability,
}

impl ToolStat {
    /// Display name for tooltips
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MiningSpeed => "Mining Speed",
            Self::AttackDamage => "Attack Damage",
            Self::AttackSpeed => "Attack Speed",
            Self::Durability => "Durability",
        }
    }
}

/// Namespaced modifier identifier, e.g. `quarry:stonebound`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifierId(pub String);

impl ModifierId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A modifier installed on a tool at some level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierEntry {
    pub id: ModifierId,
    pub level: u32,
}

impl ModifierEntry {
    pub fn new(id: impl Into<String>, level: u32) -> Self {
        Self {
            id: ModifierId::new(id),
            level,
        }
    }
}

/// Read-only view of a built tool
#[derive(Debug, Clone, Default)]
pub struct ToolView {
    multipliers: HashMap<ToolStat, f32>,
    tags: BTreeSet<String>,
    modifiers: Vec<ModifierEntry>,
}

impl ToolView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_multiplier(mut self, stat: ToolStat, value: f32) -> Self {
        self.multipliers.insert(stat, value);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_modifier(mut self, id: impl Into<String>, level: u32) -> Self {
        self.modifiers.push(ModifierEntry::new(id, level));
        self
    }

    /// Stat multiplier from the tool's materials; unset stats multiply by 1.0
    pub fn multiplier(&self, stat: ToolStat) -> f32 {
        self.multipliers.get(&stat).copied().unwrap_or(1.0)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn modifiers(&self) -> &[ModifierEntry] {
        &self.modifiers
    }

    pub fn modifier_level(&self, id: &str) -> Option<u32> {
        self.modifiers
            .iter()
            .find(|m| m.id.as_str() == id)
            .map(|m| m.level)
    }
}

/// Serializable predicate over tool views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolPredicate {
    /// Matches every tool
    Any,
    Tag { tag: String },
    HasModifier { modifier: ModifierId },
    And { predicates: Vec<ToolPredicate> },
    Or { predicates: Vec<ToolPredicate> },
    Not { predicate: Box<ToolPredicate> },
}

impl Default for ToolPredicate {
    fn default() -> Self {
        Self::Any
    }
}

const TAG_ANY: u8 = 0;
const TAG_TAG: u8 = 1;
const TAG_HAS_MODIFIER: u8 = 2;
const TAG_AND: u8 = 3;
const TAG_OR: u8 = 4;
const TAG_NOT: u8 = 5;

impl ToolPredicate {
    pub fn matches(&self, tool: &ToolView) -> bool {
        match self {
            Self::Any => true,
            Self::Tag { tag } => tool.has_tag(tag),
            Self::HasModifier { modifier } => tool.modifier_level(modifier.as_str()).is_some(),
            Self::And { predicates } => predicates.iter().all(|p| p.matches(tool)),
            Self::Or { predicates } => predicates.iter().any(|p| p.matches(tool)),
            Self::Not { predicate } => !predicate.matches(tool),
        }
    }

    pub fn encode(&self, w: &mut WireWriter) {
        match self {
            Self::Any => w.write_u8(TAG_ANY),
            Self::Tag { tag } => {
                w.write_u8(TAG_TAG);
                w.write_str(tag);
            }
            Self::HasModifier { modifier } => {
                w.write_u8(TAG_HAS_MODIFIER);
                w.write_str(modifier.as_str());
            }
            Self::And { predicates } => {
                w.write_u8(TAG_AND);
                w.write_u16(predicates.len() as u16);
                for p in predicates {
                    p.encode(w);
                }
            }
            Self::Or { predicates } => {
                w.write_u8(TAG_OR);
                w.write_u16(predicates.len() as u16);
                for p in predicates {
                    p.encode(w);
                }
            }
            Self::Not { predicate } => {
                w.write_u8(TAG_NOT);
                predicate.encode(w);
            }
        }
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(match r.read_u8()? {
            TAG_ANY => Self::Any,
            TAG_TAG => Self::Tag { tag: r.read_str()? },
            TAG_HAS_MODIFIER => Self::HasModifier {
                modifier: ModifierId::new(r.read_str()?),
            },
            TAG_AND => {
                let count = r.read_u16()?;
                let mut predicates = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    predicates.push(Self::decode(r)?);
                }
                Self::And { predicates }
            }
            TAG_OR => {
                let count = r.read_u16()?;
                let mut predicates = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    predicates.push(Self::decode(r)?);
                }
                Self::Or { predicates }
            }
            TAG_NOT => Self::Not {
                predicate: Box::new(Self::decode(r)?),
            },
            tag => {
                return Err(WireError::UnknownTag {
                    what: "tool predicate",
                    tag,
                })
            }
        })
    }
}
