//! Tool-Holder States & Entity Predicates
//!
//! Rules can be conditioned on the living entity wielding the tool. The host
//! hands us a `HolderState` snapshot; `EntityPredicate` is the serializable
//! condition language over it, mirroring the block predicate shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::wire::{WireError, WireReader, WireWriter};

/// Broad entity classification used by holder predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Player,
    Mob,
    Boss,
}

/// Immutable snapshot of the entity holding the tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderState {
    pub category: EntityCategory,
    #[serde(default)]
    pub on_ground: bool,
    #[serde(default)]
    pub submerged: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl HolderState {
    pub fn player() -> Self {
        Self {
            category: EntityCategory::Player,
            on_ground: true,
            submerged: false,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// Serializable predicate over tool holders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityPredicate {
    /// Matches every holder
    Any,
    Category { category: EntityCategory },
    /// Holder is standing on solid ground
    OnGround,
    /// Holder is underwater
    Submerged,
    Tag { tag: String },
    And { predicates: Vec<EntityPredicate> },
    Or { predicates: Vec<EntityPredicate> },
    Not { predicate: Box<EntityPredicate> },
}

impl Default for EntityPredicate {
    fn default() -> Self {
        Self::Any
    }
}

const TAG_ANY: u8 = 0;
const TAG_CATEGORY: u8 = 1;
const TAG_ON_GROUND: u8 = 2;
const TAG_SUBMERGED: u8 = 3;
const TAG_TAG: u8 = 4;
const TAG_AND: u8 = 5;
const TAG_OR: u8 = 6;
const TAG_NOT: u8 = 7;

fn category_tag(category: EntityCategory) -> u8 {
    match category {
        EntityCategory::Player => 0,
        EntityCategory::Mob => 1,
        EntityCategory::Boss => 2,
    }
}

fn category_from_tag(tag: u8) -> Result<EntityCategory, WireError> {
    Ok(match tag {
        0 => EntityCategory::Player,
        1 => EntityCategory::Mob,
        2 => EntityCategory::Boss,
        tag => {
            return Err(WireError::UnknownTag {
                what: "entity category",
                tag,
            })
        }
    })
}

impl EntityPredicate {
    pub fn matches(&self, holder: &HolderState) -> bool {
        match self {
            Self::Any => true,
            Self::Category { category } => holder.category == *category,
            Self::OnGround => holder.on_ground,
            Self::Submerged => holder.submerged,
            Self::Tag { tag } => holder.tags.contains(tag),
            Self::And { predicates } => predicates.iter().all(|p| p.matches(holder)),
            Self::Or { predicates } => predicates.iter().any(|p| p.matches(holder)),
            Self::Not { predicate } => !predicate.matches(holder),
        }
    }

    pub fn encode(&self, w: &mut WireWriter) {
        match self {
            Self::Any => w.write_u8(TAG_ANY),
            Self::Category { category } => {
                w.write_u8(TAG_CATEGORY);
                w.write_u8(category_tag(*category));
            }
            Self::OnGround => w.write_u8(TAG_ON_GROUND),
            Self::Submerged => w.write_u8(TAG_SUBMERGED),
            Self::Tag { tag } => {
                w.write_u8(TAG_TAG);
                w.write_str(tag);
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
            TAG_CATEGORY => Self::Category {
                category: category_from_tag(r.read_u8()?)?,
            },
            TAG_ON_GROUND => Self::OnGround,
            TAG_SUBMERGED => Self::Submerged,
            TAG_TAG => Self::Tag { tag: r.read_str()? },
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
                    what: "entity predicate",
                    tag,
                })
            }
        })
    }
}
