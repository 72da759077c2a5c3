//! Block States & Block Predicates
//!
//! A block state is the immutable snapshot of a block the rules engine sees
//! during an interaction: namespaced id, string property map, and tag set.
//! `BlockPredicate` is the serializable condition language over block states
//! consumed by tool rules (leaf tests plus and/or/not combinators).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::wire::{WireError, WireReader, WireWriter};

/// Namespaced block identifier, e.g. `quarry:stone`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The six block faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

/// Immutable view of a block being interacted with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub id: BlockId,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl BlockState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: BlockId::new(id),
            properties: BTreeMap::new(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// Serializable predicate over block states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockPredicate {
    /// Matches every block state
    Any,
    /// Matches any of the listed block ids
    Blocks { blocks: Vec<BlockId> },
    /// Matches block states carrying the tag
    Tag { tag: String },
    /// Matches when the named property has exactly this value
    Property { name: String, value: String },
    And { predicates: Vec<BlockPredicate> },
    Or { predicates: Vec<BlockPredicate> },
    Not { predicate: Box<BlockPredicate> },
}

impl Default for BlockPredicate {
    fn default() -> Self {
        Self::Any
    }
}

// Wire variant tags, fixed for protocol compatibility
const TAG_ANY: u8 = 0;
const TAG_BLOCKS: u8 = 1;
const TAG_TAG: u8 = 2;
const TAG_PROPERTY: u8 = 3;
const TAG_AND: u8 = 4;
const TAG_OR: u8 = 5;
const TAG_NOT: u8 = 6;

impl BlockPredicate {
    /// Convenience for a single-block match
    pub fn block(id: impl Into<String>) -> Self {
        Self::Blocks {
            blocks: vec![BlockId::new(id)],
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag { tag: tag.into() }
    }

    pub fn matches(&self, state: &BlockState) -> bool {
        match self {
            Self::Any => true,
            Self::Blocks { blocks } => blocks.contains(&state.id),
            Self::Tag { tag } => state.tags.contains(tag),
            Self::Property { name, value } => state.properties.get(name) == Some(value),
            Self::And { predicates } => predicates.iter().all(|p| p.matches(state)),
            Self::Or { predicates } => predicates.iter().any(|p| p.matches(state)),
            Self::Not { predicate } => !predicate.matches(state),
        }
    }

    pub fn encode(&self, w: &mut WireWriter) {
        match self {
            Self::Any => w.write_u8(TAG_ANY),
            Self::Blocks { blocks } => {
                w.write_u8(TAG_BLOCKS);
                w.write_u16(blocks.len() as u16);
                for b in blocks {
                    w.write_str(b.as_str());
                }
            }
            Self::Tag { tag } => {
                w.write_u8(TAG_TAG);
                w.write_str(tag);
            }
            Self::Property { name, value } => {
                w.write_u8(TAG_PROPERTY);
                w.write_str(name);
                w.write_str(value);
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
            TAG_BLOCKS => {
                let count = r.read_u16()?;
                let mut blocks = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    blocks.push(BlockId::new(r.read_str()?));
                }
                Self::Blocks { blocks }
            }
            TAG_TAG => Self::Tag { tag: r.read_str()? },
            TAG_PROPERTY => Self::Property {
                name: r.read_str()?,
                value: r.read_str()?,
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
                    what: "block predicate",
                    tag,
                })
            }
        })
    }
}
