//! Quarry - Rules Core Library
//!
//! This crate provides the data-driven rules logic for the Quarry mining game's
//! tool/equipment modifier system:
//! - Block-state and tool-holder predicates (serializable, combinable)
//! - Modifier formulas (leveled values and postfix expressions, boost/percent fallback)
//! - Generic modifier applicability conditions
//! - Conditional mining-speed rules (gated speed adjustment, percent-after-additive priority)
//! - Rule loader registry (config and wire codecs keyed by rule type id)
//! - Rule pack loading from disk
//! - Tooltip stat-line rendering
//!
//! Rules are immutable once constructed and evaluated synchronously inside the
//! host's break-speed callback; nothing here blocks, locks, or mutates shared state.

pub mod block;
pub mod condition;
pub mod entity;
pub mod event;
pub mod formula;
pub mod loader;
pub mod logging;
pub mod registry;
pub mod rules;
pub mod tool;
pub mod tooltip;
pub mod wire;
