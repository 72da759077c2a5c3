//! Tooltip Stat-Line Rendering
//!
//! Turns a rule's isolated contribution (its tooltip value against baseline
//! speeds of 1) into a display line: `+2 Mining Speed` for flat boosts,
//! `+50% Mining Speed` for percent rules. Zero contributions render nothing.

use crate::rules::{RuleSet, TooltipHook};
use crate::tool::{ModifierEntry, ToolView};

/// Contributions this close to zero are suppressed
const EPSILON: f32 = 1e-6;

/// One hook's tooltip line, or `None` for a zero contribution
pub fn stat_line(
    hook: &dyn TooltipHook,
    tool: &ToolView,
    entry: &ModifierEntry,
) -> Option<String> {
    // tooltip values are computed against a baseline of 1
    let contribution = hook.tooltip_value(tool, entry) - 1.0;
    if contribution.abs() < EPSILON {
        return None;
    }
    let stat = hook.stat().display_name();
    if hook.is_percent() {
        Some(format!("{:+}% {}", contribution * 100.0, stat))
    } else {
        Some(format!("{:+} {}", contribution, stat))
    }
}

/// All non-zero tooltip lines for a tool's rule chain, in priority order
pub fn tooltip_lines(rules: &RuleSet, tool: &ToolView) -> Vec<String> {
    rules
        .tooltip_hooks()
        .filter_map(|(hook, entry)| stat_line(hook, tool, entry))
        .collect()
}
