//! Integration tests: structured-config round-trips through the registry.
//!
//! Simulates the datapack pipeline:
//!   1. Author a rule in JSON (or build one and serialize it)
//!   2. Load it through the registry / pack loader
//!   3. Serialize it back and reload → verify an equivalent rule
//!   4. Evaluate both against the same event → identical speeds

use std::io::Write;
use std::sync::Arc;

use quarry_core::block::{BlockPredicate, BlockState, Direction};
use quarry_core::event::BreakSpeedEvent;
use quarry_core::loader::load_rule_dir;
use quarry_core::registry::standard_registry;
use quarry_core::rules::mining_speed::{ConditionalMiningSpeed, CONDITIONAL_MINING_SPEED};
use quarry_core::rules::{RuleSet, ToolRule};
use quarry_core::tool::{ModifierEntry, ToolView};

fn as_mining(rule: &Arc<dyn ToolRule>) -> &ConditionalMiningSpeed {
    rule.as_any()
        .downcast_ref::<ConditionalMiningSpeed>()
        .expect("not a conditional_mining_speed rule")
}

#[test]
fn roundtrip_authored_json() -> anyhow::Result<()> {
    let registry = standard_registry();
    let authored = serde_json::json!({
        "type": "conditional_mining_speed",
        "blocks": { "type": "tag", "tag": "mineable/pickaxe" },
        "entity": { "type": "on_ground" },
        "require_effective": false,
        "percent": true,
        "modifier_level": { "min": 1, "max": 3 },
        "amount": 0.25
    });

    let rule = registry.rule_from_value(&authored)?;
    let back = registry.rule_to_value(rule.as_ref())?;
    assert_eq!(back["type"], CONDITIONAL_MINING_SPEED);
    let reloaded = registry.rule_from_value(&back)?;
    assert_eq!(as_mining(&reloaded), as_mining(&rule));
    Ok(())
}

#[test]
fn roundtrip_preserves_evaluation() -> anyhow::Result<()> {
    let registry = standard_registry();
    let rule = ConditionalMiningSpeed::blocks(BlockPredicate::block("quarry:stone"))
        .each_level(0.5)
        .percent()
        .build();

    let value = registry.rule_to_value(&rule)?;
    let reloaded = registry.rule_from_value(&value)?;

    let tool = ToolView::new();
    let entry = ModifierEntry::new("quarry:swift", 3);
    let mut a = BreakSpeedEvent::new(BlockState::new("quarry:stone"), Direction::Up, 4.0);
    let mut b = a.clone();

    use quarry_core::rules::BreakSpeedHook;
    rule.on_break_speed(&tool, &entry, &mut a, true, 1.0);
    as_mining(&reloaded)
        .as_break_speed()
        .expect("break speed hook")
        .on_break_speed(&tool, &entry, &mut b, true, 1.0);
    assert_eq!(a.new_speed(), b.new_speed());
    // 4.0 * (1 + 0.5 * 3)
    assert_eq!(a.new_speed(), 10.0);
    Ok(())
}

#[test]
fn loaded_pack_drives_rule_set() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut file = std::fs::File::create(dir.path().join("stone.json"))?;
    file.write_all(
        br#"[
            {
                "type": "conditional_mining_speed",
                "blocks": { "type": "blocks", "blocks": ["quarry:stone"] },
                "percent": true,
                "amount": { "flat": 0.5 }
            },
            {
                "type": "conditional_mining_speed",
                "blocks": { "type": "blocks", "blocks": ["quarry:stone"] },
                "amount": { "flat": 2.0 }
            }
        ]"#,
    )?;

    let registry = standard_registry();
    let report = load_rule_dir(&registry, dir.path())?;
    assert!(report.is_clean());
    assert_eq!(report.rules.len(), 2);

    // file order is percent-first, but the rule set reorders by priority
    let mut rules = RuleSet::new();
    for loaded in report.rules {
        rules.insert(loaded.rule, ModifierEntry::new("quarry:pack", 1));
    }
    let tool = ToolView::new();
    let mut event = BreakSpeedEvent::new(BlockState::new("quarry:stone"), Direction::North, 1.0);
    rules.apply_break_speed(&tool, &mut event, true, 1.0);
    // additive first: (1 + 2) * 1.5
    assert_eq!(event.new_speed(), 4.5);
    Ok(())
}

#[test]
fn field_order_is_insignificant() -> anyhow::Result<()> {
    let registry = standard_registry();
    let a = serde_json::json!({
        "type": "conditional_mining_speed",
        "amount": 1.0,
        "percent": true,
        "blocks": { "type": "any" }
    });
    // same fields, different textual order
    let b: serde_json::Value = serde_json::from_str(
        r#"{
            "blocks": { "type": "any" },
            "percent": true,
            "type": "conditional_mining_speed",
            "amount": 1.0
        }"#,
    )?;
    let rule_a = registry.rule_from_value(&a)?;
    let rule_b = registry.rule_from_value(&b)?;
    assert_eq!(as_mining(&rule_a), as_mining(&rule_b));
    assert!(as_mining(&rule_a).percent());
    Ok(())
}
