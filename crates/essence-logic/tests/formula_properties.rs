//! Property tests for the pure formulas: cost growth, bulk pricing,
//! relationship clamping and tier consistency.

use std::collections::BTreeMap;

use essence_logic::catalog::ProducerDefinition;
use essence_logic::config::RelationshipRules;
use essence_logic::relationships::{
    ChangeSource, NpcDefinition, RelationshipScale, RelationshipTracker, TierTables,
};
use essence_logic::scaling::{bulk_cost, cost, max_affordable, production};
use proptest::prelude::*;

/// Producers whose unit cost rises by at least one whole point per
/// purchase, the range where flooring keeps costs strictly increasing.
fn producer() -> impl Strategy<Value = ProducerDefinition> {
    (1.0f64..500.0, 1.01f64..2.5, 0.0f64..50.0, 1.0f64..2.0).prop_filter_map(
        "unit cost must grow by at least one point",
        |(base_cost, cost_multiplier, base_production, production_multiplier)| {
            let base_cost = base_cost.floor();
            if base_cost * (cost_multiplier - 1.0) < 1.01 {
                return None;
            }
            let mut def = ProducerDefinition::generator(
                "p",
                base_cost,
                cost_multiplier,
                base_production,
            );
            def.production_multiplier = production_multiplier;
            Some(def)
        },
    )
}

fn npcs(scale: RelationshipScale) -> BTreeMap<String, NpcDefinition> {
    let mut map = BTreeMap::new();
    map.insert("npc".to_string(), NpcDefinition::new("npc", scale));
    map
}

fn scale() -> impl Strategy<Value = RelationshipScale> {
    prop_oneof![
        Just(RelationshipScale::Simple),
        Just(RelationshipScale::Extended)
    ]
}

proptest! {
    #[test]
    fn cost_strictly_increases_with_owned(def in producer(), owned in 0u64..60) {
        prop_assert!(cost(&def, owned + 1) > cost(&def, owned));
        prop_assert!(cost(&def, owned) >= 0.0);
    }

    #[test]
    fn cost_at_zero_is_base_cost(def in producer()) {
        prop_assert_eq!(cost(&def, 0), def.base_cost.floor());
    }

    #[test]
    fn unowned_producers_produce_nothing(def in producer(), level in 1u32..50) {
        prop_assert_eq!(production(&def, 0, level), 0.0);
    }

    #[test]
    fn bulk_cost_is_sum_of_unit_costs(def in producer(), owned in 0u64..30, amount in 1u64..20) {
        let expected: f64 = (owned..owned + amount).map(|n| cost(&def, n)).sum();
        prop_assert!((bulk_cost(&def, owned, amount) - expected).abs() < 1e-6);
    }

    #[test]
    fn max_affordable_fits_budget(def in producer(), owned in 0u64..20, budget in 0.0f64..100_000.0) {
        let n = max_affordable(&def, owned, budget);
        prop_assert!(bulk_cost(&def, owned, n) <= budget);
        prop_assert!(bulk_cost(&def, owned, n + 1) > budget);
    }

    #[test]
    fn changes_stay_clamped_and_tiers_follow_value(
        scale in scale(),
        deltas in prop::collection::vec(-250.0f64..250.0, 1..20),
        idle_days in 0.0f64..30.0,
    ) {
        let npcs = npcs(scale);
        let tables = TierTables::default();
        let rules = RelationshipRules::default();
        let mut tracker = RelationshipTracker::from_definitions(&npcs, 0.0);

        for delta in deltas {
            let value = tracker
                .apply_change(&npcs, "npc", delta, ChangeSource::Interaction, 0.0, 1.0)
                .unwrap();
            prop_assert!(scale.contains(value));
            prop_assert_eq!(
                tracker.tier(&npcs, &tables, "npc").unwrap(),
                tables.classify(scale, value)
            );
        }

        tracker.decay_tick(&npcs, &rules, 0.0, idle_days * 86_400.0);
        let value = tracker.get("npc").unwrap().value;
        prop_assert!(scale.contains(value));
        prop_assert_eq!(
            tracker.tier(&npcs, &tables, "npc").unwrap(),
            tables.classify(scale, value)
        );
    }
}
