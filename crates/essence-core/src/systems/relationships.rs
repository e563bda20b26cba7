//! Relationship system - passive growth and idle decay over a window

use essence_logic::catalog::Catalog;
use essence_logic::config::SimConfig;
use essence_logic::effects::{EffectKey, EffectSet};

use crate::state::GameState;

/// Passive growth rate in points per hour from the active effects.
///
/// Growth is a gain, so it is scaled by the relationship gain multiplier
/// the same way positive interaction deltas are.
pub fn passive_growth_per_hour(effects: &EffectSet) -> f64 {
    effects.get(EffectKey::PassiveRelationshipGrowth)
        * effects.get(EffectKey::RelationshipGainMultiplier)
}

/// Evolve every relationship over `[state.now, state.now + elapsed]`.
pub fn relationship_system(
    state: &mut GameState,
    catalog: &Catalog,
    config: &SimConfig,
    effects: &EffectSet,
    elapsed: f64,
) {
    state.relationships.advance(
        &catalog.npcs,
        &config.relationships,
        state.now,
        elapsed,
        passive_growth_per_hour(effects),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use essence_logic::catalog::CatalogFile;
    use essence_logic::constants::SECONDS_PER_DAY;
    use essence_logic::relationships::{NpcDefinition, RelationshipScale};

    fn catalog(initial: f64) -> Catalog {
        let mut file = CatalogFile::default();
        let mut npc = NpcDefinition::new("mira", RelationshipScale::Simple);
        npc.initial_value = initial;
        file.npcs.push(npc);
        Catalog::from_file(file).unwrap()
    }

    #[test]
    fn test_growth_scaled_by_gain_multiplier() {
        let effects = EffectSet::neutral()
            .with(EffectKey::PassiveRelationshipGrowth, 0.5)
            .with(EffectKey::RelationshipGainMultiplier, 2.0);
        assert_eq!(passive_growth_per_hour(&effects), 1.0);
        assert_eq!(passive_growth_per_hour(&EffectSet::neutral()), 0.0);
    }

    #[test]
    fn test_decay_after_grace_period() {
        let catalog = catalog(90.0);
        let mut state = GameState::new(&catalog, 0.0);
        relationship_system(
            &mut state,
            &catalog,
            &SimConfig::default(),
            &EffectSet::neutral(),
            4.0 * SECONDS_PER_DAY,
        );
        let value = state.relationships.get("mira").unwrap().value;
        assert!((value - 87.0).abs() < 1e-9);
    }
}
