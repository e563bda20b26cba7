//! The game-state aggregate.
//!
//! Every mutable piece of simulation state lives in one [`GameState`] value
//! that is passed explicitly into each operation. Ticks and commands work on
//! a clone and replace the original only when they succeed, so no caller can
//! observe a half-applied change.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use essence_logic::catalog::Catalog;
use essence_logic::combat::PlayerProfile;
use essence_logic::config::SimConfig;
use essence_logic::effects::{self, EffectSet, TraitKind};
use essence_logic::ledger::ProducerLedger;
use essence_logic::relationships::RelationshipTracker;
use essence_logic::requirements::Progress;
use essence_logic::resources::{Resource, ResourcePool};
use essence_logic::SimError;

/// Named countdown timers in seconds remaining.
pub type Cooldowns = BTreeMap<String, f64>;

/// Cooldown key for direct interaction with an NPC.
pub fn interaction_cooldown_key(npc_id: &str) -> String {
    format!("interact:{npc_id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Simulated time this state is current as of.
    pub now: f64,
    pub resources: ResourcePool,
    pub producers: ProducerLedger,
    pub relationships: RelationshipTracker,
    pub acquired_traits: BTreeSet<String>,
    pub equipped_traits: BTreeSet<String>,
    pub cooldowns: Cooldowns,
    pub player: PlayerProfile,
}

impl GameState {
    /// Fresh game from the catalog's starting state.
    pub fn new(catalog: &Catalog, now: f64) -> Self {
        let mut resources = ResourcePool::new();
        for (resource, amount) in &catalog.start.resources {
            resources.restore(*resource, *amount, 0.0);
        }
        Self {
            now,
            resources,
            producers: ProducerLedger::from_definitions(&catalog.producers, now),
            relationships: RelationshipTracker::from_definitions(&catalog.npcs, now),
            acquired_traits: BTreeSet::new(),
            equipped_traits: BTreeSet::new(),
            cooldowns: Cooldowns::new(),
            player: PlayerProfile::new(catalog.start.player),
        }
    }

    /// Effects of the currently acquired and equipped traits, rebuilt from
    /// definitions on every call.
    pub fn effects(&self, catalog: &Catalog) -> EffectSet {
        effects::resolve(&self.acquired_traits, &self.equipped_traits, &catalog.traits)
    }

    /// Snapshot used to evaluate unlock requirements.
    pub fn progress(&self) -> Progress {
        Progress {
            resources: self.resources.clone(),
            owned: self.producers.owned_counts(),
            traits: self.acquired_traits.clone(),
        }
    }

    pub fn production_rates(&self, catalog: &Catalog) -> BTreeMap<Resource, f64> {
        self.producers
            .total_production_by_resource(&catalog.producers, &self.effects(catalog))
    }

    /// Seconds left on a cooldown, 0 when absent.
    pub fn cooldown(&self, key: &str) -> f64 {
        self.cooldowns.get(key).copied().unwrap_or(0.0)
    }

    /// Check every invariant a tick or command relies on.
    pub fn validate(&self, catalog: &Catalog, config: &SimConfig) -> Result<(), SimError> {
        if !self.now.is_finite() {
            return Err(SimError::corrupted("state timestamp is not a number"));
        }
        self.resources.validate()?;
        self.producers.validate(&catalog.producers)?;
        self.relationships.validate(&catalog.npcs)?;

        for id in &self.acquired_traits {
            if catalog.trait_def(id).is_none() {
                return Err(SimError::corrupted(format!("unknown trait `{id}` acquired")));
            }
        }
        for id in &self.equipped_traits {
            let equippable = catalog
                .trait_def(id)
                .map(|def| def.kind == TraitKind::Equippable)
                .unwrap_or(false);
            if !equippable || !self.acquired_traits.contains(id) {
                return Err(SimError::corrupted(format!(
                    "trait `{id}` equipped but not an acquired equippable trait"
                )));
            }
        }
        if self.equipped_traits.len() > config.max_equipped_traits {
            return Err(SimError::corrupted(format!(
                "{} traits equipped, limit is {}",
                self.equipped_traits.len(),
                config.max_equipped_traits
            )));
        }

        for (key, remaining) in &self.cooldowns {
            if !remaining.is_finite() || *remaining < 0.0 {
                return Err(SimError::corrupted(format!("cooldown `{key}` is {remaining}")));
            }
        }
        self.player.stats.validate("player")?;
        if self.player.level == 0 {
            return Err(SimError::corrupted("player level 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use essence_logic::catalog::{CatalogFile, ProducerDefinition};
    use essence_logic::effects::{EffectKey, TraitDefinition};

    fn catalog() -> Catalog {
        let mut file = CatalogFile::default();
        file.producers
            .push(ProducerDefinition::generator("wisp", 10.0, 1.15, 0.1));
        let mut ring = TraitDefinition::passive("ring", EffectKey::AttackDamageMultiplier, 1.2);
        ring.kind = TraitKind::Equippable;
        file.traits.push(ring);
        file.start.resources.insert(Resource::Essence, 25.0);
        Catalog::from_file(file).unwrap()
    }

    #[test]
    fn test_new_state_uses_starting_resources() {
        let catalog = catalog();
        let state = GameState::new(&catalog, 50.0);
        assert_eq!(state.resources.amount(Resource::Essence), 25.0);
        assert_eq!(state.resources.lifetime(Resource::Essence), 0.0);
        assert_eq!(state.producers.get("wisp").unwrap().last_collected_at, 50.0);
        assert!(state.validate(&catalog, &SimConfig::default()).is_ok());
    }

    #[test]
    fn test_equipped_trait_must_be_acquired() {
        let catalog = catalog();
        let mut state = GameState::new(&catalog, 0.0);
        state.equipped_traits.insert("ring".into());
        assert!(matches!(
            state.validate(&catalog, &SimConfig::default()),
            Err(SimError::CorruptedSaveState(_))
        ));
        state.acquired_traits.insert("ring".into());
        assert!(state.validate(&catalog, &SimConfig::default()).is_ok());
    }

    #[test]
    fn test_negative_cooldown_rejected() {
        let catalog = catalog();
        let mut state = GameState::new(&catalog, 0.0);
        state.cooldowns.insert("x".into(), -1.0);
        assert!(state.validate(&catalog, &SimConfig::default()).is_err());
    }
}
