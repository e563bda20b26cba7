//! Static definition tables: producers, traits, NPCs, enemies, and the
//! starting state of a new game.
//!
//! Definitions are validated once when the catalog is built. Anything
//! malformed is rejected with [`SimError::InvalidDefinition`]; nothing is
//! silently coerced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::{CombatStats, Element, StatusEffect};
use crate::effects::TraitDefinition;
use crate::error::SimError;
use crate::relationships::NpcDefinition;
use crate::requirements::Requirement;
use crate::resources::Resource;
use crate::scaling::LevelCost;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProducerKind {
    #[default]
    EssenceGenerator,
    Minion,
}

/// Formula parameters for one producer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ProducerKind,
    /// Resource this producer generates.
    #[serde(default)]
    pub produces: Resource,
    /// Resource its units are bought with.
    #[serde(default)]
    pub cost_resource: Resource,
    pub base_cost: f64,
    pub cost_multiplier: f64,
    pub base_production: f64,
    pub production_multiplier: f64,
    #[serde(default)]
    pub starts_unlocked: bool,
    #[serde(default)]
    pub unlock_requirement: Option<Requirement>,
    #[serde(default)]
    pub level_cost: Option<LevelCost>,
    #[serde(default)]
    pub max_level: Option<u32>,
}

impl ProducerDefinition {
    /// Unlocked essence generator with no level costs; handy in tests.
    pub fn generator(
        id: &str,
        base_cost: f64,
        cost_multiplier: f64,
        base_production: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind: ProducerKind::EssenceGenerator,
            produces: Resource::Essence,
            cost_resource: Resource::Essence,
            base_cost,
            cost_multiplier,
            base_production,
            production_multiplier: 1.0,
            starts_unlocked: true,
            unlock_requirement: None,
            level_cost: None,
            max_level: None,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.id.trim().is_empty() {
            return Err(SimError::invalid("<producer>", "empty producer id"));
        }
        if !self.base_cost.is_finite() || self.base_cost <= 0.0 {
            return Err(SimError::invalid(&self.id, "baseCost must be positive"));
        }
        if !self.cost_multiplier.is_finite() || self.cost_multiplier <= 1.0 {
            return Err(SimError::invalid(
                &self.id,
                format!("costMultiplier must be > 1, got {}", self.cost_multiplier),
            ));
        }
        if !self.base_production.is_finite() || self.base_production < 0.0 {
            return Err(SimError::invalid(&self.id, "baseProduction must be non-negative"));
        }
        if !self.production_multiplier.is_finite() || self.production_multiplier < 1.0 {
            return Err(SimError::invalid(
                &self.id,
                format!(
                    "productionMultiplier must be >= 1, got {}",
                    self.production_multiplier
                ),
            ));
        }
        if let Some(table) = &self.level_cost {
            if !table.base.is_finite() || table.base < 0.0 {
                return Err(SimError::invalid(&self.id, "levelCost.base must be non-negative"));
            }
            if !table.growth.is_finite() || table.growth < 1.0 {
                return Err(SimError::invalid(&self.id, "levelCost.growth must be >= 1"));
            }
        }
        if self.max_level == Some(0) {
            return Err(SimError::invalid(&self.id, "maxLevel must be at least 1"));
        }
        Ok(())
    }
}

/// A combat opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyDefinition {
    pub id: String,
    pub name: String,
    pub stats: CombatStats,
    #[serde(default)]
    pub element: Element,
    /// Incoming damage multiplier per element.
    #[serde(default)]
    pub weaknesses: BTreeMap<Element, f64>,
    /// Status applied to the player on every landed hit.
    #[serde(default)]
    pub on_hit: Option<StatusEffect>,
    #[serde(default)]
    pub essence_reward: f64,
    #[serde(default)]
    pub experience: u64,
}

impl EnemyDefinition {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.id.trim().is_empty() {
            return Err(SimError::invalid("<enemy>", "empty enemy id"));
        }
        self.stats.validate(&self.id)?;
        for (element, factor) in &self.weaknesses {
            if !factor.is_finite() || *factor < 0.0 {
                return Err(SimError::invalid(
                    &self.id,
                    format!("weakness to {:?} must be non-negative", element),
                ));
            }
        }
        if !self.essence_reward.is_finite() || self.essence_reward < 0.0 {
            return Err(SimError::invalid(&self.id, "essenceReward must be non-negative"));
        }
        Ok(())
    }
}

/// Resources and player stats for a brand new game.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartingState {
    pub resources: BTreeMap<Resource, f64>,
    pub player: CombatStats,
}

/// The on-disk shape of a catalog, lists rather than maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogFile {
    pub producers: Vec<ProducerDefinition>,
    pub traits: Vec<TraitDefinition>,
    pub npcs: Vec<NpcDefinition>,
    pub enemies: Vec<EnemyDefinition>,
    pub start: StartingState,
}

/// Validated definition tables keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub producers: BTreeMap<String, ProducerDefinition>,
    pub traits: BTreeMap<String, TraitDefinition>,
    pub npcs: BTreeMap<String, NpcDefinition>,
    pub enemies: BTreeMap<String, EnemyDefinition>,
    pub start: StartingState,
}

fn index<T>(
    items: Vec<T>,
    kind: &str,
    id_of: impl Fn(&T) -> &str,
    validate: impl Fn(&T) -> Result<(), SimError>,
) -> Result<BTreeMap<String, T>, SimError> {
    let mut map = BTreeMap::new();
    for item in items {
        validate(&item)?;
        let id = id_of(&item).to_string();
        if map.contains_key(&id) {
            return Err(SimError::invalid(id, format!("duplicate {kind} id")));
        }
        map.insert(id, item);
    }
    Ok(map)
}

impl Catalog {
    /// Validate and index a catalog file.
    pub fn from_file(file: CatalogFile) -> Result<Self, SimError> {
        let catalog = Self {
            producers: index(file.producers, "producer", |p| p.id.as_str(), |p| p.validate())?,
            traits: index(file.traits, "trait", |t| t.id.as_str(), |t| t.validate())?,
            npcs: index(file.npcs, "npc", |n| n.id.as_str(), |n| n.validate())?,
            enemies: index(file.enemies, "enemy", |e| e.id.as_str(), |e| e.validate())?,
            start: file.start,
        };
        catalog.check_references()?;
        catalog.start.player.validate("start.player")?;
        for (resource, amount) in &catalog.start.resources {
            if !amount.is_finite() || *amount < 0.0 {
                return Err(SimError::invalid(
                    "start.resources",
                    format!("{resource} must be non-negative"),
                ));
            }
        }
        Ok(catalog)
    }

    fn check_references(&self) -> Result<(), SimError> {
        for def in self.producers.values() {
            let Some(req) = &def.unlock_requirement else {
                continue;
            };
            for producer in req.referenced_producers() {
                if !self.producers.contains_key(producer) {
                    return Err(SimError::invalid(
                        &def.id,
                        format!("unlock requirement names unknown producer `{producer}`"),
                    ));
                }
            }
            for trait_id in req.referenced_traits() {
                if !self.traits.contains_key(trait_id) {
                    return Err(SimError::invalid(
                        &def.id,
                        format!("unlock requirement names unknown trait `{trait_id}`"),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn producer(&self, id: &str) -> Option<&ProducerDefinition> {
        self.producers.get(id)
    }

    pub fn trait_def(&self, id: &str) -> Option<&TraitDefinition> {
        self.traits.get(id)
    }

    pub fn npc(&self, id: &str) -> Option<&NpcDefinition> {
        self.npcs.get(id)
    }

    pub fn enemy(&self, id: &str) -> Option<&EnemyDefinition> {
        self.enemies.get(id)
    }
}
