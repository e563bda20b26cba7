//! Read-only snapshot handed to presentation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use essence_logic::catalog::Catalog;
use essence_logic::combat::PlayerProfile;
use essence_logic::config::SimConfig;
use essence_logic::effects::EffectKey;
use essence_logic::relationships::{RelationshipScale, Tier};
use essence_logic::resources::Resource;
use essence_logic::scaling;

use crate::combat::{CombatActor, CombatEvent, CombatOutcome, CombatSession};
use crate::state::GameState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerView {
    pub id: String,
    pub name: String,
    pub owned: u64,
    pub level: u32,
    pub unlocked: bool,
    pub next_cost: f64,
    pub cost_resource: Resource,
    /// Effective output per second, effects included.
    pub production: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipView {
    pub npc_id: String,
    pub name: String,
    pub value: f64,
    pub scale: RelationshipScale,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatView {
    pub enemy_id: String,
    pub round: u32,
    pub actors: Vec<CombatActor>,
    pub outcome: Option<CombatOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub now: f64,
    pub resources: BTreeMap<Resource, f64>,
    pub production: BTreeMap<Resource, f64>,
    pub producers: Vec<ProducerView>,
    pub relationships: Vec<RelationshipView>,
    /// Keys with a non-identity value.
    pub effects: BTreeMap<EffectKey, f64>,
    pub player: PlayerProfile,
    pub combat: Option<CombatView>,
    /// Combat events not yet taken by the presentation layer.
    pub combat_events: Vec<CombatEvent>,
}

pub fn build_view(
    state: &GameState,
    catalog: &Catalog,
    config: &SimConfig,
    combat: Option<&CombatSession>,
    combat_events: &[CombatEvent],
) -> GameView {
    let effects = state.effects(catalog);

    let producers = catalog
        .producers
        .values()
        .map(|def| {
            let entry = state.producers.get(&def.id);
            ProducerView {
                id: def.id.clone(),
                name: def.name.clone(),
                owned: entry.map(|e| e.owned).unwrap_or(0),
                level: entry.map(|e| e.level).unwrap_or(1),
                unlocked: entry.map(|e| e.unlocked).unwrap_or(false),
                next_cost: scaling::cost(def, state.producers.owned(&def.id)),
                cost_resource: def.cost_resource,
                production: state
                    .producers
                    .production_of(&catalog.producers, &def.id, &effects),
            }
        })
        .collect();

    let relationships = state
        .relationships
        .records()
        .filter_map(|record| {
            let def = catalog.npc(&record.npc_id)?;
            Some(RelationshipView {
                npc_id: record.npc_id.clone(),
                name: def.name.clone(),
                value: record.value,
                scale: def.scale,
                tier: config.tiers.classify(def.scale, record.value),
            })
        })
        .collect();

    GameView {
        now: state.now,
        resources: state.resources.balances().collect(),
        production: state
            .producers
            .total_production_by_resource(&catalog.producers, &effects),
        producers,
        relationships,
        effects: effects.iter().collect(),
        player: state.player.clone(),
        combat: combat.map(|session| CombatView {
            enemy_id: session.enemy_id().to_string(),
            round: session.round(),
            actors: session.actors(),
            outcome: session.outcome(),
        }),
        combat_events: combat_events.to_vec(),
    }
}
