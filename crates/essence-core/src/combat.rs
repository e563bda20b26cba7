//! Combat sessions.
//!
//! A [`CombatSession`] owns a private `hecs::World` holding exactly two
//! transient actors, the player and one enemy. Actors are built at the start
//! of the fight from base stats and the current [`EffectSet`], mutated only
//! while the session runs, and dropped with it. The only lasting changes are
//! applied by [`write_back`] to the persistent player and resource pool.
//!
//! Rolls come from a `StdRng` seeded at start, so the same seed and the same
//! sequence of actions replay the same fight.

use hecs::{ComponentError, Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use essence_logic::catalog::{Catalog, EnemyDefinition};
use essence_logic::combat::{
    apply_status, AttackProfile, DefenseProfile, Element, HitOutcome, PlayerProfile, Rolls, Side,
    StatusEffect, StatusKind,
};
use essence_logic::config::{CombatRules, SimConfig};
use essence_logic::effects::{EffectKey, EffectSet};
use essence_logic::resources::Resource;
use essence_logic::SimError;

use crate::components::{Combatant, OnHit, Speed, Statuses, Vitals};
use crate::state::GameState;
use crate::systems::{attack_system, initiative_order, status_upkeep_system};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerAction {
    Attack,
    /// Gain a one-turn shield.
    Defend,
    Flee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CombatCommand {
    #[serde(rename_all = "camelCase")]
    Start { enemy_id: String, seed: u64 },
    Act { action: PlayerAction },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    Fled,
    /// Round limit reached with both sides standing.
    Stalemate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum CombatEvent {
    RoundStarted { round: u32 },
    Attacked { attacker: Side, hit: HitOutcome, target_health: f64 },
    Defended { shield: f64 },
    StatusApplied { target: Side, kind: StatusKind },
    StatusDamage { target: Side, amount: f64, health: f64 },
    StatusExpired { target: Side, kind: StatusKind },
    Stunned { side: Side },
    FleeFailed,
    Ended { outcome: CombatOutcome },
}

/// Read-only view of one combat actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatActor {
    pub name: String,
    pub side: Side,
    pub health: f64,
    pub max_health: f64,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
    pub status_effects: Vec<StatusEffect>,
}

/// Permanent gains applied after a fight.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatRewards {
    pub essence: f64,
    pub experience: u64,
    pub levels_gained: u32,
}

/// Result of one combat command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatReport {
    pub enemy_id: String,
    pub events: Vec<CombatEvent>,
    pub outcome: Option<CombatOutcome>,
    pub rewards: Option<CombatRewards>,
}

fn missing_actor(e: ComponentError) -> SimError {
    SimError::not_available("combat", format!("combat actor missing: {e}"))
}

pub struct CombatSession {
    world: World,
    rng: StdRng,
    rules: CombatRules,
    enemy_id: String,
    player: Entity,
    enemy: Entity,
    round: u32,
    outcome: Option<CombatOutcome>,
    log: Vec<CombatEvent>,
}

impl CombatSession {
    /// Build both actors and seed the roll stream.
    pub fn start(
        catalog: &Catalog,
        config: &SimConfig,
        state: &GameState,
        enemy_id: &str,
        seed: u64,
    ) -> Result<Self, SimError> {
        let enemy_def = catalog
            .enemy(enemy_id)
            .ok_or_else(|| SimError::not_available(enemy_id, "unknown enemy"))?;
        let effects = state.effects(catalog);

        let mut world = World::new();
        let player = spawn_player(&mut world, &state.player, &effects, &config.combat);
        let enemy = spawn_enemy(&mut world, enemy_def, &config.combat);
        if let Some(status) = enemy_def.on_hit {
            world
                .insert_one(enemy, OnHit(status))
                .map_err(|e| SimError::not_available(enemy_id, e.to_string()))?;
        }
        log::debug!("combat started against `{}` with seed {}", enemy_id, seed);

        Ok(Self {
            world,
            rng: StdRng::seed_from_u64(seed),
            rules: config.combat.clone(),
            enemy_id: enemy_id.to_string(),
            player,
            enemy,
            round: 0,
            outcome: None,
            log: Vec::new(),
        })
    }

    pub fn enemy_id(&self) -> &str {
        &self.enemy_id
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn outcome(&self) -> Option<CombatOutcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Every event since the session started.
    pub fn log(&self) -> &[CombatEvent] {
        &self.log
    }

    /// Player first, then enemies in spawn order.
    pub fn actors(&self) -> Vec<CombatActor> {
        let mut actors: Vec<(u32, CombatActor)> = self
            .world
            .query::<(
                &Combatant,
                &Vitals,
                &Speed,
                &Statuses,
                &AttackProfile,
                &DefenseProfile,
            )>()
            .iter()
            .map(|(_, (who, vitals, speed, statuses, offense, guard))| {
                (
                    who.spawn_index,
                    CombatActor {
                        name: who.name.clone(),
                        side: who.side,
                        health: vitals.health,
                        max_health: vitals.max_health,
                        attack: offense.attack,
                        defense: guard.defense,
                        speed: speed.0,
                        status_effects: statuses.0.clone(),
                    },
                )
            })
            .collect();
        actors.sort_by(|a, b| a.1.side.cmp(&b.1.side).then(a.0.cmp(&b.0)));
        actors.into_iter().map(|(_, actor)| actor).collect()
    }

    /// Play one round with the player choosing `action`.
    pub fn act(&mut self, action: PlayerAction) -> Result<Vec<CombatEvent>, SimError> {
        if self.outcome.is_some() {
            return Err(SimError::not_available(&self.enemy_id, "combat already ended"));
        }
        self.round += 1;
        let mut events = vec![CombatEvent::RoundStarted { round: self.round }];

        for actor in initiative_order(&self.world) {
            if self.outcome.is_some() {
                break;
            }
            if self.vitals(actor)?.is_down() {
                continue;
            }
            let side = self.side_of(actor);

            let upkeep = status_upkeep_system(&mut self.world, actor).map_err(missing_actor)?;
            if upkeep.damage > 0.0 {
                events.push(CombatEvent::StatusDamage {
                    target: side,
                    amount: upkeep.damage,
                    health: self.vitals(actor)?.health,
                });
            }
            for kind in upkeep.expired {
                events.push(CombatEvent::StatusExpired { target: side, kind });
            }
            if self.check_end(&mut events)? {
                break;
            }
            if upkeep.stunned {
                events.push(CombatEvent::Stunned { side });
                continue;
            }

            match side {
                Side::Player => self.player_turn(action, &mut events)?,
                Side::Enemy => self.strike(self.enemy, self.player, Side::Enemy, &mut events)?,
            }
            if self.check_end(&mut events)? {
                break;
            }
        }

        if self.outcome.is_none() && self.round >= self.rules.max_rounds {
            self.finish(CombatOutcome::Stalemate, &mut events);
        }
        for event in &events {
            log::debug!("combat `{}`: {:?}", self.enemy_id, event);
        }
        self.log.extend(events.iter().cloned());
        Ok(events)
    }

    fn side_of(&self, entity: Entity) -> Side {
        if entity == self.player {
            Side::Player
        } else {
            Side::Enemy
        }
    }

    fn vitals(&self, entity: Entity) -> Result<Vitals, SimError> {
        self.world
            .get::<&Vitals>(entity)
            .map(|v| *v)
            .map_err(missing_actor)
    }

    fn player_turn(
        &mut self,
        action: PlayerAction,
        events: &mut Vec<CombatEvent>,
    ) -> Result<(), SimError> {
        match action {
            PlayerAction::Attack => self.strike(self.player, self.enemy, Side::Player, events),
            PlayerAction::Defend => {
                let shield = StatusEffect::new(StatusKind::Shield, self.rules.defend_shield, 1);
                let mut statuses = self
                    .world
                    .get::<&mut Statuses>(self.player)
                    .map_err(missing_actor)?;
                apply_status(&mut statuses.0, shield);
                events.push(CombatEvent::Defended {
                    shield: self.rules.defend_shield,
                });
                Ok(())
            }
            PlayerAction::Flee => {
                let roll: f64 = self.rng.gen();
                if roll < self.rules.flee_chance {
                    self.finish(CombatOutcome::Fled, events);
                } else {
                    events.push(CombatEvent::FleeFailed);
                }
                Ok(())
            }
        }
    }

    fn strike(
        &mut self,
        attacker: Entity,
        defender: Entity,
        side: Side,
        events: &mut Vec<CombatEvent>,
    ) -> Result<(), SimError> {
        let rolls = Rolls {
            dodge: self.rng.gen(),
            crit: self.rng.gen(),
        };
        let strike =
            attack_system(&mut self.world, attacker, defender, rolls).map_err(missing_actor)?;
        events.push(CombatEvent::Attacked {
            attacker: side,
            hit: strike.outcome,
            target_health: strike.target_health,
        });
        if let Some(kind) = strike.applied {
            events.push(CombatEvent::StatusApplied {
                target: self.side_of(defender),
                kind,
            });
        }
        Ok(())
    }

    fn check_end(&mut self, events: &mut Vec<CombatEvent>) -> Result<bool, SimError> {
        if self.vitals(self.player)?.is_down() {
            self.finish(CombatOutcome::Defeat, events);
        } else if self.vitals(self.enemy)?.is_down() {
            self.finish(CombatOutcome::Victory, events);
        }
        Ok(self.outcome.is_some())
    }

    fn finish(&mut self, outcome: CombatOutcome, events: &mut Vec<CombatEvent>) {
        self.outcome = Some(outcome);
        events.push(CombatEvent::Ended { outcome });
    }
}

fn spawn_player(
    world: &mut World,
    profile: &PlayerProfile,
    effects: &EffectSet,
    rules: &CombatRules,
) -> Entity {
    let stats = profile.stats;
    world.spawn((
        Combatant {
            name: "player".to_string(),
            side: Side::Player,
            spawn_index: 0,
        },
        Vitals::full(stats.max_health * effects.get(EffectKey::MaxHealthMultiplier)),
        Speed(stats.speed),
        Statuses::default(),
        AttackProfile {
            attack: stats.attack,
            damage_multiplier: effects.get(EffectKey::AttackDamageMultiplier),
            crit_chance: (stats.crit_chance + effects.get(EffectKey::CriticalChance)).clamp(0.0, 1.0),
            crit_multiplier: rules.crit_multiplier,
            element: Element::Physical,
        },
        DefenseProfile {
            defense: stats.defense * effects.get(EffectKey::DefenseMultiplier),
            dodge_chance: (stats.dodge_chance + effects.get(EffectKey::DodgeChance)).clamp(0.0, 1.0),
            weaknesses: Default::default(),
        },
    ))
}

fn spawn_enemy(world: &mut World, def: &EnemyDefinition, rules: &CombatRules) -> Entity {
    let stats = def.stats;
    world.spawn((
        Combatant {
            name: def.name.clone(),
            side: Side::Enemy,
            spawn_index: 0,
        },
        Vitals::full(stats.max_health),
        Speed(stats.speed),
        Statuses::default(),
        AttackProfile {
            attack: stats.attack,
            damage_multiplier: 1.0,
            crit_chance: stats.crit_chance,
            crit_multiplier: rules.crit_multiplier,
            element: def.element,
        },
        DefenseProfile {
            defense: stats.defense,
            dodge_chance: stats.dodge_chance,
            weaknesses: def.weaknesses.clone(),
        },
    ))
}

/// Apply a finished fight to the persistent state.
///
/// Victory pays the enemy's essence reward and experience (with level-ups)
/// and counts a win; defeat counts a loss. Fleeing and stalemates change
/// nothing.
pub fn write_back(
    state: &mut GameState,
    catalog: &Catalog,
    config: &SimConfig,
    enemy_id: &str,
    outcome: CombatOutcome,
) -> Result<CombatRewards, SimError> {
    let def = catalog
        .enemy(enemy_id)
        .ok_or_else(|| SimError::not_available(enemy_id, "unknown enemy"))?;
    let mut rewards = CombatRewards::default();
    match outcome {
        CombatOutcome::Victory => {
            state.resources.credit(Resource::Essence, def.essence_reward);
            rewards.essence = def.essence_reward;
            rewards.experience = def.experience;
            rewards.levels_gained = state
                .player
                .grant_experience(def.experience, &config.player_growth);
            state.player.victories += 1;
            if rewards.levels_gained > 0 {
                log::info!("player reached level {}", state.player.level);
            }
        }
        CombatOutcome::Defeat => state.player.defeats += 1,
        CombatOutcome::Fled | CombatOutcome::Stalemate => {}
    }
    Ok(rewards)
}
