//! Combat systems - turn order, start-of-turn status upkeep and attacks
//! over the actors in a session world

use hecs::{ComponentError, Entity, World};

use essence_logic::combat::{
    apply_status, is_stunned, resolve_hit, status_tick_damage, tick_statuses, turn_order,
    AttackProfile, DefenseProfile, HitOutcome, Initiative, Rolls, StatusKind,
};

use crate::components::{Combatant, OnHit, Speed, Statuses, Vitals};

/// What happened to an actor at the start of its turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Upkeep {
    pub damage: f64,
    pub stunned: bool,
    pub expired: Vec<StatusKind>,
}

/// Result of one attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub outcome: HitOutcome,
    pub target_health: f64,
    pub applied: Option<StatusKind>,
}

/// Living actors in acting order: speed, then player before enemy, then
/// spawn order.
pub fn initiative_order(world: &World) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut initiative = Vec::new();
    for (entity, (combatant, speed, vitals)) in world
        .query::<(&Combatant, &Speed, &Vitals)>()
        .iter()
    {
        if vitals.is_down() {
            continue;
        }
        entities.push(entity);
        initiative.push(Initiative {
            speed: speed.0,
            side: combatant.side,
            spawn_index: combatant.spawn_index,
        });
    }
    turn_order(&initiative)
        .into_iter()
        .map(|i| entities[i])
        .collect()
}

/// Damage-over-time, stun check and duration countdown for the actor
/// about to act. Stun is read before durations tick, so a one-turn stun
/// costs exactly one turn.
pub fn status_upkeep_system(world: &mut World, entity: Entity) -> Result<Upkeep, ComponentError> {
    let mut statuses = world.get::<&Statuses>(entity)?.0.clone();
    let damage = status_tick_damage(&statuses);
    let stunned = is_stunned(&statuses);
    let expired = tick_statuses(&mut statuses);

    world.get::<&mut Vitals>(entity)?.take(damage);
    world.get::<&mut Statuses>(entity)?.0 = statuses;

    Ok(Upkeep {
        damage,
        stunned,
        expired,
    })
}

/// Resolve one attack from `attacker` against `defender` and apply it.
pub fn attack_system(
    world: &mut World,
    attacker: Entity,
    defender: Entity,
    rolls: Rolls,
) -> Result<Strike, ComponentError> {
    let offense = (*world.get::<&AttackProfile>(attacker)?).clone();
    let attacker_statuses = world.get::<&Statuses>(attacker)?.0.clone();
    let guard = (*world.get::<&DefenseProfile>(defender)?).clone();
    let defender_statuses = world.get::<&Statuses>(defender)?.0.clone();
    let on_hit = world.get::<&OnHit>(attacker).ok().map(|h| h.0);

    let outcome = resolve_hit(&offense, &attacker_statuses, &guard, &defender_statuses, rolls);

    let target_health = {
        let mut vitals = world.get::<&mut Vitals>(defender)?;
        vitals.take(outcome.amount());
        vitals.health
    };

    let mut applied = None;
    if let (HitOutcome::Hit { .. }, Some(status)) = (outcome, on_hit) {
        if target_health > 0.0 {
            let mut statuses = world.get::<&mut Statuses>(defender)?;
            apply_status(&mut statuses.0, status);
            applied = Some(status.kind);
        }
    }

    Ok(Strike {
        outcome,
        target_health,
        applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use essence_logic::combat::{Element, Side, StatusEffect};

    fn spawn(world: &mut World, side: Side, speed: f64, attack: f64, defense: f64) -> Entity {
        world.spawn((
            Combatant {
                name: format!("{:?}", side),
                side,
                spawn_index: 0,
            },
            Vitals::full(50.0),
            Speed(speed),
            Statuses::default(),
            AttackProfile {
                attack,
                damage_multiplier: 1.0,
                crit_chance: 0.0,
                crit_multiplier: 1.5,
                element: Element::Physical,
            },
            DefenseProfile {
                defense,
                ..Default::default()
            },
        ))
    }

    #[test]
    fn test_player_first_on_speed_tie() {
        let mut world = World::new();
        let enemy = spawn(&mut world, Side::Enemy, 10.0, 5.0, 0.0);
        let player = spawn(&mut world, Side::Player, 10.0, 5.0, 0.0);
        assert_eq!(initiative_order(&world), vec![player, enemy]);
    }

    #[test]
    fn test_faster_actor_first() {
        let mut world = World::new();
        let player = spawn(&mut world, Side::Player, 5.0, 5.0, 0.0);
        let enemy = spawn(&mut world, Side::Enemy, 12.0, 5.0, 0.0);
        assert_eq!(initiative_order(&world), vec![enemy, player]);
    }

    #[test]
    fn test_attack_applies_damage_and_on_hit() {
        let mut world = World::new();
        let player = spawn(&mut world, Side::Player, 10.0, 12.0, 0.0);
        let enemy = spawn(&mut world, Side::Enemy, 10.0, 3.0, 5.0);
        world
            .insert_one(player, OnHit(StatusEffect::new(StatusKind::Poison, 2.0, 3)))
            .unwrap();

        let strike = attack_system(&mut world, player, enemy, Rolls::FLAT).unwrap();
        assert_eq!(strike.outcome.amount(), 7.0);
        assert_eq!(strike.target_health, 43.0);
        assert_eq!(strike.applied, Some(StatusKind::Poison));

        let upkeep = status_upkeep_system(&mut world, enemy).unwrap();
        assert_eq!(upkeep.damage, 2.0);
        assert!(!upkeep.stunned);
        assert_eq!(world.get::<&Vitals>(enemy).unwrap().health, 41.0);
    }

    #[test]
    fn test_stun_costs_one_turn() {
        let mut world = World::new();
        let player = spawn(&mut world, Side::Player, 10.0, 5.0, 0.0);
        world.get::<&mut Statuses>(player).unwrap().0 =
            vec![StatusEffect::new(StatusKind::Stun, 0.0, 1)];

        let first = status_upkeep_system(&mut world, player).unwrap();
        assert!(first.stunned);
        assert_eq!(first.expired, vec![StatusKind::Stun]);
        let second = status_upkeep_system(&mut world, player).unwrap();
        assert!(!second.stunned);
    }
}
