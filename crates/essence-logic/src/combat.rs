//! Stateless combat math: damage, status effects, turn order, progression.
//!
//! The baseline is `damage(attack, defense) = max(0, attack − defense)`.
//! [`resolve_hit`] layers dodge, critical hits, elemental weakness and
//! status modifiers on top. Random rolls are passed in as numbers so the
//! caller decides where randomness comes from (the engine uses a seeded
//! RNG so a combat replays identically).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::LevelGrowth;
use crate::error::SimError;

/// Baseline damage: `max(0, attack − defense)`.
pub fn damage(attack: f64, defense: f64) -> f64 {
    (attack - defense).max(0.0)
}

/// Damage element of an attack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Element {
    #[default]
    Physical,
    Fire,
    Frost,
    Shadow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    /// Damage per turn equal to magnitude.
    Poison,
    /// Damage per turn equal to magnitude.
    Burn,
    /// Attack reduced by magnitude.
    Weaken,
    /// Defense increased by magnitude.
    Shield,
    /// Damage taken increased by magnitude as a fraction.
    Vulnerable,
    /// Turn skipped.
    Stun,
}

/// A transient modifier on a combat actor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub magnitude: f64,
    /// Turns left, counted down at the start of the owner's turn.
    pub remaining_turns: u32,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, magnitude: f64, remaining_turns: u32) -> Self {
        Self {
            kind,
            magnitude,
            remaining_turns,
        }
    }
}

/// Base stats shared by the player profile and enemy definitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatStats {
    pub max_health: f64,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
    #[serde(default)]
    pub crit_chance: f64,
    #[serde(default)]
    pub dodge_chance: f64,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            attack: 10.0,
            defense: 2.0,
            speed: 10.0,
            crit_chance: 0.05,
            dodge_chance: 0.0,
        }
    }
}

impl CombatStats {
    pub fn validate(&self, id: &str) -> Result<(), SimError> {
        let numbers = [
            ("maxHealth", self.max_health),
            ("attack", self.attack),
            ("defense", self.defense),
            ("speed", self.speed),
        ];
        for (name, value) in numbers {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::invalid(id, format!("{name} must be non-negative")));
            }
        }
        if self.max_health <= 0.0 {
            return Err(SimError::invalid(id, "maxHealth must be positive"));
        }
        for (name, chance) in [("critChance", self.crit_chance), ("dodgeChance", self.dodge_chance)] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(SimError::invalid(id, format!("{name} must be within 0..=1")));
            }
        }
        Ok(())
    }
}

/// Everything about an attacker that affects the hit.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackProfile {
    pub attack: f64,
    pub damage_multiplier: f64,
    pub crit_chance: f64,
    pub crit_multiplier: f64,
    pub element: Element,
}

/// Everything about a defender that affects the hit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefenseProfile {
    pub defense: f64,
    pub dodge_chance: f64,
    /// Damage multiplier per incoming element; absent means 1.0.
    pub weaknesses: BTreeMap<Element, f64>,
}

/// Uniform rolls in `[0, 1)` consumed by one attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rolls {
    pub dodge: f64,
    pub crit: f64,
}

impl Rolls {
    /// Rolls that never dodge and never crit.
    pub const FLAT: Rolls = Rolls {
        dodge: 1.0,
        crit: 1.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HitOutcome {
    Dodged,
    Hit { amount: f64, critical: bool },
}

impl HitOutcome {
    pub fn amount(&self) -> f64 {
        match self {
            HitOutcome::Dodged => 0.0,
            HitOutcome::Hit { amount, .. } => *amount,
        }
    }
}

fn total_magnitude(statuses: &[StatusEffect], kind: StatusKind) -> f64 {
    statuses
        .iter()
        .filter(|s| s.kind == kind)
        .map(|s| s.magnitude)
        .sum()
}

/// Resolve one attack.
///
/// Order: dodge check, baseline damage on status-adjusted attack/defense,
/// then damage multiplier, elemental weakness, vulnerability, crit.
pub fn resolve_hit(
    attacker: &AttackProfile,
    attacker_statuses: &[StatusEffect],
    defender: &DefenseProfile,
    defender_statuses: &[StatusEffect],
    rolls: Rolls,
) -> HitOutcome {
    if rolls.dodge < defender.dodge_chance.clamp(0.0, 1.0) {
        return HitOutcome::Dodged;
    }

    let attack = (attacker.attack - total_magnitude(attacker_statuses, StatusKind::Weaken)).max(0.0);
    let defense = defender.defense + total_magnitude(defender_statuses, StatusKind::Shield);
    let elemental = defender
        .weaknesses
        .get(&attacker.element)
        .copied()
        .unwrap_or(1.0);
    let vulnerable = 1.0 + total_magnitude(defender_statuses, StatusKind::Vulnerable);

    let mut amount = damage(attack, defense) * attacker.damage_multiplier * elemental * vulnerable;
    let critical = rolls.crit < attacker.crit_chance.clamp(0.0, 1.0);
    if critical {
        amount *= attacker.crit_multiplier;
    }

    HitOutcome::Hit {
        amount: amount.max(0.0),
        critical,
    }
}

/// Damage dealt to the owner at the start of its turn.
pub fn status_tick_damage(statuses: &[StatusEffect]) -> f64 {
    total_magnitude(statuses, StatusKind::Poison) + total_magnitude(statuses, StatusKind::Burn)
}

pub fn is_stunned(statuses: &[StatusEffect]) -> bool {
    statuses
        .iter()
        .any(|s| s.kind == StatusKind::Stun && s.remaining_turns > 0)
}

/// Count every status down by one turn and drop the expired ones.
/// Returns the kinds that expired.
pub fn tick_statuses(statuses: &mut Vec<StatusEffect>) -> Vec<StatusKind> {
    let mut expired = Vec::new();
    for status in statuses.iter_mut() {
        status.remaining_turns = status.remaining_turns.saturating_sub(1);
        if status.remaining_turns == 0 {
            expired.push(status.kind);
        }
    }
    statuses.retain(|s| s.remaining_turns > 0);
    expired
}

/// Apply a status, refreshing an existing one of the same kind.
pub fn apply_status(statuses: &mut Vec<StatusEffect>, incoming: StatusEffect) {
    if let Some(existing) = statuses.iter_mut().find(|s| s.kind == incoming.kind) {
        existing.magnitude = existing.magnitude.max(incoming.magnitude);
        existing.remaining_turns = existing.remaining_turns.max(incoming.remaining_turns);
    } else {
        statuses.push(incoming);
    }
}

/// Which side an actor fights on. Players act first on speed ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Player,
    Enemy,
}

/// Inputs to turn ordering for one actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Initiative {
    pub speed: f64,
    pub side: Side,
    pub spawn_index: u32,
}

/// Indices into `actors` in acting order: faster first, then player before
/// enemy, then spawn order. Never random.
pub fn turn_order(actors: &[Initiative]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..actors.len()).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = (&actors[a], &actors[b]);
        y.speed
            .partial_cmp(&x.speed)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(x.side.cmp(&y.side))
            .then(x.spawn_index.cmp(&y.spawn_index))
    });
    order
}

/// The persistent player entity. Combat actors are built from it and
/// permanent changes are written back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub level: u32,
    pub experience: u64,
    pub stats: CombatStats,
    pub victories: u32,
    pub defeats: u32,
}

impl PlayerProfile {
    pub fn new(stats: CombatStats) -> Self {
        Self {
            level: 1,
            experience: 0,
            stats,
            victories: 0,
            defeats: 0,
        }
    }

    /// Add experience and apply any level-ups. Returns levels gained.
    pub fn grant_experience(&mut self, amount: u64, growth: &LevelGrowth) -> u32 {
        self.experience += amount;
        let mut gained = 0;
        if growth.experience_per_level == 0 {
            return 0;
        }
        while self.experience >= growth.experience_per_level * self.level as u64 {
            self.experience -= growth.experience_per_level * self.level as u64;
            self.level += 1;
            self.stats.max_health += growth.max_health;
            self.stats.attack += growth.attack;
            self.stats.defense += growth.defense;
            self.stats.speed += growth.speed;
            gained += 1;
        }
        gained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_attacker(attack: f64) -> AttackProfile {
        AttackProfile {
            attack,
            damage_multiplier: 1.0,
            crit_chance: 0.0,
            crit_multiplier: 2.0,
            element: Element::Physical,
        }
    }

    fn plain_defender(defense: f64) -> DefenseProfile {
        DefenseProfile {
            defense,
            ..Default::default()
        }
    }

    #[test]
    fn test_baseline_damage() {
        assert_eq!(damage(12.0, 5.0), 7.0);
        assert_eq!(damage(3.0, 5.0), 0.0);
    }

    #[test]
    fn test_resolve_hit_matches_baseline_without_modifiers() {
        let out = resolve_hit(&plain_attacker(12.0), &[], &plain_defender(5.0), &[], Rolls::FLAT);
        assert_eq!(out, HitOutcome::Hit { amount: 7.0, critical: false });
        let out = resolve_hit(&plain_attacker(3.0), &[], &plain_defender(5.0), &[], Rolls::FLAT);
        assert_eq!(out.amount(), 0.0);
    }

    #[test]
    fn test_dodge_and_crit() {
        let mut attacker = plain_attacker(12.0);
        attacker.crit_chance = 0.5;
        let mut defender = plain_defender(2.0);
        defender.dodge_chance = 0.25;

        let dodged = resolve_hit(&attacker, &[], &defender, &[], Rolls { dodge: 0.1, crit: 0.0 });
        assert_eq!(dodged, HitOutcome::Dodged);

        let crit = resolve_hit(&attacker, &[], &defender, &[], Rolls { dodge: 0.9, crit: 0.2 });
        assert_eq!(crit, HitOutcome::Hit { amount: 20.0, critical: true });
    }

    #[test]
    fn test_elemental_and_status_modifiers() {
        let mut attacker = plain_attacker(12.0);
        attacker.element = Element::Fire;
        let mut defender = plain_defender(4.0);
        defender.weaknesses.insert(Element::Fire, 1.5);

        let weaken = [StatusEffect::new(StatusKind::Weaken, 2.0, 2)];
        let shield_and_vuln = [
            StatusEffect::new(StatusKind::Shield, 2.0, 1),
            StatusEffect::new(StatusKind::Vulnerable, 0.5, 1),
        ];
        // (12 - 2) - (4 + 2) = 4, × 1.5 fire × 1.5 vulnerable = 9
        let out = resolve_hit(&attacker, &weaken, &defender, &shield_and_vuln, Rolls::FLAT);
        assert!((out.amount() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_turn_order_speed_then_player_first() {
        let actors = [
            Initiative { speed: 10.0, side: Side::Enemy, spawn_index: 1 },
            Initiative { speed: 10.0, side: Side::Player, spawn_index: 0 },
            Initiative { speed: 15.0, side: Side::Enemy, spawn_index: 2 },
        ];
        assert_eq!(turn_order(&actors), vec![2, 1, 0]);
    }

    #[test]
    fn test_status_tick_and_expiry() {
        let mut statuses = vec![
            StatusEffect::new(StatusKind::Poison, 3.0, 2),
            StatusEffect::new(StatusKind::Burn, 1.0, 1),
        ];
        assert_eq!(status_tick_damage(&statuses), 4.0);
        let expired = tick_statuses(&mut statuses);
        assert_eq!(expired, vec![StatusKind::Burn]);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].remaining_turns, 1);
    }

    #[test]
    fn test_apply_status_refreshes() {
        let mut statuses = vec![StatusEffect::new(StatusKind::Poison, 2.0, 1)];
        apply_status(&mut statuses, StatusEffect::new(StatusKind::Poison, 1.0, 3));
        assert_eq!(statuses, vec![StatusEffect::new(StatusKind::Poison, 2.0, 3)]);
    }

    #[test]
    fn test_grant_experience_levels_up() {
        let growth = LevelGrowth::default();
        let mut player = PlayerProfile::new(CombatStats::default());
        let before = player.stats;
        let gained = player.grant_experience(growth.experience_per_level * 3, &growth);
        // level 1 needs 1×, level 2 needs 2× per-level experience
        assert_eq!(gained, 2);
        assert_eq!(player.level, 3);
        assert_eq!(player.experience, 0);
        assert_eq!(player.stats.attack, before.attack + 2.0 * growth.attack);
    }

    #[test]
    fn test_stats_validation() {
        let mut stats = CombatStats::default();
        assert!(stats.validate("player").is_ok());
        stats.dodge_chance = 1.5;
        assert!(stats.validate("player").is_err());
    }
}
