//! ECS components for the transient actors of a combat session.
//!
//! Actors only exist inside a session's `hecs::World`. Alongside these the
//! world stores [`AttackProfile`] and [`DefenseProfile`] from the logic crate
//! as components directly.
//!
//! [`AttackProfile`]: essence_logic::combat::AttackProfile
//! [`DefenseProfile`]: essence_logic::combat::DefenseProfile

use serde::{Deserialize, Serialize};

use essence_logic::combat::{Side, StatusEffect};

/// Who an actor is and which side it fights on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub name: String,
    pub side: Side,
    pub spawn_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: f64,
    pub max_health: f64,
}

impl Vitals {
    pub fn full(max_health: f64) -> Self {
        Self {
            health: max_health,
            max_health,
        }
    }

    pub fn is_down(&self) -> bool {
        self.health <= 0.0
    }

    /// Subtract damage, never below zero.
    pub fn take(&mut self, amount: f64) {
        self.health = (self.health - amount.max(0.0)).max(0.0);
    }
}

/// Turn-order stat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Speed(pub f64);

/// Active status effects on an actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statuses(pub Vec<StatusEffect>);

/// Status applied to the target whenever this actor lands a hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnHit(pub StatusEffect);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vitals_never_negative() {
        let mut vitals = Vitals::full(10.0);
        vitals.take(4.0);
        assert_eq!(vitals.health, 6.0);
        vitals.take(100.0);
        assert_eq!(vitals.health, 0.0);
        assert!(vitals.is_down());
        vitals.take(-5.0);
        assert_eq!(vitals.health, 0.0);
    }
}
