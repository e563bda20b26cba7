//! Cost and production formulas for leveled, owned producers.
//!
//! All functions are pure: identical inputs always give identical outputs,
//! which is what lets offline catch-up reuse the live-tick arithmetic.
//!
//! ```
//! use essence_logic::catalog::ProducerDefinition;
//! use essence_logic::scaling::{cost, production};
//!
//! let def = ProducerDefinition::generator("wisp", 10.0, 1.15, 0.1);
//! assert_eq!(cost(&def, 0), 10.0);
//! assert_eq!(cost(&def, 1), 11.0);
//! assert_eq!(production(&def, 0, 5), 0.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::catalog::ProducerDefinition;
use crate::constants::MAX_BULK_PURCHASE;
use crate::resources::Resource;

/// Price of the next unit given `owned` units already held:
/// `floor(base_cost × cost_multiplier^owned)`.
pub fn cost(def: &ProducerDefinition, owned: u64) -> f64 {
    (def.base_cost * def.cost_multiplier.powf(owned as f64)).floor()
}

/// Production per second before effect multipliers:
/// `base_production × owned × production_multiplier^(level − 1)`.
pub fn production(def: &ProducerDefinition, owned: u64, level: u32) -> f64 {
    if owned == 0 {
        return 0.0;
    }
    let level_bonus = def
        .production_multiplier
        .powf(level.saturating_sub(1) as f64);
    def.base_production * owned as f64 * level_bonus
}

/// Total price of `amount` units bought one after another starting at `owned`.
///
/// This is the sum of [`cost`] at each successive owned count, not
/// `amount × cost(owned)`.
pub fn bulk_cost(def: &ProducerDefinition, owned: u64, amount: u64) -> f64 {
    (0..amount).map(|i| cost(def, owned + i)).sum()
}

/// Largest number of units purchasable with `budget`, at most
/// [`MAX_BULK_PURCHASE`]. An infinite budget buys the maximum; NaN buys nothing.
pub fn max_affordable(def: &ProducerDefinition, owned: u64, budget: f64) -> u64 {
    if budget.is_nan() || budget <= 0.0 {
        return 0;
    }
    let mut spent = 0.0;
    let mut count = 0;
    while count < MAX_BULK_PURCHASE {
        let next = cost(def, owned + count);
        if spent + next > budget {
            break;
        }
        spent += next;
        count += 1;
    }
    count
}

/// Separately modeled price of raising a producer's level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCost {
    #[serde(default)]
    pub resource: Resource,
    pub base: f64,
    pub growth: f64,
}

impl LevelCost {
    /// Price of going from `level` to `level + 1`:
    /// `floor(base × growth^(level − 1))`.
    pub fn price(&self, level: u32) -> f64 {
        (self.base * self.growth.powf(level.saturating_sub(1) as f64)).floor()
    }
}
