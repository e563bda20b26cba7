//! Resource kinds and the balance pool they are stored in.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effects::EffectKey;
use crate::error::SimError;

/// A spendable currency produced by producers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    #[default]
    Essence,
    Gold,
    Souls,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Essence, Resource::Gold, Resource::Souls];

    /// Effect key that scales generation of this resource.
    pub fn generation_effect(self) -> EffectKey {
        match self {
            Resource::Essence => EffectKey::EssenceGenerationMultiplier,
            Resource::Gold => EffectKey::GoldGenerationMultiplier,
            Resource::Souls => EffectKey::SoulHarvestMultiplier,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Essence => "essence",
            Resource::Gold => "gold",
            Resource::Souls => "souls",
        };
        f.write_str(name)
    }
}

/// Current balances plus lifetime-earned totals per resource.
///
/// Balances never go negative: [`ResourcePool::debit`] checks before it
/// subtracts, so a failed debit leaves the pool untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcePool {
    balances: BTreeMap<Resource, f64>,
    lifetime: BTreeMap<Resource, f64>,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of `resource`.
    pub fn amount(&self, resource: Resource) -> f64 {
        self.balances.get(&resource).copied().unwrap_or(0.0)
    }

    /// Total ever credited to `resource`.
    pub fn lifetime(&self, resource: Resource) -> f64 {
        self.lifetime.get(&resource).copied().unwrap_or(0.0)
    }

    /// Add income. Non-positive amounts are ignored.
    pub fn credit(&mut self, resource: Resource, amount: f64) {
        if amount <= 0.0 || !amount.is_finite() {
            return;
        }
        *self.balances.entry(resource).or_insert(0.0) += amount;
        *self.lifetime.entry(resource).or_insert(0.0) += amount;
    }

    /// Check that `amount` can be paid, reporting the shortfall if not.
    pub fn ensure(&self, resource: Resource, amount: f64) -> Result<(), SimError> {
        let available = self.amount(resource);
        if available >= amount {
            Ok(())
        } else {
            Err(SimError::InsufficientResource {
                resource,
                required: amount,
                available,
                shortfall: amount - available,
            })
        }
    }

    /// Spend `amount`, or fail without changing anything.
    pub fn debit(&mut self, resource: Resource, amount: f64) -> Result<(), SimError> {
        self.ensure(resource, amount)?;
        if amount > 0.0 {
            *self.balances.entry(resource).or_insert(0.0) -= amount;
        }
        Ok(())
    }

    /// Overwrite a balance and lifetime total, used when restoring a save.
    pub fn restore(&mut self, resource: Resource, amount: f64, lifetime: f64) {
        self.balances.insert(resource, amount);
        self.lifetime.insert(resource, lifetime);
    }

    /// Iterate `(resource, balance)` in a stable order.
    pub fn balances(&self) -> impl Iterator<Item = (Resource, f64)> + '_ {
        Resource::ALL.iter().map(move |r| (*r, self.amount(*r)))
    }

    /// Reject non-finite or negative balances.
    pub fn validate(&self) -> Result<(), SimError> {
        for (resource, value) in self.balances.iter().chain(self.lifetime.iter()) {
            if !value.is_finite() || *value < 0.0 {
                return Err(SimError::corrupted(format!(
                    "{} balance is {}",
                    resource, value
                )));
            }
        }
        Ok(())
    }
}

/// Pools are equal when every resource reads the same; an absent entry
/// equals an explicit zero.
impl PartialEq for ResourcePool {
    fn eq(&self, other: &Self) -> bool {
        Resource::ALL.iter().all(|r| {
            self.amount(*r) == other.amount(*r) && self.lifetime(*r) == other.lifetime(*r)
        })
    }
}
