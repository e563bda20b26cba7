//! Producer ownership: owned counts, levels, unlock status, and the
//! operations that change them.
//!
//! Every operation validates first and mutates last, so a rejected call
//! leaves both the ledger and the resource pool exactly as they were.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::ProducerDefinition;
use crate::constants::MAX_BULK_PURCHASE;
use crate::effects::EffectSet;
use crate::error::SimError;
use crate::requirements::Progress;
use crate::resources::{Resource, ResourcePool};
use crate::scaling::{self, LevelCost};

/// Mutable per-producer state. Cost and production are always derived from
/// `(owned, level)`; nothing here caches them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerState {
    pub owned: u64,
    pub level: u32,
    pub unlocked: bool,
    pub last_collected_at: f64,
}

impl ProducerState {
    pub fn fresh(def: &ProducerDefinition, now: f64) -> Self {
        Self {
            owned: 0,
            level: 1,
            unlocked: def.starts_unlocked,
            last_collected_at: now,
        }
    }
}

/// Result of a successful purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub producer_id: String,
    pub amount: u64,
    pub resource: Resource,
    pub spent: f64,
    pub owned: u64,
}

type Definitions = BTreeMap<String, ProducerDefinition>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProducerLedger {
    entries: BTreeMap<String, ProducerState>,
}

impl ProducerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// One fresh entry per defined producer.
    pub fn from_definitions(defs: &Definitions, now: f64) -> Self {
        let entries = defs
            .values()
            .map(|def| (def.id.clone(), ProducerState::fresh(def, now)))
            .collect();
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&ProducerState> {
        self.entries.get(id)
    }

    pub fn owned(&self, id: &str) -> u64 {
        self.entries.get(id).map(|s| s.owned).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProducerState)> {
        self.entries.iter().map(|(id, s)| (id.as_str(), s))
    }

    /// Owned counts by id, for requirement checks.
    pub fn owned_counts(&self) -> BTreeMap<String, u64> {
        self.entries
            .iter()
            .map(|(id, s)| (id.clone(), s.owned))
            .collect()
    }

    /// Insert a restored entry.
    pub fn restore(&mut self, id: &str, state: ProducerState) {
        self.entries.insert(id.to_string(), state);
    }

    /// Add fresh entries for definitions that have none (new content
    /// added after a save was written).
    pub fn fill_missing(&mut self, defs: &Definitions, now: f64) {
        for def in defs.values() {
            self.entries
                .entry(def.id.clone())
                .or_insert_with(|| ProducerState::fresh(def, now));
        }
    }

    fn available<'a>(
        &self,
        defs: &'a Definitions,
        id: &str,
    ) -> Result<(&'a ProducerDefinition, ProducerState), SimError> {
        let def = defs
            .get(id)
            .ok_or_else(|| SimError::not_available(id, "unknown producer"))?;
        let state = self
            .entries
            .get(id)
            .cloned()
            .unwrap_or_else(|| ProducerState::fresh(def, 0.0));
        if !state.unlocked {
            return Err(SimError::not_available(id, "producer is locked"));
        }
        Ok((def, state))
    }

    /// Buy `amount` units, paying the sum of successive unit costs.
    pub fn purchase(
        &mut self,
        defs: &Definitions,
        pool: &mut ResourcePool,
        id: &str,
        amount: u64,
    ) -> Result<PurchaseReceipt, SimError> {
        let (def, mut state) = self.available(defs, id)?;
        if amount == 0 || amount > MAX_BULK_PURCHASE {
            return Err(SimError::not_available(
                id,
                format!("purchase amount must be within 1..={MAX_BULK_PURCHASE}"),
            ));
        }

        let total = scaling::bulk_cost(def, state.owned, amount);
        pool.debit(def.cost_resource, total)?;
        state.owned += amount;
        self.entries.insert(id.to_string(), state.clone());

        Ok(PurchaseReceipt {
            producer_id: id.to_string(),
            amount,
            resource: def.cost_resource,
            spent: total,
            owned: state.owned,
        })
    }

    /// Raise a producer's level by one, paying from `level_cost` if given.
    pub fn upgrade(
        &mut self,
        defs: &Definitions,
        pool: &mut ResourcePool,
        id: &str,
        level_cost: Option<&LevelCost>,
    ) -> Result<u32, SimError> {
        let (def, mut state) = self.available(defs, id)?;
        if let Some(max) = def.max_level {
            if state.level >= max {
                return Err(SimError::not_available(id, format!("already at max level {max}")));
            }
        }
        if let Some(table) = level_cost {
            pool.debit(table.resource, table.price(state.level))?;
        }
        state.level += 1;
        let level = state.level;
        self.entries.insert(id.to_string(), state);
        Ok(level)
    }

    /// Unlock a producer whose requirement is met. Returns `false` if it
    /// was already unlocked; unlocking never reverses.
    pub fn unlock(
        &mut self,
        defs: &Definitions,
        id: &str,
        progress: &Progress,
        now: f64,
    ) -> Result<bool, SimError> {
        let def = defs
            .get(id)
            .ok_or_else(|| SimError::not_available(id, "unknown producer"))?;
        let state = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| ProducerState::fresh(def, now));
        if state.unlocked {
            return Ok(false);
        }
        let met = def
            .unlock_requirement
            .as_ref()
            .map(|req| req.is_satisfied(progress))
            .unwrap_or(true);
        if !met {
            return Err(SimError::not_available(id, "unlock requirement not met"));
        }
        state.unlocked = true;
        state.last_collected_at = now;
        Ok(true)
    }

    /// Locked producers whose requirement is currently met.
    pub fn ready_to_unlock(&self, defs: &Definitions, progress: &Progress) -> Vec<String> {
        defs.values()
            .filter(|def| !self.entries.get(&def.id).map(|s| s.unlocked).unwrap_or(false))
            .filter(|def| {
                def.unlock_requirement
                    .as_ref()
                    .map(|req| req.is_satisfied(progress))
                    .unwrap_or(true)
            })
            .map(|def| def.id.clone())
            .collect()
    }

    /// Effective production per second of one producer.
    pub fn production_of(&self, defs: &Definitions, id: &str, effects: &EffectSet) -> f64 {
        let (Some(def), Some(state)) = (defs.get(id), self.entries.get(id)) else {
            return 0.0;
        };
        if !state.unlocked {
            return 0.0;
        }
        scaling::production(def, state.owned, state.level)
            * effects.get(def.produces.generation_effect())
    }

    /// Production per second summed per resource over every unlocked,
    /// owned producer. Every resource appears, with 0.0 if nothing makes it.
    pub fn total_production_by_resource(
        &self,
        defs: &Definitions,
        effects: &EffectSet,
    ) -> BTreeMap<Resource, f64> {
        let mut rates: BTreeMap<Resource, f64> =
            Resource::ALL.iter().map(|r| (*r, 0.0)).collect();
        for (id, state) in &self.entries {
            if !state.unlocked || state.owned == 0 {
                continue;
            }
            let Some(def) = defs.get(id) else {
                continue;
            };
            *rates.entry(def.produces).or_insert(0.0) += self.production_of(defs, id, effects);
        }
        rates
    }

    /// Credit `elapsed` seconds of production and stamp collection time.
    pub fn collect(
        &mut self,
        defs: &Definitions,
        pool: &mut ResourcePool,
        effects: &EffectSet,
        elapsed: f64,
        collected_at: f64,
    ) {
        for (resource, rate) in self.total_production_by_resource(defs, effects) {
            pool.credit(resource, rate * elapsed);
        }
        for state in self.entries.values_mut() {
            if state.unlocked {
                state.last_collected_at = collected_at;
            }
        }
    }

    /// Every entry has a definition, a level of at least 1 and a finite
    /// collection time.
    pub fn validate(&self, defs: &Definitions) -> Result<(), SimError> {
        for (id, state) in &self.entries {
            let def = defs
                .get(id)
                .ok_or_else(|| SimError::corrupted(format!("unknown producer `{id}`")))?;
            if state.level == 0 {
                return Err(SimError::corrupted(format!("producer `{id}` has level 0")));
            }
            if let Some(max) = def.max_level {
                if state.level > max {
                    return Err(SimError::corrupted(format!(
                        "producer `{id}` level {} above max {max}",
                        state.level
                    )));
                }
            }
            if !state.last_collected_at.is_finite() {
                return Err(SimError::corrupted(format!(
                    "producer `{id}` has no valid collection time"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectKey;
    use crate::requirements::Requirement;

    fn defs() -> Definitions {
        let mut map = Definitions::new();
        let wisp = ProducerDefinition::generator("wisp", 10.0, 1.15, 0.1);
        let mut imp = ProducerDefinition::generator("imp", 50.0, 1.2, 1.0);
        imp.starts_unlocked = false;
        imp.produces = Resource::Gold;
        imp.unlock_requirement = Some(Requirement::ProducerOwned {
            producer: "wisp".into(),
            count: 2,
        });
        imp.level_cost = Some(LevelCost {
            resource: Resource::Essence,
            base: 100.0,
            growth: 2.0,
        });
        imp.max_level = Some(2);
        map.insert(wisp.id.clone(), wisp);
        map.insert(imp.id.clone(), imp);
        map
    }

    fn pool(essence: f64) -> ResourcePool {
        let mut pool = ResourcePool::new();
        pool.credit(Resource::Essence, essence);
        pool
    }

    fn progress(ledger: &ProducerLedger, pool: &ResourcePool) -> Progress {
        Progress {
            resources: pool.clone(),
            owned: ledger.owned_counts(),
            traits: Default::default(),
        }
    }

    #[test]
    fn test_purchase_one_then_another() {
        let defs = defs();
        let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
        let mut pool = pool(21.0);

        let first = ledger.purchase(&defs, &mut pool, "wisp", 1).unwrap();
        assert_eq!(first.spent, 10.0);
        assert_eq!(ledger.owned("wisp"), 1);

        let second = ledger.purchase(&defs, &mut pool, "wisp", 1).unwrap();
        assert_eq!(second.spent, 11.0);
        assert_eq!(pool.amount(Resource::Essence), 0.0);
    }

    #[test]
    fn test_bulk_purchase_charges_successive_costs() {
        let defs = defs();
        let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
        let mut pool = pool(1_000.0);
        let receipt = ledger.purchase(&defs, &mut pool, "wisp", 3).unwrap();
        // 10 + 11 + 13
        assert_eq!(receipt.spent, 34.0);
        assert_eq!(receipt.owned, 3);
    }

    #[test]
    fn test_insufficient_purchase_changes_nothing() {
        let defs = defs();
        let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
        let mut pool = pool(20.0);
        let before = ledger.clone();
        let err = ledger.purchase(&defs, &mut pool, "wisp", 2).unwrap_err();
        assert_eq!(
            err,
            SimError::InsufficientResource {
                resource: Resource::Essence,
                required: 21.0,
                available: 20.0,
                shortfall: 1.0,
            }
        );
        assert_eq!(ledger, before);
        assert_eq!(pool.amount(Resource::Essence), 20.0);
    }

    #[test]
    fn test_locked_and_unknown_not_available() {
        let defs = defs();
        let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
        let mut pool = pool(1_000.0);
        assert!(matches!(
            ledger.purchase(&defs, &mut pool, "imp", 1),
            Err(SimError::NotAvailable { .. })
        ));
        assert!(matches!(
            ledger.purchase(&defs, &mut pool, "ghoul", 1),
            Err(SimError::NotAvailable { .. })
        ));
        assert!(matches!(
            ledger.upgrade(&defs, &mut pool, "imp", None),
            Err(SimError::NotAvailable { .. })
        ));
        assert_eq!(pool.amount(Resource::Essence), 1_000.0);
    }

    #[test]
    fn test_unlock_requires_requirement_and_is_one_way() {
        let defs = defs();
        let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
        let mut pool = pool(1_000.0);

        let p = progress(&ledger, &pool);
        assert!(ledger.unlock(&defs, "imp", &p, 5.0).is_err());
        assert!(ledger.ready_to_unlock(&defs, &p).is_empty());

        ledger.purchase(&defs, &mut pool, "wisp", 2).unwrap();
        let p = progress(&ledger, &pool);
        assert_eq!(ledger.ready_to_unlock(&defs, &p), vec!["imp".to_string()]);
        assert!(ledger.unlock(&defs, "imp", &p, 5.0).unwrap());
        assert!(!ledger.unlock(&defs, "imp", &p, 6.0).unwrap());
        assert!(ledger.get("imp").unwrap().unlocked);
    }

    #[test]
    fn test_upgrade_pays_level_table_and_respects_max() {
        let defs = defs();
        let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
        let mut pool = pool(1_000.0);
        ledger.purchase(&defs, &mut pool, "wisp", 2).unwrap();
        let p = progress(&ledger, &pool);
        ledger.unlock(&defs, "imp", &p, 0.0).unwrap();

        let table = defs["imp"].level_cost.clone();
        let before = pool.amount(Resource::Essence);
        assert_eq!(ledger.upgrade(&defs, &mut pool, "imp", table.as_ref()).unwrap(), 2);
        assert_eq!(pool.amount(Resource::Essence), before - 100.0);
        assert!(matches!(
            ledger.upgrade(&defs, &mut pool, "imp", table.as_ref()),
            Err(SimError::NotAvailable { .. })
        ));
    }

    #[test]
    fn test_upgrade_without_table_is_free() {
        let defs = defs();
        let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
        let mut pool = ResourcePool::new();
        assert_eq!(ledger.upgrade(&defs, &mut pool, "wisp", None).unwrap(), 2);
    }

    #[test]
    fn test_production_rate_with_multiplier() {
        let defs = defs();
        let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
        ledger.restore(
            "wisp",
            ProducerState {
                owned: 5,
                level: 1,
                unlocked: true,
                last_collected_at: 0.0,
            },
        );
        let plain = ledger.total_production_by_resource(&defs, &EffectSet::neutral());
        assert!((plain[&Resource::Essence] - 0.5).abs() < 1e-12);
        assert_eq!(plain[&Resource::Gold], 0.0);

        let boosted = EffectSet::neutral().with(EffectKey::EssenceGenerationMultiplier, 1.1);
        let rates = ledger.total_production_by_resource(&defs, &boosted);
        assert!((rates[&Resource::Essence] - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_collect_credits_rate_times_elapsed() {
        let defs = defs();
        let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
        let mut pool = pool(100.0);
        ledger.purchase(&defs, &mut pool, "wisp", 5).unwrap();
        let before = pool.amount(Resource::Essence);
        ledger.collect(&defs, &mut pool, &EffectSet::neutral(), 10.0, 10.0);
        assert!((pool.amount(Resource::Essence) - before - 5.0).abs() < 1e-9);
        assert_eq!(ledger.get("wisp").unwrap().last_collected_at, 10.0);
    }

    #[test]
    fn test_validate_rejects_level_zero() {
        let defs = defs();
        let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
        ledger.restore(
            "wisp",
            ProducerState {
                owned: 1,
                level: 0,
                unlocked: true,
                last_collected_at: 0.0,
            },
        );
        assert!(matches!(ledger.validate(&defs), Err(SimError::CorruptedSaveState(_))));
    }
}
