//! NPC relationships: records, tier classification, change, growth and decay.
//!
//! # Scales
//!
//! Two value ranges coexist and are chosen per NPC definition:
//!
//! - [`RelationshipScale::Simple`]: `0..=100`, classified by the coarse table
//! - [`RelationshipScale::Extended`]: `-100..=100`, classified by the 7-tier
//!   granular table
//!
//! Decay never pushes a value below 0 on either scale.
//!
//! # Tiers
//!
//! A tier is never stored. It is always looked up from the current value in
//! an ordered threshold table (highest first, inclusive lower bound).
//!
//! # Time evolution
//!
//! Between interactions a value moves under two constant rates: passive
//! growth (from the `passiveRelationshipGrowth` effect, up to the scale
//! maximum) and decay (once idle longer than the grace period, down to the
//! floor). [`RelationshipTracker::advance`] integrates that motion in closed
//! form, so one long step and many short steps land on the same value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::RelationshipRules;
use crate::constants::{SECONDS_PER_DAY, SECONDS_PER_HOUR};
use crate::error::SimError;

/// Value range model for one NPC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipScale {
    #[default]
    Simple,
    Extended,
}

impl RelationshipScale {
    pub fn min(self) -> f64 {
        match self {
            RelationshipScale::Simple => 0.0,
            RelationshipScale::Extended => -100.0,
        }
    }

    pub fn max(self) -> f64 {
        100.0
    }

    /// Lowest value decay can reach.
    pub fn decay_floor(self) -> f64 {
        0.0
    }

    pub fn clamp(self, value: f64) -> f64 {
        value.clamp(self.min(), self.max())
    }

    pub fn contains(self, value: f64) -> bool {
        value.is_finite() && value >= self.min() && value <= self.max()
    }
}

/// 7-tier classification used on the extended scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GranularTier {
    Nemesis,
    Enemy,
    Unfriendly,
    Neutral,
    Friendly,
    Ally,
    Devoted,
}

/// Coarse classification used on the simple scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoarseTier {
    Stranger,
    Acquaintance,
    Friend,
    Confidant,
}

/// A tier as presented for one NPC, tagged by the table that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tier {
    Coarse(CoarseTier),
    Granular(GranularTier),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold<T> {
    /// Inclusive lower bound.
    pub min: f64,
    pub tier: T,
}

/// Ordered threshold table, highest bound first. Values below every
/// threshold map to `floor_tier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdTable<T> {
    pub thresholds: Vec<Threshold<T>>,
    pub floor_tier: T,
}

impl<T: Copy> ThresholdTable<T> {
    pub fn classify(&self, value: f64) -> T {
        self.thresholds
            .iter()
            .find(|t| value >= t.min)
            .map(|t| t.tier)
            .unwrap_or(self.floor_tier)
    }

    pub fn is_descending(&self) -> bool {
        self.thresholds.iter().all(|t| t.min.is_finite())
            && self.thresholds.windows(2).all(|w| w[0].min > w[1].min)
    }
}

impl Default for ThresholdTable<GranularTier> {
    fn default() -> Self {
        use GranularTier::*;
        Self {
            thresholds: vec![
                Threshold { min: 80.0, tier: Devoted },
                Threshold { min: 50.0, tier: Ally },
                Threshold { min: 20.0, tier: Friendly },
                Threshold { min: -20.0, tier: Neutral },
                Threshold { min: -50.0, tier: Unfriendly },
                Threshold { min: -80.0, tier: Enemy },
            ],
            floor_tier: Nemesis,
        }
    }
}

impl Default for ThresholdTable<CoarseTier> {
    fn default() -> Self {
        use CoarseTier::*;
        Self {
            thresholds: vec![
                Threshold { min: 80.0, tier: Confidant },
                Threshold { min: 50.0, tier: Friend },
                Threshold { min: 20.0, tier: Acquaintance },
            ],
            floor_tier: Stranger,
        }
    }
}

/// Both classification tables, selectable independently.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TierTables {
    pub coarse: ThresholdTable<CoarseTier>,
    pub granular: ThresholdTable<GranularTier>,
}

impl TierTables {
    /// Tier for `value` using the table that belongs to `scale`.
    pub fn classify(&self, scale: RelationshipScale, value: f64) -> Tier {
        match scale {
            RelationshipScale::Simple => Tier::Coarse(coarse_tier(&self.coarse, value)),
            RelationshipScale::Extended => Tier::Granular(granular_tier(&self.granular, value)),
        }
    }
}

/// Classify with the 7-tier granular table.
pub fn granular_tier(table: &ThresholdTable<GranularTier>, value: f64) -> GranularTier {
    table.classify(value)
}

/// Classify with the coarse table.
pub fn coarse_tier(table: &ThresholdTable<CoarseTier>, value: f64) -> CoarseTier {
    table.classify(value)
}

/// Static NPC definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scale: RelationshipScale,
    #[serde(default)]
    pub initial_value: f64,
    /// Overrides the configured decay per day.
    #[serde(default)]
    pub decay_per_day: Option<f64>,
}

impl NpcDefinition {
    pub fn new(id: &str, scale: RelationshipScale) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            scale,
            initial_value: 0.0,
            decay_per_day: None,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.id.trim().is_empty() {
            return Err(SimError::invalid("<npc>", "empty npc id"));
        }
        if !self.scale.contains(self.initial_value) {
            return Err(SimError::invalid(
                &self.id,
                format!("initial value {} outside scale", self.initial_value),
            ));
        }
        if let Some(rate) = self.decay_per_day {
            if !rate.is_finite() || rate < 0.0 {
                return Err(SimError::invalid(&self.id, "decayPerDay must be non-negative"));
            }
        }
        Ok(())
    }
}

/// What caused a relationship change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeSource {
    Interaction,
    Gift,
    Quest,
    Combat,
    /// Scripted world event; not a personal interaction.
    Event,
}

impl ChangeSource {
    /// Genuine interactions reset the idle timer that drives decay.
    pub fn resets_idle_timer(self) -> bool {
        matches!(
            self,
            ChangeSource::Interaction | ChangeSource::Gift | ChangeSource::Quest
        )
    }
}

/// Persisted relationship state for one NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRecord {
    pub npc_id: String,
    pub value: f64,
    pub last_interaction_at: f64,
}

/// All relationship records, keyed by NPC id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipTracker {
    records: BTreeMap<String, RelationshipRecord>,
}

impl RelationshipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// One record per defined NPC at its initial value.
    pub fn from_definitions(npcs: &BTreeMap<String, NpcDefinition>, now: f64) -> Self {
        let records = npcs
            .values()
            .map(|def| {
                (
                    def.id.clone(),
                    RelationshipRecord {
                        npc_id: def.id.clone(),
                        value: def.initial_value,
                        last_interaction_at: now,
                    },
                )
            })
            .collect();
        Self { records }
    }

    pub fn get(&self, npc_id: &str) -> Option<&RelationshipRecord> {
        self.records.get(npc_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &RelationshipRecord> {
        self.records.values()
    }

    /// Insert a restored record. The value is checked by [`Self::validate`].
    pub fn restore(&mut self, record: RelationshipRecord) {
        self.records.insert(record.npc_id.clone(), record);
    }

    /// Tier of an NPC under the table that matches its scale.
    pub fn tier(
        &self,
        npcs: &BTreeMap<String, NpcDefinition>,
        tables: &TierTables,
        npc_id: &str,
    ) -> Option<Tier> {
        let def = npcs.get(npc_id)?;
        let record = self.records.get(npc_id)?;
        Some(tables.classify(def.scale, record.value))
    }

    /// Apply a relationship change and return the new value.
    ///
    /// Positive deltas are scaled by `gain_multiplier`. The result is clamped
    /// to the NPC's scale. Only genuine interactions move
    /// `last_interaction_at`.
    pub fn apply_change(
        &mut self,
        npcs: &BTreeMap<String, NpcDefinition>,
        npc_id: &str,
        delta: f64,
        source: ChangeSource,
        now: f64,
        gain_multiplier: f64,
    ) -> Result<f64, SimError> {
        let def = npcs
            .get(npc_id)
            .ok_or_else(|| SimError::not_available(npc_id, "unknown npc"))?;
        if !delta.is_finite() {
            return Err(SimError::not_available(npc_id, "relationship delta must be finite"));
        }

        let scaled = if delta > 0.0 { delta * gain_multiplier } else { delta };
        let record = self
            .records
            .entry(npc_id.to_string())
            .or_insert_with(|| RelationshipRecord {
                npc_id: npc_id.to_string(),
                value: def.initial_value,
                last_interaction_at: now,
            });
        record.value = def.scale.clamp(record.value + scaled);
        if source.resets_idle_timer() {
            record.last_interaction_at = now;
        }
        log::debug!(
            "relationship {} {:+.2} via {:?} -> {:.2}",
            npc_id,
            scaled,
            source,
            record.value
        );
        Ok(record.value)
    }

    /// Apply decay for the window `[since, now]` without passive growth.
    ///
    /// Only the part of the window past each record's grace period counts,
    /// and `last_interaction_at` is left alone.
    pub fn decay_tick(
        &mut self,
        npcs: &BTreeMap<String, NpcDefinition>,
        rules: &RelationshipRules,
        since: f64,
        now: f64,
    ) {
        self.advance(npcs, rules, since, (now - since).max(0.0), 0.0);
    }

    /// Evolve every record over `[from, from + elapsed]` under passive growth
    /// (points per hour) and idle decay.
    pub fn advance(
        &mut self,
        npcs: &BTreeMap<String, NpcDefinition>,
        rules: &RelationshipRules,
        from: f64,
        elapsed: f64,
        growth_per_hour: f64,
    ) {
        if elapsed <= 0.0 {
            return;
        }
        let growth = (growth_per_hour / SECONDS_PER_HOUR).max(0.0);
        let end = from + elapsed;

        for record in self.records.values_mut() {
            let Some(def) = npcs.get(&record.npc_id) else {
                continue;
            };
            let decay_per_day = def.decay_per_day.unwrap_or(rules.decay_per_day);
            let decay = (decay_per_day / SECONDS_PER_DAY).max(0.0);
            let onset = record.last_interaction_at + rules.decay_grace_secs;

            let quiet = (onset.min(end) - from).clamp(0.0, elapsed);
            let idle = elapsed - quiet;

            let floor = def.scale.decay_floor();
            let cap = def.scale.max();
            let mut value = flow(record.value, growth, 0.0, floor, cap, quiet);
            value = flow(value, growth, decay, floor, cap, idle);
            record.value = def.scale.clamp(value);
        }
    }

    /// Every value inside its scale and every NPC defined.
    pub fn validate(&self, npcs: &BTreeMap<String, NpcDefinition>) -> Result<(), SimError> {
        for record in self.records.values() {
            let def = npcs.get(&record.npc_id).ok_or_else(|| {
                SimError::corrupted(format!("relationship with unknown npc `{}`", record.npc_id))
            })?;
            if !def.scale.contains(record.value) {
                return Err(SimError::corrupted(format!(
                    "relationship `{}` value {} outside scale",
                    record.npc_id, record.value
                )));
            }
            if !record.last_interaction_at.is_finite() {
                return Err(SimError::corrupted(format!(
                    "relationship `{}` has no valid interaction time",
                    record.npc_id
                )));
            }
        }
        Ok(())
    }
}

/// Closed-form motion of a value under growth (active below `cap`) and
/// decay (active above `floor`) for `secs` seconds.
///
/// The value moves linearly inside each region and stops at a boundary
/// where the rates on both sides push against each other. Because the
/// motion only depends on the current value, splitting `secs` into any
/// number of pieces gives the same end point.
fn flow(value: f64, growth: f64, decay: f64, floor: f64, cap: f64, secs: f64) -> f64 {
    let mut v = value;
    let mut remaining = secs;
    let inside = growth - decay;

    // Each pass crosses at most one boundary; three passes cover
    // below-floor -> floor -> cap.
    for _ in 0..3 {
        if remaining <= 0.0 {
            break;
        }
        let (rate, target) = if v < floor {
            if growth <= 0.0 {
                break;
            }
            (growth, floor.min(cap))
        } else if v < cap {
            if inside > 0.0 {
                (inside, cap)
            } else if inside < 0.0 && v > floor {
                (inside, floor)
            } else {
                break;
            }
        } else if inside < 0.0 {
            (inside, floor)
        } else {
            break;
        };

        let to_target = (target - v) / rate;
        if to_target >= remaining {
            v += rate * remaining;
            remaining = 0.0;
        } else {
            v = target;
            remaining -= to_target;
        }
    }
    v
}
