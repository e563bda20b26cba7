//! Trait effects and their aggregation into an [`EffectSet`].
//!
//! Each trait declares a map of effect keys to numbers. The resolver folds
//! every active trait into one aggregate, using the composition rule that
//! the key itself declares:
//!
//! - `*Multiplier` keys compose multiplicatively (`1.1 × 1.15`), identity 1.0
//! - chance keys and `passiveRelationshipGrowth` compose additively, identity 0.0
//!
//! The set is rebuilt from trait definitions on demand and never mutated in
//! place by gameplay code.
//!
//! ```
//! use std::collections::{BTreeMap, BTreeSet};
//! use essence_logic::effects::{resolve, EffectKey, TraitDefinition, TraitKind};
//!
//! let mut defs = BTreeMap::new();
//! defs.insert("focus".to_string(), TraitDefinition::passive("focus", EffectKey::EssenceGenerationMultiplier, 1.1));
//! let acquired: BTreeSet<String> = ["focus".to_string()].into();
//! let set = resolve(&acquired, &BTreeSet::new(), &defs);
//! assert!((set.get(EffectKey::EssenceGenerationMultiplier) - 1.1).abs() < 1e-12);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::resources::Resource;

/// A named modifier a trait can contribute to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectKey {
    EssenceGenerationMultiplier,
    GoldGenerationMultiplier,
    SoulHarvestMultiplier,
    RelationshipGainMultiplier,
    /// Relationship points gained per hour by every NPC below the scale maximum.
    PassiveRelationshipGrowth,
    AttackDamageMultiplier,
    DefenseMultiplier,
    MaxHealthMultiplier,
    CriticalChance,
    DodgeChance,
}

/// How two contributions to the same key combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    Multiplicative,
    Additive,
}

impl EffectKey {
    pub const ALL: [EffectKey; 10] = [
        EffectKey::EssenceGenerationMultiplier,
        EffectKey::GoldGenerationMultiplier,
        EffectKey::SoulHarvestMultiplier,
        EffectKey::RelationshipGainMultiplier,
        EffectKey::PassiveRelationshipGrowth,
        EffectKey::AttackDamageMultiplier,
        EffectKey::DefenseMultiplier,
        EffectKey::MaxHealthMultiplier,
        EffectKey::CriticalChance,
        EffectKey::DodgeChance,
    ];

    pub fn composition(self) -> Composition {
        match self {
            EffectKey::PassiveRelationshipGrowth
            | EffectKey::CriticalChance
            | EffectKey::DodgeChance => Composition::Additive,
            _ => Composition::Multiplicative,
        }
    }

    /// Value of the key when no trait contributes to it.
    pub fn identity(self) -> f64 {
        match self.composition() {
            Composition::Multiplicative => 1.0,
            Composition::Additive => 0.0,
        }
    }

    /// Check a single declared contribution.
    pub fn validate_value(self, value: f64) -> Result<(), String> {
        if !value.is_finite() {
            return Err(format!("{:?} must be finite", self));
        }
        if self.composition() == Composition::Multiplicative && value <= 0.0 {
            return Err(format!("{:?} must be positive, got {}", self, value));
        }
        Ok(())
    }
}

/// Whether a trait applies as soon as it is acquired or only while equipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraitKind {
    #[default]
    Passive,
    Equippable,
}

/// Static trait definition loaded from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: TraitKind,
    /// Price paid once when the trait is acquired.
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub cost_resource: Resource,
    pub effects: BTreeMap<EffectKey, f64>,
}

impl TraitDefinition {
    /// Free passive trait with a single effect.
    pub fn passive(id: &str, key: EffectKey, value: f64) -> Self {
        let mut effects = BTreeMap::new();
        effects.insert(key, value);
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind: TraitKind::Passive,
            cost: 0.0,
            cost_resource: Resource::Essence,
            effects,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.id.trim().is_empty() {
            return Err(SimError::invalid("<trait>", "empty trait id"));
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(SimError::invalid(&self.id, "cost must be a non-negative number"));
        }
        for (key, value) in &self.effects {
            key.validate_value(*value)
                .map_err(|reason| SimError::invalid(&self.id, reason))?;
        }
        Ok(())
    }

    /// Whether the trait contributes given the acquired / equipped sets.
    pub fn is_active(&self, acquired: &BTreeSet<String>, equipped: &BTreeSet<String>) -> bool {
        match self.kind {
            TraitKind::Passive => acquired.contains(&self.id),
            TraitKind::Equippable => acquired.contains(&self.id) && equipped.contains(&self.id),
        }
    }
}

/// Aggregated modifiers currently in force.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectSet {
    values: BTreeMap<EffectKey, f64>,
}

impl EffectSet {
    /// The set with no contributions; every key reads as its identity.
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn get(&self, key: EffectKey) -> f64 {
        self.values
            .get(&key)
            .copied()
            .unwrap_or_else(|| key.identity())
    }

    /// Builder used by tests and the resolver.
    pub fn with(mut self, key: EffectKey, value: f64) -> Self {
        self.fold(key, value);
        self
    }

    fn fold(&mut self, key: EffectKey, value: f64) {
        let current = self.get(key);
        let next = match key.composition() {
            Composition::Multiplicative => current * value,
            Composition::Additive => current + value,
        };
        self.values.insert(key, next);
    }

    /// Keys with a non-identity contribution, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (EffectKey, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

/// Fold every active trait into an [`EffectSet`].
///
/// Traits are visited in id order so the floating-point result is the same
/// on every call. Ids without a definition are skipped.
pub fn resolve(
    acquired: &BTreeSet<String>,
    equipped: &BTreeSet<String>,
    definitions: &BTreeMap<String, TraitDefinition>,
) -> EffectSet {
    let mut set = EffectSet::neutral();
    for id in acquired {
        let Some(def) = definitions.get(id) else {
            log::debug!("skipping unknown trait `{}` during effect resolution", id);
            continue;
        };
        if !def.is_active(acquired, equipped) {
            continue;
        }
        for (key, value) in &def.effects {
            set.fold(*key, *value);
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> BTreeMap<String, TraitDefinition> {
        let mut map = BTreeMap::new();
        map.insert(
            "focus".to_string(),
            TraitDefinition::passive("focus", EffectKey::EssenceGenerationMultiplier, 1.1),
        );
        map.insert(
            "greed".to_string(),
            TraitDefinition::passive("greed", EffectKey::EssenceGenerationMultiplier, 1.15),
        );
        map.insert(
            "keen_eye".to_string(),
            TraitDefinition::passive("keen_eye", EffectKey::CriticalChance, 0.05),
        );
        map.insert(
            "sharp".to_string(),
            TraitDefinition::passive("sharp", EffectKey::CriticalChance, 0.1),
        );
        let mut blade = TraitDefinition::passive("blade", EffectKey::AttackDamageMultiplier, 1.5);
        blade.kind = TraitKind::Equippable;
        map.insert("blade".to_string(), blade);
        map
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_multipliers_compose_multiplicatively() {
        let effects = resolve(&set(&["focus", "greed"]), &set(&[]), &defs());
        let value = effects.get(EffectKey::EssenceGenerationMultiplier);
        assert!((value - 1.1 * 1.15).abs() < 1e-12);
        assert!((value - 1.25).abs() > 1e-3);
    }

    #[test]
    fn test_chances_compose_additively() {
        let effects = resolve(&set(&["keen_eye", "sharp"]), &set(&[]), &defs());
        assert!((effects.get(EffectKey::CriticalChance) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_identity_when_absent() {
        let effects = EffectSet::neutral();
        assert_eq!(effects.get(EffectKey::AttackDamageMultiplier), 1.0);
        assert_eq!(effects.get(EffectKey::DodgeChance), 0.0);
    }

    #[test]
    fn test_equippable_requires_equip() {
        let defs = defs();
        let acquired = set(&["blade"]);
        let unequipped = resolve(&acquired, &set(&[]), &defs);
        assert_eq!(unequipped.get(EffectKey::AttackDamageMultiplier), 1.0);
        let equipped = resolve(&acquired, &set(&["blade"]), &defs);
        assert_eq!(equipped.get(EffectKey::AttackDamageMultiplier), 1.5);
    }

    #[test]
    fn test_equipped_but_not_acquired_is_inactive() {
        let effects = resolve(&set(&[]), &set(&["blade"]), &defs());
        assert_eq!(effects.get(EffectKey::AttackDamageMultiplier), 1.0);
    }

    #[test]
    fn test_unknown_trait_skipped() {
        let effects = resolve(&set(&["ghost", "focus"]), &set(&[]), &defs());
        assert!((effects.get(EffectKey::EssenceGenerationMultiplier) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_non_positive_multiplier() {
        let bad = TraitDefinition::passive("curse", EffectKey::DefenseMultiplier, 0.0);
        assert!(matches!(bad.validate(), Err(SimError::InvalidDefinition { .. })));
        let ok = TraitDefinition::passive("luck", EffectKey::DodgeChance, -0.05);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_composition_table() {
        for key in EffectKey::ALL {
            let expected = matches!(
                key,
                EffectKey::PassiveRelationshipGrowth
                    | EffectKey::CriticalChance
                    | EffectKey::DodgeChance
            );
            assert_eq!(key.composition() == Composition::Additive, expected, "{key:?}");
        }
    }
}
