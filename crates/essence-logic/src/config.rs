//! Simulation tuning knobs.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Validation reports every problem at once:
//!
//! ```
//! use essence_logic::config::{validate_config, SimConfig};
//!
//! let config = SimConfig::default();
//! assert!(validate_config(&config).is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DECAY_GRACE_SECS, DEFAULT_DECAY_PER_DAY, DEFAULT_MAX_OFFLINE_SECS,
    DEFAULT_TICK_INTERVAL_SECS, SECONDS_PER_HOUR,
};
use crate::relationships::TierTables;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimConfig {
    /// Fixed live tick step in seconds.
    pub tick_interval_secs: f64,
    /// Upper clamp on any single step, live or catch-up.
    pub max_offline_secs: f64,
    /// A live backlog larger than this many intervals is applied as one step.
    pub max_live_backlog_ticks: u32,
    pub relationships: RelationshipRules,
    pub tiers: TierTables,
    pub max_equipped_traits: usize,
    pub combat: CombatRules,
    pub player_growth: LevelGrowth,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            max_offline_secs: DEFAULT_MAX_OFFLINE_SECS,
            max_live_backlog_ticks: 60,
            relationships: RelationshipRules::default(),
            tiers: TierTables::default(),
            max_equipped_traits: 3,
            combat: CombatRules::default(),
            player_growth: LevelGrowth::default(),
        }
    }
}

/// Growth, decay and interaction pacing for relationships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelationshipRules {
    /// Idle seconds before decay begins.
    pub decay_grace_secs: f64,
    /// Points lost per idle day past the grace period, unless the NPC overrides it.
    pub decay_per_day: f64,
    /// Minimum seconds between direct interactions with the same NPC.
    pub interaction_cooldown_secs: f64,
}

impl Default for RelationshipRules {
    fn default() -> Self {
        Self {
            decay_grace_secs: DEFAULT_DECAY_GRACE_SECS,
            decay_per_day: DEFAULT_DECAY_PER_DAY,
            interaction_cooldown_secs: SECONDS_PER_HOUR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CombatRules {
    pub crit_multiplier: f64,
    pub flee_chance: f64,
    /// Shield magnitude granted by the Defend action.
    pub defend_shield: f64,
    /// Rounds after which the fight ends in a stalemate.
    pub max_rounds: u32,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            crit_multiplier: 1.5,
            flee_chance: 0.5,
            defend_shield: 5.0,
            max_rounds: 100,
        }
    }
}

/// Stat gains per player level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LevelGrowth {
    /// Experience needed per level, multiplied by the current level.
    pub experience_per_level: u64,
    pub max_health: f64,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
}

impl Default for LevelGrowth {
    fn default() -> Self {
        Self {
            experience_per_level: 100,
            max_health: 10.0,
            attack: 2.0,
            defense: 1.0,
            speed: 0.5,
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Tick interval not a positive number.
    InvalidTickInterval(f64),
    /// Offline cap negative, non-finite, or below one tick.
    InvalidOfflineCap(f64),
    /// A rate or duration that must be non-negative.
    NegativeValue(&'static str, f64),
    /// A probability outside 0..=1.
    InvalidChance(&'static str, f64),
    /// Crit multiplier below 1.
    InvalidCritMultiplier(f64),
    /// Threshold table not strictly descending.
    UnorderedTierTable(&'static str),
    ZeroRoundLimit,
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &SimConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if !(config.tick_interval_secs.is_finite() && config.tick_interval_secs > 0.0) {
        errors.push(ConfigError::InvalidTickInterval(config.tick_interval_secs));
    }
    if !config.max_offline_secs.is_finite() || config.max_offline_secs < config.tick_interval_secs
    {
        errors.push(ConfigError::InvalidOfflineCap(config.max_offline_secs));
    }

    let rules = &config.relationships;
    let non_negative = [
        ("relationships.decayGraceSecs", rules.decay_grace_secs),
        ("relationships.decayPerDay", rules.decay_per_day),
        ("relationships.interactionCooldownSecs", rules.interaction_cooldown_secs),
        ("combat.defendShield", config.combat.defend_shield),
        ("playerGrowth.maxHealth", config.player_growth.max_health),
        ("playerGrowth.attack", config.player_growth.attack),
        ("playerGrowth.defense", config.player_growth.defense),
        ("playerGrowth.speed", config.player_growth.speed),
    ];
    for (name, value) in non_negative {
        if !value.is_finite() || value < 0.0 {
            errors.push(ConfigError::NegativeValue(name, value));
        }
    }

    if !(0.0..=1.0).contains(&config.combat.flee_chance) {
        errors.push(ConfigError::InvalidChance("combat.fleeChance", config.combat.flee_chance));
    }
    if !(config.combat.crit_multiplier >= 1.0) {
        errors.push(ConfigError::InvalidCritMultiplier(config.combat.crit_multiplier));
    }
    if config.combat.max_rounds == 0 {
        errors.push(ConfigError::ZeroRoundLimit);
    }

    if !config.tiers.coarse.is_descending() {
        errors.push(ConfigError::UnorderedTierTable("coarse"));
    }
    if !config.tiers.granular.is_descending() {
        errors.push(ConfigError::UnorderedTierTable("granular"));
    }

    errors
}
