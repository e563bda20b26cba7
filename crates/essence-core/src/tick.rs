//! The tick step shared by live ticking and offline catch-up.
//!
//! [`step`] is a pure function of `(state, elapsed)`. Every piece of it is a
//! closed-form function of elapsed time:
//!
//! | Concern | Over `t` seconds |
//! |---------|------------------|
//! | Production | `rate × t` at rates fixed for the step |
//! | Relationships | piecewise-linear growth / decay flow, split at decay onset |
//! | Cooldowns | `max(0, c − t)` |
//!
//! so `step(step(s, a), b) == step(s, a + b)` up to float rounding, as long
//! as `a + b` stays under the offline cap.

use std::collections::BTreeMap;

use thiserror::Error;

use essence_logic::catalog::Catalog;
use essence_logic::config::SimConfig;
use essence_logic::resources::Resource;
use essence_logic::SimError;

use crate::state::GameState;
use crate::systems::{cooldown_system, production_system, relationship_system};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickError {
    #[error("elapsed time {0} is not a number")]
    InvalidElapsed(f64),
    #[error("state rejected before tick: {0}")]
    InvalidState(#[from] SimError),
}

/// What a step did, for logging and the harness.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepReport {
    /// Seconds actually simulated after clamping.
    pub applied: f64,
    /// Seconds requested but dropped by the offline cap.
    pub forfeited: f64,
    pub produced: BTreeMap<Resource, f64>,
    pub expired_cooldowns: Vec<String>,
}

/// Clamp a requested delta into `[0, max_offline_secs]`.
pub fn clamp_elapsed(elapsed: f64, config: &SimConfig) -> Result<f64, TickError> {
    if elapsed.is_nan() {
        return Err(TickError::InvalidElapsed(elapsed));
    }
    Ok(elapsed.clamp(0.0, config.max_offline_secs))
}

/// Advance `state` by `elapsed` seconds.
pub fn step(
    state: &GameState,
    catalog: &Catalog,
    config: &SimConfig,
    elapsed: f64,
) -> Result<GameState, TickError> {
    step_with_report(state, catalog, config, elapsed).map(|(next, _)| next)
}

/// [`step`] plus a summary of what changed.
pub fn step_with_report(
    state: &GameState,
    catalog: &Catalog,
    config: &SimConfig,
    elapsed: f64,
) -> Result<(GameState, StepReport), TickError> {
    state.validate(catalog, config)?;
    let applied = clamp_elapsed(elapsed, config)?;
    let forfeited = (elapsed - applied).max(0.0);
    if forfeited > 0.0 {
        log::warn!(
            "clamped elapsed time from {:.0}s to {:.0}s",
            elapsed,
            applied
        );
    }

    let mut next = state.clone();
    let effects = state.effects(catalog);

    let produced = production_system(&mut next, catalog, &effects, applied);
    relationship_system(&mut next, catalog, config, &effects, applied);
    let expired_cooldowns = cooldown_system(&mut next.cooldowns, applied);
    next.now = state.now + applied;

    Ok((
        next,
        StepReport {
            applied,
            forfeited,
            produced,
            expired_cooldowns,
        },
    ))
}
