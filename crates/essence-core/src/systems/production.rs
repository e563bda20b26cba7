//! Production system - credits producer output for an elapsed window

use std::collections::BTreeMap;

use essence_logic::catalog::Catalog;
use essence_logic::effects::EffectSet;
use essence_logic::resources::Resource;

use crate::state::GameState;

/// Credit `elapsed` seconds of production at the current rates and return
/// the amounts credited per resource.
///
/// Rates are constant within a step (nothing in a step changes owned counts,
/// levels or traits), so accrual is exactly `rate × elapsed`.
pub fn production_system(
    state: &mut GameState,
    catalog: &Catalog,
    effects: &EffectSet,
    elapsed: f64,
) -> BTreeMap<Resource, f64> {
    let rates = state
        .producers
        .total_production_by_resource(&catalog.producers, effects);
    state.producers.collect(
        &catalog.producers,
        &mut state.resources,
        effects,
        elapsed,
        state.now + elapsed,
    );
    rates
        .into_iter()
        .map(|(resource, rate)| (resource, rate * elapsed))
        .collect()
}
