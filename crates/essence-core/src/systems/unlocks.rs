//! Unlock system - flips locked producers whose requirement is now met

use essence_logic::catalog::Catalog;

use crate::state::GameState;

/// Unlock every producer whose requirement is satisfied and return their
/// ids. Unlocking changes no input a requirement reads, so one pass is
/// enough.
pub fn unlock_system(state: &mut GameState, catalog: &Catalog) -> Vec<String> {
    let progress = state.progress();
    let ready = state.producers.ready_to_unlock(&catalog.producers, &progress);
    let mut unlocked = Vec::new();
    for id in ready {
        match state
            .producers
            .unlock(&catalog.producers, &id, &progress, state.now)
        {
            Ok(true) => {
                log::info!("unlocked producer `{}`", id);
                unlocked.push(id);
            }
            Ok(false) => {}
            Err(e) => log::debug!("unlock of `{}` skipped: {}", id, e),
        }
    }
    unlocked
}
