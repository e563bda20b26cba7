//! Catch-up properties: a step over `a + b` seconds matches a step over
//! `a` followed by one over `b`, and a run of live ticks matches a single
//! catch-up over the same span.

use essence_core::data::default_catalog;
use essence_core::state::{interaction_cooldown_key, GameState};
use essence_core::tick::step;
use essence_logic::catalog::Catalog;
use essence_logic::config::SimConfig;
use essence_logic::constants::SECONDS_PER_DAY;
use essence_logic::relationships::ChangeSource;
use essence_logic::resources::Resource;
use proptest::prelude::*;

const START: f64 = 1_700_000_000.0;

/// A mid-game state: producers owned on every resource, a growth trait,
/// relationships moved and an interaction cooldown running.
fn mid_game(catalog: &Catalog, wisps: u64, last_talk: f64, cooldown: f64) -> GameState {
    let mut state = GameState::new(catalog, START);
    for resource in Resource::ALL {
        state.resources.credit(resource, 1_000_000.0);
    }
    for (id, amount) in [("wisp", wisps), ("imp", 3)] {
        let progress = state.progress();
        state
            .producers
            .unlock(&catalog.producers, id, &progress, START)
            .unwrap();
        state
            .producers
            .purchase(&catalog.producers, &mut state.resources, id, amount)
            .unwrap();
    }
    state.acquired_traits.insert("growing_affinity".into());
    state.acquired_traits.insert("essence_focus".into());
    state
        .relationships
        .apply_change(
            &catalog.npcs,
            "orrin",
            35.0,
            ChangeSource::Interaction,
            START - last_talk,
            1.0,
        )
        .unwrap();
    state
        .cooldowns
        .insert(interaction_cooldown_key("orrin"), cooldown);
    state
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

fn assert_equivalent(a: &GameState, b: &GameState) {
    for resource in Resource::ALL {
        assert!(
            close(a.resources.amount(resource), b.resources.amount(resource)),
            "{resource}: {} vs {}",
            a.resources.amount(resource),
            b.resources.amount(resource)
        );
        assert!(close(
            a.resources.lifetime(resource),
            b.resources.lifetime(resource)
        ));
    }
    for record in a.relationships.records() {
        let other = b.relationships.get(&record.npc_id).unwrap();
        assert!(
            close(record.value, other.value),
            "{}: {} vs {}",
            record.npc_id,
            record.value,
            other.value
        );
    }
    assert_eq!(
        a.cooldowns.keys().collect::<Vec<_>>(),
        b.cooldowns.keys().collect::<Vec<_>>()
    );
    for (key, left) in &a.cooldowns {
        assert!(close(*left, b.cooldowns[key]));
    }
    assert!(close(a.now, b.now));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn step_is_additive(
        wisps in 1u64..40,
        last_talk in 0.0f64..(3.0 * SECONDS_PER_DAY),
        cooldown in 0.0f64..7_200.0,
        a in 0.0f64..(2.0 * SECONDS_PER_DAY),
        b in 0.0f64..(2.0 * SECONDS_PER_DAY),
    ) {
        let catalog = default_catalog().unwrap();
        let config = SimConfig::default();
        let state = mid_game(&catalog, wisps, last_talk, cooldown);

        let whole = step(&state, &catalog, &config, a + b).unwrap();
        let first = step(&state, &catalog, &config, a).unwrap();
        let split = step(&first, &catalog, &config, b).unwrap();
        assert_equivalent(&whole, &split);
    }

    #[test]
    fn step_never_goes_negative(
        wisps in 1u64..40,
        last_talk in 0.0f64..(30.0 * SECONDS_PER_DAY),
        elapsed in 0.0f64..(10.0 * SECONDS_PER_DAY),
    ) {
        let catalog = default_catalog().unwrap();
        let config = SimConfig::default();
        let state = mid_game(&catalog, wisps, last_talk, 60.0);
        let next = step(&state, &catalog, &config, elapsed).unwrap();
        prop_assert!(next.validate(&catalog, &config).is_ok());
        for resource in Resource::ALL {
            prop_assert!(next.resources.amount(resource) >= state.resources.amount(resource));
        }
        prop_assert!(next.cooldowns.values().all(|c| *c >= 0.0));
    }
}

#[test]
fn test_hour_of_live_ticks_matches_one_step() {
    let catalog = default_catalog().unwrap();
    let config = SimConfig::default();
    let state = mid_game(&catalog, 12, 20.0 * 3_600.0, 900.0);

    let mut live = state.clone();
    for _ in 0..3_600 {
        live = step(&live, &catalog, &config, config.tick_interval_secs).unwrap();
    }
    let caught_up = step(&state, &catalog, &config, 3_600.0).unwrap();
    assert_equivalent(&live, &caught_up);
}

#[test]
fn test_elapsed_beyond_cap_matches_cap() {
    let catalog = default_catalog().unwrap();
    let config = SimConfig::default();
    let state = mid_game(&catalog, 5, 0.0, 0.0);

    let capped = step(&state, &catalog, &config, 10.0 * SECONDS_PER_DAY).unwrap();
    let exact = step(&state, &catalog, &config, config.max_offline_secs).unwrap();
    assert_eq!(capped, exact);
}
