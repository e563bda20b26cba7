//! Essence Headless Simulation Harness
//!
//! Checks the shipped catalog, the scaling and relationship formulas, combat
//! resolution, catch-up equivalence and save fallback without a frontend.
//! Runs entirely in-process with a manual clock.
//!
//! Usage:
//!   cargo run -p essence-simtest
//!   cargo run -p essence-simtest -- --verbose

use std::collections::BTreeMap;

use essence_core::clock::ManualClock;
use essence_core::combat::{CombatCommand, CombatOutcome, CombatSession, PlayerAction};
use essence_core::commands::{Command, CommandOutcome, ProducerCommand};
use essence_core::data::default_catalog;
use essence_core::engine::GameEngine;
use essence_core::persistence::{LoadSource, SaveFormat};
use essence_core::state::GameState;
use essence_logic::catalog::{Catalog, ProducerDefinition};
use essence_logic::combat::damage;
use essence_logic::config::{validate_config, SimConfig};
use essence_logic::constants::SECONDS_PER_DAY;
use essence_logic::effects::{EffectKey, EffectSet};
use essence_logic::ledger::ProducerLedger;
use essence_logic::relationships::{
    CoarseTier, NpcDefinition, RelationshipScale, RelationshipTracker, Tier,
};
use essence_logic::resources::{Resource, ResourcePool};
use essence_logic::scaling;
use tracing_subscriber::filter::LevelFilter;

const START: f64 = 1_700_000_000.0;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    tracing_subscriber::fmt()
        .with_max_level(if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::WARN
        })
        .with_target(false)
        .init();
    println!("=== Essence Simulation Harness ===\n");

    let catalog = match default_catalog() {
        Ok(c) => c,
        Err(e) => {
            println!("  ✗ catalog_parse: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Catalog and config validation
    results.extend(validate_catalog(&catalog));

    // 2. Cost and production formulas
    results.extend(validate_scaling());

    // 3. Relationship growth, decay and tiers
    results.extend(validate_relationships());

    // 4. Combat resolution
    results.extend(validate_combat(&catalog));

    // 5. Live ticking vs catch-up
    results.extend(validate_catch_up(&catalog));

    // 6. Save and fallback
    results.extend(validate_persistence(&catalog));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();
    log::info!("harness finished: {} checks", total);

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(catalog: &Catalog) -> Vec<TestResult> {
    println!("--- Catalog ---");
    let mut results = Vec::new();

    results.push(check(
        "catalog_not_empty",
        !catalog.producers.is_empty() && !catalog.enemies.is_empty(),
        format!(
            "{} producers, {} traits, {} npcs, {} enemies",
            catalog.producers.len(),
            catalog.traits.len(),
            catalog.npcs.len(),
            catalog.enemies.len()
        ),
    ));

    let starters: Vec<_> = catalog
        .producers
        .values()
        .filter(|p| p.starts_unlocked)
        .map(|p| p.id.as_str())
        .collect();
    results.push(check(
        "catalog_has_starter",
        !starters.is_empty(),
        format!("unlocked at start: {}", starters.join(", ")),
    ));

    // Every starter must be affordable from the starting resources
    let unaffordable: Vec<_> = catalog
        .producers
        .values()
        .filter(|p| p.starts_unlocked)
        .filter(|p| {
            let have = catalog.start.resources.get(&p.cost_resource).copied().unwrap_or(0.0);
            scaling::cost(p, 0) > have
        })
        .map(|p| p.id.as_str())
        .collect();
    results.push(check(
        "catalog_starter_affordable",
        unaffordable.is_empty(),
        if unaffordable.is_empty() {
            "first unit of every starter is affordable".to_string()
        } else {
            format!("unaffordable starters: {}", unaffordable.join(", "))
        },
    ));

    let config = SimConfig::default();
    let errors = validate_config(&config);
    results.push(check(
        "config_default_valid",
        errors.is_empty(),
        format!("{} config errors", errors.len()),
    ));

    let state = GameState::new(catalog, START);
    let valid = state.validate(catalog, &config);
    results.push(check(
        "catalog_new_game_valid",
        valid.is_ok(),
        match valid {
            Ok(()) => "new game state validates".to_string(),
            Err(e) => e.to_string(),
        },
    ));

    results
}

// ── 2. Scaling ──────────────────────────────────────────────────────────

fn validate_scaling() -> Vec<TestResult> {
    println!("--- Scaling ---");
    let mut results = Vec::new();
    let def = ProducerDefinition::generator("wisp", 10.0, 1.15, 0.1);
    let defs: BTreeMap<String, ProducerDefinition> = [("wisp".to_string(), def.clone())].into();

    results.push(check(
        "cost_first_two_units",
        scaling::cost(&def, 0) == 10.0 && scaling::cost(&def, 1) == 11.0,
        format!(
            "cost(0)={}, cost(1)={}",
            scaling::cost(&def, 0),
            scaling::cost(&def, 1)
        ),
    ));

    let bulk = scaling::bulk_cost(&def, 0, 10);
    let summed: f64 = (0..10).map(|n| scaling::cost(&def, n)).sum();
    results.push(check(
        "cost_bulk_matches_sum",
        bulk == summed,
        format!("bulk(10)={}, sum={}", bulk, summed),
    ));

    let budget = 100.0;
    let n = scaling::max_affordable(&def, 0, budget);
    results.push(check(
        "cost_max_affordable",
        scaling::bulk_cost(&def, 0, n) <= budget && scaling::bulk_cost(&def, 0, n + 1) > budget,
        format!("{} units for {}", n, budget),
    ));

    let mut ledger = ProducerLedger::from_definitions(&defs, 0.0);
    let mut pool = ResourcePool::new();
    pool.credit(Resource::Essence, 1_000.0);
    let bought = ledger.purchase(&defs, &mut pool, "wisp", 5).is_ok();
    let neutral = ledger.production_of(&defs, "wisp", &EffectSet::neutral());
    let boosted = ledger.production_of(
        &defs,
        "wisp",
        &EffectSet::neutral().with(EffectKey::EssenceGenerationMultiplier, 1.1),
    );
    results.push(check(
        "production_with_multiplier",
        bought && (neutral - 0.5).abs() < 1e-12 && (boosted - 0.55).abs() < 1e-12,
        format!("5 wisps: {:.3}/s base, {:.3}/s with 1.1x", neutral, boosted),
    ));

    let composed = EffectSet::neutral()
        .with(EffectKey::EssenceGenerationMultiplier, 1.1)
        .with(EffectKey::EssenceGenerationMultiplier, 1.15)
        .get(EffectKey::EssenceGenerationMultiplier);
    results.push(check(
        "effects_multiply",
        (composed - 1.265).abs() < 1e-12,
        format!("1.1 x 1.15 = {:.4}", composed),
    ));

    results
}

// ── 3. Relationships ────────────────────────────────────────────────────

fn validate_relationships() -> Vec<TestResult> {
    println!("--- Relationships ---");
    let mut results = Vec::new();
    let config = SimConfig::default();

    let mut npc = NpcDefinition::new("mira", RelationshipScale::Simple);
    npc.initial_value = 90.0;
    let npcs: BTreeMap<String, NpcDefinition> = [("mira".to_string(), npc)].into();
    let mut tracker = RelationshipTracker::from_definitions(&npcs, 0.0);
    tracker.decay_tick(&npcs, &config.relationships, 0.0, 4.0 * SECONDS_PER_DAY);
    let value = tracker.get("mira").map(|r| r.value).unwrap_or(f64::NAN);
    results.push(check(
        "decay_after_grace",
        (value - 87.0).abs() < 1e-9,
        format!("90 after 3 idle days past grace: {:.3}", value),
    ));

    tracker.decay_tick(
        &npcs,
        &config.relationships,
        4.0 * SECONDS_PER_DAY,
        400.0 * SECONDS_PER_DAY,
    );
    let value = tracker.get("mira").map(|r| r.value).unwrap_or(f64::NAN);
    results.push(check(
        "decay_floors_at_zero",
        value == 0.0,
        format!("after a long absence: {:.3}", value),
    ));

    let tier = config.tiers.classify(RelationshipScale::Simple, 90.0);
    results.push(check(
        "tier_simple_high",
        tier == Tier::Coarse(CoarseTier::Confidant),
        format!("90 on the simple scale: {:?}", tier),
    ));

    results
}

// ── 4. Combat ───────────────────────────────────────────────────────────

fn validate_combat(catalog: &Catalog) -> Vec<TestResult> {
    println!("--- Combat ---");
    let mut results = Vec::new();

    results.push(check(
        "damage_formula",
        damage(12.0, 5.0) == 7.0 && damage(3.0, 5.0) == 0.0,
        format!("12 vs 5 = {}, 3 vs 5 = {}", damage(12.0, 5.0), damage(3.0, 5.0)),
    ));

    let config = SimConfig::default();
    let state = GameState::new(catalog, START);
    let replay = |seed: u64| -> Option<(CombatOutcome, u32)> {
        let mut session = CombatSession::start(catalog, &config, &state, "skeleton", seed).ok()?;
        while !session.is_over() {
            session.act(PlayerAction::Attack).ok()?;
        }
        Some((session.outcome()?, session.round()))
    };
    let first = replay(42);
    let second = replay(42);
    results.push(check(
        "combat_seed_replays",
        first.is_some() && first == second,
        format!("seed 42: {:?}", first),
    ));

    let clock = ManualClock::new(START);
    let rat = GameEngine::new_game(catalog.clone(), config.clone(), Box::new(clock))
        .map_err(|e| e.to_string())
        .and_then(|mut engine| {
            engine
                .execute(Command::Combat(CombatCommand::Start {
                    enemy_id: "rat".into(),
                    seed: 1,
                }))
                .map_err(|e| e.to_string())?;
            loop {
                match engine.combat_action(PlayerAction::Attack) {
                    Ok(CommandOutcome::Combat(report)) if report.outcome.is_some() => {
                        return Ok((report.outcome, engine.state().player.victories));
                    }
                    Ok(_) => {}
                    Err(e) => return Err(e.to_string()),
                }
            }
        });
    results.push(check(
        "combat_rat_victory_written_back",
        matches!(rat, Ok((Some(CombatOutcome::Victory), 1))),
        format!("{:?}", rat),
    ));

    results
}

// ── 5. Catch-up ─────────────────────────────────────────────────────────

fn new_engine(catalog: &Catalog, clock: &ManualClock) -> Result<GameEngine, String> {
    let mut engine = GameEngine::new_game(catalog.clone(), SimConfig::default(), Box::new(clock.clone()))
        .map_err(|e| e.to_string())?;
    engine
        .execute(Command::Producer(ProducerCommand::Purchase {
            producer_id: "wisp".into(),
            amount: 1,
        }))
        .map_err(|e| e.to_string())?;
    Ok(engine)
}

fn validate_catch_up(catalog: &Catalog) -> Vec<TestResult> {
    println!("--- Catch-up ---");
    let mut results = Vec::new();
    let span = 2.0 * 3_600.0;

    let outcome = (|| -> Result<(f64, f64), String> {
        let live_clock = ManualClock::new(START);
        let mut live = new_engine(catalog, &live_clock)?;
        for _ in 0..(span as u32) {
            live_clock.advance(1.0);
            live.advance().map_err(|e| e.to_string())?;
        }

        let idle_clock = ManualClock::new(START);
        let mut idle = new_engine(catalog, &idle_clock)?;
        idle_clock.advance(span);
        idle.catch_up().map_err(|e| e.to_string())?;

        Ok((
            live.state().resources.amount(Resource::Essence),
            idle.state().resources.amount(Resource::Essence),
        ))
    })();
    results.push(check(
        "catch_up_matches_live",
        matches!(outcome, Ok((a, b)) if (a - b).abs() < 1e-6),
        format!("live vs catch-up essence after {}s: {:?}", span, outcome),
    ));

    let capped = (|| -> Result<(f64, f64), String> {
        let clock = ManualClock::new(START);
        let mut engine = new_engine(catalog, &clock)?;
        clock.advance(30.0 * SECONDS_PER_DAY);
        let report = engine.catch_up().map_err(|e| e.to_string())?;
        Ok((report.applied, report.forfeited))
    })();
    let cap = SimConfig::default().max_offline_secs;
    results.push(check(
        "catch_up_capped",
        matches!(capped, Ok((applied, _)) if applied == cap),
        format!("30 days offline: {:?}", capped),
    ));

    results
}

// ── 6. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(catalog: &Catalog) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    for format in [SaveFormat::Binary, SaveFormat::Json] {
        let outcome = (|| -> Result<(LoadSource, bool), String> {
            let clock = ManualClock::new(START);
            let engine = new_engine(catalog, &clock)?;
            let good = engine.save(format).map_err(|e| e.to_string())?;
            let (resumed, report) = GameEngine::resume(
                catalog.clone(),
                SimConfig::default(),
                Box::new(clock.clone()),
                Some(b"definitely not a save".as_slice()),
                Some(good.as_slice()),
                format,
            )
            .map_err(|e| e.to_string())?;
            Ok((report.source, resumed.state() == engine.state()))
        })();
        results.push(check(
            &format!("save_fallback_{:?}", format).to_lowercase(),
            matches!(outcome, Ok((LoadSource::Backup, true))),
            format!("corrupt primary, good backup: {:?}", outcome),
        ));
    }

    results
}
