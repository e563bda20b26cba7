//! Game engine - owns the state and drives it from a clock
//!
//! The engine is the only place that reads time. Catch-up on resume and
//! live ticking both hand an elapsed delta to the same pure [`crate::tick::step`], so a
//! session played live and a session resumed after the same gap end in the
//! same state.

use std::collections::BTreeMap;
use std::io::Write;

use thiserror::Error;

use essence_logic::catalog::Catalog;
use essence_logic::config::SimConfig;
use essence_logic::resources::Resource;
use essence_logic::SimError;

use crate::clock::Clock;
use crate::combat::{
    write_back, CombatCommand, CombatEvent, CombatReport, CombatSession, PlayerAction,
};
use crate::commands::{dispatch, Command, CommandOutcome, Context, HandlerTable};
use crate::data::{check_config, DataError};
use crate::persistence::{load_with_fallback, save_state, LoadSource, SaveError, SaveFormat};
use crate::state::GameState;
use crate::systems::unlock_system;
use crate::tick::{step_with_report, StepReport, TickError};
use crate::view::{build_view, GameView};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error(transparent)]
    Tick(#[from] TickError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// What a catch-up did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatchUp {
    /// Seconds between the saved timestamp and the clock.
    pub requested: f64,
    pub applied: f64,
    /// Seconds beyond the offline cap that were dropped.
    pub forfeited: f64,
    pub produced: BTreeMap<Resource, f64>,
    pub unlocked: Vec<String>,
}

#[derive(Debug)]
pub struct ResumeReport {
    pub source: LoadSource,
    pub rejected: Vec<(LoadSource, SaveError)>,
    pub catch_up: CatchUp,
}

pub struct GameEngine {
    catalog: Catalog,
    config: SimConfig,
    handlers: HandlerTable,
    clock: Box<dyn Clock>,
    state: GameState,
    /// Last state that passed validation; restored when a step is rejected.
    last_good: GameState,
    /// Real seconds read from the clock but not yet ticked.
    accumulator: f64,
    last_reading: f64,
    combat: Option<CombatSession>,
    pending_events: Vec<CombatEvent>,
}

impl GameEngine {
    /// Start a new game at the clock's current time.
    pub fn new_game(
        catalog: Catalog,
        config: SimConfig,
        clock: Box<dyn Clock>,
    ) -> Result<Self, EngineError> {
        check_config(&config)?;
        let state = GameState::new(&catalog, clock.now());
        log::info!("new game started at {:.0}", state.now);
        Ok(Self::with_state(catalog, config, clock, state))
    }

    /// Load the primary save (falling back to the backup, then a new game)
    /// and catch up to the clock.
    pub fn resume(
        catalog: Catalog,
        config: SimConfig,
        clock: Box<dyn Clock>,
        primary: Option<&[u8]>,
        backup: Option<&[u8]>,
        format: SaveFormat,
    ) -> Result<(Self, ResumeReport), EngineError> {
        check_config(&config)?;
        let report = load_with_fallback(primary, backup, format, &catalog, &config, clock.now());
        let mut engine = Self::with_state(catalog, config, clock, report.state);
        let catch_up = engine.catch_up()?;
        Ok((
            engine,
            ResumeReport {
                source: report.source,
                rejected: report.rejected,
                catch_up,
            },
        ))
    }

    fn with_state(
        catalog: Catalog,
        config: SimConfig,
        clock: Box<dyn Clock>,
        state: GameState,
    ) -> Self {
        let last_reading = clock.now();
        Self {
            catalog,
            config,
            handlers: HandlerTable::default(),
            clock,
            last_good: state.clone(),
            state,
            accumulator: 0.0,
            last_reading,
            combat: None,
            pending_events: Vec::new(),
        }
    }

    /// Replace the command handlers.
    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    /// Apply the time between the state's timestamp and the clock as one
    /// step. Time beyond the offline cap is forfeited and the state is
    /// rebased onto the clock. A clock behind the state applies nothing.
    pub fn catch_up(&mut self) -> Result<CatchUp, EngineError> {
        let now = self.clock.now();
        let requested = now - self.state.now;
        self.last_reading = now;
        self.accumulator = 0.0;

        if requested.is_nan() {
            return Err(TickError::InvalidElapsed(requested).into());
        }
        if requested <= 0.0 {
            if requested < 0.0 {
                log::warn!(
                    "clock is {:.0}s behind the saved state; skipping catch-up",
                    -requested
                );
            }
            return Ok(CatchUp {
                requested,
                ..CatchUp::default()
            });
        }

        let (mut next, report) = self.run_step(requested)?;
        if report.forfeited > 0.0 {
            next.now = now;
        }
        let unlocked = self.commit(next)?;
        log::info!(
            "caught up {:.0}s offline ({:.0}s forfeited)",
            report.applied,
            report.forfeited
        );
        Ok(CatchUp {
            requested,
            applied: report.applied,
            forfeited: report.forfeited,
            produced: report.produced,
            unlocked,
        })
    }

    /// Read the clock and run every whole tick interval that has built up.
    ///
    /// A backlog longer than `max_live_backlog_ticks` intervals runs as one
    /// step; the result is the same either way. Returns the number of
    /// intervals consumed.
    pub fn advance(&mut self) -> Result<u32, EngineError> {
        let now = self.clock.now();
        let real = now - self.last_reading;
        self.last_reading = now;
        if real.is_nan() || real <= 0.0 {
            return Ok(0);
        }
        self.accumulator += real;

        let interval = self.config.tick_interval_secs;
        let due = (self.accumulator / interval).floor();
        if due < 1.0 {
            return Ok(0);
        }
        if due > self.config.max_live_backlog_ticks as f64 {
            let elapsed = due * interval;
            log::debug!("running a {:.0}-tick backlog as one step", due);
            let (mut next, report) = self.run_step(elapsed)?;
            if report.forfeited > 0.0 {
                // the capped span is spent, not left for the next resume
                log::info!("live backlog capped ({:.0}s forfeited)", report.forfeited);
                next.now = self.state.now + elapsed;
            }
            self.commit(next)?;
            self.accumulator -= elapsed;
            return Ok(due as u32);
        }

        let ticks = due as u32;
        for _ in 0..ticks {
            self.live_tick()?;
            self.accumulator -= interval;
        }
        Ok(ticks)
    }

    /// Advance the state by exactly one tick interval.
    pub fn live_tick(&mut self) -> Result<StepReport, EngineError> {
        let (next, report) = self.run_step(self.config.tick_interval_secs)?;
        self.commit(next)?;
        Ok(report)
    }

    fn run_step(&mut self, elapsed: f64) -> Result<(GameState, StepReport), TickError> {
        match step_with_report(&self.state, &self.catalog, &self.config, elapsed) {
            Ok(result) => Ok(result),
            Err(e) => {
                log::warn!("step rejected ({}); restoring last good state", e);
                self.state = self.last_good.clone();
                Err(e)
            }
        }
    }

    /// Install `next`, refresh unlocks and record it as the last good state.
    fn commit(&mut self, mut next: GameState) -> Result<Vec<String>, SimError> {
        let unlocked = unlock_system(&mut next, &self.catalog);
        if let Err(e) = next.validate(&self.catalog, &self.config) {
            log::warn!("discarding invalid state: {}", e);
            return Err(e);
        }
        self.last_good = next.clone();
        self.state = next;
        Ok(unlocked)
    }

    /// Apply a player command. Combat commands go to the active session;
    /// everything else is dispatched against the state.
    pub fn execute(&mut self, command: Command) -> Result<CommandOutcome, EngineError> {
        match command {
            Command::Combat(CombatCommand::Start { enemy_id, seed }) => {
                self.start_combat(&enemy_id, seed)
            }
            Command::Combat(CombatCommand::Act { action }) => self.combat_action(action),
            other => {
                let ctx = Context {
                    catalog: &self.catalog,
                    config: &self.config,
                };
                let (next, outcome) = dispatch(&self.state, &ctx, &self.handlers, other)?;
                self.commit(next)?;
                Ok(outcome)
            }
        }
    }

    pub fn start_combat(&mut self, enemy_id: &str, seed: u64) -> Result<CommandOutcome, EngineError> {
        if self.combat.as_ref().is_some_and(|s| !s.is_over()) {
            return Err(SimError::not_available(enemy_id, "combat already in progress").into());
        }
        let session = CombatSession::start(&self.catalog, &self.config, &self.state, enemy_id, seed)?;
        log::info!("combat started against `{}`", enemy_id);
        self.combat = Some(session);
        Ok(CommandOutcome::Combat(CombatReport {
            enemy_id: enemy_id.to_string(),
            events: Vec::new(),
            outcome: None,
            rewards: None,
        }))
    }

    /// Play one round. When the fight ends its result is written back to
    /// the state and the session is closed.
    pub fn combat_action(&mut self, action: PlayerAction) -> Result<CommandOutcome, EngineError> {
        let session = self
            .combat
            .as_mut()
            .ok_or_else(|| SimError::not_available("combat", "no active combat session"))?;
        let events = session.act(action)?;
        let outcome = session.outcome();
        let enemy_id = session.enemy_id().to_string();
        self.pending_events.extend(events.iter().cloned());

        let mut rewards = None;
        if let Some(outcome) = outcome {
            let mut next = self.state.clone();
            rewards = Some(write_back(
                &mut next,
                &self.catalog,
                &self.config,
                &enemy_id,
                outcome,
            )?);
            self.commit(next)?;
            self.combat = None;
            log::info!("combat against `{}` ended: {:?}", enemy_id, outcome);
        }
        Ok(CommandOutcome::Combat(CombatReport {
            enemy_id,
            events,
            outcome,
            rewards,
        }))
    }

    /// Combat events since the last call.
    pub fn take_combat_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn save_to<W: Write>(&self, writer: W, format: SaveFormat) -> Result<(), SaveError> {
        save_state(writer, &self.state, format)
    }

    pub fn save(&self, format: SaveFormat) -> Result<Vec<u8>, SaveError> {
        let mut buffer = Vec::new();
        self.save_to(&mut buffer, format)?;
        log::debug!("saved {} bytes", buffer.len());
        Ok(buffer)
    }

    pub fn view(&self) -> GameView {
        build_view(
            &self.state,
            &self.catalog,
            &self.config,
            self.combat.as_ref(),
            &self.pending_events,
        )
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn combat(&self) -> Option<&CombatSession> {
        self.combat.as_ref()
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }
}
