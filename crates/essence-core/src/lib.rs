//! Essence Core - incremental simulation engine
//!
//! Owns the mutable game state and drives the pure rules in
//! `essence_logic` from a clock: fixed-step live ticking, closed-form
//! offline catch-up, player commands, turn-based combat sessions and
//! save/load with fallback.
//!
//! # Architecture
//!
//! - **State**: [`state::GameState`] is plain data; every change produces a
//!   new validated value
//! - **Systems**: per-concern functions a tick or command is built from
//! - **Combat**: a short-lived `hecs` world holding the two actors of a fight
//! - **Engine**: [`engine::GameEngine`] reads the clock, applies steps and
//!   commands, and keeps the last known good state
//!
//! # Example
//!
//! ```rust,no_run
//! use essence_core::prelude::*;
//!
//! let catalog = default_catalog().unwrap();
//! let mut engine =
//!     GameEngine::new_game(catalog, SimConfig::default(), Box::new(SystemClock::new())).unwrap();
//!
//! engine
//!     .execute(Command::Producer(ProducerCommand::Purchase {
//!         producer_id: "wisp".into(),
//!         amount: 1,
//!     }))
//!     .unwrap();
//!
//! loop {
//!     engine.advance().unwrap();
//!     let _view = engine.view();
//! }
//! ```

pub mod clock;
pub mod combat;
pub mod commands;
pub mod components;
pub mod data;
pub mod engine;
pub mod persistence;
pub mod state;
pub mod systems;
pub mod tick;
pub mod view;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::combat::{CombatCommand, CombatOutcome, PlayerAction};
    pub use crate::commands::{
        Command, CommandOutcome, ProducerCommand, RelationshipCommand, TraitCommand,
    };
    pub use crate::data::default_catalog;
    pub use crate::engine::{EngineError, GameEngine};
    pub use crate::persistence::{LoadSource, SaveFormat};
    pub use crate::state::GameState;
    pub use crate::tick::step;
    pub use crate::view::GameView;
    pub use essence_logic::config::SimConfig;
    pub use essence_logic::resources::Resource;
}
