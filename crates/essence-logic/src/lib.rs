//! Pure simulation rules for the essence incremental game.
//!
//! This crate contains every rule that turns elapsed time and player actions
//! into numeric game state, independent of any runtime, clock, or storage.
//! Functions take plain data and return results, so the engine crate can
//! replay them deterministically for live ticks and offline catch-up alike.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Static producer / trait / NPC / enemy definitions and load-time validation |
//! | [`combat`] | Damage resolution, status effects, turn order, player progression |
//! | [`config`] | Simulation tuning knobs and `validate_config` |
//! | [`constants`] | Time units and default limits |
//! | [`effects`] | Effect keys, composition rules, trait folding into an [`effects::EffectSet`] |
//! | [`error`] | The shared [`error::SimError`] kinds |
//! | [`ledger`] | Producer ownership, purchase / upgrade / unlock, production rates |
//! | [`relationships`] | Relationship records, tier tables, growth and decay flow |
//! | [`requirements`] | Unlock requirements evaluated against player progress |
//! | [`resources`] | Resource kinds and the balance pool |
//! | [`scaling`] | Cost and production formulas |

pub mod catalog;
pub mod combat;
pub mod config;
pub mod constants;
pub mod effects;
pub mod error;
pub mod ledger;
pub mod relationships;
pub mod requirements;
pub mod resources;
pub mod scaling;

pub use error::SimError;
