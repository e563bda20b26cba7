//! Player commands and their dispatch.
//!
//! A [`Command`] is a tagged variant per subsystem. [`dispatch`] looks the
//! subsystem up in a [`HandlerTable`], runs the handler against a clone of
//! the state, and hands the clone back only on success:
//!
//! ```text
//! (state, command) ──dispatch──▶ Ok((new_state, outcome))
//!                              └▶ Err(SimError)  (state untouched)
//! ```
//!
//! Combat commands need a live combat session, which is not part of the
//! game state, so the engine routes them itself.

use serde::{Deserialize, Serialize};

use essence_logic::catalog::Catalog;
use essence_logic::config::SimConfig;
use essence_logic::constants::MAX_BULK_PURCHASE;
use essence_logic::effects::{EffectKey, TraitKind};
use essence_logic::ledger::PurchaseReceipt;
use essence_logic::relationships::{ChangeSource, Tier};
use essence_logic::scaling;
use essence_logic::SimError;

use crate::combat::CombatCommand;
use crate::state::{interaction_cooldown_key, GameState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subsystem", content = "command", rename_all = "camelCase")]
pub enum Command {
    Producer(ProducerCommand),
    Relationship(RelationshipCommand),
    Trait(TraitCommand),
    Combat(CombatCommand),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProducerCommand {
    #[serde(rename_all = "camelCase")]
    Purchase { producer_id: String, amount: u64 },
    /// Buy as many units as the current balance allows.
    #[serde(rename_all = "camelCase")]
    PurchaseMax { producer_id: String },
    #[serde(rename_all = "camelCase")]
    Upgrade { producer_id: String },
    #[serde(rename_all = "camelCase")]
    Unlock { producer_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelationshipCommand {
    /// Talk to an NPC. Resets its idle timer and starts the interaction
    /// cooldown.
    #[serde(rename_all = "camelCase")]
    Interact { npc_id: String, delta: f64 },
    /// Any other change (gift, quest, event) with no cooldown.
    #[serde(rename_all = "camelCase")]
    Change {
        npc_id: String,
        delta: f64,
        source: ChangeSource,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TraitCommand {
    #[serde(rename_all = "camelCase")]
    Acquire { trait_id: String },
    #[serde(rename_all = "camelCase")]
    Equip { trait_id: String },
    #[serde(rename_all = "camelCase")]
    Unequip { trait_id: String },
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandOutcome {
    Purchased(PurchaseReceipt),
    Upgraded { producer_id: String, level: u32 },
    Unlocked { producer_id: String, changed: bool },
    RelationshipChanged { npc_id: String, value: f64, tier: Option<Tier> },
    TraitAcquired { trait_id: String },
    TraitEquipped { trait_id: String },
    TraitUnequipped { trait_id: String },
    Combat(crate::combat::CombatReport),
}

/// Everything a handler may read besides the state it mutates.
pub struct Context<'a> {
    pub catalog: &'a Catalog,
    pub config: &'a SimConfig,
}

type Handler<C> = fn(&mut GameState, &Context<'_>, C) -> Result<CommandOutcome, SimError>;

/// One handler per state-level subsystem.
#[derive(Clone, Copy)]
pub struct HandlerTable {
    pub producer: Handler<ProducerCommand>,
    pub relationship: Handler<RelationshipCommand>,
    pub traits: Handler<TraitCommand>,
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self {
            producer: handle_producer,
            relationship: handle_relationship,
            traits: handle_trait,
        }
    }
}

/// Apply `command` to a copy of `state`.
pub fn dispatch(
    state: &GameState,
    ctx: &Context<'_>,
    table: &HandlerTable,
    command: Command,
) -> Result<(GameState, CommandOutcome), SimError> {
    let mut next = state.clone();
    let outcome = match command {
        Command::Producer(cmd) => (table.producer)(&mut next, ctx, cmd)?,
        Command::Relationship(cmd) => (table.relationship)(&mut next, ctx, cmd)?,
        Command::Trait(cmd) => (table.traits)(&mut next, ctx, cmd)?,
        Command::Combat(_) => {
            return Err(SimError::not_available("combat", "no active combat session"))
        }
    };
    log::debug!("command applied: {:?}", outcome);
    Ok((next, outcome))
}

pub fn handle_producer(
    state: &mut GameState,
    ctx: &Context<'_>,
    command: ProducerCommand,
) -> Result<CommandOutcome, SimError> {
    let defs = &ctx.catalog.producers;
    match command {
        ProducerCommand::Purchase {
            producer_id,
            amount,
        } => {
            let receipt = state
                .producers
                .purchase(defs, &mut state.resources, &producer_id, amount)?;
            Ok(CommandOutcome::Purchased(receipt))
        }
        ProducerCommand::PurchaseMax { producer_id } => {
            let def = ctx
                .catalog
                .producer(&producer_id)
                .ok_or_else(|| SimError::not_available(&producer_id, "unknown producer"))?;
            let owned = state.producers.owned(&producer_id);
            let budget = state.resources.amount(def.cost_resource);
            // zero affordable still goes through purchase so the caller
            // gets the shortfall for one unit
            let amount = scaling::max_affordable(def, owned, budget).clamp(1, MAX_BULK_PURCHASE);
            let receipt = state
                .producers
                .purchase(defs, &mut state.resources, &producer_id, amount)?;
            Ok(CommandOutcome::Purchased(receipt))
        }
        ProducerCommand::Upgrade { producer_id } => {
            let level_cost = ctx
                .catalog
                .producer(&producer_id)
                .and_then(|def| def.level_cost.clone());
            let level = state.producers.upgrade(
                defs,
                &mut state.resources,
                &producer_id,
                level_cost.as_ref(),
            )?;
            Ok(CommandOutcome::Upgraded { producer_id, level })
        }
        ProducerCommand::Unlock { producer_id } => {
            let progress = state.progress();
            let changed = state
                .producers
                .unlock(defs, &producer_id, &progress, state.now)?;
            Ok(CommandOutcome::Unlocked {
                producer_id,
                changed,
            })
        }
    }
}

pub fn handle_relationship(
    state: &mut GameState,
    ctx: &Context<'_>,
    command: RelationshipCommand,
) -> Result<CommandOutcome, SimError> {
    let gain = state
        .effects(ctx.catalog)
        .get(EffectKey::RelationshipGainMultiplier);
    let (npc_id, value) = match command {
        RelationshipCommand::Interact { npc_id, delta } => {
            let key = interaction_cooldown_key(&npc_id);
            let remaining = state.cooldown(&key);
            if remaining > 0.0 {
                return Err(SimError::not_available(
                    &npc_id,
                    format!("interaction on cooldown for {remaining:.0}s"),
                ));
            }
            let value = state.relationships.apply_change(
                &ctx.catalog.npcs,
                &npc_id,
                delta,
                ChangeSource::Interaction,
                state.now,
                gain,
            )?;
            let cooldown = ctx.config.relationships.interaction_cooldown_secs;
            if cooldown > 0.0 {
                state.cooldowns.insert(key, cooldown);
            }
            (npc_id, value)
        }
        RelationshipCommand::Change {
            npc_id,
            delta,
            source,
        } => {
            let value = state.relationships.apply_change(
                &ctx.catalog.npcs,
                &npc_id,
                delta,
                source,
                state.now,
                gain,
            )?;
            (npc_id, value)
        }
    };
    let tier = state
        .relationships
        .tier(&ctx.catalog.npcs, &ctx.config.tiers, &npc_id);
    Ok(CommandOutcome::RelationshipChanged {
        npc_id,
        value,
        tier,
    })
}

pub fn handle_trait(
    state: &mut GameState,
    ctx: &Context<'_>,
    command: TraitCommand,
) -> Result<CommandOutcome, SimError> {
    match command {
        TraitCommand::Acquire { trait_id } => {
            let def = ctx
                .catalog
                .trait_def(&trait_id)
                .ok_or_else(|| SimError::not_available(&trait_id, "unknown trait"))?;
            if state.acquired_traits.contains(&trait_id) {
                return Err(SimError::not_available(&trait_id, "trait already acquired"));
            }
            state.resources.debit(def.cost_resource, def.cost)?;
            state.acquired_traits.insert(trait_id.clone());
            Ok(CommandOutcome::TraitAcquired { trait_id })
        }
        TraitCommand::Equip { trait_id } => {
            let def = ctx
                .catalog
                .trait_def(&trait_id)
                .ok_or_else(|| SimError::not_available(&trait_id, "unknown trait"))?;
            if def.kind != TraitKind::Equippable {
                return Err(SimError::not_available(&trait_id, "trait is passive"));
            }
            if !state.acquired_traits.contains(&trait_id) {
                return Err(SimError::not_available(&trait_id, "trait not acquired"));
            }
            if state.equipped_traits.contains(&trait_id) {
                return Err(SimError::not_available(&trait_id, "trait already equipped"));
            }
            if state.equipped_traits.len() >= ctx.config.max_equipped_traits {
                return Err(SimError::not_available(
                    &trait_id,
                    format!("all {} trait slots in use", ctx.config.max_equipped_traits),
                ));
            }
            state.equipped_traits.insert(trait_id.clone());
            Ok(CommandOutcome::TraitEquipped { trait_id })
        }
        TraitCommand::Unequip { trait_id } => {
            if !state.equipped_traits.remove(&trait_id) {
                return Err(SimError::not_available(&trait_id, "trait not equipped"));
            }
            Ok(CommandOutcome::TraitUnequipped { trait_id })
        }
    }
}
