//! Save/Load functionality for persisting game state
//!
//! A save is a flat, versioned [`SaveData`] snapshot written either as
//! bincode (compact, the default) or JSON (readable). Loading rebuilds a
//! [`GameState`] against the current catalog and validates it; anything
//! malformed is rejected rather than patched.
//!
//! [`load_with_fallback`] tries the primary save, then the backup, then
//! starts fresh, and reports which one it used and why the others failed.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use essence_logic::catalog::Catalog;
use essence_logic::combat::PlayerProfile;
use essence_logic::config::SimConfig;
use essence_logic::ledger::{ProducerLedger, ProducerState};
use essence_logic::relationships::{RelationshipRecord, RelationshipTracker};
use essence_logic::resources::{Resource, ResourcePool};
use essence_logic::SimError;

use crate::state::GameState;

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub version: u32,
    /// Simulated time of the snapshot; catch-up runs from here on load.
    pub last_saved_timestamp: f64,
    pub resources: Vec<SavedResource>,
    pub producers: Vec<SavedProducer>,
    pub relationships: Vec<RelationshipRecord>,
    pub acquired_traits: Vec<String>,
    pub equipped_traits: Vec<String>,
    pub cooldowns: BTreeMap<String, f64>,
    pub player: PlayerProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedResource {
    pub resource: Resource,
    pub amount: f64,
    pub lifetime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedProducer {
    pub id: String,
    pub owned: u64,
    pub level: u32,
    pub unlocked: bool,
    pub last_collected_at: f64,
}

impl SaveData {
    pub fn capture(state: &GameState) -> Self {
        Self {
            version: SAVE_VERSION,
            last_saved_timestamp: state.now,
            resources: Resource::ALL
                .iter()
                .map(|r| SavedResource {
                    resource: *r,
                    amount: state.resources.amount(*r),
                    lifetime: state.resources.lifetime(*r),
                })
                .collect(),
            producers: state
                .producers
                .iter()
                .map(|(id, s)| SavedProducer {
                    id: id.to_string(),
                    owned: s.owned,
                    level: s.level,
                    unlocked: s.unlocked,
                    last_collected_at: s.last_collected_at,
                })
                .collect(),
            relationships: state.relationships.records().cloned().collect(),
            acquired_traits: state.acquired_traits.iter().cloned().collect(),
            equipped_traits: state.equipped_traits.iter().cloned().collect(),
            cooldowns: state.cooldowns.clone(),
            player: state.player.clone(),
        }
    }

    /// Rebuild and validate a game state.
    ///
    /// Entries for producers or NPCs the catalog no longer defines are
    /// dropped with a warning; content added since the save gets fresh
    /// entries. Everything else must validate.
    pub fn restore(self, catalog: &Catalog, config: &SimConfig) -> Result<GameState, SaveError> {
        if self.version != SAVE_VERSION {
            return Err(SaveError::VersionMismatch {
                expected: SAVE_VERSION,
                found: self.version,
            });
        }
        let now = self.last_saved_timestamp;
        if !now.is_finite() {
            return Err(SimError::corrupted("lastSavedTimestamp is not a number").into());
        }

        let mut resources = ResourcePool::new();
        for saved in self.resources {
            resources.restore(saved.resource, saved.amount, saved.lifetime);
        }

        let mut producers = ProducerLedger::new();
        for saved in self.producers {
            if catalog.producer(&saved.id).is_none() {
                log::warn!("dropping saved producer `{}` missing from catalog", saved.id);
                continue;
            }
            producers.restore(
                &saved.id,
                ProducerState {
                    owned: saved.owned,
                    level: saved.level,
                    unlocked: saved.unlocked,
                    last_collected_at: saved.last_collected_at,
                },
            );
        }
        producers.fill_missing(&catalog.producers, now);

        let mut relationships = RelationshipTracker::from_definitions(&catalog.npcs, now);
        for record in self.relationships {
            if catalog.npc(&record.npc_id).is_none() {
                log::warn!("dropping saved relationship `{}` missing from catalog", record.npc_id);
                continue;
            }
            relationships.restore(record);
        }

        let state = GameState {
            now,
            resources,
            producers,
            relationships,
            acquired_traits: self.acquired_traits.into_iter().collect(),
            equipped_traits: self.equipped_traits.into_iter().collect(),
            cooldowns: self.cooldowns,
            player: self.player,
        };
        state.validate(catalog, config)?;
        Ok(state)
    }
}

/// On-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveFormat {
    #[default]
    Binary,
    Json,
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("{0}")]
    Corrupted(#[from] SimError),
}

/// Write a snapshot of `state`.
pub fn save_state<W: Write>(
    writer: W,
    state: &GameState,
    format: SaveFormat,
) -> Result<(), SaveError> {
    let data = SaveData::capture(state);
    match format {
        SaveFormat::Binary => bincode::serialize_into(writer, &data)?,
        SaveFormat::Json => serde_json::to_writer_pretty(writer, &data)?,
    }
    Ok(())
}

/// Read and decode a snapshot without validating it.
pub fn read_save<R: Read>(reader: R, format: SaveFormat) -> Result<SaveData, SaveError> {
    let data = match format {
        SaveFormat::Binary => bincode::deserialize_from(reader)?,
        SaveFormat::Json => serde_json::from_reader(reader)?,
    };
    Ok(data)
}

/// Read, decode and restore a game state.
pub fn load_state<R: Read>(
    reader: R,
    format: SaveFormat,
    catalog: &Catalog,
    config: &SimConfig,
) -> Result<GameState, SaveError> {
    read_save(reader, format)?.restore(catalog, config)
}

/// Where a loaded state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadSource {
    Primary,
    Backup,
    /// Neither save was usable; a new game was started.
    Fresh,
}

#[derive(Debug)]
pub struct LoadReport {
    pub state: GameState,
    pub source: LoadSource,
    /// Saves that were tried and rejected, in order.
    pub rejected: Vec<(LoadSource, SaveError)>,
}

/// Load the primary save, else the backup, else a fresh game at `now`.
pub fn load_with_fallback(
    primary: Option<&[u8]>,
    backup: Option<&[u8]>,
    format: SaveFormat,
    catalog: &Catalog,
    config: &SimConfig,
    now: f64,
) -> LoadReport {
    let mut rejected = Vec::new();
    for (source, bytes) in [(LoadSource::Primary, primary), (LoadSource::Backup, backup)] {
        let Some(bytes) = bytes else {
            continue;
        };
        match load_state(bytes, format, catalog, config) {
            Ok(state) => {
                if !rejected.is_empty() {
                    log::info!("loaded {:?} save after {} rejection(s)", source, rejected.len());
                }
                return LoadReport {
                    state,
                    source,
                    rejected,
                };
            }
            Err(e) => {
                log::warn!("{:?} save rejected: {}", source, e);
                rejected.push((source, e));
            }
        }
    }
    log::info!("starting a fresh game");
    LoadReport {
        state: GameState::new(catalog, now),
        source: LoadSource::Fresh,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use essence_logic::catalog::{CatalogFile, ProducerDefinition};
    use essence_logic::relationships::{NpcDefinition, RelationshipScale};

    fn catalog() -> Catalog {
        let mut file = CatalogFile::default();
        file.producers
            .push(ProducerDefinition::generator("wisp", 10.0, 1.15, 0.1));
        file.npcs
            .push(NpcDefinition::new("mira", RelationshipScale::Extended));
        file.start.resources.insert(Resource::Essence, 50.0);
        Catalog::from_file(file).unwrap()
    }

    fn played(catalog: &Catalog) -> GameState {
        let mut state = GameState::new(catalog, 1_700_000_000.0);
        state
            .producers
            .purchase(&catalog.producers, &mut state.resources, "wisp", 3)
            .unwrap();
        state.cooldowns.insert("interact:mira".into(), 120.0);
        state
    }

    fn encode(state: &GameState, format: SaveFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        save_state(&mut buffer, state, format).expect("Save failed");
        buffer
    }

    #[test]
    fn test_save_load_roundtrip_both_formats() {
        let catalog = catalog();
        let config = SimConfig::default();
        let state = played(&catalog);
        for format in [SaveFormat::Binary, SaveFormat::Json] {
            let bytes = encode(&state, format);
            let loaded = load_state(&bytes[..], format, &catalog, &config).expect("Load failed");
            assert_eq!(loaded, state);
        }
    }

    #[test]
    fn test_json_save_names_required_fields() {
        let catalog = catalog();
        let bytes = encode(&played(&catalog), SaveFormat::Json);
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["lastSavedTimestamp"], 1_700_000_000.0);
        assert_eq!(value["producers"][0]["owned"], 3);
        assert!(value["producers"][0]["lastCollectedAt"].is_number());
        assert_eq!(value["relationships"][0]["npcId"], "mira");
        assert!(value["acquiredTraits"].is_array());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let catalog = catalog();
        let bytes = encode(&played(&catalog), SaveFormat::Json);
        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value.as_object_mut().unwrap().remove("producers");
        let broken = serde_json::to_vec(&value).unwrap();
        let err = load_state(&broken[..], SaveFormat::Json, &catalog, &SimConfig::default())
            .unwrap_err();
        assert!(matches!(err, SaveError::Json(_)));
    }

    #[test]
    fn test_out_of_range_relationship_is_corrupted() {
        let catalog = catalog();
        let mut data = SaveData::capture(&played(&catalog));
        data.relationships[0].value = 250.0;
        let err = data.restore(&catalog, &SimConfig::default()).unwrap_err();
        assert!(matches!(err, SaveError::Corrupted(SimError::CorruptedSaveState(_))));
    }

    #[test]
    fn test_version_mismatch() {
        let catalog = catalog();
        let mut data = SaveData::capture(&played(&catalog));
        data.version = 99;
        assert!(matches!(
            data.restore(&catalog, &SimConfig::default()),
            Err(SaveError::VersionMismatch {
                expected: 1,
                found: 99
            })
        ));
    }

    #[test]
    fn test_removed_content_is_dropped() {
        let catalog = catalog();
        let mut data = SaveData::capture(&played(&catalog));
        data.producers.push(SavedProducer {
            id: "retired".into(),
            owned: 4,
            level: 1,
            unlocked: true,
            last_collected_at: 0.0,
        });
        let state = data.restore(&catalog, &SimConfig::default()).unwrap();
        assert!(state.producers.get("retired").is_none());
        assert_eq!(state.producers.owned("wisp"), 3);
    }

    #[test]
    fn test_fallback_to_backup_then_fresh() {
        let catalog = catalog();
        let config = SimConfig::default();
        let good = encode(&played(&catalog), SaveFormat::Binary);
        let garbage = vec![0xFFu8; 7];

        let report = load_with_fallback(
            Some(garbage.as_slice()),
            Some(good.as_slice()),
            SaveFormat::Binary,
            &catalog,
            &config,
            5.0,
        );
        assert_eq!(report.source, LoadSource::Backup);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, LoadSource::Primary);
        assert_eq!(report.state.producers.owned("wisp"), 3);

        let report =
            load_with_fallback(Some(garbage.as_slice()), None, SaveFormat::Binary, &catalog, &config, 5.0);
        assert_eq!(report.source, LoadSource::Fresh);
        assert_eq!(report.state, GameState::new(&catalog, 5.0));
    }
}
