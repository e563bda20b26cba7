//! Loading static definitions and configuration from JSON.
//!
//! The default catalog is embedded at compile time from
//! `data/catalog.json`. To add or rebalance producers, traits, NPCs or
//! enemies, edit the JSON file; no code changes are needed.

use thiserror::Error;

use essence_logic::catalog::{Catalog, CatalogFile};
use essence_logic::config::{validate_config, ConfigError, SimConfig};
use essence_logic::SimError;

const CATALOG_JSON: &str = include_str!("../../../data/catalog.json");

#[derive(Debug, Error)]
pub enum DataError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Definition(#[from] SimError),
    #[error("invalid configuration: {0:?}")]
    Config(Vec<ConfigError>),
}

/// Parse and validate a catalog document.
pub fn parse_catalog(json: &str) -> Result<Catalog, DataError> {
    let file: CatalogFile = serde_json::from_str(json)?;
    Ok(Catalog::from_file(file)?)
}

/// The catalog shipped with the game.
pub fn default_catalog() -> Result<Catalog, DataError> {
    parse_catalog(CATALOG_JSON)
}

/// Parse a config document; omitted fields take their defaults.
pub fn parse_config(json: &str) -> Result<SimConfig, DataError> {
    let config: SimConfig = serde_json::from_str(json)?;
    check_config(&config)?;
    Ok(config)
}

/// Reject a config with any validation error, reporting all of them.
pub fn check_config(config: &SimConfig) -> Result<(), DataError> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DataError::Config(errors))
    }
}
