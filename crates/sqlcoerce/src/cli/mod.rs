//! CLI functionality for the sqlcoerce tool
//!
//! This module contains all CLI-related functionality including:
//! - Casting expressions
//! - Explaining cast resolution
//! - Listing registered types
//! - REPL
//! - Output formatting

pub mod cast;
pub mod output;
pub mod repl;
pub mod resolve;
pub mod types;

use anyhow::{Context, Result};
use log::info;
use sqlcoerce_eval::{CastEngine, EngineConfig};
use std::path::Path;

/// Build the engine from an optional JSON config file
pub fn load_engine(config: Option<&Path>) -> Result<CastEngine> {
    let Some(path) = config else {
        return Ok(CastEngine::new());
    };
    let config = EngineConfig::from_path(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;
    let engine = CastEngine::from_config(&config)
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    info!(
        "loaded {} equivalent types from {}",
        config.equivalent_types.len(),
        path.display()
    );
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_engine_without_config() {
        let engine = load_engine(None).unwrap();
        assert!(engine.lookup("integer").is_ok());
    }

    #[test]
    fn test_load_engine_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"equivalent_types": [{{"name": "float4", "equivalent_to": "float"}}]}}"#
        )
        .unwrap();
        let engine = load_engine(Some(file.path())).unwrap();
        assert_eq!(engine.lookup("float4").unwrap().name(), "float4");
    }

    #[test]
    fn test_load_engine_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_engine(Some(&dir.path().join("missing.json"))).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load config"));
    }
}
