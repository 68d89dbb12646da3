//! Entity lists: the built-in defaults and list files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::models::Entity;

#[derive(Debug, Error)]
pub enum EntityListError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON entity list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML entity list: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported entity list format: {0} (expected .json or .toml)")]
    UnsupportedFormat(String),
}

/// TOML lists are `[[entity]]` tables.
#[derive(Debug, Deserialize)]
struct TomlEntityList {
    #[serde(alias = "company", alias = "companies", default)]
    entity: Vec<Entity>,
}

/// The built-in sample list.
pub fn default_entities() -> Vec<Entity> {
    vec![
        Entity::new("0000320193", "Apple Inc.")
            .with_ticker("AAPL")
            .with_classification("Technology", "Consumer Electronics"),
        Entity::new("0000789019", "Microsoft Corporation")
            .with_ticker("MSFT")
            .with_classification("Technology", "Software"),
        Entity::new("0001018724", "Amazon.com Inc.")
            .with_ticker("AMZN")
            .with_classification("Technology", "E-commerce"),
        Entity::new("0001652044", "Alphabet Inc.")
            .with_ticker("GOOGL")
            .with_classification("Technology", "Internet Services"),
        Entity::new("0001318605", "Tesla Inc.")
            .with_ticker("TSLA")
            .with_classification("Automotive", "Electric Vehicles"),
    ]
}

/// Load an entity list, choosing the format by file extension.
pub fn load_entities(path: &Path) -> Result<Vec<Entity>, EntityListError> {
    let content = fs::read_to_string(path).map_err(|source| EntityListError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let entities = match extension.as_str() {
        "json" => parse_json(&content)?,
        "toml" => parse_toml(&content)?,
        other => return Err(EntityListError::UnsupportedFormat(other.to_string())),
    };

    info!(path = %path.display(), count = entities.len(), "Loaded entity list");
    Ok(entities)
}

/// Parse a JSON array of entities.
pub fn parse_json(content: &str) -> Result<Vec<Entity>, EntityListError> {
    Ok(serde_json::from_str(content)?)
}

pub fn parse_toml(content: &str) -> Result<Vec<Entity>, EntityListError> {
    let list: TomlEntityList = toml::from_str(content)?;
    Ok(list.entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_entities_have_valid_keys() {
        let entities = default_entities();
        assert_eq!(entities.len(), 5);
        for entity in &entities {
            assert!(crate::validate::validate_entity(entity).is_ok(), "{entity}");
        }
    }

    #[test]
    fn test_parse_json_with_source_field_names() {
        let entities = parse_json(
            r#"[
                {"name": "Apple Inc.", "cik": "0000320193", "ticker": "AAPL"},
                {"display_name": "Tesla Inc.", "key": "0001318605"}
            ]"#,
        )
        .unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].display_name, "Tesla Inc.");
    }

    #[test]
    fn test_parse_toml() {
        let entities = parse_toml(
            r#"
            [[entity]]
            key = "0000789019"
            display_name = "Microsoft Corporation"
            sector = "Software"

            [[entity]]
            cik = "0001652044"
            name = "Alphabet Inc."
            "#,
        )
        .unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].sector.as_deref(), Some("Software"));
        assert_eq!(entities[1].key, "0001652044");
    }

    #[test]
    fn test_load_entities_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("companies.json");
        fs::write(&path, r#"[{"name": "Apple Inc.", "cik": "0000320193"}]"#).unwrap();
        assert_eq!(load_entities(&path).unwrap().len(), 1);

        let csv = dir.path().join("companies.csv");
        fs::write(&csv, "name,cik\n").unwrap();
        assert!(matches!(
            load_entities(&csv),
            Err(EntityListError::UnsupportedFormat(_))
        ));

        assert!(matches!(
            load_entities(&dir.path().join("missing.toml")),
            Err(EntityListError::Io { .. })
        ));
    }
}
