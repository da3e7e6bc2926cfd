use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::catalog::AttributeKind;
use crate::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeSeed {
    pub category: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Initial categories and attribute definitions, loaded from YAML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub attributes: Vec<AttributeSeed>,
}

/// Load and validate the seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_seed(path: &Path) -> Result<CatalogSeed, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_seed(&content)
}

/// Parse and validate seed YAML.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_seed(content: &str) -> Result<CatalogSeed, ConfigError> {
    let seed: CatalogSeed = serde_yaml::from_str(content).map_err(ConfigError::SeedFileParse)?;
    validate_seed(&seed)?;
    Ok(seed)
}

fn validate_seed(seed: &CatalogSeed) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for category in &seed.categories {
        if category.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name must be non-empty".to_string(),
            ));
        }
        if !seen.insert(category.name.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category name: '{}'",
                category.name
            )));
        }
    }

    for attr in &seed.attributes {
        if attr.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "attribute name must be non-empty".to_string(),
            ));
        }
        if !seen.contains(&attr.category.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "attribute '{}' references unknown category '{}'",
                attr.name, attr.category
            )));
        }
        if attr.kind == AttributeKind::Select && attr.options.is_empty() {
            return Err(ConfigError::Validation(format!(
                "select attribute '{}' must list options",
                attr.name
            )));
        }
    }

    Ok(())
}
