pub mod app_config;
pub mod catalog;
pub mod config;
pub mod form;
pub mod reconcile;
pub mod search;
pub mod seed;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{
    validate_attributes, Attribute, AttributeDraft, AttributeKind, AttributeMap, Category,
    CategoryDraft, Product, ProductDraft, ProductRecord, Variation, DEFAULT_VARIATION_TYPE,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use reconcile::{
    reconcile_rows, split_variation_name, ReconcileWarning, Reconciled, RowKind, SheetRow,
};
pub use search::{Page, ProductFilter, ProductMatcher, ProductPage, SearchQuery, TextClause};
pub use seed::{load_seed, AttributeSeed, CatalogSeed, CategorySeed};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read seed file {path}: {source}")]
    SeedFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed file: {0}")]
    SeedFileParse(#[source] serde_yaml::Error),

    #[error("seed validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid attribute type: {0}")]
    InvalidAttributeKind(String),

    #[error("attribute '{name}' does not allow value '{value}'")]
    AttributeValueNotAllowed { name: String, value: String },

    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
