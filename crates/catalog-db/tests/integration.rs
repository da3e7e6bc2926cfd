//! Offline unit tests for catalog-db pool configuration and row types.
//! These tests do not require a live database connection.

use catalog_core::{AppConfig, Category, Environment, Product};
use catalog_db::{BatchFailure, BatchResult, CategoryRow, PoolConfig, ProductRow};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        seed_path: PathBuf::from("./config/catalog.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        upload_dir: PathBuf::from("./uploads"),
        upload_max_bytes: 1024,
        public_base_url: "/uploads".to_string(),
        jwt_secret: None,
        token_ttl_minutes: 60,
        admin_email: None,
        admin_password: None,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn product_row_converts_json_columns() {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sqlx::types::Json;
    use uuid::Uuid;

    let mut attributes = catalog_core::AttributeMap::new();
    attributes.insert("Qualidade".to_string(), "Premium".to_string());

    let row = ProductRow {
        id: Uuid::new_v4(),
        sku: Some("TL-15".to_string()),
        name: "Tela 15 Incell".to_string(),
        category: Some("Telas".to_string()),
        subcategory: None,
        price: Decimal::new(4990, 2),
        stock: 3,
        attributes: Json(attributes),
        has_variations: false,
        variations: Json(vec![]),
        image: None,
        image_public_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let product = Product::from(row);
    assert_eq!(product.sku.as_deref(), Some("TL-15"));
    assert_eq!(product.attributes["Qualidade"], "Premium");
    assert!(product.variations.is_empty());
}

#[test]
fn category_row_converts_to_domain() {
    use chrono::Utc;
    use uuid::Uuid;

    let id = Uuid::new_v4();
    let category = Category::from(CategoryRow {
        id,
        name: "Telas".to_string(),
        subcategories: vec!["Incell".to_string()],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    });
    assert_eq!(category.id, id);
    assert_eq!(category.subcategories, vec!["Incell"]);
}

#[test]
fn batch_result_serializes_camel_case_counts() {
    let result = BatchResult {
        matched_count: 2,
        upserted_count: 1,
        modified_count: 1,
        failed: vec![BatchFailure {
            sku: None,
            reason: "missing sku".to_string(),
        }],
    };

    let json = serde_json::to_value(&result).expect("serialize");
    assert_eq!(json["matchedCount"], 2);
    assert_eq!(json["upsertedCount"], 1);
    assert_eq!(json["modifiedCount"], 1);
    assert_eq!(json["failed"][0]["reason"], "missing sku");
}
