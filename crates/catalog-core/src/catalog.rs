//! Catalog domain types shared by the store, the HTTP API, and the CLI.
//!
//! Field names serialize in camelCase because that is the wire shape the
//! admin front end and the spreadsheet importer already speak.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Variation type used when a spreadsheet or form does not name one.
pub const DEFAULT_VARIATION_TYPE: &str = "Cor";

/// Open attribute map: attribute name to value. Legal keys per category are
/// checked against [`Attribute`] definitions at the API boundary only.
pub type AttributeMap = BTreeMap<String, String>;

/// A sub-unit of a parent product (e.g. one colour), embedded in the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    /// Dimension label, e.g. `"Cor"` or `"Versão"`. Free text.
    #[serde(rename = "type", default = "default_variation_type")]
    pub kind: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub sku: String,
}

fn default_variation_type() -> String {
    DEFAULT_VARIATION_TYPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub sku: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub price: Decimal,
    /// Aggregate of `variations[].stock` when `has_variations` is set.
    pub stock: i32,
    pub attributes: AttributeMap,
    pub has_variations: bool,
    pub variations: Vec<Variation>,
    /// Display reference for the product image.
    pub image: Option<String>,
    /// Handle used to release the image from asset storage.
    pub image_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Sum of all variation stock.
    #[must_use]
    pub fn variation_stock(&self) -> i32 {
        self.variations.iter().map(|v| v.stock).sum()
    }

    /// `true` unless the product has variations whose stock does not add up
    /// to the product-level stock.
    #[must_use]
    pub fn stock_is_consistent(&self) -> bool {
        !self.has_variations || self.stock == self.variation_stock()
    }
}

/// Editable product fields for single-product create and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
    pub sku: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub attributes: AttributeMap,
    pub has_variations: bool,
    pub variations: Vec<Variation>,
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            sku: product.sku.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            subcategory: product.subcategory.clone(),
            price: product.price,
            stock: product.stock,
            attributes: product.attributes.clone(),
            has_variations: product.has_variations,
            variations: product.variations.clone(),
        }
    }
}

/// One item of a batch upsert keyed by `sku`.
///
/// Absent fields leave the stored value untouched (`$set`-style partial
/// overwrite); on insert they fall back to the column defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductRecord {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub attributes: Option<AttributeMap>,
    pub has_variations: Option<bool>,
    pub variations: Option<Vec<Variation>>,
}

impl ProductRecord {
    /// Trimmed, non-empty SKU if the record carries one.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.sku.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Recompute `stock` from the variations when the record carries both
    /// `hasVariations = true` and a non-empty variation list.
    #[must_use]
    pub fn with_aggregated_stock(mut self) -> Self {
        if self.has_variations == Some(true) {
            if let Some(variations) = self.variations.as_ref().filter(|v| !v.is_empty()) {
                let total = variations
                    .iter()
                    .fold(0_i32, |acc, v| acc.saturating_add(v.stock.max(0)));
                self.stock = Some(total);
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub subcategories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Subcategories present on `self` but missing from `next`.
    #[must_use]
    pub fn removed_subcategories<'a>(&'a self, next: &[String]) -> Vec<&'a str> {
        self.subcategories
            .iter()
            .filter(|s| !next.contains(s))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
}

impl CategoryDraft {
    /// Trim the name and subcategories, dropping blank and repeated entries.
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut subcategories: Vec<String> = Vec::with_capacity(self.subcategories.len());
        for sub in self.subcategories {
            let sub = sub.trim().to_string();
            if !sub.is_empty() && !subcategories.contains(&sub) {
                subcategories.push(sub);
            }
        }
        Self {
            name: self.name.trim().to_string(),
            subcategories,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Select,
    Text,
}

impl AttributeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeKind::Select => "select",
            AttributeKind::Text => "text",
        }
    }
}

impl std::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "select" => Ok(AttributeKind::Select),
            "text" => Ok(AttributeKind::Text),
            other => Err(CoreError::InvalidAttributeKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: Uuid,
    /// Name of the [`Category`] this attribute applies to.
    pub category: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    /// Allowed values; only meaningful for [`AttributeKind::Select`].
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttributeDraft {
    pub category: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    #[serde(default)]
    pub options: Vec<String>,
}

impl Attribute {
    /// Whether `value` is acceptable for this attribute. Blank values always are.
    #[must_use]
    pub fn allows(&self, value: &str) -> bool {
        let value = value.trim();
        match self.kind {
            AttributeKind::Text => true,
            AttributeKind::Select => {
                value.is_empty() || self.options.is_empty() || self.options.iter().any(|o| o == value)
            }
        }
    }
}

/// Check a product's attribute values against the definitions for its category.
///
/// Keys without a definition pass through untouched.
///
/// # Errors
///
/// Returns [`CoreError::AttributeValueNotAllowed`] for the first `select`
/// value that is not one of the defined options.
pub fn validate_attributes(
    definitions: &[Attribute],
    values: &AttributeMap,
) -> Result<(), CoreError> {
    for def in definitions {
        if let Some(value) = values.get(&def.name) {
            if !def.allows(value) {
                return Err(CoreError::AttributeValueNotAllowed {
                    name: def.name.clone(),
                    value: value.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_variation(stock: i32) -> Variation {
        Variation {
            kind: "Cor".to_string(),
            value: "Azul".to_string(),
            price: Decimal::new(1999, 2),
            stock,
            sku: "V1".to_string(),
        }
    }

    fn make_product(has_variations: bool, stock: i32, variations: Vec<Variation>) -> Product {
        Product {
            id: Uuid::new_v4(),
            sku: Some("P1".to_string()),
            name: "Tela 15 Incell".to_string(),
            category: Some("Telas".to_string()),
            subcategory: None,
            price: Decimal::new(1999, 2),
            stock,
            attributes: AttributeMap::new(),
            has_variations,
            variations,
            image: None,
            image_public_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn select_attr(options: &[&str]) -> Attribute {
        Attribute {
            id: Uuid::new_v4(),
            category: "Telas".to_string(),
            name: "Qualidade".to_string(),
            kind: AttributeKind::Select,
            options: options.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn stock_is_consistent_when_sum_matches() {
        let product = make_product(true, 8, vec![make_variation(3), make_variation(5)]);
        assert_eq!(product.variation_stock(), 8);
        assert!(product.stock_is_consistent());
    }

    #[test]
    fn stock_is_inconsistent_when_sum_differs() {
        let product = make_product(true, 2, vec![make_variation(3)]);
        assert!(!product.stock_is_consistent());
    }

    #[test]
    fn stock_without_variations_is_always_consistent() {
        let product = make_product(false, 42, vec![]);
        assert!(product.stock_is_consistent());
    }

    #[test]
    fn variation_deserializes_type_field_with_default() {
        let v: Variation = serde_json::from_str(r#"{"value":"Azul","stock":2}"#).unwrap();
        assert_eq!(v.kind, "Cor");
        assert_eq!(v.value, "Azul");
        assert_eq!(v.price, Decimal::ZERO);

        let v: Variation =
            serde_json::from_str(r#"{"type":"Versão","value":"M15","price":"10.50"}"#).unwrap();
        assert_eq!(v.kind, "Versão");
        assert_eq!(v.price, Decimal::new(1050, 2));
    }

    #[test]
    fn product_serializes_camel_case_keys() {
        let product = make_product(true, 3, vec![make_variation(3)]);
        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("hasVariations").is_some());
        assert!(json.get("imagePublicId").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["variations"][0]["type"], "Cor");
    }

    #[test]
    fn product_record_key_ignores_blank_sku() {
        let record = ProductRecord {
            sku: Some("   ".to_string()),
            ..ProductRecord::default()
        };
        assert!(record.key().is_none());

        let record = ProductRecord {
            sku: Some(" P1 ".to_string()),
            ..ProductRecord::default()
        };
        assert_eq!(record.key(), Some("P1"));
    }

    #[test]
    fn product_record_missing_fields_deserialize_as_none() {
        let record: ProductRecord = serde_json::from_str(r#"{"sku":"A1","price":12.5}"#).unwrap();
        assert_eq!(record.sku.as_deref(), Some("A1"));
        assert_eq!(record.price, Some(Decimal::new(125, 1)));
        assert!(record.name.is_none());
        assert!(record.variations.is_none());
    }

    #[test]
    fn aggregated_stock_only_applies_to_records_with_variations() {
        let record = ProductRecord {
            sku: Some("P1".to_string()),
            stock: Some(99),
            has_variations: Some(true),
            variations: Some(vec![make_variation(3), make_variation(5)]),
            ..ProductRecord::default()
        }
        .with_aggregated_stock();
        assert_eq!(record.stock, Some(8));

        let record = ProductRecord {
            stock: Some(99),
            has_variations: Some(false),
            variations: Some(vec![make_variation(3)]),
            ..ProductRecord::default()
        }
        .with_aggregated_stock();
        assert_eq!(record.stock, Some(99));
    }

    #[test]
    fn draft_from_product_copies_editable_fields() {
        let product = make_product(true, 3, vec![make_variation(3)]);
        let draft = ProductDraft::from(&product);
        assert_eq!(draft.sku, product.sku);
        assert_eq!(draft.stock, 3);
        assert_eq!(draft.variations.len(), 1);
    }

    #[test]
    fn attribute_kind_parses_case_insensitively() {
        assert_eq!("Select".parse::<AttributeKind>().unwrap(), AttributeKind::Select);
        assert_eq!(" text ".parse::<AttributeKind>().unwrap(), AttributeKind::Text);
        assert!("number".parse::<AttributeKind>().is_err());
    }

    #[test]
    fn removed_subcategories_lists_only_dropped_entries() {
        let category = Category {
            id: Uuid::new_v4(),
            name: "Telas".to_string(),
            subcategories: vec!["Incell".to_string(), "OLED".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let removed = category.removed_subcategories(&["OLED".to_string(), "LCD".to_string()]);
        assert_eq!(removed, vec!["Incell"]);
    }

    #[test]
    fn category_draft_normalization_trims_and_dedups() {
        let draft = CategoryDraft {
            name: "  Telas ".to_string(),
            subcategories: vec![
                " Incell".to_string(),
                String::new(),
                "Incell".to_string(),
                "OLED".to_string(),
            ],
        }
        .normalized();
        assert_eq!(draft.name, "Telas");
        assert_eq!(draft.subcategories, vec!["Incell", "OLED"]);
    }

    #[test]
    fn attribute_draft_reads_type_key() {
        let draft: AttributeDraft = serde_json::from_str(
            r#"{"category":"Telas","name":"Qualidade","type":"select","options":["A"]}"#,
        )
        .unwrap();
        assert_eq!(draft.kind, AttributeKind::Select);
        assert_eq!(draft.options, vec!["A"]);
    }

    #[test]
    fn validate_attributes_rejects_unknown_select_option() {
        let defs = vec![select_attr(&["Original", "Premium"])];
        let mut values = AttributeMap::new();
        values.insert("Qualidade".to_string(), "Paralela".to_string());
        let err = validate_attributes(&defs, &values).unwrap_err();
        assert!(matches!(err, CoreError::AttributeValueNotAllowed { ref name, .. } if name == "Qualidade"));
    }

    #[test]
    fn validate_attributes_accepts_known_option_blank_and_undefined_keys() {
        let defs = vec![select_attr(&["Original", "Premium"])];
        let mut values = AttributeMap::new();
        values.insert("Qualidade".to_string(), "Premium".to_string());
        values.insert("Garantia".to_string(), "90 dias".to_string());
        assert!(validate_attributes(&defs, &values).is_ok());

        values.insert("Qualidade".to_string(), "  ".to_string());
        assert!(validate_attributes(&defs, &values).is_ok());
    }
}
