//! Decoding of product create/update bodies.
//!
//! Both `multipart/form-data` (with an optional `image` file) and JSON are
//! accepted. Either way the body is first flattened to raw text fields and
//! then applied onto a [`ProductDraft`]: fields that are absent keep the
//! draft's value, fields that are present are decoded leniently.

use std::collections::HashMap;

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use catalog_core::form::{
    parse_flag, parse_json_or_default, parse_price, parse_stock, parse_variations,
};
use catalog_core::{AttributeMap, ProductDraft};

use crate::assets::ImageUpload;

use super::ApiError;

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Default)]
pub(in crate::api) struct ProductFields {
    values: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl ProductFields {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Read the body according to its content type.
    pub(in crate::api) async fn from_request<S>(
        req: Request,
        state: &S,
        request_id: &str,
    ) -> Result<Self, ApiError>
    where
        S: Send + Sync,
    {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation(request_id, e.body_text()))?;
            Self::from_multipart(multipart, request_id).await
        } else {
            let Json(body) = Json::<serde_json::Value>::from_request(req, state)
                .await
                .map_err(|e| ApiError::validation(request_id, e.body_text()))?;
            Self::from_json(body, request_id)
        }
    }

    async fn from_multipart(mut multipart: Multipart, request_id: &str) -> Result<Self, ApiError> {
        let mut fields = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(request_id, format!("invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::validation(request_id, format!("invalid image field: {e}"))
                })?;
                // Browsers send an empty part when no file was chosen.
                if !bytes.is_empty() {
                    fields.image = Some(ImageUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let text = field.text().await.map_err(|e| {
                    ApiError::validation(request_id, format!("invalid field '{name}': {e}"))
                })?;
                fields.values.insert(name, text);
            }
        }

        Ok(fields)
    }

    fn from_json(body: serde_json::Value, request_id: &str) -> Result<Self, ApiError> {
        let serde_json::Value::Object(map) = body else {
            return Err(ApiError::validation(request_id, "body must be a JSON object"));
        };

        let values = map
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    serde_json::Value::Null => return None,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Some((key, text))
            })
            .collect();

        Ok(Self {
            values,
            image: None,
        })
    }

    /// Apply the present fields onto `base`.
    ///
    /// When the result has variations, its stock is the sum of their stock.
    pub(in crate::api) fn apply(&self, mut base: ProductDraft) -> ProductDraft {
        if let Some(sku) = self.get("sku") {
            base.sku = non_blank(sku);
        }
        if let Some(name) = self.get("name") {
            base.name = name.trim().to_string();
        }
        if let Some(category) = self.get("category") {
            base.category = non_blank(category);
        }
        if let Some(subcategory) = self.get("subcategory") {
            base.subcategory = non_blank(subcategory);
        }
        if let Some(price) = self.get("price") {
            base.price = parse_price(price);
        }
        if let Some(stock) = self.get("stock") {
            base.stock = parse_stock(stock);
        }
        if let Some(flag) = self.get("hasVariations") {
            base.has_variations = parse_flag(flag);
        }
        if let Some(raw) = self.get("attributes") {
            base.attributes = parse_json_or_default::<AttributeMap>("attributes", Some(raw));
        }
        if let Some(raw) = self.get("variations") {
            base.variations = parse_variations(Some(raw), base.price);
        }

        if base.has_variations && !base.variations.is_empty() {
            base.stock = base
                .variations
                .iter()
                .fold(0_i32, |acc, v| acc.saturating_add(v.stock.max(0)));
        }
        base
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
