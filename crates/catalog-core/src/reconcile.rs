//! Batch reconciliation: spreadsheet rows to upsert records keyed by SKU.
//!
//! Rows are folded in file order. The fold state carries the records built
//! so far and the SKU of the most recent `Parent` row; `Variation` rows
//! attach to that parent and add their stock to it. The result is a pure
//! function of the input rows.

use std::collections::HashMap;

use crate::catalog::{AttributeMap, ProductRecord, Variation, DEFAULT_VARIATION_TYPE};
use crate::form::{parse_price_opt, parse_stock};

const COL_SKU: &[&str] = &["sku"];
const COL_NAME: &[&str] = &["name", "nome"];
const COL_KIND: &[&str] = &["tipo", "type"];
const COL_PRICE: &[&str] = &["price", "preço", "preco"];
const COL_STOCK: &[&str] = &["stock", "estoque"];
const COL_CATEGORY: &[&str] = &["category", "categoria"];
const COL_SUBCATEGORY: &[&str] = &["subcategory", "subcategoria"];

const RECOGNIZED: &[&[&str]] = &[
    COL_SKU,
    COL_NAME,
    COL_KIND,
    COL_PRICE,
    COL_STOCK,
    COL_CATEGORY,
    COL_SUBCATEGORY,
];

/// One spreadsheet row as ordered `(column header, cell)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    cells: Vec<(String, String)>,
}

impl SheetRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// First non-blank trimmed cell whose header matches one of `names`
    /// (case-insensitive).
    fn get(&self, names: &[&str]) -> Option<&str> {
        self.cells
            .iter()
            .filter(|(header, _)| is_column(header, names))
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }

    /// Non-blank cells outside the recognized columns, as trimmed attributes.
    fn extra_attributes(&self) -> AttributeMap {
        self.cells
            .iter()
            .filter(|(header, _)| {
                !header.trim().is_empty() && !RECOGNIZED.iter().any(|names| is_column(header, names))
            })
            .filter_map(|(header, value)| {
                let value = value.trim();
                (!value.is_empty()).then(|| (header.trim().to_string(), value.to_string()))
            })
            .collect()
    }
}

fn is_column(header: &str, names: &[&str]) -> bool {
    let header = header.trim().to_lowercase();
    names.iter().any(|n| *n == header)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Simple,
    Parent,
    Variation,
}

impl RowKind {
    /// Unknown or missing kinds are `Simple`.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("parent" | "pai") => RowKind::Parent,
            Some("variation" | "variação" | "variacao" | "variacão") => RowKind::Variation,
            _ => RowKind::Simple,
        }
    }
}

/// Rows the fold skipped. Neither stops the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileWarning {
    /// A `Variation` row appeared before any `Parent` row.
    OrphanVariation { row: usize, sku: Option<String> },
    /// A `Simple` or `Parent` row without a SKU.
    MissingSku { row: usize },
}

impl std::fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileWarning::OrphanVariation { row, sku } => write!(
                f,
                "row {row}: variation {} has no parent row; dropped",
                sku.as_deref().unwrap_or("(no sku)")
            ),
            ReconcileWarning::MissingSku { row } => write!(f, "row {row}: missing SKU; skipped"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    /// One record per distinct SKU, in first-seen order.
    pub records: Vec<ProductRecord>,
    pub warnings: Vec<ReconcileWarning>,
}

/// Split a variation label `"<Type>:<Value>"` at the first colon.
///
/// Labels without a colon are a value of the default type (`"Cor"`).
#[must_use]
pub fn split_variation_name(name: &str) -> (String, String) {
    match name.split_once(':') {
        Some((kind, value)) => (kind.trim().to_string(), value.trim().to_string()),
        None => (DEFAULT_VARIATION_TYPE.to_string(), name.trim().to_string()),
    }
}

/// Fold spreadsheet rows into upsert records.
///
/// Row numbers in warnings are 1-based positions in `rows`.
pub fn reconcile_rows<I>(rows: I) -> Reconciled
where
    I: IntoIterator<Item = SheetRow>,
{
    rows.into_iter()
        .enumerate()
        .fold(FoldState::default(), |state, (i, row)| state.step(i + 1, &row))
        .finish()
}

#[derive(Debug, Default)]
struct FoldState {
    records: Vec<ProductRecord>,
    by_sku: HashMap<String, usize>,
    current_parent: Option<String>,
    warnings: Vec<ReconcileWarning>,
}

impl FoldState {
    fn step(mut self, row_number: usize, row: &SheetRow) -> Self {
        match RowKind::parse(row.get(COL_KIND)) {
            RowKind::Variation => self.attach_variation(row_number, row),
            kind @ (RowKind::Parent | RowKind::Simple) => {
                let Some(sku) = row.get(COL_SKU).map(ToOwned::to_owned) else {
                    self.warnings.push(ReconcileWarning::MissingSku { row: row_number });
                    return self;
                };
                let record = base_record(&sku, row, kind == RowKind::Parent);
                if kind == RowKind::Parent {
                    self.current_parent = Some(sku.clone());
                } else if self.current_parent.as_deref() == Some(sku.as_str()) {
                    // The parent record was replaced; later variations are orphans.
                    self.current_parent = None;
                }
                self.put(sku, record);
            }
        }
        self
    }

    /// Last write wins: a repeated SKU replaces the earlier record in place.
    fn put(&mut self, sku: String, record: ProductRecord) {
        match self.by_sku.get(&sku) {
            Some(&idx) => self.records[idx] = record,
            None => {
                self.by_sku.insert(sku, self.records.len());
                self.records.push(record);
            }
        }
    }

    fn attach_variation(&mut self, row_number: usize, row: &SheetRow) {
        let sku = row.get(COL_SKU).map(ToOwned::to_owned);
        let parent = self
            .current_parent
            .as_ref()
            .and_then(|p| self.by_sku.get(p))
            .and_then(|&idx| self.records.get_mut(idx));

        let Some(parent) = parent else {
            self.warnings
                .push(ReconcileWarning::OrphanVariation { row: row_number, sku });
            return;
        };

        let (kind, value) = split_variation_name(row.get(COL_NAME).unwrap_or_default());
        let stock = row.get(COL_STOCK).map_or(0, parse_stock);
        let price = parse_price_opt(row.get(COL_PRICE))
            .or(parent.price)
            .unwrap_or_default();

        parent.stock = Some(parent.stock.unwrap_or(0).saturating_add(stock));
        parent.variations.get_or_insert_with(Vec::new).push(Variation {
            kind,
            value,
            price,
            stock,
            sku: sku.unwrap_or_default(),
        });
    }

    fn finish(self) -> Reconciled {
        Reconciled {
            records: self.records,
            warnings: self.warnings,
        }
    }
}

fn base_record(sku: &str, row: &SheetRow, is_parent: bool) -> ProductRecord {
    let own_stock = row.get(COL_STOCK).map_or(0, parse_stock);
    ProductRecord {
        sku: Some(sku.to_string()),
        name: row.get(COL_NAME).map(ToOwned::to_owned),
        category: row.get(COL_CATEGORY).map(ToOwned::to_owned),
        subcategory: row.get(COL_SUBCATEGORY).map(ToOwned::to_owned),
        price: Some(parse_price_opt(row.get(COL_PRICE)).unwrap_or_default()),
        stock: Some(if is_parent { 0 } else { own_stock }),
        attributes: Some(row.extra_attributes()),
        has_variations: Some(is_parent),
        variations: Some(Vec::new()),
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
