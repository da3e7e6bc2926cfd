//! Spreadsheet import: CSV rows are folded into per-SKU records and synced
//! through the batch upsert.

use std::path::Path;

use anyhow::Context;
use catalog_core::{reconcile_rows, Reconciled, SheetRow};

/// Read a CSV export into header/cell rows.
///
/// Rows shorter than the header row get blank cells for the missing columns.
///
/// # Errors
///
/// Returns an error if the delimiter is not ASCII or the file cannot be read
/// or parsed.
pub(crate) fn read_sheet(path: &Path, delimiter: char) -> anyhow::Result<Vec<SheetRow>> {
    anyhow::ensure!(
        delimiter.is_ascii(),
        "delimiter must be a single ASCII character, got '{delimiter}'"
    );
    let delimiter = u8::try_from(delimiter).context("delimiter must fit in one byte")?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read headers from {}", path.display()))?
        .clone();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to parse row {}", i + 2))?;
        let pairs = headers
            .iter()
            .enumerate()
            .map(|(col, header)| (header, record.get(col).unwrap_or("")));
        rows.push(SheetRow::from_pairs(pairs));
    }
    Ok(rows)
}

/// Fold rows and log every skipped row.
pub(crate) fn reconcile(rows: Vec<SheetRow>) -> Reconciled {
    let row_count = rows.len();
    let reconciled = reconcile_rows(rows);
    for warning in &reconciled.warnings {
        tracing::warn!(%warning, "spreadsheet row skipped");
    }
    tracing::info!(
        rows = row_count,
        records = reconciled.records.len(),
        skipped = reconciled.warnings.len(),
        "spreadsheet reconciled"
    );
    reconciled
}

/// Print the records an import would send, without touching the database.
///
/// # Errors
///
/// Returns an error if the records cannot be serialized.
pub(crate) fn print_dry_run(reconciled: &Reconciled) -> anyhow::Result<()> {
    println!(
        "dry-run: would sync {} product(s), {} row(s) skipped",
        reconciled.records.len(),
        reconciled.warnings.len()
    );
    println!("{}", serde_json::to_string_pretty(&reconciled.records)?);
    Ok(())
}

/// Upsert the reconciled records and print the batch counts.
///
/// # Errors
///
/// Returns an error if the store becomes unavailable mid-batch. Per-record
/// failures are reported in the printed summary instead.
pub(crate) async fn run_import(pool: &sqlx::PgPool, reconciled: &Reconciled) -> anyhow::Result<()> {
    let records: Vec<_> = reconciled
        .records
        .iter()
        .cloned()
        .map(catalog_core::ProductRecord::with_aggregated_stock)
        .collect();

    let result = catalog_db::upsert_by_sku(pool, &records).await?;
    for failure in &result.failed {
        eprintln!(
            "error: {}: {}",
            failure.sku.as_deref().unwrap_or("(no sku)"),
            failure.reason
        );
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
