use rust_decimal::Decimal;

use super::*;

fn row(cells: &[(&str, &str)]) -> SheetRow {
    SheetRow::from_pairs(cells.iter().copied())
}

fn simple(sku: &str, name: &str, price: &str, stock: &str) -> SheetRow {
    row(&[
        ("SKU", sku),
        ("Name", name),
        ("Tipo", "Simple"),
        ("Price", price),
        ("Stock", stock),
        ("Category", "Telas"),
    ])
}

fn parent(sku: &str, name: &str, price: &str) -> SheetRow {
    row(&[
        ("SKU", sku),
        ("Name", name),
        ("Tipo", "Parent"),
        ("Price", price),
        ("Stock", "99"),
    ])
}

fn variation(sku: &str, name: &str, stock: &str) -> SheetRow {
    row(&[
        ("SKU", sku),
        ("Name", name),
        ("Tipo", "Variation"),
        ("Stock", stock),
    ])
}

#[test]
fn parent_stock_is_sum_of_variations() {
    let out = reconcile_rows(vec![
        parent("P1", "Tela 15", "100"),
        variation("P1-A", "Cor:Azul", "3"),
        variation("P1-B", "Cor:Preto", "5"),
    ]);

    assert!(out.warnings.is_empty());
    assert_eq!(out.records.len(), 1);
    let p = &out.records[0];
    assert_eq!(p.sku.as_deref(), Some("P1"));
    assert_eq!(p.has_variations, Some(true));
    assert_eq!(p.stock, Some(8));
    let vars = p.variations.as_ref().expect("variations");
    assert_eq!(vars.len(), 2);
    assert_eq!(vars[0].sku, "P1-A");
    assert_eq!(vars[1].value, "Preto");
}

#[test]
fn parent_own_stock_cell_is_ignored() {
    let out = reconcile_rows(vec![parent("P1", "Tela", "10")]);
    assert_eq!(out.records[0].stock, Some(0));
}

#[test]
fn variation_name_splitting() {
    assert_eq!(
        split_variation_name("Versão:M15"),
        ("Versão".to_string(), "M15".to_string())
    );
    assert_eq!(
        split_variation_name(" Cor : Azul claro "),
        ("Cor".to_string(), "Azul claro".to_string())
    );
    assert_eq!(
        split_variation_name("Azul"),
        ("Cor".to_string(), "Azul".to_string())
    );
    assert_eq!(
        split_variation_name("A:B:C"),
        ("A".to_string(), "B:C".to_string())
    );
}

#[test]
fn variation_price_defaults_to_parent_price() {
    let out = reconcile_rows(vec![
        parent("P1", "Tela", "1.200,50"),
        variation("V1", "Azul", "1"),
        row(&[
            ("SKU", "V2"),
            ("Name", "Preto"),
            ("Tipo", "Variation"),
            ("Price", "214,29"),
            ("Stock", "2"),
        ]),
    ]);
    let vars = out.records[0].variations.as_ref().unwrap();
    assert_eq!(vars[0].price, Decimal::new(120_050, 2));
    assert_eq!(vars[1].price, Decimal::new(21_429, 2));
}

#[test]
fn orphan_variation_is_dropped_with_warning() {
    let out = reconcile_rows(vec![
        variation("V0", "Azul", "4"),
        simple("S1", "Capa", "10", "2"),
    ]);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].sku.as_deref(), Some("S1"));
    assert_eq!(
        out.warnings,
        vec![ReconcileWarning::OrphanVariation {
            row: 1,
            sku: Some("V0".to_string())
        }]
    );
}

#[test]
fn simple_rows_do_not_reset_current_parent() {
    let out = reconcile_rows(vec![
        parent("P1", "Tela", "10"),
        simple("S1", "Capa", "5", "1"),
        variation("V1", "Azul", "4"),
    ]);
    assert_eq!(out.records.len(), 2);
    assert_eq!(out.records[0].stock, Some(4));
    assert_eq!(out.records[1].has_variations, Some(false));
}

#[test]
fn simple_row_overwriting_parent_clears_pointer() {
    let out = reconcile_rows(vec![
        parent("P1", "Tela", "10"),
        simple("P1", "Tela simples", "5", "1"),
        variation("V1", "Azul", "4"),
    ]);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].has_variations, Some(false));
    assert_eq!(out.records[0].stock, Some(1));
    assert_eq!(out.warnings.len(), 1);
}

#[test]
fn new_parent_takes_over_subsequent_variations() {
    let out = reconcile_rows(vec![
        parent("P1", "Tela A", "10"),
        variation("A1", "Azul", "1"),
        parent("P2", "Tela B", "20"),
        variation("B1", "Verde", "2"),
        variation("B2", "Rosa", "3"),
    ]);
    assert_eq!(out.records[0].stock, Some(1));
    assert_eq!(out.records[1].stock, Some(5));
    assert_eq!(out.records[1].variations.as_ref().unwrap().len(), 2);
}

#[test]
fn duplicate_sku_last_write_wins_in_first_seen_position() {
    let out = reconcile_rows(vec![
        simple("S1", "Old", "1", "1"),
        simple("S2", "Other", "1", "1"),
        simple("S1", "New", "2", "7"),
    ]);
    assert_eq!(out.records.len(), 2);
    assert_eq!(out.records[0].name.as_deref(), Some("New"));
    assert_eq!(out.records[0].stock, Some(7));
    assert_eq!(out.records[1].sku.as_deref(), Some("S2"));
}

#[test]
fn missing_sku_is_skipped_with_warning() {
    let out = reconcile_rows(vec![simple("", "Sem SKU", "1", "1")]);
    assert!(out.records.is_empty());
    assert_eq!(out.warnings, vec![ReconcileWarning::MissingSku { row: 1 }]);
}

#[test]
fn unrecognized_columns_become_trimmed_attributes() {
    let out = reconcile_rows(vec![row(&[
        ("SKU", "S1"),
        ("Name", "Tela"),
        ("Qualidade", " Premium "),
        ("Garantia", ""),
        ("PRICE", "10"),
        ("Categoria", "Telas"),
    ])]);
    let record = &out.records[0];
    let attrs = record.attributes.as_ref().unwrap();
    assert_eq!(attrs.len(), 1);
    assert_eq!(attrs.get("Qualidade").map(String::as_str), Some("Premium"));
    assert_eq!(record.price, Some(Decimal::new(10, 0)));
    assert_eq!(record.category.as_deref(), Some("Telas"));
}

#[test]
fn missing_kind_defaults_to_simple_and_price_to_zero() {
    let out = reconcile_rows(vec![row(&[("SKU", "S1"), ("Name", "Capa"), ("Price", "grátis")])]);
    let record = &out.records[0];
    assert_eq!(record.has_variations, Some(false));
    assert_eq!(record.price, Some(Decimal::ZERO));
    assert_eq!(record.stock, Some(0));
}

#[test]
fn row_kind_parse_accepts_portuguese_labels() {
    assert_eq!(RowKind::parse(Some("Pai")), RowKind::Parent);
    assert_eq!(RowKind::parse(Some("Variação")), RowKind::Variation);
    assert_eq!(RowKind::parse(Some("variation")), RowKind::Variation);
    assert_eq!(RowKind::parse(Some("whatever")), RowKind::Simple);
    assert_eq!(RowKind::parse(None), RowKind::Simple);
}

#[test]
fn reconciliation_is_deterministic() {
    let rows = vec![
        parent("P1", "Tela", "10"),
        variation("V1", "Cor:Azul", "2"),
        simple("S1", "Capa", "3", "4"),
    ];
    assert_eq!(reconcile_rows(rows.clone()), reconcile_rows(rows));
}

#[test]
fn warning_display_mentions_row() {
    let w = ReconcileWarning::OrphanVariation {
        row: 4,
        sku: None,
    };
    assert_eq!(w.to_string(), "row 4: variation (no sku) has no parent row; dropped");
}
