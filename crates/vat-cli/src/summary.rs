//! Operator-facing run summaries.

use std::path::PathBuf;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

pub struct UpdateSummary {
    pub callset_path: String,
    pub projects: usize,
    pub applied: bool,
    pub new_rows: usize,
    pub total_rows: usize,
    pub table_path: PathBuf,
}

pub struct CollectionSummary {
    pub collection: String,
    pub version: String,
    pub rows: usize,
    pub datasets: usize,
    pub path: PathBuf,
}

pub struct InspectSummary {
    pub path: PathBuf,
    pub key_schema: String,
    pub rows: usize,
    pub columns: usize,
    pub globals: String,
}

pub fn print_update_summary(summary: &UpdateSummary) {
    println!("Callset: {}", summary.callset_path);
    println!("Table: {}", summary.table_path.display());
    let mut table = new_summary_table();
    table.add_row(vec![Cell::new("Projects"), count_cell(summary.projects)]);
    table.add_row(vec![
        Cell::new("Applied"),
        Cell::new(if summary.applied { "yes" } else { "already applied" }),
    ]);
    table.add_row(vec![Cell::new("New rows"), count_cell(summary.new_rows)]);
    table.add_row(vec![Cell::new("Total rows"), count_cell(summary.total_rows)]);
    println!("{table}");
}

pub fn print_collection_summary(summary: &CollectionSummary) {
    println!("Collection: {} v{}", summary.collection, summary.version);
    println!("Path: {}", summary.path.display());
    let mut table = new_summary_table();
    table.add_row(vec![Cell::new("Datasets"), count_cell(summary.datasets)]);
    table.add_row(vec![Cell::new("Rows"), count_cell(summary.rows)]);
    println!("{table}");
}

pub fn print_inspect_summary(summary: &InspectSummary) {
    println!("Table: {}", summary.path.display());
    let mut table = new_summary_table();
    table.add_row(vec![Cell::new("Key schema"), Cell::new(&summary.key_schema)]);
    table.add_row(vec![Cell::new("Rows"), count_cell(summary.rows)]);
    table.add_row(vec![Cell::new("Columns"), count_cell(summary.columns)]);
    println!("{table}");
    println!("Globals:\n{}", summary.globals);
}

fn new_summary_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn count_cell(count: usize) -> Cell {
    Cell::new(count).set_alignment(CellAlignment::Right)
}
