//! Table builder wrapper around comfy-table for consistent list display.

use comfy_table::{presets, Attribute, Cell, CellAlignment, ContentArrangement, Table};

/// Create a standard list table with the given headers.
///
/// Uses the NOTHING preset (no borders) for a clean CLI aesthetic.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| {
            Cell::new(h.to_uppercase())
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Left)
        }));
    table
}

/// Right-aligned numeric cell.
pub fn count_cell(value: u32) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

/// Render the table to string with a count header.
pub fn render_list(entity_name: &str, table: &Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let noun = if total == 1 {
        entity_name.to_string()
    } else {
        format!("{entity_name}s")
    };
    format!("{total} {noun}:\n{table}")
}
