use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::push::RegressionDistance;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Red for likely regressions, yellow when earlier pushes skipped the label,
/// grey when the search gave up.
pub fn color_coded_distance_cell(distance: RegressionDistance) -> Cell {
    match distance {
        RegressionDistance::Known(0) => Cell::new("likely (0)").fg(TableColor::Red),
        RegressionDistance::Known(n) => Cell::new(format!("possible ({n})")).fg(TableColor::Yellow),
        RegressionDistance::Unknown => Cell::new("possible (unknown)").fg(TableColor::DarkGrey),
    }
}

pub fn color_coded_coverage_cell(percentage: f64) -> Cell {
    let text = format!("{percentage:.1}%");
    if percentage >= 50.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if percentage >= 20.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn color_coded_count_cell(count: usize) -> Cell {
    if count == 0 {
        Cell::new(count).fg(TableColor::Green)
    } else {
        Cell::new(count).fg(TableColor::Red)
    }
}
