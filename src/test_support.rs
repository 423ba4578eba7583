//! Shared fixtures for unit tests.

use crate::color::HexColor;
use crate::grid::{Cell, Grid};
use crate::registry::PaletteRegistry;
use crate::store::GridStore;

pub(crate) fn hex(value: &str) -> HexColor {
    HexColor::parse(value).unwrap()
}

/// Letter shorthand: `A`..`F` map to `#AAAAAA`..`#FFFFFF`, `X` is an
/// external cell and `.` is transparent.
pub(crate) fn cell(token: &str) -> Cell {
    match token {
        "X" => Cell::external(),
        "." => Cell::transparent(),
        letter => Cell::color(hex(&format!("#{}", letter.repeat(6)))),
    }
}

pub(crate) fn grid_of(rows: &[&str]) -> Grid {
    let rows: Vec<Vec<Cell>> = rows
        .iter()
        .map(|row| row.split_whitespace().map(cell).collect())
        .collect();
    Grid::from_rows(rows).unwrap()
}

pub(crate) fn store_of(rows: &[&str]) -> GridStore {
    GridStore::new(grid_of(rows))
}

/// Registry holding the letter colors `A`..`F`.
pub(crate) fn letter_registry() -> PaletteRegistry {
    PaletteRegistry::from_entries([
        ("A", "#AAAAAA"),
        ("B", "#BBBBBB"),
        ("C", "#CCCCCC"),
        ("D", "#DDDDDD"),
        ("E", "#EEEEEE"),
        ("F", "#FFFFFF"),
    ])
}
