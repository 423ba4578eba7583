//! Region edits: flood-fill erase, global color replace, automatic
//! background removal and single-cell painting.
//!
//! Every operator builds its complete change batch first and then applies it
//! through the store, so a refused operation leaves grid and counts alone.

use serde::Serialize;
use std::collections::HashMap;

use crate::color::HexColor;
use crate::error::{EngineError, Result};
use crate::grid::{Cell, CellColor, Grid};
use crate::registry::PaletteRegistry;
use crate::store::{CellChanges, GridStore};

/// Result of an automatic background removal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackgroundRemoval {
    pub background: HexColor,
    pub removed: usize,
}

/// 4-connected region of cells holding `target`, grown from every matching
/// seed. External cells and other identities stop the fill.
pub(crate) fn flood_fill(grid: &Grid, seeds: &[usize], target: &HexColor) -> Vec<usize> {
    let mut visited = vec![false; grid.cells().len()];
    let mut stack = Vec::new();
    let mut region = Vec::new();

    for &seed in seeds {
        if !visited[seed] && grid.cell_at(seed).holds(target) {
            visited[seed] = true;
            stack.push(seed);
        }
    }

    while let Some(idx) = stack.pop() {
        region.push(idx);
        for next in grid.neighbors(idx) {
            if !visited[next] && grid.cell_at(next).holds(target) {
                visited[next] = true;
                stack.push(next);
            }
        }
    }

    region
}

fn erase_all(cells: Vec<usize>) -> CellChanges {
    cells.into_iter().map(|idx| (idx, Cell::transparent())).collect()
}

/// Erase the connected same-color region containing `(row, col)`.
pub fn erase(store: &mut GridStore, row: usize, col: usize) -> Result<usize> {
    let grid = store.grid();
    let start = grid.index_of(row, col)?;
    let target = grid
        .cell_at(start)
        .counted()
        .cloned()
        .ok_or(EngineError::NotErasable { row, col })?;

    let region = flood_fill(grid, &[start], &target);
    let erased = store.apply(erase_all(region));
    log::info!("Erased {} cells of {} starting at ({}, {})", erased, target, row, col);
    Ok(erased)
}

/// Rewrite every cell holding `source` to `target`, connected or not.
pub fn replace_color(
    store: &mut GridStore,
    registry: &PaletteRegistry,
    source: &HexColor,
    target: &HexColor,
) -> Result<usize> {
    if !registry.contains(target) {
        return Err(EngineError::UnknownColor(target.clone()));
    }
    if source == target {
        return Ok(0);
    }

    let changes: CellChanges = store
        .grid()
        .cells()
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.holds(source))
        .map(|(idx, _)| (idx, Cell::color(target.clone())))
        .collect();
    let replaced = store.apply(changes);
    if replaced > 0 {
        log::info!("Replaced {} cells of {} with {}", replaced, source, target);
    }
    Ok(replaced)
}

/// Most frequent counted color on the border; ties go to the color seen
/// first in border scan order.
fn border_majority(grid: &Grid) -> Option<HexColor> {
    let mut order: Vec<(&HexColor, u32)> = Vec::new();
    let mut index: HashMap<&HexColor, usize> = HashMap::new();
    for idx in grid.border_indices() {
        let Some(hex) = grid.cell_at(idx).counted() else {
            continue;
        };
        match index.get(hex) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(hex, order.len());
                order.push((hex, 1));
            }
        }
    }

    let mut best: Option<(&HexColor, u32)> = None;
    for (hex, count) in order {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((hex, count)),
        }
    }
    best.map(|(hex, _)| hex.clone())
}

/// Detect the border-majority color and erase every region of it that
/// touches the border. Enclosed islands of that color are kept.
pub fn auto_remove_background(store: &mut GridStore) -> Result<BackgroundRemoval> {
    let grid = store.grid();
    let background = border_majority(grid).ok_or(EngineError::NoBackground)?;

    let region = flood_fill(grid, &grid.border_indices(), &background);
    if region.is_empty() {
        return Err(EngineError::NothingRemovable);
    }

    let removed = store.apply(erase_all(region));
    log::info!("Removed background {}: {} cells", background, removed);
    Ok(BackgroundRemoval {
        background,
        removed,
    })
}

/// Set one cell to a palette color or erase it. External cells are refused.
/// Returns whether the cell changed.
pub fn paint(
    store: &mut GridStore,
    registry: &PaletteRegistry,
    row: usize,
    col: usize,
    color: &CellColor,
) -> Result<bool> {
    let idx = store.grid().index_of(row, col)?;
    if store.grid().cell_at(idx).is_external {
        return Err(EngineError::NotPaintable { row, col });
    }
    let cell = match color {
        CellColor::Transparent => Cell::transparent(),
        CellColor::Color(hex) => {
            if !registry.contains(hex) {
                return Err(EngineError::UnknownColor(hex.clone()));
            }
            Cell::color(hex.clone())
        }
    };
    Ok(store.apply(vec![(idx, cell)]) > 0)
}
