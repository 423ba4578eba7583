//! Owner of the live grid, its color counts and the initial color snapshot.

use std::collections::BTreeSet;

use crate::color::{compare_by_hue, HexColor};
use crate::grid::{Cell, Grid};
use crate::registry::{PaletteColor, PaletteRegistry};
use crate::stats::ColorCounts;

/// A batch of cell rewrites, keyed by row-major index.
pub(crate) type CellChanges = Vec<(usize, Cell)>;

#[derive(Debug, Clone)]
pub struct GridStore {
    grid: Grid,
    counts: ColorCounts,
    initial_colors: BTreeSet<HexColor>,
}

impl GridStore {
    /// Wrap a freshly regenerated grid: recount and freeze its color set.
    pub fn new(grid: Grid) -> Self {
        let mut store = Self {
            grid,
            counts: ColorCounts::default(),
            initial_colors: BTreeSet::new(),
        };
        store.recount_all();
        store.initial_colors = store.counts.colors().cloned().collect();
        store
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.grid.get(row, col)
    }

    pub fn counts(&self) -> &ColorCounts {
        &self.counts
    }

    pub fn total(&self) -> u32 {
        self.counts.total()
    }

    /// Colors present right after the last full regeneration.
    pub fn initial_colors(&self) -> &BTreeSet<HexColor> {
        &self.initial_colors
    }

    /// Full rebuild of the counts. Only needed after regeneration.
    pub fn recount_all(&mut self) {
        self.counts = ColorCounts::from_grid(&self.grid);
    }

    /// Write a batch of cells, updating counts per cell. Returns how many
    /// cells actually changed.
    pub(crate) fn apply(&mut self, changes: CellChanges) -> usize {
        let mut changed = 0;
        for (idx, cell) in changes {
            let old = self.grid.cell_at(idx);
            if *old == cell {
                continue;
            }
            self.counts.apply_change(old.counted(), cell.counted());
            self.grid.set_at(idx, cell);
            changed += 1;
        }
        changed
    }

    /// Distinct counted colors, ordered by hue. Colors missing from the
    /// registry are listed under their hex value.
    pub fn grid_colors_by_hue(&self, registry: &PaletteRegistry) -> Vec<PaletteColor> {
        let mut colors: Vec<PaletteColor> = self
            .counts
            .colors()
            .map(|hex| {
                registry
                    .get(hex)
                    .cloned()
                    .unwrap_or_else(|| PaletteColor::new(hex.as_str(), hex.clone()))
            })
            .collect();
        colors.sort_by(|a, b| compare_by_hue(a.rgb, b.rgb).then_with(|| a.hex.cmp(&b.hex)));
        colors
    }

    /// Counts match a from-scratch recount of the grid.
    pub fn is_consistent(&self) -> bool {
        self.counts.is_consistent() && self.counts == ColorCounts::from_grid(&self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(value: &str) -> HexColor {
        HexColor::parse(value).unwrap()
    }

    fn store() -> GridStore {
        let grid = Grid::from_rows(vec![
            vec![Cell::color(hex("#FF0000")), Cell::color(hex("#0000FF"))],
            vec![Cell::external(), Cell::color(hex("#FF0000"))],
        ])
        .unwrap();
        GridStore::new(grid)
    }

    #[test]
    fn test_new_snapshots_initial_colors() {
        let store = store();
        assert_eq!(store.total(), 3);
        let initial: Vec<&str> = store.initial_colors().iter().map(HexColor::as_str).collect();
        assert_eq!(initial, vec!["#0000FF", "#FF0000"]);
    }

    #[test]
    fn test_apply_updates_counts_incrementally() {
        let mut store = store();
        let changed = store.apply(vec![
            (0, Cell::transparent()),
            (1, Cell::color(hex("#0000FF"))),
            (3, Cell::color(hex("#00FF00"))),
        ]);
        assert_eq!(changed, 2);
        assert_eq!(store.total(), 2);
        assert!(!store.counts().contains(&hex("#FF0000")));
        assert!(store.is_consistent());
        assert_eq!(store.initial_colors().len(), 2);
    }

    #[test]
    fn test_recount_all_matches_incremental_counts() {
        let mut store = store();
        store.apply(vec![(1, Cell::color(hex("#FF0000"))), (2, Cell::transparent())]);
        let incremental = store.counts().clone();
        store.recount_all();
        assert_eq!(store.counts(), &incremental);
        assert_eq!(store.counts().get(&hex("#FF0000")), 3);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_grid_colors_by_hue() {
        let store = store();
        let registry = PaletteRegistry::from_entries([("R", "#FF0000"), ("B", "#0000FF")]);
        let keys: Vec<String> = store
            .grid_colors_by_hue(&registry)
            .into_iter()
            .map(|c| c.display_key)
            .collect();
        assert_eq!(keys, vec!["R", "B"]);
    }
}
