//! Excluding and re-including palette colors on a live grid.
//!
//! Excluding a color rewrites its cells locally to the nearest color that
//! was in the picture after the last regeneration and is still allowed.
//! Re-including a color cannot be patched locally (the cells it used to own
//! are no longer known), so the engine answers it with a full regeneration.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::color::{nearest_index, HexColor};
use crate::error::{EngineError, Result};
use crate::grid::Cell;
use crate::registry::{PaletteColor, PaletteRegistry};
use crate::store::{CellChanges, GridStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExclusionReport {
    pub excluded: HexColor,
    /// Color that took over the excluded cells; `None` when no cell held it.
    pub replacement: Option<HexColor>,
    pub cells_remapped: usize,
}

/// The set of palette colors currently removed from candidacy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    excluded: BTreeSet<HexColor>,
}

impl Exclusions {
    pub fn contains(&self, hex: &HexColor) -> bool {
        self.excluded.contains(hex)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HexColor> {
        self.excluded.iter()
    }

    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.excluded.clear();
    }

    /// Colors an excluded `hex` may be remapped to: the initial grid colors
    /// minus `hex` and minus everything already excluded.
    pub fn remap_targets(&self, initial: &BTreeSet<HexColor>, hex: &HexColor) -> BTreeSet<HexColor> {
        initial
            .iter()
            .filter(|candidate| *candidate != hex && !self.excluded.contains(*candidate))
            .cloned()
            .collect()
    }

    /// Exclude `hex`, remapping its cells. Refused without any change when no
    /// legitimate target color remains.
    pub fn exclude(
        &mut self,
        store: Option<&mut GridStore>,
        registry: &PaletteRegistry,
        hex: &HexColor,
    ) -> Result<ExclusionReport> {
        let store = match store {
            Some(store) if !store.initial_colors().is_empty() => store,
            _ => return Err(EngineError::NotRegenerated),
        };
        let excluded_color = registry
            .get(hex)
            .ok_or_else(|| EngineError::UnknownColor(hex.clone()))?;
        if self.excluded.contains(hex) {
            return Err(EngineError::AlreadyExcluded(hex.clone()));
        }

        let targets = self.remap_targets(store.initial_colors(), hex);
        if targets.is_empty() {
            log::warn!(
                "Cannot exclude color {}: no other color from the initial grid remains",
                hex
            );
            return Err(EngineError::NoRemapTarget(hex.clone()));
        }

        // Registry order keeps nearest-color ties deterministic.
        let target_palette: Vec<&PaletteColor> = registry
            .colors()
            .iter()
            .filter(|color| targets.contains(&color.hex))
            .collect();
        let replacement = nearest_index(
            excluded_color.rgb,
            target_palette.iter().map(|color| &color.rgb),
        )
        .map(|idx| target_palette[idx].hex.clone())
        .ok_or_else(|| EngineError::NoRemapTarget(hex.clone()))?;

        let changes: CellChanges = store
            .grid()
            .cells()
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.holds(hex))
            .map(|(idx, _)| (idx, Cell::color(replacement.clone())))
            .collect();
        let cells_remapped = store.apply(changes);
        self.excluded.insert(hex.clone());

        log::info!(
            "Excluded {}: remapped {} cells to {}",
            hex,
            cells_remapped,
            replacement
        );
        Ok(ExclusionReport {
            excluded: hex.clone(),
            replacement: (cells_remapped > 0).then_some(replacement),
            cells_remapped,
        })
    }

    /// Mark `hex` active again. The caller is responsible for regenerating.
    pub(crate) fn include(&mut self, hex: &HexColor) -> Result<()> {
        if self.excluded.remove(hex) {
            Ok(())
        } else {
            Err(EngineError::NotExcluded(hex.clone()))
        }
    }

    pub(crate) fn restore(&mut self, hex: HexColor) {
        self.excluded.insert(hex);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn hex(value: &str) -> HexColor {
        HexColor::parse(value).unwrap()
    }

    fn registry() -> PaletteRegistry {
        PaletteRegistry::from_entries([
            ("A", "#000000"),
            ("B", "#FFFFFF"),
            ("C", "#101010"),
            ("D", "#F0F0F0"),
            ("Z", "#123456"),
        ])
    }

    fn store_of(rows: &[&[&str]]) -> GridStore {
        let rows: Vec<Vec<Cell>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|h| match *h {
                        "ext" => Cell::external(),
                        "" => Cell::transparent(),
                        other => Cell::color(hex(other)),
                    })
                    .collect()
            })
            .collect();
        GridStore::new(Grid::from_rows(rows).unwrap())
    }

    #[test]
    fn test_exclude_requires_regeneration() {
        let mut exclusions = Exclusions::default();
        let result = exclusions.exclude(None, &registry(), &hex("#000000"));
        assert_eq!(result, Err(EngineError::NotRegenerated));
    }

    #[test]
    fn test_exclude_remaps_to_nearest_initial_color() {
        let mut store = store_of(&[
            &["#000000", "#FFFFFF", "#101010"],
            &["#000000", "ext", "#000000"],
        ]);
        let mut exclusions = Exclusions::default();
        let report = exclusions
            .exclude(Some(&mut store), &registry(), &hex("#000000"))
            .unwrap();

        assert_eq!(report.replacement, Some(hex("#101010")));
        assert_eq!(report.cells_remapped, 3);
        assert!(exclusions.contains(&hex("#000000")));
        assert!(!store.counts().contains(&hex("#000000")));
        assert_eq!(store.counts().get(&hex("#101010")), 4);
        assert_eq!(store.get(1, 1), Some(&Cell::external()));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_exclude_never_uses_colors_outside_initial_set() {
        // D is the nearest palette color to B but was never in the picture.
        let mut store = store_of(&[&["#FFFFFF", "#000000"]]);
        let mut exclusions = Exclusions::default();
        let report = exclusions
            .exclude(Some(&mut store), &registry(), &hex("#FFFFFF"))
            .unwrap();
        assert_eq!(report.replacement, Some(hex("#000000")));
    }

    #[test]
    fn test_second_exclusion_of_two_color_grid_is_refused() {
        let mut store = store_of(&[&["#000000", "#FFFFFF"], &["#FFFFFF", "#FFFFFF"]]);
        let mut exclusions = Exclusions::default();
        let registry = registry();
        exclusions
            .exclude(Some(&mut store), &registry, &hex("#000000"))
            .unwrap();

        let before = store.grid().fingerprint();
        let result = exclusions.exclude(Some(&mut store), &registry, &hex("#FFFFFF"));
        assert_eq!(result, Err(EngineError::NoRemapTarget(hex("#FFFFFF"))));
        assert_eq!(store.grid().fingerprint(), before);
        assert_eq!(exclusions.len(), 1);
        assert_eq!(store.total(), 4);
    }

    #[test]
    fn test_exclude_rejects_unknown_and_repeated_colors() {
        let mut store = store_of(&[&["#000000", "#FFFFFF"]]);
        let mut exclusions = Exclusions::default();
        let registry = registry();
        assert_eq!(
            exclusions.exclude(Some(&mut store), &registry, &hex("#ABCDEF")),
            Err(EngineError::UnknownColor(hex("#ABCDEF")))
        );
        exclusions
            .exclude(Some(&mut store), &registry, &hex("#FFFFFF"))
            .unwrap();
        assert_eq!(
            exclusions.exclude(Some(&mut store), &registry, &hex("#FFFFFF")),
            Err(EngineError::AlreadyExcluded(hex("#FFFFFF")))
        );
    }

    #[test]
    fn test_exclude_color_absent_from_grid() {
        let mut store = store_of(&[&["#000000", "#FFFFFF"]]);
        let mut exclusions = Exclusions::default();
        let report = exclusions
            .exclude(Some(&mut store), &registry(), &hex("#123456"))
            .unwrap();
        assert_eq!(report.cells_remapped, 0);
        assert_eq!(report.replacement, None);
        assert!(exclusions.contains(&hex("#123456")));
    }

    #[test]
    fn test_remap_targets_ignore_current_exclusions() {
        let mut store = store_of(&[&["#000000", "#FFFFFF", "#101010"]]);
        let mut exclusions = Exclusions::default();
        let registry = registry();
        exclusions
            .exclude(Some(&mut store), &registry, &hex("#101010"))
            .unwrap();
        let targets = exclusions.remap_targets(store.initial_colors(), &hex("#000000"));
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec![hex("#FFFFFF")]);

        // The next exclusion must land on white, never back on the excluded gray.
        let report = exclusions
            .exclude(Some(&mut store), &registry, &hex("#000000"))
            .unwrap();
        assert_eq!(report.replacement, Some(hex("#FFFFFF")));
        assert_eq!(store.counts().get(&hex("#FFFFFF")), 3);
        assert_eq!(store.counts().len(), 1);
    }

    #[test]
    fn test_include_requires_excluded_color() {
        let mut exclusions = Exclusions::default();
        assert_eq!(
            exclusions.include(&hex("#000000")),
            Err(EngineError::NotExcluded(hex("#000000")))
        );
        exclusions.restore(hex("#000000"));
        assert!(exclusions.include(&hex("#000000")).is_ok());
        assert!(exclusions.is_empty());
    }
}
