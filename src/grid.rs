use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::color::HexColor;
use crate::error::{EngineError, Result};

/// What a cell holds: a bead color, or nothing (erased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellColor {
    Transparent,
    Color(HexColor),
}

impl CellColor {
    pub fn as_hex(&self) -> Option<&HexColor> {
        match self {
            CellColor::Color(hex) => Some(hex),
            CellColor::Transparent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub color: CellColor,
    /// Outside the drawn shape. Never counted, never flooded.
    #[serde(default)]
    pub is_external: bool,
}

impl Cell {
    pub fn color(hex: HexColor) -> Self {
        Self {
            color: CellColor::Color(hex),
            is_external: false,
        }
    }

    pub fn transparent() -> Self {
        Self {
            color: CellColor::Transparent,
            is_external: false,
        }
    }

    pub fn external() -> Self {
        Self {
            color: CellColor::Transparent,
            is_external: true,
        }
    }

    /// Identity that contributes to the color counts, if any.
    pub fn counted(&self) -> Option<&HexColor> {
        if self.is_external {
            None
        } else {
            self.color.as_hex()
        }
    }

    pub fn holds(&self, hex: &HexColor) -> bool {
        self.counted() == Some(hex)
    }
}

/// Fixed-size row-major grid of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

#[derive(Deserialize)]
struct RawGrid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl TryFrom<RawGrid> for Grid {
    type Error = EngineError;

    fn try_from(raw: RawGrid) -> Result<Self> {
        Grid::new(raw.width, raw.height, raw.cells)
    }
}

impl Grid {
    pub fn new(width: usize, height: usize, cells: Vec<Cell>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidParams(
                "grid dimensions must be greater than 0".to_string(),
            ));
        }
        let expected = width.checked_mul(height).ok_or_else(|| {
            EngineError::InvalidParams(format!("grid size {}x{} is too large", width, height))
        })?;
        if cells.len() != expected {
            return Err(EngineError::InvalidParams(format!(
                "expected {} cells for a {}x{} grid, got {}",
                expected,
                width,
                height,
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Build from rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != width) {
            return Err(EngineError::InvalidParams(
                "grid rows must all have the same length".to_string(),
            ));
        }
        Self::new(width, height, rows.into_iter().flatten().collect())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.height && col < self.width {
            Some(&self.cells[row * self.width + col])
        } else {
            None
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width)
    }

    pub(crate) fn cell_at(&self, idx: usize) -> &Cell {
        &self.cells[idx]
    }

    pub(crate) fn set_at(&mut self, idx: usize, cell: Cell) {
        self.cells[idx] = cell;
    }

    pub(crate) fn index_of(&self, row: usize, col: usize) -> Result<usize> {
        if row < self.height && col < self.width {
            Ok(row * self.width + col)
        } else {
            Err(EngineError::OutOfBounds {
                row,
                col,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Border cell indices, each once: column by column the top then bottom
    /// cell, then the left and right cells of the inner rows from top to
    /// bottom.
    pub fn border_indices(&self) -> Vec<usize> {
        let (w, h) = (self.width, self.height);
        let mut out = Vec::with_capacity(2 * (w + h));
        for col in 0..w {
            out.push(col);
            if h > 1 {
                out.push((h - 1) * w + col);
            }
        }
        for row in 1..h.saturating_sub(1) {
            out.push(row * w);
            if w > 1 {
                out.push(row * w + w - 1);
            }
        }
        out
    }

    /// 4-connected neighbours of a cell index, within bounds.
    pub(crate) fn neighbors(&self, idx: usize) -> impl Iterator<Item = usize> {
        let (w, h) = (self.width, self.height);
        let x = idx % w;
        let y = idx / w;
        let up = (y > 0).then(|| idx - w);
        let down = (y + 1 < h).then(|| idx + w);
        let left = (x > 0).then(|| idx - 1);
        let right = (x + 1 < w).then(|| idx + 1);
        [up, down, left, right].into_iter().flatten()
    }

    /// Content hash of the grid, stable across runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.width as u64).to_le_bytes());
        hasher.update((self.height as u64).to_le_bytes());
        for cell in &self.cells {
            hasher.update([cell.is_external as u8]);
            match &cell.color {
                CellColor::Transparent => hasher.update([0u8]),
                CellColor::Color(hex) => hasher.update(hex.as_str().as_bytes()),
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(hex: &str) -> Cell {
        Cell::color(HexColor::parse(hex).unwrap())
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let rows = vec![vec![c("#000000"), c("#000000")], vec![c("#000000")]];
        assert!(Grid::from_rows(rows).is_err());
        assert!(Grid::new(0, 3, Vec::new()).is_err());
    }

    #[test]
    fn test_border_indices_cover_each_edge_cell_once() {
        let grid = Grid::new(4, 3, vec![Cell::transparent(); 12]).unwrap();
        assert_eq!(grid.border_indices(), vec![0, 8, 1, 9, 2, 10, 3, 11, 4, 7]);

        let single_row = Grid::new(3, 1, vec![Cell::transparent(); 3]).unwrap();
        assert_eq!(single_row.border_indices(), vec![0, 1, 2]);

        let single_col = Grid::new(1, 3, vec![Cell::transparent(); 3]).unwrap();
        assert_eq!(single_col.border_indices(), vec![0, 2, 1]);
    }

    #[test]
    fn test_neighbors_stay_in_bounds() {
        let grid = Grid::new(3, 3, vec![Cell::transparent(); 9]).unwrap();
        let mut corner: Vec<usize> = grid.neighbors(0).collect();
        corner.sort_unstable();
        assert_eq!(corner, vec![1, 3]);
        assert_eq!(grid.neighbors(4).count(), 4);
    }

    #[test]
    fn test_counted_skips_external_and_transparent() {
        assert!(Cell::external().counted().is_none());
        assert!(Cell::transparent().counted().is_none());
        assert_eq!(c("#010203").counted().unwrap().as_str(), "#010203");
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let json = r##"{"width": 2, "height": 1, "cells": [{"color": "transparent"}]}"##;
        assert!(serde_json::from_str::<Grid>(json).is_err());

        let json = r##"{"width": 1, "height": 1, "cells": [{"color": {"color": "#abcdef"}}]}"##;
        let grid: Grid = serde_json::from_str(json).unwrap();
        assert_eq!(grid.get(0, 0), Some(&c("#ABCDEF")));

        let huge = r##"{"width": 4294967296, "height": 4294967296, "cells": []}"##;
        assert!(serde_json::from_str::<Grid>(huge).is_err());
        assert!(matches!(
            Grid::new(usize::MAX, 2, Vec::new()),
            Err(EngineError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Grid::from_rows(vec![vec![c("#000000"), c("#FFFFFF")]]).unwrap();
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.set_at(1, Cell::transparent());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
