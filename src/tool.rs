//! Interactive tool modes. Exactly one mode is active at a time; the engine
//! routes grid clicks according to it.

use serde::Serialize;

use crate::color::HexColor;
use crate::grid::{Cell, CellColor};

/// Progress of a two-step color replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum ReplaceStep {
    SelectSource,
    SelectTarget { source: HexColor },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ToolMode {
    #[default]
    Idle,
    /// Clicks paint `brush`; without a brush they only inspect.
    ManualColoring { brush: Option<CellColor> },
    /// The next click flood-erases a region.
    Erase,
    ColorReplace(ReplaceStep),
    RegionSelect {
        anchor: Option<(usize, usize)>,
        area: Option<SelectedArea>,
    },
}

impl ToolMode {
    pub fn region_select() -> Self {
        ToolMode::RegionSelect {
            anchor: None,
            area: None,
        }
    }

    pub fn color_replace() -> Self {
        ToolMode::ColorReplace(ReplaceStep::SelectSource)
    }

    /// Any mode that edits cells, as opposed to just looking at them.
    pub fn is_editing(&self) -> bool {
        !matches!(self, ToolMode::Idle | ToolMode::RegionSelect { .. })
    }
}

/// Inclusive rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectedArea {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl SelectedArea {
    /// Rectangle spanned by two corner cells given in any order.
    pub fn from_corners(a: (usize, usize), b: (usize, usize)) -> Self {
        Self {
            top: a.0.min(b.0),
            left: a.1.min(b.1),
            bottom: a.0.max(b.0),
            right: a.1.max(b.1),
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.top..=self.bottom).contains(&row) && (self.left..=self.right).contains(&col)
    }

    pub fn cell_count(&self) -> usize {
        (self.bottom - self.top + 1) * (self.right - self.left + 1)
    }
}

/// What a click did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClickOutcome {
    Inspected { cell: Cell },
    Erased { cells: usize },
    SourceSelected { source: HexColor },
    Painted { changed: bool },
    AnchorSet { row: usize, col: usize },
    AreaSelected { area: SelectedArea },
}
