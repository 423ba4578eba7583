//! Palette-constrained bead pattern grids.
//!
//! A picture (an image or a caller-supplied grid) is mapped onto an `N × M`
//! grid of bead colors drawn from a fixed registry, similar colors are
//! consolidated, and the result can then be edited: colors excluded and
//! re-included, regions erased, colors replaced, the background removed and
//! single cells painted. Per-color counts are kept in step with every edit.
//!
//! [`PatternEngine`] is the entry point. The building blocks it drives are
//! public for callers that want to run them directly.

mod color;
mod engine;
mod error;
mod exclusion;
mod grid;
mod mapper;
mod merge;
mod pipeline;
mod region;
mod registry;
mod selection;
mod stats;
mod store;
mod tool;

#[cfg(test)]
mod test_support;

pub use color::{color_distance, compare_by_hue, is_hex_color, nearest_index, rgb_to_hex, HexColor};
pub use engine::PatternEngine;
pub use error::{EngineError, ErrorKind, Result};
pub use exclusion::{ExclusionReport, Exclusions};
pub use grid::{Cell, CellColor, Grid};
pub use mapper::{
    choose_fallback, grid_dimensions, InitialMapper, PaletteMapper, PixelationMode, Source,
};
pub use merge::{merge_similar_colors, MergeReport};
pub use pipeline::{
    regenerate, RegenerateParams, Regeneration, RequestKey, DEFAULT_GRANULARITY,
    DEFAULT_THRESHOLD, MAX_GRANULARITY,
};
pub use region::{auto_remove_background, erase, paint, replace_color, BackgroundRemoval};
pub use registry::{PaletteColor, PaletteRegistry};
pub use selection::{
    active_palette, export_palette_file, import_palette_file, validate_selections, PaletteFile,
    PaletteImport, PaletteSelections, SelectionValidation, PALETTE_FILE_VERSION,
};
pub use stats::{ColorCounts, LegendEntry};
pub use store::GridStore;
pub use tool::{ClickOutcome, ReplaceStep, SelectedArea, ToolMode};
