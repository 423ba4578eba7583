//! Initial color mapping: turns a source picture into a palette-constrained
//! grid before any merging happens.
//!
//! Images are sampled per cell (dominant or average color of the cell's pixel
//! block) and snapped to the nearest active palette color. Grids supplied by
//! the caller are snapped cell by cell.

use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::color::{nearest_index, HexColor};
use crate::error::{EngineError, Result};
use crate::grid::{Cell, CellColor, Grid};
use crate::registry::PaletteColor;

/// Pixels with alpha below this are treated as empty.
const ALPHA_CUTOFF: u8 = 128;
const WHITE: &str = "#FFFFFF";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelationMode {
    /// Most frequent color in the cell. Keeps flat artwork crisp.
    #[default]
    Dominant,
    /// Mean color of the cell. Better for photos.
    Average,
}

/// What a pattern is generated from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Image(RgbaImage),
    Grid(Grid),
}

impl Source {
    pub fn image(image: RgbaImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EngineError::ImageDecode("image has no pixels".to_string()));
        }
        Ok(Source::Image(image))
    }

    /// Decode PNG/JPEG/... bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| EngineError::ImageDecode(e.to_string()))?;
        Self::image(decoded.to_rgba8())
    }

    /// Target grid size for this source: images follow the granularity,
    /// grids keep their own shape.
    pub fn grid_dimensions(&self, granularity: u32) -> (usize, usize) {
        match self {
            Source::Image(image) => grid_dimensions(image.width(), image.height(), granularity),
            Source::Grid(grid) => (grid.width(), grid.height()),
        }
    }

    pub fn fingerprint(&self) -> String {
        match self {
            Source::Image(image) => {
                let mut hasher = Sha256::new();
                hasher.update(image.width().to_le_bytes());
                hasher.update(image.height().to_le_bytes());
                hasher.update(image.as_raw());
                format!("{:x}", hasher.finalize())
            }
            Source::Grid(grid) => grid.fingerprint(),
        }
    }
}

/// `N = granularity` columns and `M = max(1, round(N · h / w))` rows.
pub fn grid_dimensions(image_width: u32, image_height: u32, granularity: u32) -> (usize, usize) {
    let columns = granularity.max(1) as usize;
    let aspect = image_height as f64 / image_width.max(1) as f64;
    let rows = (columns as f64 * aspect).round().max(1.0) as usize;
    (columns, rows)
}

/// Color used where nothing better is known: white when active, otherwise
/// the first active color.
pub fn choose_fallback(palette: &[PaletteColor]) -> Option<&PaletteColor> {
    palette
        .iter()
        .find(|color| color.hex.as_str() == WHITE)
        .or_else(|| palette.first())
}

pub trait InitialMapper: Send + Sync {
    /// Produce a `width` × `height` grid whose counted cells all use colors
    /// from `palette`.
    fn map_initial(
        &self,
        source: &Source,
        width: usize,
        height: usize,
        palette: &[PaletteColor],
        mode: PixelationMode,
        fallback: &PaletteColor,
    ) -> Result<Grid>;
}

/// Default mapper: block sampling for images, nearest-color snapping for
/// grids.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaletteMapper;

impl InitialMapper for PaletteMapper {
    fn map_initial(
        &self,
        source: &Source,
        width: usize,
        height: usize,
        palette: &[PaletteColor],
        mode: PixelationMode,
        fallback: &PaletteColor,
    ) -> Result<Grid> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidParams(format!(
                "grid size {}x{} must be at least 1x1",
                width, height
            )));
        }
        match source {
            Source::Image(image) => map_image(image, width, height, palette, mode, fallback),
            Source::Grid(grid) => remap_grid(grid, width, height, palette, fallback),
        }
    }
}

fn snap(rgb: [u8; 3], palette: &[PaletteColor], fallback: &PaletteColor) -> HexColor {
    nearest_index(rgb, palette.iter().map(|color| &color.rgb))
        .map(|idx| palette[idx].hex.clone())
        .unwrap_or_else(|| fallback.hex.clone())
}

/// Pixel span `[floor(i·len/cells), floor((i+1)·len/cells))`, never empty.
fn block(index: usize, cells: usize, len: u32) -> (u32, u32) {
    let len = len as u64;
    let start = (index as u64 * len / cells as u64) as u32;
    let end = ((index as u64 + 1) * len / cells as u64) as u32;
    (start, end.max(start + 1))
}

fn sample_block(
    image: &RgbaImage,
    (x0, x1): (u32, u32),
    (y0, y1): (u32, u32),
    mode: PixelationMode,
) -> Option<[u8; 3]> {
    let opaque = (y0..y1)
        .flat_map(|y| (x0..x1).map(move |x| (x, y)))
        .map(|(x, y)| image.get_pixel(x, y).0)
        .filter(|p| p[3] >= ALPHA_CUTOFF)
        .map(|p| [p[0], p[1], p[2]]);

    match mode {
        PixelationMode::Dominant => {
            let mut seen: Vec<([u8; 3], u32)> = Vec::new();
            let mut index: HashMap<[u8; 3], usize> = HashMap::new();
            for rgb in opaque {
                match index.get(&rgb) {
                    Some(&i) => seen[i].1 += 1,
                    None => {
                        index.insert(rgb, seen.len());
                        seen.push((rgb, 1));
                    }
                }
            }
            let mut best: Option<([u8; 3], u32)> = None;
            for (rgb, count) in seen {
                match best {
                    Some((_, best_count)) if count <= best_count => {}
                    _ => best = Some((rgb, count)),
                }
            }
            best.map(|(rgb, _)| rgb)
        }
        PixelationMode::Average => {
            let mut sum = [0u64; 3];
            let mut n = 0u64;
            for rgb in opaque {
                for c in 0..3 {
                    sum[c] += rgb[c] as u64;
                }
                n += 1;
            }
            if n == 0 {
                return None;
            }
            Some([
                ((sum[0] + n / 2) / n) as u8,
                ((sum[1] + n / 2) / n) as u8,
                ((sum[2] + n / 2) / n) as u8,
            ])
        }
    }
}

fn map_image(
    image: &RgbaImage,
    width: usize,
    height: usize,
    palette: &[PaletteColor],
    mode: PixelationMode,
    fallback: &PaletteColor,
) -> Result<Grid> {
    let rows: Vec<Vec<Cell>> = (0..height)
        .into_par_iter()
        .map(|row| {
            let ys = block(row, height, image.height());
            (0..width)
                .map(|col| {
                    let xs = block(col, width, image.width());
                    match sample_block(image, xs, ys, mode) {
                        Some(rgb) => Cell::color(snap(rgb, palette, fallback)),
                        // Nothing opaque here: outside the shape.
                        None => Cell {
                            color: CellColor::Color(fallback.hex.clone()),
                            is_external: true,
                        },
                    }
                })
                .collect()
        })
        .collect();

    let grid = Grid::from_rows(rows)?;
    log::debug!(
        "Mapped {}x{} image onto {}x{} grid ({:?})",
        image.width(),
        image.height(),
        width,
        height,
        mode
    );
    Ok(grid)
}

fn remap_grid(
    grid: &Grid,
    width: usize,
    height: usize,
    palette: &[PaletteColor],
    fallback: &PaletteColor,
) -> Result<Grid> {
    if grid.width() != width || grid.height() != height {
        return Err(EngineError::DimensionMismatch {
            width,
            height,
            actual_width: grid.width(),
            actual_height: grid.height(),
        });
    }

    let mut snapped = 0usize;
    let cells: Vec<Cell> = grid
        .cells()
        .iter()
        .map(|cell| match cell.counted() {
            Some(hex) if palette.iter().any(|color| &color.hex == hex) => cell.clone(),
            Some(hex) => {
                snapped += 1;
                Cell::color(snap(hex.rgb(), palette, fallback))
            }
            None => cell.clone(),
        })
        .collect();

    if snapped > 0 {
        log::debug!("Snapped {} imported cells to the active palette", snapped);
    }
    Grid::new(width, height, cells)
}
