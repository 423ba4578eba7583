//! Global frequency-driven color consolidation.
//!
//! Colors are visited from most to least frequent. Each surviving color
//! absorbs every less frequent, not-yet-absorbed color closer than the
//! threshold. An absorbed color never absorbs others, so dominant colors are
//! kept exactly and the result does not depend on chains of near neighbours.

use std::collections::HashMap;

use crate::color::{color_distance, HexColor};
use crate::grid::{Cell, Grid};
use crate::registry::PaletteRegistry;

/// What a merge pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// `(absorbed, into)` pairs in the order they were decided.
    pub absorbed: Vec<(HexColor, HexColor)>,
    pub cells_rewritten: usize,
}

/// Counted identities with their frequency, in order of first appearance.
fn frequencies(grid: &Grid) -> Vec<(HexColor, u32)> {
    let mut order: Vec<(HexColor, u32)> = Vec::new();
    let mut index: HashMap<&HexColor, usize> = HashMap::new();
    for cell in grid.cells() {
        let Some(hex) = cell.counted() else {
            continue;
        };
        match index.get(hex) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(hex, order.len());
                order.push((hex.clone(), 1));
            }
        }
    }
    order
}

/// Merge colors closer than `threshold` (strict `<`) into more frequent ones.
pub fn merge_similar_colors(
    grid: &mut Grid,
    threshold: f64,
    registry: &PaletteRegistry,
) -> MergeReport {
    let mut report = MergeReport::default();

    let mut by_frequency = frequencies(grid);
    if by_frequency.is_empty() {
        log::debug!("No counted colors found; skipping merge");
        return report;
    }
    // Stable: equal counts keep first-appearance order.
    by_frequency.sort_by(|a, b| b.1.cmp(&a.1));

    let rgbs: Vec<Option<[u8; 3]>> = by_frequency
        .iter()
        .map(|(hex, _)| {
            let rgb = registry.get(hex).map(|color| color.rgb);
            if rgb.is_none() {
                log::warn!("RGB not found for color {}. Skipping it during merge.", hex);
            }
            rgb
        })
        .collect();

    let mut absorbed = vec![false; by_frequency.len()];
    let mut targets: HashMap<HexColor, HexColor> = HashMap::new();

    for i in 0..by_frequency.len() {
        if absorbed[i] {
            continue;
        }
        let Some(current_rgb) = rgbs[i] else {
            continue;
        };
        for j in (i + 1)..by_frequency.len() {
            if absorbed[j] {
                continue;
            }
            let Some(lower_rgb) = rgbs[j] else {
                continue;
            };
            let dist = color_distance(current_rgb, lower_rgb);
            if dist < threshold {
                log::debug!(
                    "Merging color {} into {} (distance: {:.2})",
                    by_frequency[j].0,
                    by_frequency[i].0,
                    dist
                );
                absorbed[j] = true;
                targets.insert(by_frequency[j].0.clone(), by_frequency[i].0.clone());
                report
                    .absorbed
                    .push((by_frequency[j].0.clone(), by_frequency[i].0.clone()));
            }
        }
    }

    if targets.is_empty() {
        log::debug!("No colors were similar enough to merge");
        return report;
    }

    let rewrites: Vec<(usize, HexColor)> = grid
        .cells()
        .iter()
        .enumerate()
        .filter_map(|(idx, cell)| {
            let target = targets.get(cell.counted()?)?;
            Some((idx, target.clone()))
        })
        .collect();
    report.cells_rewritten = rewrites.len();
    for (idx, target) in rewrites {
        grid.set_at(idx, Cell::color(target));
    }

    log::info!(
        "Merged {} less frequent colors into more frequent ones ({} cells)",
        report.absorbed.len(),
        report.cells_rewritten
    );
    report
}
