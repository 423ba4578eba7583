//! Per-color occupancy counts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::color::HexColor;
use crate::grid::Grid;

/// Legend entry with bead statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub hex: HexColor,
    pub count: u32,
    pub coverage: f32,
}

/// Identity → bead count, plus the running total.
///
/// `total` always equals the sum of the counts and no entry is ever zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCounts {
    counts: HashMap<HexColor, u32>,
    total: u32,
}

impl ColorCounts {
    /// Full O(N·M) rebuild.
    pub fn from_grid(grid: &Grid) -> Self {
        let mut counts = Self::default();
        for cell in grid.cells() {
            if let Some(hex) = cell.counted() {
                counts.increment(hex);
            }
        }
        counts
    }

    pub fn get(&self, hex: &HexColor) -> u32 {
        self.counts.get(hex).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn contains(&self, hex: &HexColor) -> bool {
        self.counts.contains_key(hex)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HexColor, u32)> {
        self.counts.iter().map(|(hex, &count)| (hex, count))
    }

    pub fn colors(&self) -> impl Iterator<Item = &HexColor> {
        self.counts.keys()
    }

    pub fn coverage(&self, hex: &HexColor) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.get(hex) as f32 / self.total as f32
    }

    /// Entries sorted by count (descending), then by hex.
    pub fn legend(&self) -> Vec<LegendEntry> {
        let mut legend: Vec<LegendEntry> = self
            .counts
            .iter()
            .map(|(hex, &count)| LegendEntry {
                hex: hex.clone(),
                count,
                coverage: self.coverage(hex),
            })
            .collect();
        legend.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.hex.cmp(&b.hex)));
        legend
    }

    pub(crate) fn increment(&mut self, hex: &HexColor) {
        *self.counts.entry(hex.clone()).or_insert(0) += 1;
        self.total += 1;
    }

    pub(crate) fn decrement(&mut self, hex: &HexColor) {
        match self.counts.get_mut(hex) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(hex);
                }
                self.total -= 1;
            }
            None => {
                log::warn!("Count for {} dropped below zero; ignoring", hex);
            }
        }
    }

    /// Apply one cell change. Equal identities are a no-op.
    pub(crate) fn apply_change(&mut self, old: Option<&HexColor>, new: Option<&HexColor>) {
        if old == new {
            return;
        }
        if let Some(old) = old {
            self.decrement(old);
        }
        if let Some(new) = new {
            self.increment(new);
        }
    }

    /// Check `total == Σ counts` and that no entry is zero.
    pub fn is_consistent(&self) -> bool {
        let sum: u32 = self.counts.values().sum();
        sum == self.total && self.counts.values().all(|&count| count > 0)
    }
}
