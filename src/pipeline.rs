//! Full regeneration: initial mapping, global merge, recount and snapshot.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Instant;

use crate::error::{EngineError, Result};
use crate::mapper::{choose_fallback, InitialMapper, PixelationMode, Source};
use crate::merge::{merge_similar_colors, MergeReport};
use crate::registry::{PaletteColor, PaletteRegistry};
use crate::store::GridStore;

const REQUEST_KEY_VERSION: u8 = 1;

pub const DEFAULT_GRANULARITY: u32 = 50;
/// Upper bound on grid columns; keeps image grids around 300x300 beads.
pub const MAX_GRANULARITY: u32 = 300;
pub const DEFAULT_THRESHOLD: f64 = 30.0;

/// Knobs for a full regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegenerateParams {
    /// Grid columns for image sources.
    pub granularity: u32,
    /// Merge distance; colors strictly closer than this are consolidated.
    pub threshold: f64,
    pub mode: PixelationMode,
}

impl Default for RegenerateParams {
    fn default() -> Self {
        Self {
            granularity: DEFAULT_GRANULARITY,
            threshold: DEFAULT_THRESHOLD,
            mode: PixelationMode::Dominant,
        }
    }
}

impl RegenerateParams {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_GRANULARITY).contains(&self.granularity) {
            return Err(EngineError::InvalidParams(format!(
                "granularity must be between 1 and {}, got {}",
                MAX_GRANULARITY, self.granularity
            )));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(EngineError::InvalidParams(format!(
                "threshold must be a finite value >= 0, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Fingerprint of everything a regeneration depends on. Two requests with the
/// same key produce the same grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(source: &Source, params: &RegenerateParams, palette: &[PaletteColor]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([REQUEST_KEY_VERSION]);
        hasher.update(source.fingerprint().as_bytes());
        hasher.update(params.granularity.to_le_bytes());
        hasher.update(params.threshold.to_le_bytes());
        hasher.update([match params.mode {
            PixelationMode::Dominant => 0,
            PixelationMode::Average => 1,
        }]);
        for color in palette {
            hasher.update(color.hex.as_str().as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A freshly regenerated grid with its counts and initial color set.
#[derive(Debug, Clone)]
pub struct Regeneration {
    pub store: GridStore,
    pub merge: MergeReport,
    pub key: RequestKey,
}

pub fn regenerate(
    mapper: &dyn InitialMapper,
    source: &Source,
    params: &RegenerateParams,
    palette: &[PaletteColor],
    registry: &PaletteRegistry,
) -> Result<Regeneration> {
    let total_start = Instant::now();
    params.validate()?;
    let Some(fallback) = choose_fallback(palette) else {
        log::warn!("Cannot regenerate: the active palette is empty");
        return Err(EngineError::EmptyPalette);
    };

    let (width, height) = source.grid_dimensions(params.granularity);
    let map_start = Instant::now();
    let mut grid = mapper.map_initial(source, width, height, palette, params.mode, fallback)?;
    let map_ms = map_start.elapsed().as_millis() as u64;

    let merge = merge_similar_colors(&mut grid, params.threshold, registry);
    let store = GridStore::new(grid);

    log::info!(
        "Regenerated {}x{} grid: {} colors, {} beads (map {}ms, total {}ms)",
        width,
        height,
        store.counts().len(),
        store.total(),
        map_ms,
        total_start.elapsed().as_millis()
    );
    Ok(Regeneration {
        store,
        merge,
        key: RequestKey::new(source, params, palette),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::mapper::PaletteMapper;
    use crate::test_support::{grid_of, hex, letter_registry};

    struct FailingMapper;

    impl InitialMapper for FailingMapper {
        fn map_initial(
            &self,
            _source: &Source,
            _width: usize,
            _height: usize,
            _palette: &[PaletteColor],
            _mode: PixelationMode,
            _fallback: &PaletteColor,
        ) -> Result<Grid> {
            panic!("mapper must not run");
        }
    }

    #[test]
    fn test_params_defaults_and_validation() {
        let params: RegenerateParams = serde_json::from_str(r#"{"threshold": 12.5}"#).unwrap();
        assert_eq!(params.granularity, 50);
        assert_eq!(params.threshold, 12.5);
        assert_eq!(params.mode, PixelationMode::Dominant);

        let bad = RegenerateParams {
            granularity: 0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(EngineError::InvalidParams(_))));
        let huge = RegenerateParams {
            granularity: 1_000_000,
            ..Default::default()
        };
        assert!(matches!(huge.validate(), Err(EngineError::InvalidParams(_))));
        let largest = RegenerateParams {
            granularity: MAX_GRANULARITY,
            ..Default::default()
        };
        assert!(largest.validate().is_ok());
        let bad = RegenerateParams {
            threshold: f64::NAN,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_empty_palette_fails_before_mapping() {
        let source = Source::Grid(grid_of(&["A"]));
        let result = regenerate(
            &FailingMapper,
            &source,
            &RegenerateParams::default(),
            &[],
            &letter_registry(),
        );
        assert!(matches!(result, Err(EngineError::EmptyPalette)));
    }

    #[test]
    fn test_regenerate_maps_merges_and_snapshots() {
        let registry = letter_registry();
        let palette = registry.colors().to_vec();
        // A (#AAAAAA) and B (#BBBBBB) are ~29.4 apart; A is more frequent.
        let source = Source::Grid(grid_of(&["A A B", "A F X"]));
        let regeneration = regenerate(
            &PaletteMapper,
            &source,
            &RegenerateParams::default(),
            &palette,
            &registry,
        )
        .unwrap();

        let store = &regeneration.store;
        assert_eq!(store.counts().get(&hex("#AAAAAA")), 4);
        assert_eq!(store.counts().get(&hex("#FFFFFF")), 1);
        assert_eq!(store.total(), 5);
        assert_eq!(store.initial_colors().len(), 2);
        assert_eq!(regeneration.merge.absorbed.len(), 1);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_request_key_tracks_inputs() {
        let registry = letter_registry();
        let palette = registry.colors().to_vec();
        let source = Source::Grid(grid_of(&["A B"]));
        let params = RegenerateParams::default();

        let key = RequestKey::new(&source, &params, &palette);
        assert_eq!(key, RequestKey::new(&source, &params, &palette));
        assert_eq!(key.as_str().len(), 64);

        let tighter = RegenerateParams {
            threshold: 5.0,
            ..params
        };
        assert_ne!(key, RequestKey::new(&source, &tighter, &palette));
        assert_ne!(key, RequestKey::new(&source, &params, &palette[1..]));
    }
}
