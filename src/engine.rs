//! The pattern engine: one owner for the live grid, the color selections,
//! the excluded set and the active tool.
//!
//! Every public mutator either completes or returns an error with the engine
//! exactly as it was. Full regenerations are computed off to the side and
//! only committed once they succeed.

use image::RgbaImage;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::color::HexColor;
use crate::error::{EngineError, Result};
use crate::exclusion::{ExclusionReport, Exclusions};
use crate::grid::{CellColor, Grid};
use crate::mapper::{InitialMapper, PaletteMapper, Source};
use crate::merge::MergeReport;
use crate::pipeline::{self, RegenerateParams, Regeneration, RequestKey};
use crate::region::{self, BackgroundRemoval};
use crate::registry::{PaletteColor, PaletteRegistry};
use crate::selection::{
    active_palette, validate_selections, PaletteSelections, SelectionValidation,
};
use crate::stats::{ColorCounts, LegendEntry};
use crate::store::GridStore;
use crate::tool::{ClickOutcome, ReplaceStep, SelectedArea, ToolMode};

pub struct PatternEngine {
    registry: Arc<PaletteRegistry>,
    mapper: Box<dyn InitialMapper>,
    selections: PaletteSelections,
    excluded: Exclusions,
    source: Option<Source>,
    params: RegenerateParams,
    store: Option<GridStore>,
    request_key: Option<RequestKey>,
    last_merge: MergeReport,
    tool: ToolMode,
}

impl PatternEngine {
    pub fn new(registry: Arc<PaletteRegistry>) -> Self {
        Self::with_mapper(registry, Box::new(PaletteMapper))
    }

    pub fn with_mapper(registry: Arc<PaletteRegistry>, mapper: Box<dyn InitialMapper>) -> Self {
        let selections = PaletteSelections::all(&registry);
        Self {
            registry,
            mapper,
            selections,
            excluded: Exclusions::default(),
            source: None,
            params: RegenerateParams::default(),
            store: None,
            request_key: None,
            last_merge: MergeReport::default(),
            tool: ToolMode::Idle,
        }
    }

    // ---- sources & regeneration ----

    pub fn load_image(&mut self, image: RgbaImage, params: RegenerateParams) -> Result<()> {
        self.load_source(Source::image(image)?, params)
    }

    pub fn load_image_bytes(&mut self, bytes: &[u8], params: RegenerateParams) -> Result<()> {
        self.load_source(Source::decode(bytes)?, params)
    }

    /// Use a caller-supplied grid as the source. Its cells are snapped to the
    /// active palette and merged like an image would be.
    pub fn load_grid(&mut self, grid: Grid, params: RegenerateParams) -> Result<()> {
        self.load_source(Source::Grid(grid), params)
    }

    fn load_source(&mut self, source: Source, params: RegenerateParams) -> Result<()> {
        let excluded = Exclusions::default();
        let regeneration = self.build(&source, &params, &self.selections, &excluded)?;
        self.source = Some(source);
        self.params = params;
        self.excluded = excluded;
        self.commit(regeneration);
        Ok(())
    }

    pub fn set_params(&mut self, params: RegenerateParams) -> Result<()> {
        let source = self.source.as_ref().ok_or(EngineError::NoSource)?;
        let regeneration = self.build(source, &params, &self.selections, &self.excluded)?;
        self.params = params;
        self.commit(regeneration);
        Ok(())
    }

    /// Full regeneration from the current source and parameters.
    pub fn regenerate(&mut self) -> Result<()> {
        let source = self.source.as_ref().ok_or(EngineError::NoSource)?;
        let regeneration = self.build(source, &self.params, &self.selections, &self.excluded)?;
        self.commit(regeneration);
        Ok(())
    }

    fn build(
        &self,
        source: &Source,
        params: &RegenerateParams,
        selections: &PaletteSelections,
        excluded: &Exclusions,
    ) -> Result<Regeneration> {
        let palette = active_palette(&self.registry, selections, excluded);
        pipeline::regenerate(self.mapper.as_ref(), source, params, &palette, &self.registry)
    }

    fn commit(&mut self, regeneration: Regeneration) {
        self.store = Some(regeneration.store);
        self.request_key = Some(regeneration.key);
        self.last_merge = regeneration.merge;
        self.tool = ToolMode::Idle;
    }

    fn store_mut(&mut self) -> Result<&mut GridStore> {
        self.store.as_mut().ok_or(EngineError::NotRegenerated)
    }

    fn store_ref(&self) -> Result<&GridStore> {
        self.store.as_ref().ok_or(EngineError::NotRegenerated)
    }

    // ---- exclusion ----

    pub fn exclude(&mut self, hex: &HexColor) -> Result<ExclusionReport> {
        let report = self
            .excluded
            .exclude(self.store.as_mut(), &self.registry, hex)?;
        self.tool = ToolMode::Idle;
        Ok(report)
    }

    /// Re-admit an excluded color. Always a full regeneration.
    pub fn include(&mut self, hex: &HexColor) -> Result<()> {
        self.excluded.include(hex)?;
        let Some(source) = self.source.as_ref() else {
            self.tool = ToolMode::Idle;
            return Ok(());
        };
        match self.build(source, &self.params, &self.selections, &self.excluded) {
            Ok(regeneration) => {
                log::info!("Included {}; regenerated", hex);
                self.commit(regeneration);
                Ok(())
            }
            Err(err) => {
                self.excluded.restore(hex.clone());
                Err(err)
            }
        }
    }

    // ---- region edits ----

    pub fn erase(&mut self, row: usize, col: usize) -> Result<usize> {
        region::erase(self.store_mut()?, row, col)
    }

    pub fn replace_color(&mut self, source: &HexColor, target: &HexColor) -> Result<usize> {
        let registry = Arc::clone(&self.registry);
        region::replace_color(self.store_mut()?, &registry, source, target)
    }

    pub fn auto_remove_background(&mut self) -> Result<BackgroundRemoval> {
        region::auto_remove_background(self.store_mut()?)
    }

    pub fn paint(&mut self, row: usize, col: usize, color: &CellColor) -> Result<bool> {
        let registry = Arc::clone(&self.registry);
        region::paint(self.store_mut()?, &registry, row, col, color)
    }

    // ---- selections ----

    /// Replace the enabled color set and regenerate if a source is loaded.
    pub fn set_selections(&mut self, selections: PaletteSelections) -> Result<()> {
        if let Some(source) = self.source.as_ref() {
            let regeneration = self.build(source, &self.params, &selections, &self.excluded)?;
            self.commit(regeneration);
        }
        self.selections = selections;
        self.tool = ToolMode::Idle;
        Ok(())
    }

    /// Apply persisted selections after dropping malformed or unknown keys.
    pub fn load_selections(&mut self, raw: &HashMap<String, bool>) -> Result<SelectionValidation> {
        let validation = validate_selections(raw, &self.registry);
        self.set_selections(validation.selections.clone())?;
        Ok(validation)
    }

    pub fn set_color_enabled(&mut self, hex: &HexColor, enabled: bool) -> Result<()> {
        if !self.registry.contains(hex) {
            return Err(EngineError::UnknownColor(hex.clone()));
        }
        let mut selections = self.selections.clone();
        selections.set(hex.clone(), enabled);
        self.set_selections(selections)
    }

    // ---- tool modes ----

    pub fn enter_erase(&mut self) -> Result<()> {
        self.store_ref()?;
        self.tool = ToolMode::Erase;
        Ok(())
    }

    pub fn enter_color_replace(&mut self) -> Result<()> {
        self.store_ref()?;
        self.tool = ToolMode::color_replace();
        Ok(())
    }

    pub fn enter_manual_coloring(&mut self, brush: Option<CellColor>) -> Result<()> {
        self.store_ref()?;
        if let Some(CellColor::Color(hex)) = &brush {
            if !self.registry.contains(hex) {
                return Err(EngineError::UnknownColor(hex.clone()));
            }
        }
        self.tool = ToolMode::ManualColoring { brush };
        Ok(())
    }

    pub fn enter_region_select(&mut self) -> Result<()> {
        self.store_ref()?;
        self.tool = ToolMode::region_select();
        Ok(())
    }

    pub fn exit_tool(&mut self) {
        self.tool = ToolMode::Idle;
    }

    /// Route a click on `(row, col)` through the active tool.
    pub fn click(&mut self, row: usize, col: usize) -> Result<ClickOutcome> {
        let store = self.store_ref()?;
        let idx = store.grid().index_of(row, col)?;
        let cell = store.grid().cell_at(idx).clone();

        match self.tool.clone() {
            ToolMode::Idle | ToolMode::ManualColoring { brush: None } => {
                Ok(ClickOutcome::Inspected { cell })
            }
            ToolMode::ManualColoring { brush: Some(color) } => {
                let changed = self.paint(row, col, &color)?;
                Ok(ClickOutcome::Painted { changed })
            }
            ToolMode::Erase => {
                let cells = self.erase(row, col)?;
                self.tool = ToolMode::ManualColoring { brush: None };
                Ok(ClickOutcome::Erased { cells })
            }
            ToolMode::ColorReplace(_) => {
                let source = cell.counted().cloned().ok_or_else(|| {
                    EngineError::InvalidTransition(format!(
                        "cell ({}, {}) has no color to replace",
                        row, col
                    ))
                })?;
                self.tool = ToolMode::ColorReplace(ReplaceStep::SelectTarget {
                    source: source.clone(),
                });
                Ok(ClickOutcome::SourceSelected { source })
            }
            ToolMode::RegionSelect { anchor: None, .. } => {
                self.tool = ToolMode::RegionSelect {
                    anchor: Some((row, col)),
                    area: None,
                };
                Ok(ClickOutcome::AnchorSet { row, col })
            }
            ToolMode::RegionSelect {
                anchor: Some(anchor),
                ..
            } => {
                let area = SelectedArea::from_corners(anchor, (row, col));
                self.tool = ToolMode::RegionSelect {
                    anchor: None,
                    area: Some(area),
                };
                Ok(ClickOutcome::AreaSelected { area })
            }
        }
    }

    /// Finish a color replace by picking the target color.
    pub fn choose_replacement(&mut self, target: &HexColor) -> Result<usize> {
        let source = match &self.tool {
            ToolMode::ColorReplace(ReplaceStep::SelectTarget { source }) => source.clone(),
            other => {
                return Err(EngineError::InvalidTransition(format!(
                    "no replace source selected (tool is {:?})",
                    other
                )))
            }
        };
        let replaced = self.replace_color(&source, target)?;
        self.tool = ToolMode::ManualColoring { brush: None };
        Ok(replaced)
    }

    // ---- queries ----

    pub fn registry(&self) -> &PaletteRegistry {
        &self.registry
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn params(&self) -> &RegenerateParams {
        &self.params
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.store.as_ref().map(GridStore::grid)
    }

    pub fn counts(&self) -> Option<&ColorCounts> {
        self.store.as_ref().map(GridStore::counts)
    }

    pub fn total(&self) -> u32 {
        self.store.as_ref().map_or(0, GridStore::total)
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        self.counts().map(ColorCounts::legend).unwrap_or_default()
    }

    pub fn initial_colors(&self) -> Option<&BTreeSet<HexColor>> {
        self.store.as_ref().map(GridStore::initial_colors)
    }

    /// Colors currently in the grid, ordered by hue.
    pub fn grid_colors(&self) -> Vec<PaletteColor> {
        self.store
            .as_ref()
            .map(|store| store.grid_colors_by_hue(&self.registry))
            .unwrap_or_default()
    }

    pub fn excluded(&self) -> &Exclusions {
        &self.excluded
    }

    pub fn selections(&self) -> &PaletteSelections {
        &self.selections
    }

    pub fn active_palette(&self) -> Vec<PaletteColor> {
        active_palette(&self.registry, &self.selections, &self.excluded)
    }

    pub fn tool(&self) -> &ToolMode {
        &self.tool
    }

    pub fn request_key(&self) -> Option<&RequestKey> {
        self.request_key.as_ref()
    }

    pub fn last_merge(&self) -> &MergeReport {
        &self.last_merge
    }
}
