//! Which palette colors the user has enabled, and the palette file format
//! used to share that choice.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::color::{is_hex_color, HexColor};
use crate::error::{EngineError, Result};
use crate::exclusion::Exclusions;
use crate::registry::{PaletteColor, PaletteRegistry};

pub const PALETTE_FILE_VERSION: &str = "3.0";

/// Enabled flag per palette color. Colors without an entry are disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaletteSelections {
    enabled: BTreeMap<HexColor, bool>,
}

impl PaletteSelections {
    /// Every registry color enabled.
    pub fn all(registry: &PaletteRegistry) -> Self {
        Self::only(registry, |_| true)
    }

    fn only(registry: &PaletteRegistry, keep: impl Fn(&HexColor) -> bool) -> Self {
        let enabled = registry
            .colors()
            .iter()
            .map(|color| (color.hex.clone(), keep(&color.hex)))
            .collect();
        Self { enabled }
    }

    pub fn is_enabled(&self, hex: &HexColor) -> bool {
        self.enabled.get(hex).copied().unwrap_or(false)
    }

    pub fn set(&mut self, hex: HexColor, enabled: bool) {
        self.enabled.insert(hex, enabled);
    }

    pub fn enabled(&self) -> impl Iterator<Item = &HexColor> {
        self.enabled
            .iter()
            .filter(|(_, &on)| on)
            .map(|(hex, _)| hex)
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }
}

/// Outcome of validating persisted selections.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionValidation {
    pub selections: PaletteSelections,
    /// Keys that were malformed or not registry colors.
    pub dropped: usize,
    /// Nothing valid was found and every color was enabled instead.
    pub fell_back: bool,
}

/// Keep only well-formed keys naming registry colors (case-insensitive).
pub fn validate_selections(
    raw: &HashMap<String, bool>,
    registry: &PaletteRegistry,
) -> SelectionValidation {
    let mut selections = PaletteSelections::default();
    let mut dropped = 0;
    for (key, &enabled) in raw {
        let known = if is_hex_color(key) {
            HexColor::parse(key).ok().filter(|hex| registry.contains(hex))
        } else {
            None
        };
        match known {
            Some(hex) => selections.set(hex, enabled),
            None => dropped += 1,
        }
    }

    let fell_back = selections.enabled.is_empty();
    if fell_back {
        if !raw.is_empty() {
            log::warn!("No valid palette selections found; enabling every color");
        }
        selections = PaletteSelections::all(registry);
    } else if dropped > 0 {
        log::info!(
            "Loaded {} palette selections, dropped {} invalid keys",
            selections.enabled.len(),
            dropped
        );
    }

    SelectionValidation {
        selections,
        dropped,
        fell_back,
    }
}

/// Enabled colors minus exclusions, in registry order.
pub fn active_palette(
    registry: &PaletteRegistry,
    selections: &PaletteSelections,
    excluded: &Exclusions,
) -> Vec<PaletteColor> {
    registry
        .colors()
        .iter()
        .filter(|color| selections.is_enabled(&color.hex) && !excluded.contains(&color.hex))
        .cloned()
        .collect()
}

/// Shareable palette selection file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteFile {
    pub version: String,
    pub selected_hex_values: Vec<String>,
    pub export_date: String,
    pub total_colors: usize,
}

fn now_timestamp() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0);
    millis.to_string()
}

pub fn export_palette_file(selections: &PaletteSelections) -> Result<String> {
    let selected_hex_values: Vec<String> =
        selections.enabled().map(|hex| hex.to_string()).collect();
    if selected_hex_values.is_empty() {
        return Err(EngineError::EmptySelection);
    }

    let file = PaletteFile {
        version: PALETTE_FILE_VERSION.to_string(),
        total_colors: selected_hex_values.len(),
        selected_hex_values,
        export_date: now_timestamp(),
    };
    serde_json::to_string_pretty(&file).map_err(|e| EngineError::InvalidPaletteFile(e.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteImport {
    pub selections: PaletteSelections,
    pub imported: usize,
    /// Entries that are not registry colors, as written in the file.
    pub invalid: Vec<String>,
}

/// Read a palette file. Only `selectedHexValues` is required; everything
/// not listed ends up disabled.
pub fn import_palette_file(json: &str, registry: &PaletteRegistry) -> Result<PaletteImport> {
    let data: serde_json::Value =
        serde_json::from_str(json).map_err(|e| EngineError::InvalidPaletteFile(e.to_string()))?;
    let values = data
        .get("selectedHexValues")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            EngineError::InvalidPaletteFile("missing 'selectedHexValues' array".to_string())
        })?;

    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for value in values {
        let hex = value
            .as_str()
            .and_then(|s| HexColor::parse(s).ok())
            .filter(|hex| registry.contains(hex));
        match hex {
            Some(hex) => valid.push(hex),
            None => invalid.push(match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            }),
        }
    }

    if !invalid.is_empty() {
        log::warn!("Ignored invalid colors in palette file: {}", invalid.join(", "));
    }
    if valid.is_empty() {
        return Err(EngineError::InvalidPaletteFile(
            "file contains no valid colors".to_string(),
        ));
    }

    let selections = PaletteSelections::only(registry, |hex| valid.contains(hex));
    log::info!("Imported {} palette colors", selections.enabled_count());
    Ok(PaletteImport {
        imported: selections.enabled_count(),
        selections,
        invalid,
    })
}
