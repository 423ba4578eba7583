//! Immutable catalog of bead colors.
//!
//! The registry is built once (from the built-in table or a JSON mapping of
//! display key to hex) and shared read-only. Colors are deduplicated by hex:
//! when two display keys share a hex value the first one wins.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::color::HexColor;
use crate::error::{EngineError, Result};

/// A bead color with its canonical identity and display key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteColor {
    pub hex: HexColor,
    pub display_key: String,
    pub rgb: [u8; 3],
}

impl PaletteColor {
    pub fn new(display_key: &str, hex: HexColor) -> Self {
        let rgb = hex.rgb();
        Self {
            hex,
            display_key: display_key.to_string(),
            rgb,
        }
    }
}

/// Built-in bead catalog.
/// Each entry: (display key, hex)
const BUILTIN_PALETTE: &[(&str, &str)] = &[
    // Whites & Grays
    ("H1", "#FFFFFF"),
    ("H2", "#F1F0EC"),
    ("H3", "#D6D6D2"),
    ("H4", "#B0B0AE"),
    ("H5", "#8A8B8A"),
    ("H6", "#5F6061"),
    ("H7", "#000000"),
    ("H8", "#3A3B3D"),
    // Yellows
    ("A1", "#FAF4C8"),
    ("A2", "#FFFF9A"),
    ("A3", "#FCE840"),
    ("A4", "#FFD700"),
    ("A5", "#F8B500"),
    ("A6", "#FF9C12"),
    // Oranges & Reds
    ("F1", "#FF7F50"),
    ("F2", "#FF5A36"),
    ("F3", "#F0312E"),
    ("F4", "#D21F26"),
    ("F5", "#A8161E"),
    ("F6", "#7A0F16"),
    // Pinks
    ("E1", "#FFD3E0"),
    ("E2", "#FFA6C1"),
    ("E3", "#F46A9B"),
    ("E4", "#E2336F"),
    ("E5", "#B3124F"),
    // Purples
    ("D1", "#E3D3F5"),
    ("D2", "#C3A2E6"),
    ("D3", "#9B6FD1"),
    ("D4", "#6C3FA8"),
    ("D5", "#46217A"),
    // Blues
    ("C1", "#D4F0FF"),
    ("C2", "#9ED8F5"),
    ("C3", "#4FB3E8"),
    ("C4", "#1E88D2"),
    ("C5", "#1257A6"),
    ("C6", "#0B2F6B"),
    // Greens
    ("B1", "#E2F7C9"),
    ("B2", "#B5E67A"),
    ("B3", "#7ACB3E"),
    ("B4", "#3FA535"),
    ("B5", "#1D7A3A"),
    ("B6", "#0F4D2A"),
    ("B7", "#3CC2A8"),
    // Browns & Skin tones
    ("G1", "#FBE3CF"),
    ("G2", "#F2C7A5"),
    ("G3", "#DDA072"),
    ("G4", "#B8743F"),
    ("G5", "#8A4F26"),
    ("G6", "#5A3218"),
];

#[derive(Debug, Clone, Default)]
pub struct PaletteRegistry {
    colors: Vec<PaletteColor>,
    index: HashMap<HexColor, usize>,
}

impl PaletteRegistry {
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_PALETTE.iter().copied())
    }

    /// Build from `(display key, hex)` pairs. Invalid hex values are skipped
    /// with a warning; duplicate hex values keep the first display key.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut registry = Self::default();
        for (key, hex) in entries {
            let hex = match HexColor::parse(hex) {
                Ok(hex) => hex,
                Err(_) => {
                    log::warn!("Invalid hex code \"{}\" for key \"{}\". Skipping.", hex, key);
                    continue;
                }
            };
            if registry.index.contains_key(&hex) {
                log::debug!("Duplicate hex {} for key {}; keeping first entry", hex, key);
                continue;
            }
            registry.index.insert(hex.clone(), registry.colors.len());
            registry.colors.push(PaletteColor::new(key, hex));
        }
        registry
    }

    /// Build from a JSON object mapping display key to hex. Entries are taken
    /// in key order so the registry order is reproducible.
    pub fn from_json(json: &str) -> Result<Self> {
        let mapping: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|err| EngineError::InvalidPaletteFile(err.to_string()))?;
        Ok(Self::from_entries(
            mapping.iter().map(|(key, hex)| (key.as_str(), hex.as_str())),
        ))
    }

    /// All colors in registry order.
    pub fn colors(&self) -> &[PaletteColor] {
        &self.colors
    }

    pub fn get(&self, hex: &HexColor) -> Option<&PaletteColor> {
        self.index.get(hex).map(|&idx| &self.colors[idx])
    }

    pub fn contains(&self, hex: &HexColor) -> bool {
        self.index.contains_key(hex)
    }

    /// Registry-order position, used for deterministic tie-breaks.
    pub fn position(&self, hex: &HexColor) -> Option<usize> {
        self.index.get(hex).copied()
    }

    /// Resolve a hex string to a registry color.
    pub fn lookup(&self, hex: &str) -> Result<&PaletteColor> {
        let parsed = HexColor::parse(hex)?;
        self.get(&parsed)
            .ok_or(EngineError::UnknownColor(parsed))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
