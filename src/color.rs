//! Color identities and the fixed RGB distance metric.

use palette::{FromColor, Hsv, Srgb};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use crate::error::EngineError;

/// Canonical color identity: upper-case `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

fn hex_pattern() -> &'static Regex {
    static HEX_PATTERN: OnceLock<Regex> = OnceLock::new();
    HEX_PATTERN.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("static hex pattern"))
}

/// True for strings shaped like `#RRGGBB` (either case).
pub fn is_hex_color(value: &str) -> bool {
    hex_pattern().is_match(value)
}

impl HexColor {
    /// Parse `#RRGGBB` (case-insensitive, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Result<Self, EngineError> {
        let trimmed = value.trim();
        if !is_hex_color(trimmed) {
            return Err(EngineError::InvalidHex(value.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        Self(rgb_to_hex(rgb))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn rgb(&self) -> [u8; 3] {
        let hex = &self.0[1..];
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
        [r, g, b]
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HexColor {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HexColor::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0
    }
}

/// Convert RGB to hex string
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Plain Euclidean distance over 8-bit channels, no gamma or weighting.
pub fn color_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let dr = a[0] as f64 - b[0] as f64;
    let dg = a[1] as f64 - b[1] as f64;
    let db = a[2] as f64 - b[2] as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Index of the closest candidate; ties keep the earliest candidate.
pub fn nearest_index<'a, I>(target: [u8; 3], candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a [u8; 3]>,
{
    let mut best: Option<(usize, f64)> = None;
    for (i, rgb) in candidates.into_iter().enumerate() {
        let dist = color_distance(target, *rgb);
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| i)
}

/// Ordering used for grid color listings: chromatic colors by hue, then
/// near-grays from dark to light.
pub fn compare_by_hue(a: [u8; 3], b: [u8; 3]) -> Ordering {
    let ka = hue_key(a);
    let kb = hue_key(b);
    ka.0.cmp(&kb.0)
        .then(ka.1.partial_cmp(&kb.1).unwrap_or(Ordering::Equal))
        .then(ka.2.partial_cmp(&kb.2).unwrap_or(Ordering::Equal))
}

fn hue_key(rgb: [u8; 3]) -> (bool, f32, f32) {
    let srgb = Srgb::new(
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    );
    let hsv: Hsv = Hsv::from_color(srgb);
    let is_gray = hsv.saturation < 0.1;
    if is_gray {
        (true, hsv.value, 0.0)
    } else {
        (false, hsv.hue.into_positive_degrees(), hsv.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_conversion() {
        assert_eq!(HexColor::parse("#ff0000").unwrap().rgb(), [255, 0, 0]);
        assert_eq!(HexColor::parse(" #00FF00 ").unwrap().as_str(), "#00FF00");
        assert_eq!(HexColor::from_rgb([255, 128, 0]).as_str(), "#FF8000");
        assert_eq!(rgb_to_hex([0, 0, 255]), "#0000FF");
    }

    #[test]
    fn test_rejects_malformed_hex() {
        for bad in ["", "FF0000", "#FFF", "#GG0000", "#FF00001", "T1"] {
            assert!(HexColor::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_serde_round_trip_normalizes() {
        let parsed: HexColor = serde_json::from_str("\"#abcdef\"").unwrap();
        assert_eq!(parsed.as_str(), "#ABCDEF");
        assert!(serde_json::from_str::<HexColor>("\"red\"").is_err());
    }

    #[test]
    fn test_distance_is_plain_euclidean() {
        assert_eq!(color_distance([0, 0, 0], [0, 0, 0]), 0.0);
        let d = color_distance([0, 0, 0], [10, 10, 10]);
        assert!((d - 17.3205).abs() < 1e-3);
        assert_eq!(color_distance([0, 0, 0], [3, 4, 0]), 5.0);
    }

    #[test]
    fn test_nearest_prefers_first_on_tie() {
        let candidates = [[10, 0, 0], [0, 10, 0], [200, 200, 200]];
        assert_eq!(nearest_index([0, 0, 0], candidates.iter()), Some(0));
        assert_eq!(nearest_index([190, 190, 190], candidates.iter()), Some(2));
        assert_eq!(nearest_index([0, 0, 0], [].iter()), None);
    }

    #[test]
    fn test_hue_ordering_puts_grays_last() {
        let mut colors = vec![[255, 255, 255], [0, 0, 255], [255, 0, 0], [0, 0, 0], [0, 255, 0]];
        colors.sort_by(|a, b| compare_by_hue(*a, *b));
        assert_eq!(
            colors,
            vec![[255, 0, 0], [0, 255, 0], [0, 0, 255], [0, 0, 0], [255, 255, 255]]
        );
    }
}
