use thiserror::Error;

use crate::color::HexColor;

/// Broad category of an [`EngineError`], used by callers to pick a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The operation would break an engine invariant and was refused.
    InvariantViolation,
    /// The operation needs a completed full regeneration first.
    PreconditionNotMet,
    /// Regeneration was requested with zero active colors.
    EmptyPalette,
    /// Bad argument from the caller.
    InvalidInput,
    /// Background removal found no candidate color on the border.
    NoBackground,
    /// Background removal found nothing to remove.
    NothingRemovable,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("cannot exclude {0}: no other color from the original image remains to take its place")]
    NoRemapTarget(HexColor),

    #[error("no pattern has been generated yet")]
    NotRegenerated,

    #[error("no image or grid has been loaded")]
    NoSource,

    #[error("the active palette is empty; restore some excluded or disabled colors")]
    EmptyPalette,

    #[error("color {0} is not in the palette")]
    UnknownColor(HexColor),

    #[error("invalid hex color '{0}'")]
    InvalidHex(String),

    #[error("cell ({row}, {col}) is outside the {width}x{height} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },

    #[error("cell ({row}, {col}) cannot be erased")]
    NotErasable { row: usize, col: usize },

    #[error("cell ({row}, {col}) cannot be painted")]
    NotPaintable { row: usize, col: usize },

    #[error("color {0} is already excluded")]
    AlreadyExcluded(HexColor),

    #[error("color {0} is not excluded")]
    NotExcluded(HexColor),

    #[error("grid is {actual_width}x{actual_height}, expected {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("invalid palette file: {0}")]
    InvalidPaletteFile(String),

    #[error("no colors are selected")]
    EmptySelection,

    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("no background color detected on the grid border")]
    NoBackground,

    #[error("no removable background region found")]
    NothingRemovable,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NoRemapTarget(_) => ErrorKind::InvariantViolation,
            EngineError::NotRegenerated | EngineError::NoSource => ErrorKind::PreconditionNotMet,
            EngineError::EmptyPalette => ErrorKind::EmptyPalette,
            EngineError::NoBackground => ErrorKind::NoBackground,
            EngineError::NothingRemovable => ErrorKind::NothingRemovable,
            _ => ErrorKind::InvalidInput,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let hex = HexColor::parse("#112233").unwrap();
        assert_eq!(
            EngineError::NoRemapTarget(hex.clone()).kind(),
            ErrorKind::InvariantViolation
        );
        assert_eq!(EngineError::NotRegenerated.kind(), ErrorKind::PreconditionNotMet);
        assert_eq!(EngineError::EmptyPalette.kind(), ErrorKind::EmptyPalette);
        assert_eq!(EngineError::UnknownColor(hex).kind(), ErrorKind::InvalidInput);
        assert_eq!(EngineError::NothingRemovable.kind(), ErrorKind::NothingRemovable);
    }

    #[test]
    fn test_messages_name_the_color() {
        let hex = HexColor::parse("#abcdef").unwrap();
        let message = EngineError::NoRemapTarget(hex).to_string();
        assert!(message.contains("#ABCDEF"));
    }
}
