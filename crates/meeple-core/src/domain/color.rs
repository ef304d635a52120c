//! Player display colours.
//!
//! Colours come from configuration either as `#RRGGBB` hex strings or as one
//! of a fixed set of names.  Names are resolved through an explicit table;
//! anything else is an error rather than a silent fallback.
//!
//! A seat's colour is `palette[(seat + offset) % palette.len()]`.  The primary
//! colour uses offset 0; the secondary ("tunnel") colour uses offset 2.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Offset of the secondary colour relative to a seat's primary colour.
pub const SECOND_COLOR_OFFSET: usize = 2;

/// Errors raised while building a palette.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hex colour {0:?}; expected #RRGGBB")]
    InvalidHex(String),
    #[error("unknown colour name {0:?}")]
    UnknownName(String),
    #[error("player palette must contain at least one colour")]
    EmptyPalette,
}

/// An opaque 24-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Named colours accepted in configuration.  Lookup ignores case and `_`.
const NAMED_COLORS: &[(&str, Rgb)] = &[
    ("black", Rgb::new(0, 0, 0)),
    ("blue", Rgb::new(0, 0, 255)),
    ("cyan", Rgb::new(0, 255, 255)),
    ("darkgray", Rgb::new(64, 64, 64)),
    ("gray", Rgb::new(128, 128, 128)),
    ("green", Rgb::new(0, 255, 0)),
    ("lightgray", Rgb::new(192, 192, 192)),
    ("magenta", Rgb::new(255, 0, 255)),
    ("orange", Rgb::new(255, 200, 0)),
    ("pink", Rgb::new(255, 175, 175)),
    ("red", Rgb::new(255, 0, 0)),
    ("white", Rgb::new(255, 255, 255)),
    ("yellow", Rgb::new(255, 255, 0)),
];

/// Parses `#RRGGBB` or a colour name.
///
/// # Errors
///
/// [`ColorError::InvalidHex`] for a malformed hex string,
/// [`ColorError::UnknownName`] for a name not in the table.
pub fn parse_color(value: &str) -> Result<Rgb, ColorError> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(value.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ColorError::InvalidHex(value.to_string()))
        };
        return Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?));
    }

    let key: String = value
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, rgb)| *rgb)
        .ok_or_else(|| ColorError::UnknownName(value.to_string()))
}

/// The ordered list of player colours, loaded once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerPalette {
    colors: Vec<Rgb>,
}

impl PlayerPalette {
    /// # Errors
    ///
    /// [`ColorError::EmptyPalette`] when `colors` is empty.
    pub fn new(colors: Vec<Rgb>) -> Result<Self, ColorError> {
        if colors.is_empty() {
            return Err(ColorError::EmptyPalette);
        }
        Ok(Self { colors })
    }

    /// Builds a palette from configuration strings.
    ///
    /// # Errors
    ///
    /// The first unparseable entry, or [`ColorError::EmptyPalette`].
    pub fn from_names<I, S>(names: I) -> Result<Self, ColorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let colors = names
            .into_iter()
            .map(|n| parse_color(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(colors)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Primary colour of seat `slot`.
    pub fn color_for(&self, slot: u8) -> Rgb {
        self.offset_color(slot, 0)
    }

    /// Secondary colour of seat `slot`.
    pub fn second_color_for(&self, slot: u8) -> Rgb {
        self.offset_color(slot, SECOND_COLOR_OFFSET)
    }

    fn offset_color(&self, slot: u8, offset: usize) -> Rgb {
        self.colors[(usize::from(slot) + offset) % self.colors.len()]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
