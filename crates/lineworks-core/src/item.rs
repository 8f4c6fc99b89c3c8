//! Items moving through the line and the colours they carry.

use std::fmt;

use rand::Rng;
use serde::{Serialize, Serializer};

use crate::id::ItemId;

/// Display colour of an item or of the worker currently holding one.
///
/// Rendered as `#RRGGBB`; the neutral colour of an empty-handed worker
/// renders as `GRAY`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Color {
    /// No item held.
    #[default]
    Neutral,
    /// An item colour.
    Rgb {
        /// Red channel.
        r: u8,
        /// Green channel.
        g: u8,
        /// Blue channel.
        b: u8,
    },
}

impl Color {
    /// Draw a uniformly random item colour.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::Rgb {
            r: rng.gen(),
            g: rng.gen(),
            b: rng.gen(),
        }
    }

    /// Whether this is the neutral (empty-handed) colour.
    pub fn is_neutral(&self) -> bool {
        matches!(self, Self::Neutral)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neutral => f.write_str("GRAY"),
            Self::Rgb { r, g, b } => write!(f, "#{r:02X}{g:02X}{b:02X}"),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An immutable unit of work.
///
/// Cloning an item is how fan-out works: each output buffer of a worker
/// receives its own copy with the same id and colour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    color: Color,
}

impl Item {
    /// Create an item.
    pub fn new(id: ItemId, color: Color) -> Self {
        Self { id, color }
    }

    /// The item's sequence number.
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// The item's colour.
    pub fn color(&self) -> Color {
        self.color
    }
}
