//! The value every subtable matcher produces.

use crate::glyph::GlyphEntry;

/// A reference to a nested lookup, as carried by a contextual rule.
///
/// `sequence_index` addresses `Match::input_positions`, not the raw glyph
/// sequence -- the engine resolves it once it knows where the match landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NestedLookup {
    pub sequence_index: u16,
    pub lookup_index: u16,
}

/// The result of a subtable successfully matching at some position.
#[derive(Clone, Debug, PartialEq)]
pub struct Match {
    /// Strictly increasing sequence indices consumed by this match.
    pub input_positions: Vec<usize>,
    /// `Some` for GSUB matches that replace glyphs outright; `None` for
    /// GPOS matches (which only adjust offsets/advances in place) and for
    /// contextual matches (which carry `actions` instead).
    pub replace: Option<Vec<GlyphEntry>>,
    /// Nested lookups to run, in rule order, for contextual matches.
    pub actions: Vec<NestedLookup>,
    /// The sequence index to resume scanning from after this match.
    pub next: usize,
}

impl Match {
    pub fn simple(input_positions: Vec<usize>, next: usize) -> Self {
        Match {
            input_positions,
            replace: None,
            actions: Vec::new(),
            next,
        }
    }

    pub fn replacing(input_positions: Vec<usize>, replace: Vec<GlyphEntry>, next: usize) -> Self {
        Match {
            input_positions,
            replace: Some(replace),
            actions: Vec::new(),
            next,
        }
    }

    pub fn contextual(
        input_positions: Vec<usize>,
        actions: Vec<NestedLookup>,
        next: usize,
    ) -> Self {
        Match {
            input_positions,
            replace: None,
            actions,
            next,
        }
    }
}
