//! Errors the subsetter can return, built with `thiserror` like `otl::Error`
//! underneath it. This crate's own variants cover the subsetter-specific
//! surface (bad gid lists, retained glyphs that collide with reserved ones)
//! and wrap the codec's errors transparently via `Codec`.

use font_types::GlyphId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubsetError {
    #[error("retain list is empty; glyph 0 (.notdef) must always be retained")]
    EmptyRetainList,

    #[error("retain list must start with .notdef (glyph 0), found {0:?} at index 0")]
    MissingNotdef(GlyphId),

    #[error("retain list contains glyph {0:?} more than once")]
    DuplicateGlyph(GlyphId),

    #[error("closure exceeded {0} rounds without reaching a fixed point")]
    ClosureDidNotConverge(usize),

    #[error(transparent)]
    Codec(#[from] otl::Error),
}

pub type Result<T> = std::result::Result<T, SubsetError>;
