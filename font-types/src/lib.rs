//! Common scalar data types used by the OpenType layout engine.
//!
//! This is a deliberately small slice of the usual sfnt scalar zoo: just
//! enough to talk about glyphs without dragging in the table-directory,
//! script/feature-tag and variation machinery that the layout engine never
//! touches.

#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::doc_markdown)]

mod glyph_id;

pub use glyph_id::GlyphId;
