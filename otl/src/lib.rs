//! An OpenType GSUB/GPOS shaping engine and LookupList/cmap codec.
//!
//! This crate covers four things: the GSUB/GPOS shaping engine
//! ([`engine`]), the LookupList binary codec shared by both tables
//! ([`codec::lookuplist`]), the cmap format 4 / format 12 codec
//! ([`codec::cmap`]), and the in-memory subtable models those codecs
//! produce ([`gsub`], [`gpos`], [`context`]).
//!
//! Everything else an OpenType font needs -- the sfnt directory, the other
//! tables (head, hhea, hmtx, maxp, name, post, OS/2, cvt, fpgm, prep,
//! gasp), outline parsing, hinting execution, bidi/script itemization,
//! justification, vertical writing, variations, color fonts and CFF2 -- is
//! out of scope. GDEF is modeled only to the extent the engine consults it
//! (see [`gdef`]); it is otherwise an out-of-scope collaborator.

pub mod classdef;
pub mod codec;
pub mod context;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod gdef;
pub mod glyph;
pub mod gpos;
pub mod gsub;
pub mod keep;
pub mod lookup;
pub mod matching;
pub mod value_record;

pub use classdef::ClassDef;
pub use coverage::Coverage;
pub use engine::Engine;
pub use error::{Error, Result};
pub use gdef::Gdef;
pub use glyph::{GlyphClass, GlyphEntry, GlyphText};
pub use gpos::GposSubtable;
pub use gsub::GsubSubtable;
pub use keep::{Keep, LookupFlag};
pub use lookup::{Lookup, LookupIndex, LookupList, Subtable};
pub use matching::{Match, NestedLookup};
pub use value_record::{ValueFormat, ValueRecord};
