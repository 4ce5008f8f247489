//! Subsets a font down to a caller-supplied glyph set.
//!
//! Given the source font's GSUB LookupList, cmap subtables and an ordered
//! list of glyphs to keep, this crate:
//!
//! 1. Expands that list to its transitive dependencies ([`closure`]):
//!    composite TrueType components and GSUB-4 ligature outputs.
//! 2. Assigns new glyph ids in (caller prefix, then closure order)
//!    ([`gidmap`]).
//! 3. Rewrites cmap ([`cmap`]), GSUB ([`gsub`]) and GPOS ([`gpos`])
//!    through the resulting map, dropping anything that referenced a
//!    glyph the subset doesn't retain.
//! 4. Exposes narrow collaborator interfaces ([`outline`]) for the two
//!    outline formats this crate does not itself parse, `glyf` and `CFF`.
//!
//! [`plan::Plan`] is the entry point that ties these together; the
//! individual modules are public for callers that only need one step.

pub mod closure;
pub mod cmap;
pub mod error;
pub mod gidmap;
pub mod gpos;
pub mod gsub;
pub mod outline;
pub mod plan;

pub use closure::{closure, GlyphComponents, NoComposites};
pub use error::{Result, SubsetError};
pub use gidmap::GidMap;
pub use plan::{Plan, SubsetInput};
