//! Ties the closure, gid-allocation and table-rewrite steps together into
//! the single entry point most callers want.

use font_types::GlyphId;
use otl::{GposSubtable, GsubSubtable, LookupList};

use crate::closure::{closure, GlyphComponents};
use crate::error::{Result, SubsetError};
use crate::gidmap::GidMap;

/// Everything the subsetter needs from the caller: the glyphs to retain,
/// in the order they should appear in the output, plus whichever GSUB
/// LookupList governs ligature closure (if the font has one).
///
/// `retain` must start with `.notdef` (glyph 0); the subsetter's own
/// invariant -- it never reorders this prefix or drops `.notdef` -- is
/// only as good as the caller upholding that on input.
pub struct SubsetInput<'a> {
    pub retain: &'a [GlyphId],
    pub components: &'a dyn GlyphComponents,
    pub gsub: Option<&'a LookupList<GsubSubtable>>,
}

/// The result of running closure: the gid map a caller feeds into
/// [`crate::cmap::rewrite_cmap_subtable`], [`crate::gsub::rewrite_gsub`]
/// and [`crate::gpos::rewrite_gpos`], plus the glyph count of the subset
/// font (`gids.len()`).
pub struct Plan {
    pub gids: GidMap,
}

impl Plan {
    /// Validate `input.retain`, run closure to a fixed point, and assign
    /// new gids in (caller prefix, then closure order).
    pub fn build(input: &SubsetInput) -> Result<Self> {
        validate_retain_list(input.retain)?;

        let retained = closure(input.retain, input.components, input.gsub)?;

        let mut gids = GidMap::with_capacity(retained.len());
        for gid in retained {
            gids.add(gid);
        }
        Ok(Plan { gids })
    }

    pub fn rewrite_gsub(&self, list: &LookupList<GsubSubtable>) -> LookupList<GsubSubtable> {
        crate::gsub::rewrite_gsub(list, &self.gids)
    }

    pub fn rewrite_gpos(&self, list: &LookupList<GposSubtable>) -> LookupList<GposSubtable> {
        crate::gpos::rewrite_gpos(list, &self.gids)
    }

    pub fn rewrite_cmap_subtable(&self, format: u16, data: &[u8]) -> Result<(u16, Vec<u8>)> {
        crate::cmap::rewrite_cmap_subtable(format, data, &self.gids)
    }
}

fn validate_retain_list(retain: &[GlyphId]) -> Result<()> {
    let Some(&first) = retain.first() else {
        return Err(SubsetError::EmptyRetainList);
    };
    if first != GlyphId::NOTDEF {
        return Err(SubsetError::MissingNotdef(first));
    }
    let mut seen = int_set::IntSet::<GlyphId>::default();
    for &gid in retain {
        if !seen.insert(gid) {
            return Err(SubsetError::DuplicateGlyph(gid));
        }
    }
    Ok(())
}
