//! Narrow collaborator interfaces for the outline tables (`glyf`, `CFF`).
//!
//! Outline parsing itself is out of scope here -- same as in `otl` -- so
//! this module does not contain a TrueType or CharString parser. It
//! defines the minimal shape the subsetter needs from whichever one the
//! caller is driving: enough to copy the retained glyph records across and
//! fix up the handful of fields that encode a glyph id.

use font_types::GlyphId;

use crate::gidmap::GidMap;

/// A `glyf`-table collaborator: retained glyph records copied verbatim,
/// plus composite component indices rewritten through `new_gid`.
///
/// `glyf` records are opaque to this crate except for composite glyphs'
/// component glyph ids, which the collaborator is expected to have
/// already located within each record (at whatever byte offsets its own
/// parser knows about) and expose through [`GlyfRecord::component_gids`].
pub trait GlyfRecord {
    /// This glyph's component glyph ids, in the order they appear in the
    /// composite glyph description, or an empty slice for a simple glyph.
    fn component_gids(&self) -> &[GlyphId];

    /// Replace this glyph's component glyph ids in place, same order and
    /// count as `component_gids`.
    fn set_component_gids(&mut self, gids: &[GlyphId]);
}

/// Copy `record`'s component references through `new_gid`.
///
/// Returns `Err` (the old, still-referenced gid) if a component glyph was
/// not retained; the closure step should have prevented this from ever
/// happening, so a caller hitting this has a bug in how it drove closure,
/// not a normal "glyph dropped" case.
pub fn rewrite_glyf_record<R: GlyfRecord>(
    record: &mut R,
    gids: &GidMap,
) -> Result<(), GlyphId> {
    let mut new_components = Vec::with_capacity(record.component_gids().len());
    for &old in record.component_gids() {
        match gids.get(old) {
            Some(new) => new_components.push(new),
            None => return Err(old),
        }
    }
    record.set_component_gids(&new_components);
    Ok(())
}

/// A `CFF` INDEX entry: one retained glyph's CharString plus, for a CID-
/// keyed font, the CID it maps to. The subsetter rewrites only the CID
/// (through `new_gid`, since a subset CFF's charset is expected to mirror
/// the new glyph order) and lets the caller copy the CharString bytes and
/// any referenced local/global subroutine indices verbatim.
pub trait CffGlyph {
    fn cid(&self) -> Option<u16>;
    fn set_cid(&mut self, cid: u16);
}

/// Rewrite `glyph`'s CID to match its new gid, for CID-keyed CFF fonts.
/// Non-CID-keyed CFF fonts (where glyph order and charset are the same
/// thing) have nothing to rewrite here; the caller just reorders the
/// CharString INDEX to match `gids.old_gids()`.
pub fn rewrite_cff_cid<G: CffGlyph>(glyph: &mut G, new_gid: GlyphId) {
    if glyph.cid().is_some() {
        glyph.set_cid(new_gid.to_u16());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeComposite {
        components: Vec<GlyphId>,
    }

    impl GlyfRecord for FakeComposite {
        fn component_gids(&self) -> &[GlyphId] {
            &self.components
        }
        fn set_component_gids(&mut self, gids: &[GlyphId]) {
            self.components = gids.to_vec();
        }
    }

    #[test]
    fn rewrites_composite_components_through_new_gid() {
        let mut gids = GidMap::with_capacity(3);
        gids.add(GlyphId::new(0));
        gids.add(GlyphId::new(20));
        gids.add(GlyphId::new(21));

        let mut record = FakeComposite {
            components: vec![GlyphId::new(20), GlyphId::new(21)],
        };
        rewrite_glyf_record(&mut record, &gids).unwrap();
        assert_eq!(record.components, vec![GlyphId::new(1), GlyphId::new(2)]);
    }

    #[test]
    fn rejects_a_component_that_was_not_retained() {
        let mut gids = GidMap::with_capacity(1);
        gids.add(GlyphId::new(0));

        let mut record = FakeComposite {
            components: vec![GlyphId::new(99)],
        };
        assert_eq!(
            rewrite_glyf_record(&mut record, &gids),
            Err(GlyphId::new(99))
        );
    }

    struct FakeCffGlyph {
        cid: Option<u16>,
    }

    impl CffGlyph for FakeCffGlyph {
        fn cid(&self) -> Option<u16> {
            self.cid
        }
        fn set_cid(&mut self, cid: u16) {
            self.cid = Some(cid);
        }
    }

    #[test]
    fn rewrites_cid_to_match_new_gid() {
        let mut glyph = FakeCffGlyph { cid: Some(500) };
        rewrite_cff_cid(&mut glyph, GlyphId::new(3));
        assert_eq!(glyph.cid, Some(3));
    }

    #[test]
    fn leaves_non_cid_keyed_glyphs_untouched() {
        let mut glyph = FakeCffGlyph { cid: None };
        rewrite_cff_cid(&mut glyph, GlyphId::new(3));
        assert_eq!(glyph.cid, None);
    }
}
