//! The GDEF bundle: per-glyph classification consumed by lookup-flag
//! filtering. GDEF itself is an out-of-scope collaborator (see the crate
//! docs); this module only models the slice of it the engine needs.

use font_types::GlyphId;
use fnv::FnvHashMap;
use int_set::IntSet;

use crate::glyph::GlyphClass;

/// `GlyphId -> u16` attachment type, `0` meaning unassigned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkAttachmentClass(FnvHashMap<GlyphId, u16>);

impl MarkAttachmentClass {
    pub fn new(map: FnvHashMap<GlyphId, u16>) -> Self {
        MarkAttachmentClass(map)
    }

    pub fn get(&self, gid: GlyphId) -> u16 {
        self.0.get(&gid).copied().unwrap_or(0)
    }
}

/// A single named set of mark glyphs, referenced by index from
/// `LookupFlag::mark_filtering_set`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkGlyphSet(IntSet<GlyphId>);

impl MarkGlyphSet {
    pub fn from_glyphs(glyphs: impl IntoIterator<Item = GlyphId>) -> Self {
        MarkGlyphSet(glyphs.into_iter().collect())
    }

    pub fn contains(&self, gid: GlyphId) -> bool {
        self.0.contains(gid)
    }
}

/// The subset of GDEF the engine consults: per-glyph class, mark-attachment
/// class and the mark glyph sets used by `USE_MARK_FILTERING_SET`.
#[derive(Clone, Debug, Default)]
pub struct Gdef {
    glyph_class: FnvHashMap<GlyphId, GlyphClass>,
    mark_attach_class: MarkAttachmentClass,
    mark_glyph_sets: Vec<MarkGlyphSet>,
}

impl Gdef {
    pub fn new(
        glyph_class: FnvHashMap<GlyphId, GlyphClass>,
        mark_attach_class: MarkAttachmentClass,
        mark_glyph_sets: Vec<MarkGlyphSet>,
    ) -> Self {
        Gdef {
            glyph_class,
            mark_attach_class,
            mark_glyph_sets,
        }
    }

    /// Empty GDEF: every glyph is unclassified, no mark-attachment classes,
    /// no mark glyph sets. The keep-filter treats this the same as "GDEF is
    /// absent".
    pub fn empty() -> Self {
        Gdef::default()
    }

    pub fn has_glyph_class_table(&self) -> bool {
        !self.glyph_class.is_empty()
    }

    /// `None` for unclassified glyphs; the keep-filter treats those as Base.
    pub fn glyph_class(&self, gid: GlyphId) -> Option<GlyphClass> {
        self.glyph_class.get(&gid).copied()
    }

    pub fn mark_attachment_class(&self, gid: GlyphId) -> u16 {
        self.mark_attach_class.get(gid)
    }

    pub fn mark_glyph_set(&self, index: u16) -> Option<&MarkGlyphSet> {
        self.mark_glyph_sets.get(index as usize)
    }
}
