//! Lookup flags and the keep-filter they parameterize.

use core::ops::{BitOr, BitOrAssign};
use font_types::GlyphId;

use crate::gdef::Gdef;
use crate::glyph::GlyphClass;

/// The `LookupFlag` bit enumeration.
///
/// This is kind-of-but-not-quite a bit enumeration -- the high byte carries
/// the mark-attachment type index rather than independent flag bits -- so
/// it is implemented by hand rather than derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LookupFlag(u16);

impl BitOr for LookupFlag {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LookupFlag {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

impl LookupFlag {
    /// Affects only GPOS type 3 (cursive attachment): anchor the last glyph
    /// to the baseline instead of the first.
    pub const RIGHT_TO_LEFT: Self = LookupFlag(0x0001);
    pub const IGNORE_BASE_GLYPHS: Self = LookupFlag(0x0002);
    pub const IGNORE_LIGATURES: Self = LookupFlag(0x0004);
    pub const IGNORE_MARKS: Self = LookupFlag(0x0008);
    pub const USE_MARK_FILTERING_SET: Self = LookupFlag(0x0010);

    const FLAG_MASK: u16 = 0x1F;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn to_bits(self) -> u16 {
        self.0
    }

    pub fn contains(&self, other: Self) -> bool {
        let other = other.0 & Self::FLAG_MASK;
        (self.0 & other) == other
    }

    /// If not zero, skip all marks whose attachment class differs from this
    /// value.
    pub fn mark_attachment_type(self) -> Option<u16> {
        let val = self.0 & 0xff00;
        (val != 0).then_some(val >> 8)
    }

    pub fn is_right_to_left(self) -> bool {
        self.contains(Self::RIGHT_TO_LEFT)
    }
}

/// Decides which glyphs a given lookup pass is even allowed to see.
///
/// Precedence, per the spec: `IGNORE_MARKS` beats `USE_MARK_FILTERING_SET`
/// beats the mark-attachment-class check; exactly one of those three
/// (if any) applies to a mark glyph.
pub struct Keep<'a> {
    flags: LookupFlag,
    mark_filtering_set: Option<u16>,
    gdef: &'a Gdef,
}

impl<'a> Keep<'a> {
    pub fn new(flags: LookupFlag, mark_filtering_set: Option<u16>, gdef: &'a Gdef) -> Self {
        Keep {
            flags,
            mark_filtering_set,
            gdef,
        }
    }

    /// Whether the owning lookup carries `RIGHT_TO_LEFT`. Only GPOS type 3
    /// (cursive attachment) consults this; every other lookup type ignores
    /// it.
    pub fn is_right_to_left(&self) -> bool {
        self.flags.is_right_to_left()
    }

    pub fn test(&self, gid: GlyphId) -> bool {
        if !self.gdef.has_glyph_class_table() {
            return true;
        }
        match self.gdef.glyph_class(gid) {
            Some(GlyphClass::Base) | None => !self.flags.contains(LookupFlag::IGNORE_BASE_GLYPHS),
            Some(GlyphClass::Ligature) => !self.flags.contains(LookupFlag::IGNORE_LIGATURES),
            Some(GlyphClass::Component) => true,
            Some(GlyphClass::Mark) => {
                if self.flags.contains(LookupFlag::IGNORE_MARKS) {
                    false
                } else if self.flags.contains(LookupFlag::USE_MARK_FILTERING_SET) {
                    self.mark_filtering_set
                        .and_then(|idx| self.gdef.mark_glyph_set(idx))
                        .map(|set| set.contains(gid))
                        .unwrap_or(false)
                } else if let Some(want) = self.flags.mark_attachment_type() {
                    self.gdef.mark_attachment_class(gid) == want
                } else {
                    true
                }
            }
        }
    }

    /// Scan forward from `from` (inclusive), returning the first kept
    /// position `< seq.len()`, or `None` if there is none.
    pub fn advance_kept<F: Fn(usize) -> GlyphId>(
        &self,
        gid_at: F,
        len: usize,
        mut from: usize,
    ) -> Option<usize> {
        while from < len {
            if self.test(gid_at(from)) {
                return Some(from);
            }
            from += 1;
        }
        None
    }

    /// Scan backward from `from` (inclusive), returning the first kept
    /// position, or `None` if there is none before the start of the
    /// sequence.
    pub fn retreat_kept<F: Fn(usize) -> GlyphId>(
        &self,
        gid_at: F,
        mut from: isize,
    ) -> Option<usize> {
        while from >= 0 {
            if self.test(gid_at(from as usize)) {
                return Some(from as usize);
            }
            from -= 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gdef::MarkAttachmentClass;

    fn gdef_with_mark(gid: GlyphId) -> Gdef {
        let mut classes = fnv::FnvHashMap::default();
        classes.insert(gid, GlyphClass::Mark);
        Gdef::new(classes, MarkAttachmentClass::default(), vec![])
    }

    #[test]
    fn ignore_marks_hides_mark_glyphs() {
        let gdef = gdef_with_mark(GlyphId::new(5));
        let keep = Keep::new(LookupFlag::IGNORE_MARKS, None, &gdef);
        assert!(!keep.test(GlyphId::new(5)));
        assert!(keep.test(GlyphId::new(6)));
    }

    #[test]
    fn component_glyphs_are_never_filtered() {
        let mut classes = fnv::FnvHashMap::default();
        classes.insert(GlyphId::new(5), GlyphClass::Component);
        let gdef = Gdef::new(classes, MarkAttachmentClass::default(), vec![]);
        let keep = Keep::new(LookupFlag::IGNORE_BASE_GLYPHS, None, &gdef);
        assert!(keep.test(GlyphId::new(5)));
    }

    #[test]
    fn no_gdef_keeps_everything() {
        let gdef = Gdef::empty();
        let keep = Keep::new(LookupFlag::IGNORE_MARKS, None, &gdef);
        assert!(keep.test(GlyphId::new(5)));
    }

    #[test]
    fn mark_attachment_class_precedence() {
        let mut classes = fnv::FnvHashMap::default();
        classes.insert(GlyphId::new(5), GlyphClass::Mark);
        let mut mac = fnv::FnvHashMap::default();
        mac.insert(GlyphId::new(5), 2u16);
        let gdef = Gdef::new(classes, MarkAttachmentClass::new(mac), vec![]);

        let mut flags = LookupFlag::empty();
        flags.0 |= 2 << 8; // mark attachment type 2
        let keep = Keep::new(flags, None, &gdef);
        assert!(keep.test(GlyphId::new(5)));

        let mut flags_wrong = LookupFlag::empty();
        flags_wrong.0 |= 3 << 8;
        let keep_wrong = Keep::new(flags_wrong, None, &gdef);
        assert!(!keep_wrong.test(GlyphId::new(5)));
    }
}
