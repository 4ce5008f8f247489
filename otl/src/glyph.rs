//! The mutable glyph sequence the shaping engine operates on.

use font_types::GlyphId;

/// The Unicode text backing a [`GlyphEntry`].
///
/// Most entries carry exactly one scalar value -- the code point that was
/// mapped to the glyph -- so we keep that case allocation-free and only
/// spill to the heap once ligation starts concatenating several entries'
/// text together. Modeled on the inline-then-heap storage `skrifa` uses for
/// its small outline arrays, generalized here to grow instead of being
/// fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum GlyphText {
    #[default]
    Empty,
    One(char),
    Many(Vec<char>),
}

impl GlyphText {
    pub fn single(ch: char) -> Self {
        GlyphText::One(ch)
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        let (one, many) = match self {
            GlyphText::Empty => (None, None),
            GlyphText::One(c) => (Some(*c), None),
            GlyphText::Many(v) => (None, Some(v.iter().copied())),
        };
        one.into_iter().chain(many.into_iter().flatten())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, GlyphText::Empty)
    }

    fn push(&mut self, ch: char) {
        match self {
            GlyphText::Empty => *self = GlyphText::One(ch),
            GlyphText::One(existing) => *self = GlyphText::Many(vec![*existing, ch]),
            GlyphText::Many(v) => v.push(ch),
        }
    }

    fn append(&mut self, other: &GlyphText) {
        for ch in other.chars() {
            self.push(ch);
        }
    }

    /// Concatenate the text of several entries, in order. Used by ligature
    /// substitution (GSUB 4) to build the text of the output glyph.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a GlyphText>) -> GlyphText {
        let mut out = GlyphText::Empty;
        for part in parts {
            out.append(part);
        }
        out
    }
}

/// One entry in the glyph sequence.
///
/// `text` is the Unicode backing of the entry; ligation concatenates
/// component texts in matched order, so the concatenation of every entry's
/// `text`, in sequence order, is invariant under `apply`.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphEntry {
    pub gid: GlyphId,
    pub text: GlyphText,
    pub x_offset: i16,
    pub y_offset: i16,
    pub advance: u16,
}

impl GlyphEntry {
    /// The initial entry for code point `r`, as produced by mapping a
    /// string through a cmap subtable. Offsets and advance are left at
    /// zero; advance is populated once positioning starts, by a collaborator
    /// that knows per-glyph widths.
    pub fn from_codepoint(gid: GlyphId, r: char) -> Self {
        GlyphEntry {
            gid,
            text: GlyphText::single(r),
            x_offset: 0,
            y_offset: 0,
            advance: 0,
        }
    }

    pub fn new(gid: GlyphId, text: GlyphText) -> Self {
        GlyphEntry {
            gid,
            text,
            x_offset: 0,
            y_offset: 0,
            advance: 0,
        }
    }
}

/// The GDEF glyph classification used by lookup-flag filtering.
///
/// Glyphs absent from the class table are unclassified, and are treated as
/// [`GlyphClass::Base`] by the keep-filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GlyphClass {
    Base,
    Ligature,
    Mark,
    Component,
}

impl GlyphClass {
    /// Decode the GDEF `GlyphClassDef` numeric encoding (1=Base, 2=Ligature,
    /// 3=Mark, 4=Component). Class `0` ("unclassified") is represented by
    /// the absence of an entry, not by a variant here.
    pub fn from_gdef_value(value: u16) -> Option<Self> {
        match value {
            1 => Some(GlyphClass::Base),
            2 => Some(GlyphClass::Ligature),
            3 => Some(GlyphClass::Mark),
            4 => Some(GlyphClass::Component),
            _ => None,
        }
    }
}
