//! The in-memory LookupList model shared by GSUB and GPOS, plus the
//! `Subtable` trait that lets the codec and the engine stay generic over
//! which family they're handling.

use crate::error::Result;
use crate::glyph::GlyphEntry;
use crate::gpos::GposSubtable;
use crate::gsub::GsubSubtable;
use crate::keep::{Keep, LookupFlag};
use crate::matching::Match;

/// An index into a [`LookupList`], as stored in feature lookup-index lists
/// and in `NestedLookup::lookup_index`.
pub type LookupIndex = u16;

/// A GSUB or GPOS subtable, decodable from its raw lookup-type-tagged bytes
/// and matchable against a glyph sequence. Implemented by [`GsubSubtable`]
/// and [`GposSubtable`]; generic code (the LookupList codec, the shaping
/// engine) is written once against this trait instead of twice.
pub trait Subtable: Sized {
    /// The lookup type used to wrap this family's subtables when 16-bit
    /// offsets would otherwise overflow (7 for GSUB, 9 for GPOS).
    const EXTENSION_LOOKUP_TYPE: u16;

    /// The lookup type this family applies right-to-left, subtables in
    /// reverse order, instead of the usual left-to-right scan. Only GSUB
    /// type 8 (reverse chained single substitution) does this; GPOS has
    /// no equivalent.
    const REVERSE_LOOKUP_TYPE: Option<u16> = None;

    fn lookup_type(&self) -> u16;
    fn decode(lookup_type: u16, data: &[u8]) -> Result<Self>;
    fn encode(&self) -> Vec<u8>;
    fn match_at(&self, seq: &[GlyphEntry], a: usize, keep: &Keep) -> Option<Match>;
}

impl Subtable for GsubSubtable {
    const EXTENSION_LOOKUP_TYPE: u16 = 7;
    const REVERSE_LOOKUP_TYPE: Option<u16> = Some(8);

    fn lookup_type(&self) -> u16 {
        GsubSubtable::lookup_type(self)
    }
    fn decode(lookup_type: u16, data: &[u8]) -> Result<Self> {
        GsubSubtable::decode(lookup_type, data)
    }
    fn encode(&self) -> Vec<u8> {
        GsubSubtable::encode(self)
    }
    fn match_at(&self, seq: &[GlyphEntry], a: usize, keep: &Keep) -> Option<Match> {
        GsubSubtable::match_at(self, seq, a, keep)
    }
}

impl Subtable for GposSubtable {
    const EXTENSION_LOOKUP_TYPE: u16 = 9;

    fn lookup_type(&self) -> u16 {
        GposSubtable::lookup_type(self)
    }
    fn decode(lookup_type: u16, data: &[u8]) -> Result<Self> {
        GposSubtable::decode(lookup_type, data)
    }
    fn encode(&self) -> Vec<u8> {
        GposSubtable::encode(self)
    }
    fn match_at(&self, seq: &[GlyphEntry], a: usize, keep: &Keep) -> Option<Match> {
        GposSubtable::match_at(self, seq, a, keep)
    }
}

/// One lookup: a type, the flags that parameterize its keep-filter, and the
/// ordered subtables tried at each position (first match wins).
#[derive(Clone, Debug, PartialEq)]
pub struct Lookup<S> {
    pub lookup_type: u16,
    pub flags: LookupFlag,
    pub mark_filtering_set: Option<u16>,
    pub subtables: Vec<S>,
}

impl<S: Subtable> Lookup<S> {
    pub fn new(flags: LookupFlag, mark_filtering_set: Option<u16>, subtables: Vec<S>) -> Self {
        let lookup_type = subtables
            .first()
            .map(|s| s.lookup_type())
            .unwrap_or_default();
        Lookup {
            lookup_type,
            flags,
            mark_filtering_set,
            subtables,
        }
    }

    pub fn keep<'a>(&self, gdef: &'a crate::gdef::Gdef) -> Keep<'a> {
        Keep::new(self.flags, self.mark_filtering_set, gdef)
    }
}

/// An ordered table of lookups, as decoded from a GSUB or GPOS LookupList.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct LookupList<S> {
    pub lookups: Vec<Lookup<S>>,
}

impl<S> LookupList<S> {
    pub fn get(&self, index: LookupIndex) -> Option<&Lookup<S>> {
        self.lookups.get(index as usize)
    }
}
