//! Coverage tables: the "is this glyph relevant, and at what index" lookup
//! used throughout GSUB/GPOS subtables.

use font_types::GlyphId;
use fnv::FnvHashMap;

use crate::error::{Error, Result};

const SUBSYSTEM: &str = "coverage";

/// A glyph-to-index mapping, decoded from either coverage format.
///
/// Format 1 (an explicit glyph list) is held as a hash map from glyph to
/// index; format 2 (sorted ranges) is held as a small array of ranges,
/// since that is both more compact and still supports binary search. Either
/// representation answers both "is it covered?" and "what is its index?"
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Coverage {
    List(FnvHashMap<GlyphId, u16>),
    Ranges(Vec<(GlyphId, GlyphId, u16)>),
}

impl Coverage {
    pub fn from_glyphs(glyphs: &[GlyphId]) -> Self {
        let map = glyphs
            .iter()
            .enumerate()
            .map(|(i, g)| (*g, i as u16))
            .collect();
        Coverage::List(map)
    }

    pub fn from_ranges(ranges: Vec<(GlyphId, GlyphId, u16)>) -> Self {
        Coverage::Ranges(ranges)
    }

    pub fn get_index(&self, gid: GlyphId) -> Option<u16> {
        match self {
            Coverage::List(map) => map.get(&gid).copied(),
            Coverage::Ranges(ranges) => {
                for (start, end, start_index) in ranges {
                    if gid >= *start && gid <= *end {
                        let offset = gid.to_u16() - start.to_u16();
                        return Some(start_index + offset);
                    }
                }
                None
            }
        }
    }

    pub fn contains(&self, gid: GlyphId) -> bool {
        self.get_index(gid).is_some()
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = GlyphId> + '_> {
        match self {
            Coverage::List(map) => {
                let mut pairs: Vec<_> = map.iter().map(|(g, i)| (*i, *g)).collect();
                pairs.sort_unstable_by_key(|(i, _)| *i);
                Box::new(pairs.into_iter().map(|(_, g)| g))
            }
            Coverage::Ranges(ranges) => Box::new(
                ranges
                    .iter()
                    .flat_map(|(s, e, _)| (s.to_u16()..=e.to_u16()).map(GlyphId::new)),
            ),
        }
    }

    /// Decode a coverage table from its binary layout.
    ///
    /// Format 1: `u16 format=1, u16 glyphCount, u16 glyphArray[glyphCount]`.
    /// Format 2: `u16 format=2, u16 rangeCount, (u16 startGlyphID, u16
    /// endGlyphID, u16 startCoverageIndex)[rangeCount]`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cur = crate::codec::cursor::Cursor::new(data);
        let format = cur.read_u16(SUBSYSTEM)?;
        match format {
            1 => {
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut map = FnvHashMap::default();
                for i in 0..count {
                    let gid = GlyphId::new(cur.read_u16(SUBSYSTEM)?);
                    map.insert(gid, i as u16);
                }
                Ok(Coverage::List(map))
            }
            2 => {
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut ranges = Vec::with_capacity(count);
                let mut prev_end: Option<u16> = None;
                for _ in 0..count {
                    let start = cur.read_u16(SUBSYSTEM)?;
                    let end = cur.read_u16(SUBSYSTEM)?;
                    let start_index = cur.read_u16(SUBSYSTEM)?;
                    if end < start {
                        return Err(Error::malformed(SUBSYSTEM, "range end precedes start"));
                    }
                    if let Some(prev) = prev_end {
                        if start <= prev {
                            return Err(Error::malformed(SUBSYSTEM, "overlapping coverage ranges"));
                        }
                    }
                    prev_end = Some(end);
                    ranges.push((GlyphId::new(start), GlyphId::new(end), start_index));
                }
                Ok(Coverage::Ranges(ranges))
            }
            other => Err(Error::malformed(SUBSYSTEM, {
                let _ = other;
                "unknown coverage format"
            })),
        }
    }

    /// Encode in whichever format produces the smaller byte count; ties go
    /// to format 1, since it is cheaper to decode.
    pub fn encode(glyphs: &[GlyphId]) -> Vec<u8> {
        let format1_len = 4 + glyphs.len() * 2;

        let mut ranges: Vec<(GlyphId, GlyphId, u16)> = Vec::new();
        for (i, &g) in glyphs.iter().enumerate() {
            if let Some(last) = ranges.last_mut() {
                if last.1.to_u16() + 1 == g.to_u16() {
                    last.1 = g;
                    continue;
                }
            }
            ranges.push((g, g, i as u16));
        }
        let format2_len = 4 + ranges.len() * 6;

        let mut out = Vec::new();
        if format2_len < format1_len {
            out.extend_from_slice(&2u16.to_be_bytes());
            out.extend_from_slice(&(ranges.len() as u16).to_be_bytes());
            for (start, end, start_index) in ranges {
                out.extend_from_slice(&start.to_u16().to_be_bytes());
                out.extend_from_slice(&end.to_u16().to_be_bytes());
                out.extend_from_slice(&start_index.to_be_bytes());
            }
        } else {
            out.extend_from_slice(&1u16.to_be_bytes());
            out.extend_from_slice(&(glyphs.len() as u16).to_be_bytes());
            for g in glyphs {
                out.extend_from_slice(&g.to_u16().to_be_bytes());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_format1() {
        let glyphs = vec![GlyphId::new(5), GlyphId::new(100), GlyphId::new(3)];
        let encoded = Coverage::encode(&glyphs);
        let decoded = Coverage::decode(&encoded).unwrap();
        assert_eq!(decoded.get_index(GlyphId::new(5)), Some(0));
        assert_eq!(decoded.get_index(GlyphId::new(100)), Some(1));
        assert_eq!(decoded.get_index(GlyphId::new(3)), Some(2));
    }

    #[test]
    fn consecutive_glyphs_prefer_format2() {
        let glyphs: Vec<_> = (10..20).map(GlyphId::new).collect();
        let encoded = Coverage::encode(&glyphs);
        assert_eq!(u16::from_be_bytes([encoded[0], encoded[1]]), 2);
        let decoded = Coverage::decode(&encoded).unwrap();
        for (i, g) in glyphs.iter().enumerate() {
            assert_eq!(decoded.get_index(*g), Some(i as u16));
        }
    }

    #[test]
    fn rejects_overlapping_ranges() {
        let mut bytes = vec![];
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&10u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&5u16.to_be_bytes());
        bytes.extend_from_slice(&15u16.to_be_bytes());
        bytes.extend_from_slice(&11u16.to_be_bytes());
        assert!(Coverage::decode(&bytes).is_err());
    }
}
