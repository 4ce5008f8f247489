//! ClassDef tables: partition glyphs into numbered classes, used by format-2
//! GPOS pair positioning and format-2 context/chained-context rules.

use font_types::GlyphId;
use fnv::FnvHashMap;

use crate::codec::cursor::Cursor;
use crate::error::Result;

const SUBSYSTEM: &str = "classdef";

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ClassDef {
    // absent glyphs are class 0.
    classes: FnvHashMap<GlyphId, u16>,
}

impl ClassDef {
    pub fn new(classes: FnvHashMap<GlyphId, u16>) -> Self {
        ClassDef { classes }
    }

    pub fn get(&self, gid: GlyphId) -> u16 {
        self.classes.get(&gid).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GlyphId, u16)> + '_ {
        self.classes.iter().map(|(g, c)| (*g, *c))
    }

    /// Encode as ClassDef format 2 (sorted ranges of equal class), which is
    /// always valid regardless of how sparse or dense the classes are.
    pub fn encode(&self) -> Vec<u8> {
        let mut entries: Vec<(GlyphId, u16)> = self.classes.iter().map(|(g, c)| (*g, *c)).collect();
        entries.sort_unstable_by_key(|(g, _)| g.to_u16());

        let mut ranges: Vec<(u16, u16, u16)> = Vec::new();
        for (gid, class) in entries {
            let gid = gid.to_u16();
            if let Some(last) = ranges.last_mut() {
                if last.1 + 1 == gid && last.2 == class {
                    last.1 = gid;
                    continue;
                }
            }
            ranges.push((gid, gid, class));
        }

        let mut out = Vec::new();
        out.extend_from_slice(&2u16.to_be_bytes());
        out.extend_from_slice(&(ranges.len() as u16).to_be_bytes());
        for (start, end, class) in ranges {
            out.extend_from_slice(&start.to_be_bytes());
            out.extend_from_slice(&end.to_be_bytes());
            out.extend_from_slice(&class.to_be_bytes());
        }
        out
    }

    /// Decode either ClassDef format.
    ///
    /// Format 1: `u16 format=1, u16 startGlyphID, u16 glyphCount, u16
    /// classValueArray[glyphCount]`.
    /// Format 2: `u16 format=2, u16 classRangeCount, (u16 startGlyphID, u16
    /// endGlyphID, u16 class)[classRangeCount]`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let format = cur.read_u16(SUBSYSTEM)?;
        let mut classes = FnvHashMap::default();
        match format {
            1 => {
                let start = cur.read_u16(SUBSYSTEM)?;
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                for i in 0..count {
                    let class = cur.read_u16(SUBSYSTEM)?;
                    if class != 0 {
                        classes.insert(GlyphId::new(start.wrapping_add(i as u16)), class);
                    }
                }
            }
            2 => {
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                for _ in 0..count {
                    let start = cur.read_u16(SUBSYSTEM)?;
                    let end = cur.read_u16(SUBSYSTEM)?;
                    let class = cur.read_u16(SUBSYSTEM)?;
                    if class != 0 {
                        for gid in start..=end {
                            classes.insert(GlyphId::new(gid), class);
                        }
                    }
                }
            }
            _ => return Err(crate::error::Error::malformed(SUBSYSTEM, "unknown ClassDef format")),
        }
        Ok(ClassDef { classes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format1_round_trip() {
        let mut bytes = vec![];
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&10u16.to_be_bytes());
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&2u16.to_be_bytes());
        let cd = ClassDef::decode(&bytes).unwrap();
        assert_eq!(cd.get(GlyphId::new(10)), 1);
        assert_eq!(cd.get(GlyphId::new(11)), 0);
        assert_eq!(cd.get(GlyphId::new(12)), 2);
        assert_eq!(cd.get(GlyphId::new(999)), 0);
    }
}
