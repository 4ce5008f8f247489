//! GSUB subtable representations and their matchers.
//!
//! Every matcher here is invoked on a glyph sequence `seq`, starting at
//! position `a`. The caller has already verified `keep.test(seq[a].gid)`;
//! matchers use `keep` only to locate subsequent positions (skipping
//! ignored glyphs), never to re-check the anchor position.

use font_types::GlyphId;

use crate::codec::cursor::{Cursor, Writer};
use crate::context::{ChainedSequenceContext, SequenceContext};
use crate::coverage::Coverage;
use crate::error::{Error, Result};
use crate::glyph::{GlyphEntry, GlyphText};
use crate::keep::Keep;
use crate::matching::Match;

const SUBSYSTEM: &str = "gsub";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SingleSubst {
    /// Format 1: every covered glyph shifts by the same signed delta.
    Delta(i16),
    /// Format 2: an explicit substitute per covered glyph, indexed by
    /// coverage index.
    List(Vec<GlyphId>),
}

/// A ligature's component sequence (excluding the first glyph, which is
/// implied by the coverage index that selected its ligature set) and the
/// glyph it produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ligature {
    pub components: Vec<GlyphId>,
    pub glyph: GlyphId,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GsubSubtable {
    Single {
        coverage: Coverage,
        subst: SingleSubst,
    },
    Multiple {
        coverage: Coverage,
        sequences: Vec<Vec<GlyphId>>,
    },
    Alternate {
        coverage: Coverage,
        alternate_sets: Vec<Vec<GlyphId>>,
    },
    Ligature {
        coverage: Coverage,
        ligature_sets: Vec<Vec<Ligature>>,
    },
    Context(SequenceContext),
    ChainContext(ChainedSequenceContext),
    ReverseChainSingle {
        coverage: Coverage,
        backtrack_coverages: Vec<Coverage>,
        lookahead_coverages: Vec<Coverage>,
        substitutes: Vec<GlyphId>,
    },
}

impl GsubSubtable {
    /// The numeric GSUB lookup type this subtable, decoded in isolation,
    /// corresponds to. Needed by the LookupList codec to decide whether a
    /// lookup's subtables share a type (a precondition for encoding) and,
    /// for extension promotion, which type to wrap.
    pub fn lookup_type(&self) -> u16 {
        match self {
            GsubSubtable::Single { .. } => 1,
            GsubSubtable::Multiple { .. } => 2,
            GsubSubtable::Alternate { .. } => 3,
            GsubSubtable::Ligature { .. } => 4,
            GsubSubtable::Context(_) => 5,
            GsubSubtable::ChainContext(_) => 6,
            GsubSubtable::ReverseChainSingle { .. } => 8,
        }
    }

    /// Attempt to match (and, where applicable, substitute) starting at
    /// `seq[a]`. GSUB types 1-4 and 8 replace glyphs outright; types 5/6
    /// delegate to the shared context matchers and return nested-lookup
    /// actions instead.
    pub fn match_at(&self, seq: &[GlyphEntry], a: usize, keep: &Keep) -> Option<Match> {
        let gid_at = |i: usize| seq[i].gid;
        let len = seq.len();
        match self {
            GsubSubtable::Single { coverage, subst } => {
                let idx = coverage.get_index(gid_at(a))?;
                let out_gid = match subst {
                    SingleSubst::Delta(delta) => {
                        GlyphId::new((gid_at(a).to_u16() as i32 + *delta as i32) as u16)
                    }
                    SingleSubst::List(list) => *list.get(idx as usize)?,
                };
                let entry = GlyphEntry::new(out_gid, seq[a].text.clone());
                Some(Match::replacing(vec![a], vec![entry], a + 1))
            }
            GsubSubtable::Multiple {
                coverage,
                sequences,
            } => {
                let idx = coverage.get_index(gid_at(a))?;
                let targets = sequences.get(idx as usize)?;
                let mut out = Vec::with_capacity(targets.len());
                for (i, gid) in targets.iter().enumerate() {
                    let text = if i == 0 {
                        seq[a].text.clone()
                    } else {
                        GlyphText::Empty
                    };
                    out.push(GlyphEntry::new(*gid, text));
                }
                Some(Match::replacing(vec![a], out, a + 1))
            }
            GsubSubtable::Alternate {
                coverage,
                alternate_sets,
            } => {
                let idx = coverage.get_index(gid_at(a))?;
                let set = alternate_sets.get(idx as usize)?;
                // No selection mechanism is exposed to this engine; the
                // first alternate is used, matching the common shaper
                // default when a feature doesn't carry out-of-band choice.
                let out_gid = *set.first()?;
                let entry = GlyphEntry::new(out_gid, seq[a].text.clone());
                Some(Match::replacing(vec![a], vec![entry], a + 1))
            }
            GsubSubtable::Ligature {
                coverage,
                ligature_sets,
            } => {
                let idx = coverage.get_index(gid_at(a))?;
                let set = ligature_sets.get(idx as usize)?;
                for lig in set {
                    if let Some(positions) =
                        match_component_sequence(&lig.components, &gid_at, len, a, keep)
                    {
                        let texts: Vec<GlyphText> =
                            positions.iter().map(|&p| seq[p].text.clone()).collect();
                        let text = GlyphText::concat(texts.iter());
                        let entry = GlyphEntry::new(lig.glyph, text);
                        let next = positions.last().copied().unwrap_or(a) + 1;
                        return Some(Match::replacing(positions, vec![entry], next));
                    }
                }
                None
            }
            GsubSubtable::Context(ctx) => ctx.match_at(gid_at, len, a, keep),
            GsubSubtable::ChainContext(ctx) => ctx.match_at(gid_at, len, a, keep),
            GsubSubtable::ReverseChainSingle {
                coverage,
                backtrack_coverages,
                lookahead_coverages,
                substitutes,
            } => {
                let idx = coverage.get_index(gid_at(a))?;
                let out_gid = *substitutes.get(idx as usize)?;

                let mut pos = a as isize - 1;
                for cov in backtrack_coverages {
                    let found = keep.retreat_kept(&gid_at, pos)?;
                    cov.contains(gid_at(found)).then_some(())?;
                    pos = found as isize - 1;
                }
                let mut after = a + 1;
                for cov in lookahead_coverages {
                    after = keep.advance_kept(&gid_at, len, after)?;
                    cov.contains(gid_at(after)).then_some(())?;
                    after += 1;
                }

                let entry = GlyphEntry::new(out_gid, seq[a].text.clone());
                Some(Match::replacing(vec![a], vec![entry], a + 1))
            }
        }
    }

    pub fn decode(lookup_type: u16, data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        match lookup_type {
            1 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let subst = match format {
                    1 => SingleSubst::Delta(cur.read_i16(SUBSYSTEM)?),
                    2 => {
                        let count = cur.read_u16(SUBSYSTEM)? as usize;
                        let mut list = Vec::with_capacity(count);
                        for _ in 0..count {
                            list.push(GlyphId::new(cur.read_u16(SUBSYSTEM)?));
                        }
                        SingleSubst::List(list)
                    }
                    _ => return Err(Error::malformed(SUBSYSTEM, "unknown single subst format")),
                };
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                Ok(GsubSubtable::Single { coverage, subst })
            }
            2 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                if format != 1 {
                    return Err(Error::malformed(SUBSYSTEM, "unknown multiple subst format"));
                }
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut seq_offsets = Vec::with_capacity(count);
                for _ in 0..count {
                    seq_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
                }
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                let mut sequences = Vec::with_capacity(count);
                for off in seq_offsets {
                    sequences.push(decode_glyph_array(cur.slice_from(off)?)?);
                }
                Ok(GsubSubtable::Multiple {
                    coverage,
                    sequences,
                })
            }
            3 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                if format != 1 {
                    return Err(Error::malformed(SUBSYSTEM, "unknown alternate subst format"));
                }
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut set_offsets = Vec::with_capacity(count);
                for _ in 0..count {
                    set_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
                }
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                let mut alternate_sets = Vec::with_capacity(count);
                for off in set_offsets {
                    alternate_sets.push(decode_glyph_array(cur.slice_from(off)?)?);
                }
                Ok(GsubSubtable::Alternate {
                    coverage,
                    alternate_sets,
                })
            }
            4 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                if format != 1 {
                    return Err(Error::malformed(SUBSYSTEM, "unknown ligature subst format"));
                }
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut set_offsets = Vec::with_capacity(count);
                for _ in 0..count {
                    set_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
                }
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                let mut ligature_sets = Vec::with_capacity(count);
                for off in set_offsets {
                    ligature_sets.push(decode_ligature_set(cur.slice_from(off)?)?);
                }
                Ok(GsubSubtable::Ligature {
                    coverage,
                    ligature_sets,
                })
            }
            5 => Ok(GsubSubtable::Context(SequenceContext::decode(data)?)),
            6 => Ok(GsubSubtable::ChainContext(ChainedSequenceContext::decode(
                data,
            )?)),
            8 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                if format != 1 {
                    return Err(Error::malformed(SUBSYSTEM, "unknown reverse chain format"));
                }
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let bt_count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut bt_offsets = Vec::with_capacity(bt_count);
                for _ in 0..bt_count {
                    bt_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
                }
                let la_count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut la_offsets = Vec::with_capacity(la_count);
                for _ in 0..la_count {
                    la_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
                }
                let glyph_count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut substitutes = Vec::with_capacity(glyph_count);
                for _ in 0..glyph_count {
                    substitutes.push(GlyphId::new(cur.read_u16(SUBSYSTEM)?));
                }
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                let mut backtrack_coverages = Vec::with_capacity(bt_count);
                for off in bt_offsets {
                    backtrack_coverages.push(Coverage::decode(cur.slice_from(off)?)?);
                }
                let mut lookahead_coverages = Vec::with_capacity(la_count);
                for off in la_offsets {
                    lookahead_coverages.push(Coverage::decode(cur.slice_from(off)?)?);
                }
                Ok(GsubSubtable::ReverseChainSingle {
                    coverage,
                    backtrack_coverages,
                    lookahead_coverages,
                    substitutes,
                })
            }
            other => Err(if other == 7 {
                Error::invariant(SUBSYSTEM, "extension subtable must be unwrapped before decode")
            } else {
                Error::unsupported(SUBSYSTEM, "unknown GSUB lookup type")
            }),
        }
    }

    /// Encode this subtable's content (without any extension wrapper); used
    /// directly for non-extension encoding, and by the LookupList codec to
    /// measure whether extension promotion is required.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        match self {
            GsubSubtable::Single { coverage, subst } => {
                match subst {
                    SingleSubst::Delta(delta) => {
                        w.u16(1);
                        let cov_pos = w.reserve_u16();
                        w.i16(*delta);
                        patch_trailing_coverage(&mut w, cov_pos, coverage);
                    }
                    SingleSubst::List(list) => {
                        w.u16(2);
                        let cov_pos = w.reserve_u16();
                        w.u16(list.len() as u16);
                        for gid in list {
                            w.u16(gid.to_u16());
                        }
                        patch_trailing_coverage(&mut w, cov_pos, coverage);
                    }
                }
                w.into_bytes()
            }
            GsubSubtable::Multiple {
                coverage,
                sequences,
            } => {
                w.u16(1);
                let cov_pos = w.reserve_u16();
                w.u16(sequences.len() as u16);
                let mut seq_slots = Vec::with_capacity(sequences.len());
                for _ in sequences {
                    seq_slots.push(w.reserve_u16());
                }
                for (slot, seq) in seq_slots.into_iter().zip(sequences) {
                    let here = w.len();
                    w.patch_u16(slot, here as u16);
                    encode_glyph_array(&mut w, seq);
                }
                patch_trailing_coverage(&mut w, cov_pos, coverage);
                w.into_bytes()
            }
            GsubSubtable::Alternate {
                coverage,
                alternate_sets,
            } => {
                w.u16(1);
                let cov_pos = w.reserve_u16();
                w.u16(alternate_sets.len() as u16);
                let mut slots = Vec::with_capacity(alternate_sets.len());
                for _ in alternate_sets {
                    slots.push(w.reserve_u16());
                }
                for (slot, set) in slots.into_iter().zip(alternate_sets) {
                    let here = w.len();
                    w.patch_u16(slot, here as u16);
                    encode_glyph_array(&mut w, set);
                }
                patch_trailing_coverage(&mut w, cov_pos, coverage);
                w.into_bytes()
            }
            GsubSubtable::Ligature {
                coverage,
                ligature_sets,
            } => {
                w.u16(1);
                let cov_pos = w.reserve_u16();
                w.u16(ligature_sets.len() as u16);
                let mut slots = Vec::with_capacity(ligature_sets.len());
                for _ in ligature_sets {
                    slots.push(w.reserve_u16());
                }
                for (slot, set) in slots.into_iter().zip(ligature_sets) {
                    let here = w.len();
                    w.patch_u16(slot, here as u16);
                    encode_ligature_set(&mut w, set);
                }
                patch_trailing_coverage(&mut w, cov_pos, coverage);
                w.into_bytes()
            }
            GsubSubtable::Context(ctx) => ctx.encode(),
            GsubSubtable::ChainContext(ctx) => ctx.encode(),
            GsubSubtable::ReverseChainSingle {
                coverage,
                backtrack_coverages,
                lookahead_coverages,
                substitutes,
            } => {
                w.u16(1);
                let cov_pos = w.reserve_u16();
                w.u16(backtrack_coverages.len() as u16);
                let bt_slots: Vec<usize> = backtrack_coverages.iter().map(|_| w.reserve_u16()).collect();
                w.u16(lookahead_coverages.len() as u16);
                let la_slots: Vec<usize> = lookahead_coverages.iter().map(|_| w.reserve_u16()).collect();
                w.u16(substitutes.len() as u16);
                for gid in substitutes {
                    w.u16(gid.to_u16());
                }
                for (slot, cov) in bt_slots.into_iter().zip(backtrack_coverages) {
                    let here = w.len();
                    w.patch_u16(slot, here as u16);
                    w.bytes(&Coverage::encode(&cov.iter().collect::<Vec<_>>()));
                }
                for (slot, cov) in la_slots.into_iter().zip(lookahead_coverages) {
                    let here = w.len();
                    w.patch_u16(slot, here as u16);
                    w.bytes(&Coverage::encode(&cov.iter().collect::<Vec<_>>()));
                }
                patch_trailing_coverage(&mut w, cov_pos, coverage);
                w.into_bytes()
            }
        }
    }
}

fn patch_trailing_coverage(w: &mut Writer, slot: usize, coverage: &Coverage) {
    let here = w.len();
    w.patch_u16(slot, here as u16);
    w.bytes(&Coverage::encode(&coverage.iter().collect::<Vec<_>>()));
}

fn encode_glyph_array(w: &mut Writer, glyphs: &[GlyphId]) {
    w.u16(glyphs.len() as u16);
    for g in glyphs {
        w.u16(g.to_u16());
    }
}

fn encode_ligature_set(w: &mut Writer, set: &[Ligature]) {
    w.u16(set.len() as u16);
    let slots: Vec<usize> = set.iter().map(|_| w.reserve_u16()).collect();
    for (slot, lig) in slots.into_iter().zip(set) {
        let here = w.len();
        w.patch_u16(slot, here as u16);
        w.u16(lig.glyph.to_u16());
        w.u16((lig.components.len() + 1) as u16);
        for gid in &lig.components {
            w.u16(gid.to_u16());
        }
    }
}

fn decode_glyph_array(data: &[u8]) -> Result<Vec<GlyphId>> {
    let mut cur = Cursor::new(data);
    let count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(GlyphId::new(cur.read_u16(SUBSYSTEM)?));
    }
    Ok(out)
}

fn decode_ligature_set(data: &[u8]) -> Result<Vec<Ligature>> {
    let mut cur = Cursor::new(data);
    let count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
    }
    let mut out = Vec::with_capacity(count);
    for off in offsets {
        let mut lig_cur = Cursor::new(cur.slice_from(off)?);
        let glyph = GlyphId::new(lig_cur.read_u16(SUBSYSTEM)?);
        let comp_count = lig_cur.read_u16(SUBSYSTEM)? as usize;
        if comp_count == 0 {
            return Err(Error::malformed(SUBSYSTEM, "ligature has zero components"));
        }
        let mut components = Vec::with_capacity(comp_count - 1);
        for _ in 1..comp_count {
            components.push(GlyphId::new(lig_cur.read_u16(SUBSYSTEM)?));
        }
        out.push(Ligature { glyph, components });
    }
    Ok(out)
}

/// Match a ligature's component sequence (the glyphs after the first,
/// which selected the ligature set via coverage) against kept positions
/// starting just after `a`.
fn match_component_sequence<F: Fn(usize) -> GlyphId>(
    components: &[GlyphId],
    gid_at: &F,
    len: usize,
    a: usize,
    keep: &Keep,
) -> Option<Vec<usize>> {
    let mut positions = vec![a];
    let mut pos = a;
    for want in components {
        pos = keep.advance_kept(gid_at, len, pos + 1)?;
        if gid_at(pos) != *want {
            return None;
        }
        positions.push(pos);
    }
    Some(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gdef::Gdef;
    use crate::keep::LookupFlag;

    fn entries(gids: &[u16]) -> Vec<GlyphEntry> {
        gids.iter()
            .map(|&g| GlyphEntry::new(GlyphId::new(g), GlyphText::single('x')))
            .collect()
    }

    #[test]
    fn single_format1_applies_delta() {
        let coverage = Coverage::from_glyphs(&[GlyphId::new(5)]);
        let sub = GsubSubtable::Single {
            coverage,
            subst: SingleSubst::Delta(3),
        };
        let seq = entries(&[5]);
        let gdef = Gdef::empty();
        let keep = Keep::new(LookupFlag::empty(), None, &gdef);
        let m = sub.match_at(&seq, 0, &keep).unwrap();
        assert_eq!(m.replace.unwrap()[0].gid, GlyphId::new(8));
    }

    #[test]
    fn ligature_concatenates_text_and_skips_marks() {
        use crate::gdef::MarkAttachmentClass;
        use crate::glyph::GlyphClass;

        let coverage = Coverage::from_glyphs(&[GlyphId::new(1)]);
        let lig = Ligature {
            components: vec![GlyphId::new(2), GlyphId::new(3)],
            glyph: GlyphId::new(99),
        };
        let sub = GsubSubtable::Ligature {
            coverage,
            ligature_sets: vec![vec![lig]],
        };
        let seq = vec![
            GlyphEntry::new(GlyphId::new(1), GlyphText::single('f')),
            GlyphEntry::new(GlyphId::new(9), GlyphText::single('\u{301}')), // mark, ignored
            GlyphEntry::new(GlyphId::new(2), GlyphText::single('f')),
            GlyphEntry::new(GlyphId::new(3), GlyphText::single('i')),
        ];
        let mut classes = fnv::FnvHashMap::default();
        classes.insert(GlyphId::new(9), GlyphClass::Mark);
        let gdef = Gdef::new(classes, MarkAttachmentClass::default(), vec![]);
        let keep = Keep::new(LookupFlag::IGNORE_MARKS, None, &gdef);
        let m = sub.match_at(&seq, 0, &keep).unwrap();
        assert_eq!(m.input_positions, vec![0, 2, 3]);
        let replace = m.replace.unwrap();
        assert_eq!(replace.len(), 1);
        assert_eq!(replace[0].gid, GlyphId::new(99));
        assert_eq!(
            replace[0].text.chars().collect::<Vec<_>>(),
            vec!['f', 'f', 'i']
        );
    }

    #[test]
    fn single_roundtrips_through_encode_decode() {
        let coverage = Coverage::from_glyphs(&[GlyphId::new(5), GlyphId::new(6)]);
        let sub = GsubSubtable::Single {
            coverage,
            subst: SingleSubst::List(vec![GlyphId::new(50), GlyphId::new(60)]),
        };
        let bytes = sub.encode();
        let decoded = GsubSubtable::decode(1, &bytes).unwrap();
        assert_eq!(decoded.lookup_type(), 1);
        let seq = entries(&[6]);
        let gdef = Gdef::empty();
        let keep = Keep::new(LookupFlag::empty(), None, &gdef);
        let m = decoded.match_at(&seq, 0, &keep).unwrap();
        assert_eq!(m.replace.unwrap()[0].gid, GlyphId::new(60));
    }
}
