//! GPOS subtable representations and their matchers.
//!
//! Unlike GSUB, a GPOS match never changes the glyph at a position -- it
//! only adjusts `x_offset`/`y_offset`/`advance`. It is still reported
//! through `Match::replace` (same length, same glyph IDs, new numbers) so
//! the engine can splice it back with the same code path it uses for GSUB.

use font_types::GlyphId;

use crate::codec::cursor::{Cursor, Writer};
use crate::context::{ChainedSequenceContext, SequenceContext};
use crate::coverage::Coverage;
use crate::error::{Error, Result};
use crate::glyph::GlyphEntry;
use crate::keep::Keep;
use crate::matching::Match;
use crate::value_record::{ValueFormat, ValueRecord};

const SUBSYSTEM: &str = "gpos";

/// An anchor point: only the x/y coordinate is modeled. Contour-point
/// anchors (format 2) and device-table adjustments (format 3) are parsed
/// far enough to stay aligned but contribute no extra offset, since hinting
/// execution is out of scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
}

impl Anchor {
    fn decode(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let format = cur.read_u16(SUBSYSTEM)?;
        let x = cur.read_i16(SUBSYSTEM)?;
        let y = cur.read_i16(SUBSYSTEM)?;
        match format {
            1 => {}
            2 => {
                cur.read_u16(SUBSYSTEM)?; // anchor point index
            }
            3 => {
                cur.read_u16(SUBSYSTEM)?; // x device offset
                cur.read_u16(SUBSYSTEM)?; // y device offset
            }
            _ => return Err(Error::malformed(SUBSYSTEM, "unknown anchor format")),
        }
        Ok(Anchor { x, y })
    }

    fn encode(&self, w: &mut Writer) {
        w.u16(1);
        w.i16(self.x);
        w.i16(self.y);
    }
}

fn decode_anchor_offset(cur: &mut Cursor, base: &[u8]) -> Result<Option<Anchor>> {
    let off = cur.read_u16(SUBSYSTEM)? as usize;
    if off == 0 {
        return Ok(None);
    }
    Ok(Some(Anchor::decode(
        base.get(off..)
            .ok_or_else(|| Error::malformed(SUBSYSTEM, "anchor offset out of bounds"))?,
    )?))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryExit {
    pub entry: Option<Anchor>,
    pub exit: Option<Anchor>,
}

/// One mark glyph's attachment class and anchor, from a MarkArray.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkRecord {
    pub class: u16,
    pub anchor: Anchor,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GposSubtable {
    Single {
        coverage: Coverage,
        format: ValueFormat,
        records: SingleValues,
    },
    Pair(PairSubtable),
    Cursive {
        coverage: Coverage,
        entry_exit: Vec<EntryExit>,
    },
    MarkToBase {
        mark_coverage: Coverage,
        base_coverage: Coverage,
        mark_array: Vec<MarkRecord>,
        base_array: Vec<Vec<Anchor>>,
    },
    MarkToLigature {
        mark_coverage: Coverage,
        ligature_coverage: Coverage,
        mark_array: Vec<MarkRecord>,
        ligature_array: Vec<Vec<Vec<Anchor>>>,
    },
    MarkToMark {
        mark_coverage: Coverage,
        mark2_coverage: Coverage,
        mark_array: Vec<MarkRecord>,
        mark2_array: Vec<Vec<Anchor>>,
    },
    Context(SequenceContext),
    ChainContext(ChainedSequenceContext),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SingleValues {
    Shared(ValueRecord),
    PerGlyph(Vec<ValueRecord>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairSubtable {
    pub coverage: Coverage,
    pub value_format1: ValueFormat,
    pub value_format2: ValueFormat,
    pub kind: PairKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PairKind {
    /// Format 1: explicit (secondGlyph, value1, value2) pairs, grouped by
    /// the coverage index of the first glyph.
    Glyph(Vec<Vec<(GlyphId, ValueRecord, ValueRecord)>>),
    /// Format 2: a dense [class1][class2] matrix.
    Class {
        class_def1: crate::classdef::ClassDef,
        class_def2: crate::classdef::ClassDef,
        matrix: Vec<Vec<(ValueRecord, ValueRecord)>>,
    },
}

/// Shared by GPOS 4 and 6: place `entry`'s anchor so it coincides with
/// `base`'s, compensating for every glyph advance the pen has crossed
/// between `base_pos` and `mark_pos` (ordinarily just `base`'s own
/// advance -- marks attached in between contribute zero). Vertical
/// positioning needs no such compensation since advances are horizontal
/// only in this engine's model.
fn position_mark(
    entry: &mut GlyphEntry,
    base: &GlyphEntry,
    base_anchor: Anchor,
    mark_anchor: Anchor,
    base_pos: usize,
    mark_pos: usize,
    seq: &[GlyphEntry],
) {
    let advance_since_base: i32 = seq[base_pos..mark_pos].iter().map(|e| e.advance as i32).sum();
    let dx = base.x_offset as i32 + base_anchor.x as i32 - advance_since_base - mark_anchor.x as i32;
    let dy = base.y_offset as i32 + base_anchor.y as i32 - mark_anchor.y as i32;
    entry.x_offset = dx.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    entry.y_offset = dy.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
}

impl GposSubtable {
    pub fn lookup_type(&self) -> u16 {
        match self {
            GposSubtable::Single { .. } => 1,
            GposSubtable::Pair(_) => 2,
            GposSubtable::Cursive { .. } => 3,
            GposSubtable::MarkToBase { .. } => 4,
            GposSubtable::MarkToLigature { .. } => 5,
            GposSubtable::MarkToMark { .. } => 6,
            GposSubtable::Context(_) => 7,
            GposSubtable::ChainContext(_) => 8,
        }
    }

    pub fn match_at(&self, seq: &[GlyphEntry], a: usize, keep: &Keep) -> Option<Match> {
        let gid_at = |i: usize| seq[i].gid;
        let len = seq.len();
        match self {
            GposSubtable::Single {
                coverage,
                format,
                records,
            } => {
                let idx = coverage.get_index(gid_at(a))?;
                let record = match records {
                    SingleValues::Shared(r) => r,
                    SingleValues::PerGlyph(list) => list.get(idx as usize)?,
                };
                let mut entry = seq[a].clone();
                record.apply_to(&mut entry);
                let _ = format;
                Some(Match::replacing(vec![a], vec![entry], a + 1))
            }
            GposSubtable::Pair(pair) => {
                let idx = pair.coverage.get_index(gid_at(a))?;
                let next = keep.advance_kept(&gid_at, len, a + 1)?;
                let second = gid_at(next);
                let (v1, v2) = match &pair.kind {
                    PairKind::Glyph(sets) => {
                        let set = sets.get(idx as usize)?;
                        let (_, v1, v2) = set.iter().find(|(g, _, _)| *g == second)?;
                        (*v1, *v2)
                    }
                    PairKind::Class {
                        class_def1,
                        class_def2,
                        matrix,
                    } => {
                        let c1 = class_def1.get(gid_at(a)) as usize;
                        let c2 = class_def2.get(second) as usize;
                        let row = matrix.get(c1)?;
                        let (v1, v2) = *row.get(c2)?;
                        (v1, v2)
                    }
                };
                let mut first = seq[a].clone();
                v1.apply_to(&mut first);
                let mut second_entry = seq[next].clone();
                v2.apply_to(&mut second_entry);
                Some(Match::replacing(
                    vec![a, next],
                    vec![first, second_entry],
                    next + 1,
                ))
            }
            GposSubtable::Cursive {
                coverage,
                entry_exit,
            } => {
                let idx = coverage.get_index(gid_at(a))? as usize;
                let exit = entry_exit.get(idx)?.exit?;
                let next = keep.advance_kept(&gid_at, len, a + 1)?;
                let next_idx = coverage.get_index(gid_at(next))? as usize;
                let entry = entry_exit.get(next_idx)?.entry?;

                let mut prev = seq[a].clone();
                let mut next_entry = seq[next].clone();

                // Align the next glyph's entry anchor to this glyph's exit
                // anchor vertically, and shrink the exit glyph's advance so
                // its pen position lands exactly on the entry anchor
                // horizontally -- the two glyphs connect with no gap or
                // overlap along the baseline. Propagating the resulting
                // shift across an entire cursive run is the renderer's job,
                // not the shaping engine's.
                if keep.is_right_to_left() {
                    // With RIGHT_TO_LEFT, the chain anchors from the last
                    // glyph: `next`'s advance is trimmed back to its own
                    // entry anchor instead of `a`'s advance being trimmed
                    // to its exit anchor.
                    next_entry.y_offset = next_entry.y_offset.saturating_add(exit.y - entry.y);
                    next_entry.advance = entry.x.max(0) as u16;
                } else {
                    next_entry.y_offset = next_entry.y_offset.saturating_add(exit.y - entry.y);
                    prev.advance = (exit.x - entry.x).max(0) as u16;
                }
                Some(Match::replacing(vec![a, next], vec![prev, next_entry], next + 1))
            }
            GposSubtable::MarkToBase {
                mark_coverage,
                base_coverage,
                mark_array,
                base_array,
            } => {
                let mark_idx = mark_coverage.get_index(gid_at(a))? as usize;
                let mark = mark_array.get(mark_idx)?;
                let base_pos = keep.retreat_kept(&gid_at, a as isize - 1)?;
                let base_idx = base_coverage.get_index(gid_at(base_pos))? as usize;
                let base_anchor = *base_array.get(base_idx)?.get(mark.class as usize)?;
                let mut entry = seq[a].clone();
                position_mark(&mut entry, &seq[base_pos], base_anchor, mark.anchor, base_pos, a, seq);
                Some(Match::replacing(vec![a], vec![entry], a + 1))
            }
            GposSubtable::MarkToMark {
                mark_coverage,
                mark2_coverage,
                mark_array,
                mark2_array,
            } => {
                let mark_idx = mark_coverage.get_index(gid_at(a))? as usize;
                let mark = mark_array.get(mark_idx)?;
                let base_pos = keep.retreat_kept(&gid_at, a as isize - 1)?;
                let base_idx = mark2_coverage.get_index(gid_at(base_pos))? as usize;
                let base_anchor = *mark2_array.get(base_idx)?.get(mark.class as usize)?;
                let mut entry = seq[a].clone();
                position_mark(&mut entry, &seq[base_pos], base_anchor, mark.anchor, base_pos, a, seq);
                Some(Match::replacing(vec![a], vec![entry], a + 1))
            }
            // Mark-to-ligature attachment depends on which ligature
            // component the mark is over, information this engine's glyph
            // sequence does not track once ligation has collapsed the
            // components into one entry. Parsed for completeness; never
            // matches.
            GposSubtable::MarkToLigature { .. } => None,
            GposSubtable::Context(ctx) => ctx.match_at(gid_at, len, a, keep),
            GposSubtable::ChainContext(ctx) => ctx.match_at(gid_at, len, a, keep),
        }
    }

    pub fn decode(lookup_type: u16, data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        match lookup_type {
            1 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let value_format = ValueFormat::from_bits(cur.read_u16(SUBSYSTEM)?);
                let records = match format {
                    1 => SingleValues::Shared(ValueRecord::decode(&mut cur, value_format)?),
                    2 => {
                        let count = cur.read_u16(SUBSYSTEM)? as usize;
                        let mut list = Vec::with_capacity(count);
                        for _ in 0..count {
                            list.push(ValueRecord::decode(&mut cur, value_format)?);
                        }
                        SingleValues::PerGlyph(list)
                    }
                    _ => return Err(Error::malformed(SUBSYSTEM, "unknown single pos format")),
                };
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                Ok(GposSubtable::Single {
                    coverage,
                    format: value_format,
                    records,
                })
            }
            2 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let value_format1 = ValueFormat::from_bits(cur.read_u16(SUBSYSTEM)?);
                let value_format2 = ValueFormat::from_bits(cur.read_u16(SUBSYSTEM)?);
                let kind = match format {
                    1 => {
                        let count = cur.read_u16(SUBSYSTEM)? as usize;
                        let mut set_offsets = Vec::with_capacity(count);
                        for _ in 0..count {
                            set_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
                        }
                        let mut sets = Vec::with_capacity(count);
                        for off in set_offsets {
                            let set_bytes = cur.slice_from(off)?;
                            let mut set_cur = Cursor::new(set_bytes);
                            let pair_count = set_cur.read_u16(SUBSYSTEM)? as usize;
                            let mut pairs = Vec::with_capacity(pair_count);
                            for _ in 0..pair_count {
                                let second = GlyphId::new(set_cur.read_u16(SUBSYSTEM)?);
                                let v1 = ValueRecord::decode(&mut set_cur, value_format1)?;
                                let v2 = ValueRecord::decode(&mut set_cur, value_format2)?;
                                pairs.push((second, v1, v2));
                            }
                            sets.push(pairs);
                        }
                        PairKind::Glyph(sets)
                    }
                    2 => {
                        let class_def1_off = cur.read_u16(SUBSYSTEM)? as usize;
                        let class_def2_off = cur.read_u16(SUBSYSTEM)? as usize;
                        let class1_count = cur.read_u16(SUBSYSTEM)? as usize;
                        let class2_count = cur.read_u16(SUBSYSTEM)? as usize;
                        let mut matrix = Vec::with_capacity(class1_count);
                        for _ in 0..class1_count {
                            let mut row = Vec::with_capacity(class2_count);
                            for _ in 0..class2_count {
                                let v1 = ValueRecord::decode(&mut cur, value_format1)?;
                                let v2 = ValueRecord::decode(&mut cur, value_format2)?;
                                row.push((v1, v2));
                            }
                            matrix.push(row);
                        }
                        let class_def1 = crate::classdef::ClassDef::decode(cur.slice_from(class_def1_off)?)?;
                        let class_def2 = crate::classdef::ClassDef::decode(cur.slice_from(class_def2_off)?)?;
                        PairKind::Class {
                            class_def1,
                            class_def2,
                            matrix,
                        }
                    }
                    _ => return Err(Error::malformed(SUBSYSTEM, "unknown pair pos format")),
                };
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                Ok(GposSubtable::Pair(PairSubtable {
                    coverage,
                    value_format1,
                    value_format2,
                    kind,
                }))
            }
            3 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                if format != 1 {
                    return Err(Error::malformed(SUBSYSTEM, "unknown cursive pos format"));
                }
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut entry_exit = Vec::with_capacity(count);
                for _ in 0..count {
                    let entry = decode_anchor_offset(&mut cur, data)?;
                    let exit = decode_anchor_offset(&mut cur, data)?;
                    entry_exit.push(EntryExit { entry, exit });
                }
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                Ok(GposSubtable::Cursive {
                    coverage,
                    entry_exit,
                })
            }
            4 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                if format != 1 {
                    return Err(Error::malformed(SUBSYSTEM, "unknown mark-to-base format"));
                }
                let mark_cov_off = cur.read_u16(SUBSYSTEM)? as usize;
                let base_cov_off = cur.read_u16(SUBSYSTEM)? as usize;
                let class_count = cur.read_u16(SUBSYSTEM)? as usize;
                let mark_array_off = cur.read_u16(SUBSYSTEM)? as usize;
                let base_array_off = cur.read_u16(SUBSYSTEM)? as usize;
                let mark_array = decode_mark_array(cur.slice_from(mark_array_off)?)?;
                let base_array =
                    decode_base_array(cur.slice_from(base_array_off)?, class_count)?;
                let mark_coverage = Coverage::decode(cur.slice_from(mark_cov_off)?)?;
                let base_coverage = Coverage::decode(cur.slice_from(base_cov_off)?)?;
                Ok(GposSubtable::MarkToBase {
                    mark_coverage,
                    base_coverage,
                    mark_array,
                    base_array,
                })
            }
            5 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                if format != 1 {
                    return Err(Error::malformed(SUBSYSTEM, "unknown mark-to-ligature format"));
                }
                let mark_cov_off = cur.read_u16(SUBSYSTEM)? as usize;
                let lig_cov_off = cur.read_u16(SUBSYSTEM)? as usize;
                let class_count = cur.read_u16(SUBSYSTEM)? as usize;
                let mark_array_off = cur.read_u16(SUBSYSTEM)? as usize;
                let lig_array_off = cur.read_u16(SUBSYSTEM)? as usize;
                let mark_array = decode_mark_array(cur.slice_from(mark_array_off)?)?;
                let ligature_array =
                    decode_ligature_array(cur.slice_from(lig_array_off)?, class_count)?;
                let mark_coverage = Coverage::decode(cur.slice_from(mark_cov_off)?)?;
                let ligature_coverage = Coverage::decode(cur.slice_from(lig_cov_off)?)?;
                Ok(GposSubtable::MarkToLigature {
                    mark_coverage,
                    ligature_coverage,
                    mark_array,
                    ligature_array,
                })
            }
            6 => {
                let format = cur.read_u16(SUBSYSTEM)?;
                if format != 1 {
                    return Err(Error::malformed(SUBSYSTEM, "unknown mark-to-mark format"));
                }
                let mark_cov_off = cur.read_u16(SUBSYSTEM)? as usize;
                let mark2_cov_off = cur.read_u16(SUBSYSTEM)? as usize;
                let class_count = cur.read_u16(SUBSYSTEM)? as usize;
                let mark_array_off = cur.read_u16(SUBSYSTEM)? as usize;
                let mark2_array_off = cur.read_u16(SUBSYSTEM)? as usize;
                let mark_array = decode_mark_array(cur.slice_from(mark_array_off)?)?;
                let mark2_array =
                    decode_base_array(cur.slice_from(mark2_array_off)?, class_count)?;
                let mark_coverage = Coverage::decode(cur.slice_from(mark_cov_off)?)?;
                let mark2_coverage = Coverage::decode(cur.slice_from(mark2_cov_off)?)?;
                Ok(GposSubtable::MarkToMark {
                    mark_coverage,
                    mark2_coverage,
                    mark_array,
                    mark2_array,
                })
            }
            7 => Ok(GposSubtable::Context(SequenceContext::decode(data)?)),
            8 => Ok(GposSubtable::ChainContext(ChainedSequenceContext::decode(
                data,
            )?)),
            other => Err(if other == 9 {
                Error::invariant(SUBSYSTEM, "extension subtable must be unwrapped before decode")
            } else {
                Error::unsupported(SUBSYSTEM, "unknown GPOS lookup type")
            }),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        match self {
            GposSubtable::Single {
                coverage,
                format,
                records,
            } => {
                w.u16(1);
                let cov_slot = w.reserve_u16();
                w.u16(format.to_bits());
                match records {
                    SingleValues::Shared(record) => record.encode(&mut w, *format),
                    SingleValues::PerGlyph(list) => {
                        w.u16(list.len() as u16);
                        for record in list {
                            record.encode(&mut w, *format);
                        }
                    }
                }
                let here = w.len();
                w.patch_u16(cov_slot, here as u16);
                w.bytes(&Coverage::encode(&coverage.iter().collect::<Vec<_>>()));
                w.into_bytes()
            }
            GposSubtable::Pair(pair) => {
                match &pair.kind {
                    PairKind::Glyph(sets) => {
                        w.u16(1);
                        let cov_slot = w.reserve_u16();
                        w.u16(pair.value_format1.to_bits());
                        w.u16(pair.value_format2.to_bits());
                        w.u16(sets.len() as u16);
                        let slots: Vec<usize> = sets.iter().map(|_| w.reserve_u16()).collect();
                        for (slot, set) in slots.into_iter().zip(sets) {
                            let here = w.len();
                            w.patch_u16(slot, here as u16);
                            w.u16(set.len() as u16);
                            for (second, v1, v2) in set {
                                w.u16(second.to_u16());
                                v1.encode(&mut w, pair.value_format1);
                                v2.encode(&mut w, pair.value_format2);
                            }
                        }
                        let here = w.len();
                        w.patch_u16(cov_slot, here as u16);
                        w.bytes(&Coverage::encode(&pair.coverage.iter().collect::<Vec<_>>()));
                    }
                    PairKind::Class {
                        class_def1,
                        class_def2,
                        matrix,
                    } => {
                        w.u16(2);
                        let cov_slot = w.reserve_u16();
                        w.u16(pair.value_format1.to_bits());
                        w.u16(pair.value_format2.to_bits());
                        let cd1_slot = w.reserve_u16();
                        let cd2_slot = w.reserve_u16();
                        w.u16(matrix.len() as u16);
                        w.u16(matrix.first().map(|r| r.len()).unwrap_or(0) as u16);
                        for row in matrix {
                            for (v1, v2) in row {
                                v1.encode(&mut w, pair.value_format1);
                                v2.encode(&mut w, pair.value_format2);
                            }
                        }
                        let here = w.len();
                        w.patch_u16(cd1_slot, here as u16);
                        w.bytes(&class_def1.encode());
                        let here = w.len();
                        w.patch_u16(cd2_slot, here as u16);
                        w.bytes(&class_def2.encode());
                        let here = w.len();
                        w.patch_u16(cov_slot, here as u16);
                        w.bytes(&Coverage::encode(&pair.coverage.iter().collect::<Vec<_>>()));
                    }
                }
                w.into_bytes()
            }
            GposSubtable::Cursive {
                coverage,
                entry_exit,
            } => {
                w.u16(1);
                let cov_slot = w.reserve_u16();
                w.u16(entry_exit.len() as u16);
                let mut slots = Vec::with_capacity(entry_exit.len() * 2);
                for _ in entry_exit {
                    slots.push((w.reserve_u16(), w.reserve_u16()));
                }
                for ((entry_slot, exit_slot), ee) in slots.into_iter().zip(entry_exit) {
                    if let Some(a) = ee.entry {
                        let here = w.len();
                        w.patch_u16(entry_slot, here as u16);
                        a.encode(&mut w);
                    }
                    if let Some(a) = ee.exit {
                        let here = w.len();
                        w.patch_u16(exit_slot, here as u16);
                        a.encode(&mut w);
                    }
                }
                let here = w.len();
                w.patch_u16(cov_slot, here as u16);
                w.bytes(&Coverage::encode(&coverage.iter().collect::<Vec<_>>()));
                w.into_bytes()
            }
            GposSubtable::MarkToBase {
                mark_coverage,
                base_coverage,
                mark_array,
                base_array,
            } => {
                encode_mark_attach(
                    &mut w,
                    mark_coverage,
                    base_coverage,
                    mark_array,
                    base_array,
                );
                w.into_bytes()
            }
            GposSubtable::MarkToMark {
                mark_coverage,
                mark2_coverage,
                mark_array,
                mark2_array,
            } => {
                encode_mark_attach(
                    &mut w,
                    mark_coverage,
                    mark2_coverage,
                    mark_array,
                    mark2_array,
                );
                w.into_bytes()
            }
            GposSubtable::MarkToLigature {
                mark_coverage,
                ligature_coverage,
                mark_array,
                ligature_array,
            } => {
                w.u16(1);
                let mark_cov_slot = w.reserve_u16();
                let lig_cov_slot = w.reserve_u16();
                let class_count = ligature_array
                    .iter()
                    .flat_map(|lig| lig.iter().map(|c| c.len()))
                    .max()
                    .unwrap_or(0) as u16;
                w.u16(class_count);
                let mark_array_slot = w.reserve_u16();
                let lig_array_slot = w.reserve_u16();

                let here = w.len();
                w.patch_u16(mark_array_slot, here as u16);
                encode_mark_array(&mut w, mark_array);

                let here = w.len();
                w.patch_u16(lig_array_slot, here as u16);
                encode_ligature_array(&mut w, ligature_array);

                let here = w.len();
                w.patch_u16(mark_cov_slot, here as u16);
                w.bytes(&Coverage::encode(&mark_coverage.iter().collect::<Vec<_>>()));
                let here = w.len();
                w.patch_u16(lig_cov_slot, here as u16);
                w.bytes(&Coverage::encode(
                    &ligature_coverage.iter().collect::<Vec<_>>(),
                ));
                w.into_bytes()
            }
            GposSubtable::Context(ctx) => ctx.encode(),
            GposSubtable::ChainContext(ctx) => ctx.encode(),
        }
    }
}

fn encode_mark_attach(
    w: &mut Writer,
    mark_coverage: &Coverage,
    base_coverage: &Coverage,
    mark_array: &[MarkRecord],
    base_array: &[Vec<Anchor>],
) {
    w.u16(1);
    let mark_cov_slot = w.reserve_u16();
    let base_cov_slot = w.reserve_u16();
    let class_count = base_array.iter().map(|row| row.len()).max().unwrap_or(0) as u16;
    w.u16(class_count);
    let mark_array_slot = w.reserve_u16();
    let base_array_slot = w.reserve_u16();

    let here = w.len();
    w.patch_u16(mark_array_slot, here as u16);
    encode_mark_array(w, mark_array);

    let here = w.len();
    w.patch_u16(base_array_slot, here as u16);
    w.u16(base_array.len() as u16);
    for row in base_array {
        for anchor in row {
            anchor.encode(w);
        }
    }

    let here = w.len();
    w.patch_u16(mark_cov_slot, here as u16);
    w.bytes(&Coverage::encode(&mark_coverage.iter().collect::<Vec<_>>()));
    let here = w.len();
    w.patch_u16(base_cov_slot, here as u16);
    w.bytes(&Coverage::encode(&base_coverage.iter().collect::<Vec<_>>()));
}

fn encode_mark_array(w: &mut Writer, mark_array: &[MarkRecord]) {
    w.u16(mark_array.len() as u16);
    let slots: Vec<usize> = mark_array.iter().map(|_| w.reserve_u16()).collect();
    for (slot, mark) in slots.into_iter().zip(mark_array) {
        w.u16(mark.class);
        let here = w.len();
        w.patch_u16(slot, here as u16);
        mark.anchor.encode(w);
    }
}

fn encode_ligature_array(w: &mut Writer, ligature_array: &[Vec<Vec<Anchor>>]) {
    w.u16(ligature_array.len() as u16);
    let slots: Vec<usize> = ligature_array.iter().map(|_| w.reserve_u16()).collect();
    for (slot, lig) in slots.into_iter().zip(ligature_array) {
        let here = w.len();
        w.patch_u16(slot, here as u16);
        w.u16(lig.len() as u16);
        let comp_slots: Vec<usize> = lig.iter().map(|_| w.reserve_u16()).collect();
        for (comp_slot, classes) in comp_slots.into_iter().zip(lig) {
            let here = w.len();
            w.patch_u16(comp_slot, here as u16);
            for anchor in classes {
                anchor.encode(w);
            }
        }
    }
}

fn decode_mark_array(data: &[u8]) -> Result<Vec<MarkRecord>> {
    let mut cur = Cursor::new(data);
    let count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let class = cur.read_u16(SUBSYSTEM)?;
        let anchor_off = cur.read_u16(SUBSYSTEM)? as usize;
        let anchor = Anchor::decode(cur.slice_from(anchor_off)?)?;
        out.push(MarkRecord { class, anchor });
    }
    Ok(out)
}

fn decode_base_array(data: &[u8], class_count: usize) -> Result<Vec<Vec<Anchor>>> {
    let mut cur = Cursor::new(data);
    let count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut row = Vec::with_capacity(class_count);
        for _ in 0..class_count {
            let off = cur.read_u16(SUBSYSTEM)? as usize;
            row.push(if off == 0 {
                Anchor::default()
            } else {
                Anchor::decode(data.get(off..).ok_or_else(|| {
                    Error::malformed(SUBSYSTEM, "base anchor offset out of bounds")
                })?)?
            });
        }
        out.push(row);
    }
    Ok(out)
}

fn decode_ligature_array(data: &[u8], class_count: usize) -> Result<Vec<Vec<Vec<Anchor>>>> {
    let mut cur = Cursor::new(data);
    let count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
    }
    let mut out = Vec::with_capacity(count);
    for off in offsets {
        let lig_bytes = cur.slice_from(off)?;
        let mut lig_cur = Cursor::new(lig_bytes);
        let comp_count = lig_cur.read_u16(SUBSYSTEM)? as usize;
        let mut comp_offsets = Vec::with_capacity(comp_count);
        for _ in 0..comp_count {
            comp_offsets.push(lig_cur.read_u16(SUBSYSTEM)? as usize);
        }
        let mut components = Vec::with_capacity(comp_count);
        for comp_off in comp_offsets {
            let comp_bytes = lig_bytes
                .get(comp_off..)
                .ok_or_else(|| Error::malformed(SUBSYSTEM, "ligature attach offset out of bounds"))?;
            let mut comp_cur = Cursor::new(comp_bytes);
            let mut classes = Vec::with_capacity(class_count);
            for _ in 0..class_count {
                let a_off = comp_cur.read_u16(SUBSYSTEM)? as usize;
                classes.push(if a_off == 0 {
                    Anchor::default()
                } else {
                    Anchor::decode(comp_bytes.get(a_off..).ok_or_else(|| {
                        Error::malformed(SUBSYSTEM, "ligature anchor offset out of bounds")
                    })?)?
                });
            }
            components.push(classes);
        }
        out.push(components);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gdef::Gdef;
    use crate::glyph::GlyphText;
    use crate::keep::LookupFlag;

    #[test]
    fn single_applies_x_advance() {
        let coverage = Coverage::from_glyphs(&[GlyphId::new(5)]);
        let mut record = ValueRecord::default();
        record.x_advance = 50;
        let sub = GposSubtable::Single {
            coverage,
            format: ValueFormat::X_ADVANCE,
            records: SingleValues::Shared(record),
        };
        let seq = vec![GlyphEntry::new(GlyphId::new(5), GlyphText::single('a'))];
        let gdef = Gdef::empty();
        let keep = Keep::new(LookupFlag::empty(), None, &gdef);
        let m = sub.match_at(&seq, 0, &keep).unwrap();
        assert_eq!(m.replace.unwrap()[0].advance, 50);
    }

    #[test]
    fn cursive_aligns_entry_to_exit_and_trims_exit_glyph_advance() {
        let coverage = Coverage::from_glyphs(&[GlyphId::new(1), GlyphId::new(2)]);
        let entry_exit = vec![
            EntryExit {
                entry: None,
                exit: Some(Anchor { x: 30, y: 100 }),
            },
            EntryExit {
                entry: Some(Anchor { x: 5, y: 80 }),
                exit: None,
            },
        ];
        let sub = GposSubtable::Cursive {
            coverage,
            entry_exit,
        };
        let mut seq = vec![
            GlyphEntry::new(GlyphId::new(1), GlyphText::single('a')),
            GlyphEntry::new(GlyphId::new(2), GlyphText::single('b')),
        ];
        seq[0].advance = 200;
        let gdef = Gdef::empty();
        let keep = Keep::new(LookupFlag::empty(), None, &gdef);
        let m = sub.match_at(&seq, 0, &keep).unwrap();
        let replaced = m.replace.unwrap();
        assert_eq!(replaced[0].advance, 25); // exit.x - entry.x
        assert_eq!(replaced[1].y_offset, 20); // exit.y - entry.y
        assert_eq!(m.next, 2);
    }

    #[test]
    fn mark_to_base_compensates_for_base_advance() {
        let mark_coverage = Coverage::from_glyphs(&[GlyphId::new(20)]);
        let base_coverage = Coverage::from_glyphs(&[GlyphId::new(10)]);
        let mark_array = vec![MarkRecord {
            class: 0,
            anchor: Anchor { x: 5, y: 0 },
        }];
        let base_array = vec![vec![Anchor { x: 50, y: 400 }]];
        let sub = GposSubtable::MarkToBase {
            mark_coverage,
            base_coverage,
            mark_array,
            base_array,
        };
        let mut seq = vec![
            GlyphEntry::new(GlyphId::new(10), GlyphText::single('a')),
            GlyphEntry::new(GlyphId::new(20), GlyphText::single('^')),
        ];
        seq[0].advance = 300;
        let gdef = Gdef::empty();
        let keep = Keep::new(LookupFlag::empty(), None, &gdef);
        let m = sub.match_at(&seq, 1, &keep).unwrap();
        let replaced = &m.replace.unwrap()[0];
        // base anchor (50) minus the base's own advance (300) minus the
        // mark's own anchor (5): the mark sits far to the left of its pen
        // position to land back under the base's anchor.
        assert_eq!(replaced.x_offset, 50 - 300 - 5);
        assert_eq!(replaced.y_offset, 400);
    }

    #[test]
    fn pair_format1_adjusts_both_glyphs() {
        let coverage = Coverage::from_glyphs(&[GlyphId::new(1)]);
        let mut v1 = ValueRecord::default();
        v1.x_advance = 10;
        let mut v2 = ValueRecord::default();
        v2.y_placement = 5;
        let pair = PairSubtable {
            coverage,
            value_format1: ValueFormat::X_ADVANCE,
            value_format2: ValueFormat::Y_PLACEMENT,
            kind: PairKind::Glyph(vec![vec![(GlyphId::new(2), v1, v2)]]),
        };
        let sub = GposSubtable::Pair(pair);
        let seq = vec![
            GlyphEntry::new(GlyphId::new(1), GlyphText::single('a')),
            GlyphEntry::new(GlyphId::new(2), GlyphText::single('b')),
        ];
        let gdef = Gdef::empty();
        let keep = Keep::new(LookupFlag::empty(), None, &gdef);
        let m = sub.match_at(&seq, 0, &keep).unwrap();
        let replace = m.replace.unwrap();
        assert_eq!(replace[0].advance, 10);
        assert_eq!(replace[1].y_offset, 5);
    }
}
