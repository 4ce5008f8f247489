//! Sequence context and chained sequence context: the glyph-context-sniffing
//! machinery shared by GSUB lookup types 5/6 and GPOS lookup types 7/8.
//!
//! All three formats (glyph-list, class-based, coverage-based) boil down to
//! the same shape: find a run of positions that line up with a rule, then
//! fire a list of nested lookups at specific offsets into that run. Only the
//! "does this rule's input line up" test differs between formats, so that
//! part is factored into `match_sequence`.

use font_types::GlyphId;

use crate::classdef::ClassDef;
use crate::codec::cursor::{Cursor, Writer};
use crate::coverage::Coverage;
use crate::error::{Error, Result};
use crate::keep::Keep;
use crate::matching::{Match, NestedLookup};

const SUBSYSTEM: &str = "context";

/// One lookup-bearing rule: an input sequence (encoded either as raw glyph
/// IDs or as class values, depending on the owning format) plus the nested
/// lookups it fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceRule {
    /// The full input sequence, including the first glyph (which, on the
    /// wire, is implied by the coverage/class that selected this rule set).
    pub input: Vec<u16>,
    pub actions: Vec<NestedLookup>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SequenceRuleSet {
    pub rules: Vec<SequenceRule>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainedSequenceRule {
    pub backtrack: Vec<u16>,
    pub input: Vec<u16>,
    pub lookahead: Vec<u16>,
    pub actions: Vec<NestedLookup>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ChainedSequenceRuleSet {
    pub rules: Vec<ChainedSequenceRule>,
}

/// GSUB 5 / GPOS 7: plain sequence context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceContext {
    Format1 {
        coverage: Coverage,
        rule_sets: Vec<Option<SequenceRuleSet>>,
    },
    Format2 {
        coverage: Coverage,
        class_def: ClassDef,
        rule_sets: Vec<Option<SequenceRuleSet>>,
    },
    Format3 {
        coverages: Vec<Coverage>,
        actions: Vec<NestedLookup>,
    },
}

/// GSUB 6 / GPOS 8: sequence context with backtrack/lookahead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainedSequenceContext {
    Format1 {
        coverage: Coverage,
        rule_sets: Vec<Option<ChainedSequenceRuleSet>>,
    },
    Format2 {
        coverage: Coverage,
        backtrack_class_def: ClassDef,
        input_class_def: ClassDef,
        lookahead_class_def: ClassDef,
        rule_sets: Vec<Option<ChainedSequenceRuleSet>>,
    },
    Format3 {
        backtrack_coverages: Vec<Coverage>,
        input_coverages: Vec<Coverage>,
        lookahead_coverages: Vec<Coverage>,
        actions: Vec<NestedLookup>,
    },
}

/// Match a run of input positions starting at `a` against `input`, where
/// `test` decides whether the glyph at a position satisfies the
/// corresponding raw value (a glyph ID for format 1, a class for format 2).
/// Positions after the first are found by skipping glyphs `keep` rejects,
/// matching GSUB/GPOS's "ignore these glyphs as if they weren't there" rule.
fn match_sequence<F, P>(
    input: &[u16],
    gid_at: &F,
    len: usize,
    a: usize,
    keep: &Keep,
    test: P,
) -> Option<Vec<usize>>
where
    F: Fn(usize) -> GlyphId,
    P: Fn(GlyphId, u16) -> bool,
{
    let mut positions = Vec::with_capacity(input.len());
    let mut pos = a;
    for (i, want) in input.iter().enumerate() {
        // index 0 is the glyph that selected this rule set via coverage or
        // class; it is known to match by construction and is not re-tested
        // (the wire format doesn't even encode it).
        if i == 0 {
            positions.push(pos);
            continue;
        }
        pos = keep.advance_kept(gid_at, len, pos + 1)?;
        if !test(gid_at(pos), *want) {
            return None;
        }
        positions.push(pos);
    }
    Some(positions)
}

fn match_backtrack<F, P>(
    backtrack: &[u16],
    gid_at: &F,
    a: usize,
    keep: &Keep,
    test: P,
) -> Option<()>
where
    F: Fn(usize) -> GlyphId,
    P: Fn(GlyphId, u16) -> bool,
{
    let mut pos = a as isize - 1;
    for want in backtrack {
        let found = keep.retreat_kept(gid_at, pos)?;
        if !test(gid_at(found), *want) {
            return None;
        }
        pos = found as isize - 1;
    }
    Some(())
}

fn match_lookahead<F, P>(
    lookahead: &[u16],
    gid_at: &F,
    len: usize,
    after: usize,
    keep: &Keep,
    test: P,
) -> Option<()>
where
    F: Fn(usize) -> GlyphId,
    P: Fn(GlyphId, u16) -> bool,
{
    let mut pos = after;
    for want in lookahead {
        pos = keep.advance_kept(gid_at, len, pos)?;
        if !test(gid_at(pos), *want) {
            return None;
        }
        pos += 1;
    }
    Some(())
}

impl SequenceContext {
    pub fn match_at<F: Fn(usize) -> GlyphId>(
        &self,
        gid_at: F,
        len: usize,
        a: usize,
        keep: &Keep,
    ) -> Option<Match> {
        match self {
            SequenceContext::Format1 {
                coverage,
                rule_sets,
            } => {
                let idx = coverage.get_index(gid_at(a))? as usize;
                let rule_set = rule_sets.get(idx)?.as_ref()?;
                for rule in &rule_set.rules {
                    let test = |gid: GlyphId, want: u16| gid.to_u16() == want;
                    if let Some(positions) =
                        match_sequence(&rule.input, &gid_at, len, a, keep, test)
                    {
                        let next = positions.last().copied().unwrap_or(a) + 1;
                        return Some(Match::contextual(positions, rule.actions.clone(), next));
                    }
                }
                None
            }
            SequenceContext::Format2 {
                coverage,
                class_def,
                rule_sets,
            } => {
                coverage.get_index(gid_at(a))?;
                let class = class_def.get(gid_at(a)) as usize;
                let rule_set = rule_sets.get(class)?.as_ref()?;
                for rule in &rule_set.rules {
                    let test = |gid: GlyphId, want: u16| class_def.get(gid) == want;
                    if let Some(positions) =
                        match_sequence(&rule.input, &gid_at, len, a, keep, test)
                    {
                        let next = positions.last().copied().unwrap_or(a) + 1;
                        return Some(Match::contextual(positions, rule.actions.clone(), next));
                    }
                }
                None
            }
            SequenceContext::Format3 {
                coverages,
                actions,
            } => {
                let mut positions = Vec::with_capacity(coverages.len());
                let mut pos = a;
                for (i, cov) in coverages.iter().enumerate() {
                    if i > 0 {
                        pos = keep.advance_kept(&gid_at, len, pos + 1)?;
                    }
                    cov.contains(gid_at(pos)).then_some(())?;
                    positions.push(pos);
                }
                let next = positions.last().copied().unwrap_or(a) + 1;
                Some(Match::contextual(positions, actions.clone(), next))
            }
        }
    }

    /// Re-encode this subtable. Only used to round-trip an already-decoded
    /// LookupList; this crate never synthesizes new contextual rules.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        match self {
            SequenceContext::Format1 {
                coverage,
                rule_sets,
            } => {
                w.u16(1);
                let cov_slot = w.reserve_u16();
                w.u16(rule_sets.len() as u16);
                let slots: Vec<usize> = rule_sets.iter().map(|_| w.reserve_u16()).collect();
                for (slot, rs) in slots.into_iter().zip(rule_sets) {
                    match rs {
                        None => w.patch_u16(slot, 0),
                        Some(rs) => {
                            let here = w.len();
                            w.patch_u16(slot, here as u16);
                            encode_rule_set(&mut w, rs);
                        }
                    }
                }
                patch_coverage(&mut w, cov_slot, coverage);
            }
            SequenceContext::Format2 {
                coverage,
                class_def,
                rule_sets,
            } => {
                w.u16(2);
                let cov_slot = w.reserve_u16();
                let class_slot = w.reserve_u16();
                w.u16(rule_sets.len() as u16);
                let slots: Vec<usize> = rule_sets.iter().map(|_| w.reserve_u16()).collect();
                for (slot, rs) in slots.into_iter().zip(rule_sets) {
                    match rs {
                        None => w.patch_u16(slot, 0),
                        Some(rs) => {
                            let here = w.len();
                            w.patch_u16(slot, here as u16);
                            encode_rule_set(&mut w, rs);
                        }
                    }
                }
                {
                    let here = w.len();
                    w.patch_u16(class_slot, here as u16);
                    w.bytes(&class_def.encode());
                }
                patch_coverage(&mut w, cov_slot, coverage);
            }
            SequenceContext::Format3 { coverages, actions } => {
                w.u16(3);
                w.u16(coverages.len() as u16);
                w.u16(actions.len() as u16);
                let slots: Vec<usize> = coverages.iter().map(|_| w.reserve_u16()).collect();
                encode_lookup_records(&mut w, actions);
                for (slot, cov) in slots.into_iter().zip(coverages) {
                    let here = w.len();
                    w.patch_u16(slot, here as u16);
                    w.bytes(&Coverage::encode(&cov.iter().collect::<Vec<_>>()));
                }
            }
        }
        w.into_bytes()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let format = cur.read_u16(SUBSYSTEM)?;
        match format {
            1 => {
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut rule_sets = Vec::with_capacity(count);
                for _ in 0..count {
                    let off = cur.read_u16(SUBSYSTEM)? as usize;
                    rule_sets.push(if off == 0 {
                        None
                    } else {
                        Some(decode_rule_set(cur.slice_from(off)?)?)
                    });
                }
                Ok(SequenceContext::Format1 {
                    coverage,
                    rule_sets,
                })
            }
            2 => {
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let class_def_off = cur.read_u16(SUBSYSTEM)? as usize;
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                let class_def = ClassDef::decode(cur.slice_from(class_def_off)?)?;
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut rule_sets = Vec::with_capacity(count);
                for _ in 0..count {
                    let off = cur.read_u16(SUBSYSTEM)? as usize;
                    rule_sets.push(if off == 0 {
                        None
                    } else {
                        Some(decode_rule_set(cur.slice_from(off)?)?)
                    });
                }
                Ok(SequenceContext::Format2 {
                    coverage,
                    class_def,
                    rule_sets,
                })
            }
            3 => {
                let glyph_count = cur.read_u16(SUBSYSTEM)? as usize;
                let lookup_count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut cov_offsets = Vec::with_capacity(glyph_count);
                for _ in 0..glyph_count {
                    cov_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
                }
                let actions = decode_lookup_records(&mut cur, lookup_count)?;
                let mut coverages = Vec::with_capacity(glyph_count);
                for off in cov_offsets {
                    coverages.push(Coverage::decode(cur.slice_from(off)?)?);
                }
                Ok(SequenceContext::Format3 { coverages, actions })
            }
            _ => Err(Error::malformed(SUBSYSTEM, "unknown sequence context format")),
        }
    }
}

impl ChainedSequenceContext {
    #[allow(clippy::too_many_arguments)]
    pub fn match_at<F: Fn(usize) -> GlyphId>(
        &self,
        gid_at: F,
        len: usize,
        a: usize,
        keep: &Keep,
    ) -> Option<Match> {
        match self {
            ChainedSequenceContext::Format1 {
                coverage,
                rule_sets,
            } => {
                let idx = coverage.get_index(gid_at(a))? as usize;
                let rule_set = rule_sets.get(idx)?.as_ref()?;
                let glyph_test = |gid: GlyphId, want: u16| gid.to_u16() == want;
                for rule in &rule_set.rules {
                    if let Some(m) = try_chained_rule(
                        rule, &gid_at, len, a, keep, glyph_test, glyph_test, glyph_test,
                    ) {
                        return Some(m);
                    }
                }
                None
            }
            ChainedSequenceContext::Format2 {
                coverage,
                backtrack_class_def,
                input_class_def,
                lookahead_class_def,
                rule_sets,
            } => {
                coverage.get_index(gid_at(a))?;
                let class = input_class_def.get(gid_at(a)) as usize;
                let rule_set = rule_sets.get(class)?.as_ref()?;
                let bt_test = |gid: GlyphId, want: u16| backtrack_class_def.get(gid) == want;
                let in_test = |gid: GlyphId, want: u16| input_class_def.get(gid) == want;
                let la_test = |gid: GlyphId, want: u16| lookahead_class_def.get(gid) == want;
                for rule in &rule_set.rules {
                    if let Some(m) =
                        try_chained_rule(rule, &gid_at, len, a, keep, bt_test, in_test, la_test)
                    {
                        return Some(m);
                    }
                }
                None
            }
            ChainedSequenceContext::Format3 {
                backtrack_coverages,
                input_coverages,
                lookahead_coverages,
                actions,
            } => {
                let mut pos = a as isize - 1;
                for cov in backtrack_coverages {
                    let found = keep.retreat_kept(&gid_at, pos)?;
                    cov.contains(gid_at(found)).then_some(())?;
                    pos = found as isize - 1;
                }

                let mut positions = Vec::with_capacity(input_coverages.len());
                let mut fwd = a;
                for (i, cov) in input_coverages.iter().enumerate() {
                    if i > 0 {
                        fwd = keep.advance_kept(&gid_at, len, fwd + 1)?;
                    }
                    cov.contains(gid_at(fwd)).then_some(())?;
                    positions.push(fwd);
                }

                let mut after = positions.last().copied().unwrap_or(a) + 1;
                for cov in lookahead_coverages {
                    after = keep.advance_kept(&gid_at, len, after)?;
                    cov.contains(gid_at(after)).then_some(())?;
                    after += 1;
                }

                let next = positions.last().copied().unwrap_or(a) + 1;
                Some(Match::contextual(positions, actions.clone(), next))
            }
        }
    }

    /// Re-encode this subtable; see [`SequenceContext::encode`].
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        match self {
            ChainedSequenceContext::Format1 {
                coverage,
                rule_sets,
            } => {
                w.u16(1);
                let cov_slot = w.reserve_u16();
                w.u16(rule_sets.len() as u16);
                let slots: Vec<usize> = rule_sets.iter().map(|_| w.reserve_u16()).collect();
                for (slot, rs) in slots.into_iter().zip(rule_sets) {
                    match rs {
                        None => w.patch_u16(slot, 0),
                        Some(rs) => {
                            let here = w.len();
                            w.patch_u16(slot, here as u16);
                            encode_chained_rule_set(&mut w, rs);
                        }
                    }
                }
                patch_coverage(&mut w, cov_slot, coverage);
            }
            ChainedSequenceContext::Format2 {
                coverage,
                backtrack_class_def,
                input_class_def,
                lookahead_class_def,
                rule_sets,
            } => {
                w.u16(2);
                let cov_slot = w.reserve_u16();
                let bt_slot = w.reserve_u16();
                let in_slot = w.reserve_u16();
                let la_slot = w.reserve_u16();
                w.u16(rule_sets.len() as u16);
                let slots: Vec<usize> = rule_sets.iter().map(|_| w.reserve_u16()).collect();
                for (slot, rs) in slots.into_iter().zip(rule_sets) {
                    match rs {
                        None => w.patch_u16(slot, 0),
                        Some(rs) => {
                            let here = w.len();
                            w.patch_u16(slot, here as u16);
                            encode_chained_rule_set(&mut w, rs);
                        }
                    }
                }
                for (slot, cd) in [
                    (bt_slot, backtrack_class_def),
                    (in_slot, input_class_def),
                    (la_slot, lookahead_class_def),
                ] {
                    let here = w.len();
                    w.patch_u16(slot, here as u16);
                    w.bytes(&cd.encode());
                }
                patch_coverage(&mut w, cov_slot, coverage);
            }
            ChainedSequenceContext::Format3 {
                backtrack_coverages,
                input_coverages,
                lookahead_coverages,
                actions,
            } => {
                w.u16(3);
                w.u16(backtrack_coverages.len() as u16);
                let bt_slots: Vec<usize> =
                    backtrack_coverages.iter().map(|_| w.reserve_u16()).collect();
                w.u16(input_coverages.len() as u16);
                let in_slots: Vec<usize> =
                    input_coverages.iter().map(|_| w.reserve_u16()).collect();
                w.u16(lookahead_coverages.len() as u16);
                let la_slots: Vec<usize> =
                    lookahead_coverages.iter().map(|_| w.reserve_u16()).collect();
                w.u16(actions.len() as u16);
                encode_lookup_records(&mut w, actions);
                for (slots, covs) in [
                    (bt_slots, backtrack_coverages),
                    (in_slots, input_coverages),
                    (la_slots, lookahead_coverages),
                ] {
                    for (slot, cov) in slots.into_iter().zip(covs) {
                        let here = w.len();
                        w.patch_u16(slot, here as u16);
                        w.bytes(&Coverage::encode(&cov.iter().collect::<Vec<_>>()));
                    }
                }
            }
        }
        w.into_bytes()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let format = cur.read_u16(SUBSYSTEM)?;
        match format {
            1 => {
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut rule_sets = Vec::with_capacity(count);
                for _ in 0..count {
                    let off = cur.read_u16(SUBSYSTEM)? as usize;
                    rule_sets.push(if off == 0 {
                        None
                    } else {
                        Some(decode_chained_rule_set(cur.slice_from(off)?)?)
                    });
                }
                Ok(ChainedSequenceContext::Format1 {
                    coverage,
                    rule_sets,
                })
            }
            2 => {
                let coverage_off = cur.read_u16(SUBSYSTEM)? as usize;
                let bt_off = cur.read_u16(SUBSYSTEM)? as usize;
                let in_off = cur.read_u16(SUBSYSTEM)? as usize;
                let la_off = cur.read_u16(SUBSYSTEM)? as usize;
                let coverage = Coverage::decode(cur.slice_from(coverage_off)?)?;
                let backtrack_class_def = ClassDef::decode(cur.slice_from(bt_off)?)?;
                let input_class_def = ClassDef::decode(cur.slice_from(in_off)?)?;
                let lookahead_class_def = ClassDef::decode(cur.slice_from(la_off)?)?;
                let count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut rule_sets = Vec::with_capacity(count);
                for _ in 0..count {
                    let off = cur.read_u16(SUBSYSTEM)? as usize;
                    rule_sets.push(if off == 0 {
                        None
                    } else {
                        Some(decode_chained_rule_set(cur.slice_from(off)?)?)
                    });
                }
                Ok(ChainedSequenceContext::Format2 {
                    coverage,
                    backtrack_class_def,
                    input_class_def,
                    lookahead_class_def,
                    rule_sets,
                })
            }
            3 => {
                let bt_count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut bt_offsets = Vec::with_capacity(bt_count);
                for _ in 0..bt_count {
                    bt_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
                }
                let in_count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut in_offsets = Vec::with_capacity(in_count);
                for _ in 0..in_count {
                    in_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
                }
                let la_count = cur.read_u16(SUBSYSTEM)? as usize;
                let mut la_offsets = Vec::with_capacity(la_count);
                for _ in 0..la_count {
                    la_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
                }
                let lookup_count = cur.read_u16(SUBSYSTEM)? as usize;
                let actions = decode_lookup_records(&mut cur, lookup_count)?;

                let decode_covs = |offsets: &[usize]| -> Result<Vec<Coverage>> {
                    offsets
                        .iter()
                        .map(|&off| Coverage::decode(cur.slice_from(off)?))
                        .collect()
                };
                let backtrack_coverages = decode_covs(&bt_offsets)?;
                let input_coverages = decode_covs(&in_offsets)?;
                let lookahead_coverages = decode_covs(&la_offsets)?;

                Ok(ChainedSequenceContext::Format3 {
                    backtrack_coverages,
                    input_coverages,
                    lookahead_coverages,
                    actions,
                })
            }
            _ => Err(Error::malformed(
                SUBSYSTEM,
                "unknown chained sequence context format",
            )),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn try_chained_rule<F, PB, PI, PL>(
    rule: &ChainedSequenceRule,
    gid_at: &F,
    len: usize,
    a: usize,
    keep: &Keep,
    bt_test: PB,
    in_test: PI,
    la_test: PL,
) -> Option<Match>
where
    F: Fn(usize) -> GlyphId,
    PB: Fn(GlyphId, u16) -> bool,
    PI: Fn(GlyphId, u16) -> bool,
    PL: Fn(GlyphId, u16) -> bool,
{
    match_backtrack(&rule.backtrack, gid_at, a, keep, bt_test)?;
    let positions = match_sequence(&rule.input, gid_at, len, a, keep, in_test)?;
    let after = positions.last().copied().unwrap_or(a) + 1;
    match_lookahead(&rule.lookahead, gid_at, len, after, keep, la_test)?;
    let next = positions.last().copied().unwrap_or(a) + 1;
    Some(Match::contextual(positions, rule.actions.clone(), next))
}

fn decode_lookup_records(cur: &mut Cursor, count: usize) -> Result<Vec<NestedLookup>> {
    let mut actions = Vec::with_capacity(count);
    for _ in 0..count {
        let sequence_index = cur.read_u16(SUBSYSTEM)?;
        let lookup_index = cur.read_u16(SUBSYSTEM)?;
        actions.push(NestedLookup {
            sequence_index,
            lookup_index,
        });
    }
    Ok(actions)
}

fn patch_coverage(w: &mut Writer, slot: usize, coverage: &Coverage) {
    let here = w.len();
    w.patch_u16(slot, here as u16);
    w.bytes(&Coverage::encode(&coverage.iter().collect::<Vec<_>>()));
}

fn encode_lookup_records(w: &mut Writer, actions: &[NestedLookup]) {
    for action in actions {
        w.u16(action.sequence_index);
        w.u16(action.lookup_index);
    }
}

fn encode_rule_set(w: &mut Writer, rule_set: &SequenceRuleSet) {
    w.u16(rule_set.rules.len() as u16);
    let slots: Vec<usize> = rule_set.rules.iter().map(|_| w.reserve_u16()).collect();
    for (slot, rule) in slots.into_iter().zip(&rule_set.rules) {
        let here = w.len();
        w.patch_u16(slot, here as u16);
        w.u16(rule.input.len() as u16);
        w.u16(rule.actions.len() as u16);
        for want in rule.input.iter().skip(1) {
            w.u16(*want);
        }
        encode_lookup_records(w, &rule.actions);
    }
}

fn encode_chained_rule_set(w: &mut Writer, rule_set: &ChainedSequenceRuleSet) {
    w.u16(rule_set.rules.len() as u16);
    let slots: Vec<usize> = rule_set.rules.iter().map(|_| w.reserve_u16()).collect();
    for (slot, rule) in slots.into_iter().zip(&rule_set.rules) {
        let here = w.len();
        w.patch_u16(slot, here as u16);
        w.u16(rule.backtrack.len() as u16);
        for want in &rule.backtrack {
            w.u16(*want);
        }
        w.u16(rule.input.len() as u16);
        for want in rule.input.iter().skip(1) {
            w.u16(*want);
        }
        w.u16(rule.lookahead.len() as u16);
        for want in &rule.lookahead {
            w.u16(*want);
        }
        w.u16(rule.actions.len() as u16);
        encode_lookup_records(w, &rule.actions);
    }
}

fn decode_rule_set(data: &[u8]) -> Result<SequenceRuleSet> {
    let mut cur = Cursor::new(data);
    let count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
    }
    let mut rules = Vec::with_capacity(count);
    for off in offsets {
        rules.push(decode_rule(cur.slice_from(off)?)?);
    }
    Ok(SequenceRuleSet { rules })
}

fn decode_rule(data: &[u8]) -> Result<SequenceRule> {
    let mut cur = Cursor::new(data);
    let glyph_count = cur.read_u16(SUBSYSTEM)? as usize;
    if glyph_count == 0 {
        return Err(Error::malformed(SUBSYSTEM, "sequence rule has zero glyphs"));
    }
    let lookup_count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut input = Vec::with_capacity(glyph_count);
    // the wire format omits the first glyph: it is implied by the coverage
    // or class that selected this rule set.
    input.push(0);
    for _ in 1..glyph_count {
        input.push(cur.read_u16(SUBSYSTEM)?);
    }
    let actions = decode_lookup_records(&mut cur, lookup_count)?;
    Ok(SequenceRule { input, actions })
}

fn decode_chained_rule_set(data: &[u8]) -> Result<ChainedSequenceRuleSet> {
    let mut cur = Cursor::new(data);
    let count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
    }
    let mut rules = Vec::with_capacity(count);
    for off in offsets {
        rules.push(decode_chained_rule(cur.slice_from(off)?)?);
    }
    Ok(ChainedSequenceRuleSet { rules })
}

fn decode_chained_rule(data: &[u8]) -> Result<ChainedSequenceRule> {
    let mut cur = Cursor::new(data);
    let bt_count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut backtrack = Vec::with_capacity(bt_count);
    for _ in 0..bt_count {
        backtrack.push(cur.read_u16(SUBSYSTEM)?);
    }
    let in_count = cur.read_u16(SUBSYSTEM)? as usize;
    if in_count == 0 {
        return Err(Error::malformed(SUBSYSTEM, "chained rule has zero input glyphs"));
    }
    let mut input = Vec::with_capacity(in_count);
    input.push(0);
    for _ in 1..in_count {
        input.push(cur.read_u16(SUBSYSTEM)?);
    }
    let la_count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut lookahead = Vec::with_capacity(la_count);
    for _ in 0..la_count {
        lookahead.push(cur.read_u16(SUBSYSTEM)?);
    }
    let lookup_count = cur.read_u16(SUBSYSTEM)? as usize;
    let actions = decode_lookup_records(&mut cur, lookup_count)?;
    Ok(ChainedSequenceRule {
        backtrack,
        input,
        lookahead,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gdef::Gdef;
    use crate::keep::LookupFlag;

    fn no_filter() -> Gdef {
        Gdef::empty()
    }

    #[test]
    fn format1_matches_input_sequence() {
        let coverage = Coverage::from_glyphs(&[GlyphId::new(10)]);
        let rule = SequenceRule {
            input: vec![10, 20, 30],
            actions: vec![NestedLookup {
                sequence_index: 1,
                lookup_index: 0,
            }],
        };
        let ctx = SequenceContext::Format1 {
            coverage,
            rule_sets: vec![Some(SequenceRuleSet { rules: vec![rule] })],
        };
        let seq = [10u16, 20, 30];
        let gid_at = |i: usize| GlyphId::new(seq[i]);
        let gdef = no_filter();
        let keep = Keep::new(LookupFlag::empty(), None, &gdef);
        let m = ctx.match_at(gid_at, seq.len(), 0, &keep).unwrap();
        assert_eq!(m.input_positions, vec![0, 1, 2]);
        assert_eq!(m.actions[0].lookup_index, 0);
    }

    #[test]
    fn format1_skips_ignored_glyphs_between_inputs() {
        use crate::gdef::MarkAttachmentClass;
        use crate::glyph::GlyphClass;

        let coverage = Coverage::from_glyphs(&[GlyphId::new(10)]);
        let rule = SequenceRule {
            input: vec![10, 30],
            actions: vec![],
        };
        let ctx = SequenceContext::Format1 {
            coverage,
            rule_sets: vec![Some(SequenceRuleSet { rules: vec![rule] })],
        };
        // position 1 (gid 99) is a mark that IGNORE_MARKS hides.
        let seq = [10u16, 99, 30];
        let gid_at = |i: usize| GlyphId::new(seq[i]);
        let mut classes = fnv::FnvHashMap::default();
        classes.insert(GlyphId::new(99), GlyphClass::Mark);
        let gdef = Gdef::new(classes, MarkAttachmentClass::default(), vec![]);
        let keep = Keep::new(LookupFlag::IGNORE_MARKS, None, &gdef);
        let m = ctx.match_at(gid_at, seq.len(), 0, &keep).unwrap();
        assert_eq!(m.input_positions, vec![0, 2]);
    }

    #[test]
    fn chained_requires_backtrack_and_lookahead() {
        let coverage = Coverage::from_glyphs(&[GlyphId::new(20)]);
        let rule = ChainedSequenceRule {
            backtrack: vec![10],
            input: vec![20],
            lookahead: vec![30],
            actions: vec![],
        };
        let ctx = ChainedSequenceContext::Format1 {
            coverage,
            rule_sets: vec![Some(ChainedSequenceRuleSet { rules: vec![rule] })],
        };
        let seq = [10u16, 20, 30];
        let gid_at = |i: usize| GlyphId::new(seq[i]);
        let gdef = no_filter();
        let keep = Keep::new(LookupFlag::empty(), None, &gdef);
        assert!(ctx.match_at(gid_at, seq.len(), 1, &keep).is_some());
        assert!(ctx.match_at(gid_at, seq.len(), 0, &keep).is_none());
    }
}
