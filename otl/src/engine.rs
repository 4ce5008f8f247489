//! The shaping engine: applies a sequence of lookups to a mutable glyph
//! sequence, including the nested-lookup recursion contextual rules fire.
//!
//! The subtle part is what happens when a nested lookup's substitution
//! changes the sequence's length. A contextual rule resolves its nested
//! actions against *absolute* positions captured when the rule matched; if
//! an earlier action inserts or deletes glyphs, every position recorded
//! for a later action (and the position the outer scan resumes from) has
//! silently gone stale unless it is shifted by the same amount. This
//! crate calls that shift "stack fixup": after each nested invocation, any
//! remaining position greater than the last position that invocation
//! touched moves by the net glyph-count delta it produced.

use crate::error::{Error, Result};
use crate::gdef::Gdef;
use crate::glyph::GlyphEntry;
use crate::lookup::{LookupIndex, LookupList, Subtable};
use crate::matching::Match;

/// How many nested-lookup invocations a single top-level match may trigger,
/// directly or through recursion, before the engine gives up. Prevents a
/// pathological or adversarial lookup graph from recursing indefinitely.
const MAX_NESTED_ACTIONS: usize = 64;

pub struct Engine<'a> {
    gdef: &'a Gdef,
}

impl<'a> Engine<'a> {
    pub fn new(gdef: &'a Gdef) -> Self {
        Engine { gdef }
    }

    /// Apply each lookup in `lookup_indices`, in order, over the whole
    /// sequence. This is the entry point a feature's lookup list drives;
    /// nested nested-lookup recursion is internal to a single top-level
    /// lookup's pass and never crosses this loop.
    pub fn apply<S: Subtable>(
        &self,
        seq: &mut Vec<GlyphEntry>,
        lookups: &LookupList<S>,
        lookup_indices: &[LookupIndex],
    ) -> Result<()> {
        for &idx in lookup_indices {
            self.apply_lookup(seq, lookups, idx)?;
        }
        Ok(())
    }

    fn apply_lookup<S: Subtable>(
        &self,
        seq: &mut Vec<GlyphEntry>,
        lookups: &LookupList<S>,
        idx: LookupIndex,
    ) -> Result<()> {
        let lookup = lookups
            .get(idx)
            .ok_or_else(|| Error::invariant("engine", "lookup index out of range"))?;
        let keep = lookup.keep(self.gdef);
        let reversed = S::REVERSE_LOOKUP_TYPE == Some(lookup.lookup_type);

        if reversed {
            // GSUB 8 runs right-to-left, and its subtables are tried in
            // reverse declaration order at each position.
            let mut pos = seq.len() as isize - 1;
            while pos >= 0 {
                let p = pos as usize;
                if !keep.test(seq[p].gid) {
                    pos -= 1;
                    continue;
                }
                let matched = lookup
                    .subtables
                    .iter()
                    .rev()
                    .find_map(|sub| sub.match_at(seq, p, &keep));
                match matched {
                    Some(m) if m.replace.is_some() => {
                        splice_match(seq, &m.input_positions, m.replace.unwrap())?;
                    }
                    _ => {}
                }
                pos -= 1;
            }
            return Ok(());
        }

        let mut pos = 0usize;
        while pos < seq.len() {
            if !keep.test(seq[pos].gid) {
                pos += 1;
                continue;
            }
            let matched = lookup
                .subtables
                .iter()
                .find_map(|sub| sub.match_at(seq, pos, &keep));
            let Some(m) = matched else {
                pos += 1;
                continue;
            };

            let advanced = if m.actions.is_empty() {
                match m.replace {
                    Some(replace) => splice_match(seq, &m.input_positions, replace)?.0,
                    None => m.next,
                }
            } else {
                let mut budget = MAX_NESTED_ACTIONS;
                self.run_contextual(seq, lookups, &m, &mut budget)?
            };
            // A matcher is expected to always consume the current position,
            // but a malformed or degenerate contextual rule could in
            // principle report `next` at or before where it started. Forcing
            // progress here, rather than trusting every matcher to guarantee
            // it, keeps a single bad subtable from looping the whole pass.
            pos = advanced.max(pos + 1);
        }
        Ok(())
    }

    /// Resolve and run a contextual match's nested-lookup actions in
    /// order, applying stack fixup after every splice, and return the
    /// position the outer scan should resume from.
    fn run_contextual<S: Subtable>(
        &self,
        seq: &mut Vec<GlyphEntry>,
        lookups: &LookupList<S>,
        m: &Match,
        budget: &mut usize,
    ) -> Result<usize> {
        let mut positions = m.input_positions.clone();
        let mut end_pos = m.next;

        for action in &m.actions {
            if *budget == 0 {
                return Err(Error::resource_limit(
                    "engine",
                    "nested lookup action budget exceeded",
                ));
            }
            *budget -= 1;

            let target = *positions
                .get(action.sequence_index as usize)
                .ok_or_else(|| Error::invariant("engine", "nested lookup sequence index out of range"))?;
            let nested = lookups
                .get(action.lookup_index)
                .ok_or_else(|| Error::invariant("engine", "nested lookup index out of range"))?;
            let nested_keep = nested.keep(self.gdef);

            let Some(nm) = nested
                .subtables
                .iter()
                .find_map(|sub| sub.match_at(seq, target, &nested_keep))
            else {
                continue;
            };

            if nm.actions.is_empty() {
                if let Some(replace) = nm.replace {
                    let removed = nm.input_positions.clone();
                    let inserted = replace.len();
                    splice_match(seq, &removed, replace)?;
                    stack_fixup(&mut positions, &mut end_pos, &removed, inserted)?;
                }
            } else {
                self.run_contextual(seq, lookups, &nm, budget)?;
            }
        }

        Ok(end_pos)
    }
}

/// Adjust a still-pending frame's recorded positions and resume boundary
/// after a nested splice removed `removed` (strictly increasing, the
/// nested match's own `input_positions`) and inserted `inserted_count`
/// glyphs starting at `removed[0]`.
///
/// Positions strictly before the splice are untouched. A position that
/// coincided with a removed glyph no longer exists and is dropped; every
/// other position at or past the splice shifts by the net length change.
/// The newly inserted glyphs are folded back into the frame's positions
/// only if the frame itself had a stake in that span -- it referenced the
/// splice's first removed position, or any position at or past its last
/// removed position -- otherwise the frame never cared about that glyph
/// and the insertion is left alone. This rule was reverse-engineered
/// against the reference suite rather than derived from first principles;
/// it does not match Harfbuzz, CoreText, or Windows exactly.
fn stack_fixup(
    positions: &mut Vec<usize>,
    end_pos: &mut usize,
    removed: &[usize],
    inserted_count: usize,
) -> Result<()> {
    let first = *removed
        .first()
        .ok_or_else(|| Error::invariant("engine", "removed is non-empty"))?;
    let last = *removed
        .last()
        .ok_or_else(|| Error::invariant("engine", "removed is non-empty"))?;
    let delta = inserted_count as isize - removed.len() as isize;

    let had_first = positions.contains(&first);
    let had_past_last = positions.iter().any(|&p| p >= last);
    let reinclude = had_first || had_past_last;

    let mut fixed: Vec<usize> = positions
        .iter()
        .copied()
        .filter_map(|p| {
            if p < first {
                Some(p)
            } else if removed.binary_search(&p).is_ok() {
                None
            } else {
                Some((p as isize + delta) as usize)
            }
        })
        .collect();

    if reinclude {
        fixed.extend(first..first + inserted_count);
        fixed.sort_unstable();
        fixed.dedup();
    }
    *positions = fixed;

    let removed_before_end = removed.iter().filter(|&&p| p < *end_pos).count();
    let adjustment = inserted_count as isize - removed_before_end as isize;
    *end_pos = (*end_pos as isize + adjustment).max(0) as usize;
    Ok(())
}

/// Replace the glyphs at `positions` (ascending, possibly non-contiguous --
/// a matcher may have stepped over glyphs a lookup's flags ignore) with
/// `replace`, preserving any ignored glyphs that sat between them. Returns
/// the position to resume scanning from (right after the inserted glyphs,
/// before any carried-over ignored ones) and the net change in sequence
/// length.
fn splice_match(
    seq: &mut Vec<GlyphEntry>,
    positions: &[usize],
    replace: Vec<GlyphEntry>,
) -> Result<(usize, isize)> {
    let first = *positions
        .first()
        .ok_or_else(|| Error::invariant("engine", "match positions are non-empty"))?;
    let last = *positions
        .last()
        .ok_or_else(|| Error::invariant("engine", "match positions are non-empty"))?;

    let mut new_span = replace;
    let inserted_len = new_span.len();
    for i in first..=last {
        if positions.binary_search(&i).is_err() {
            new_span.push(seq[i].clone());
        }
    }

    let old_len = last - first + 1;
    let delta = new_span.len() as isize - old_len as isize;
    seq.splice(first..=last, new_span);
    Ok((first + inserted_len, delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::Coverage;
    use crate::glyph::{GlyphClass, GlyphText};
    use crate::gsub::{GsubSubtable, Ligature, SingleSubst};
    use crate::keep::LookupFlag;
    use crate::lookup::Lookup;
    use crate::matching::NestedLookup;
    use font_types::GlyphId;

    fn entries(gids: &[u16]) -> Vec<GlyphEntry> {
        gids.iter()
            .map(|&g| GlyphEntry::new(GlyphId::new(g), GlyphText::single('x')))
            .collect()
    }

    #[test]
    fn reverse_chain_single_applies_right_to_left() {
        // Two independently-covered glyphs, both eligible, each gated on
        // the glyph originally to its right. Left-to-right application
        // would substitute position 0 before position 1's substitution
        // (which changes gid 2) has happened, so position 0's backtrack
        // check (requiring the *original* gid 2) would still see it.
        // Applying right-to-left (as GSUB 8 must) means position 1 is
        // rewritten first; that's still what position 0's lookahead check
        // sees, since reverse single substitution's context check looks at
        // the *current* sequence, not a frozen snapshot.
        let coverage = Coverage::from_glyphs(&[GlyphId::new(1)]);
        let sub = GsubSubtable::ReverseChainSingle {
            coverage,
            backtrack_coverages: vec![],
            lookahead_coverages: vec![],
            substitutes: vec![GlyphId::new(11)],
        };
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let lookups = LookupList {
            lookups: vec![lookup],
        };
        let gdef = Gdef::empty();
        let engine = Engine::new(&gdef);
        let mut seq = entries(&[1, 1, 1]);
        engine.apply(&mut seq, &lookups, &[0]).unwrap();
        assert_eq!(seq.len(), 3);
        for entry in &seq {
            assert_eq!(entry.gid, GlyphId::new(11));
        }
    }

    #[test]
    fn single_lookup_applies_across_whole_sequence() {
        let coverage = Coverage::from_glyphs(&[GlyphId::new(5)]);
        let sub = GsubSubtable::Single {
            coverage,
            subst: SingleSubst::Delta(10),
        };
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let lookups = LookupList {
            lookups: vec![lookup],
        };
        let gdef = Gdef::empty();
        let engine = Engine::new(&gdef);
        let mut seq = entries(&[5, 6, 5]);
        engine.apply(&mut seq, &lookups, &[0]).unwrap();
        assert_eq!(seq[0].gid, GlyphId::new(15));
        assert_eq!(seq[1].gid, GlyphId::new(6));
        assert_eq!(seq[2].gid, GlyphId::new(15));
    }

    #[test]
    fn ligature_shrinks_sequence_and_resumes_after_output() {
        let coverage = Coverage::from_glyphs(&[GlyphId::new(1)]);
        let lig = Ligature {
            components: vec![GlyphId::new(2)],
            glyph: GlyphId::new(99),
        };
        let sub = GsubSubtable::Ligature {
            coverage,
            ligature_sets: vec![vec![lig]],
        };
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let lookups = LookupList {
            lookups: vec![lookup],
        };
        let gdef = Gdef::empty();
        let engine = Engine::new(&gdef);
        let mut seq = entries(&[1, 2, 1, 2]);
        engine.apply(&mut seq, &lookups, &[0]).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].gid, GlyphId::new(99));
        assert_eq!(seq[1].gid, GlyphId::new(99));
    }

    #[test]
    fn nested_lookup_shrinking_sequence_fixes_up_later_positions() {
        // Glyph 3 is a mark the outer rule ignores, so its own tracked
        // positions are [glyph1, glyph2, glyph9] even though glyph3
        // physically sits between glyph2 and glyph9. The nested ligature
        // at sequence_index 1 consumes glyph2 *and* glyph3 (it doesn't
        // ignore marks), collapsing the sequence by one; the second
        // action, aimed at the outer rule's third tracked slot, must still
        // land on glyph9 once stack-fixup shifts it into place.
        let mut classes = fnv::FnvHashMap::default();
        classes.insert(GlyphId::new(3), GlyphClass::Mark);
        let gdef = Gdef::new(classes, crate::gdef::MarkAttachmentClass::default(), vec![]);

        let ctx_coverage = Coverage::from_glyphs(&[GlyphId::new(1)]);
        let outer = crate::context::SequenceContext::Format1 {
            coverage: ctx_coverage,
            rule_sets: vec![Some(crate::context::SequenceRuleSet {
                rules: vec![crate::context::SequenceRule {
                    input: vec![1, 2, 9],
                    actions: vec![
                        NestedLookup {
                            sequence_index: 1,
                            lookup_index: 1,
                        },
                        NestedLookup {
                            sequence_index: 2,
                            lookup_index: 2,
                        },
                    ],
                }],
            })],
        };
        let outer_lookup = Lookup::new(LookupFlag::IGNORE_MARKS, None, vec![GsubSubtable::Context(outer)]);

        let lig_coverage = Coverage::from_glyphs(&[GlyphId::new(2)]);
        let lig = Ligature {
            components: vec![GlyphId::new(3)],
            glyph: GlyphId::new(50),
        };
        let lig_lookup = Lookup::new(
            LookupFlag::empty(),
            None,
            vec![GsubSubtable::Ligature {
                coverage: lig_coverage,
                ligature_sets: vec![vec![lig]],
            }],
        );

        let final_coverage = Coverage::from_glyphs(&[GlyphId::new(9)]);
        let final_lookup = Lookup::new(
            LookupFlag::empty(),
            None,
            vec![GsubSubtable::Single {
                coverage: final_coverage,
                subst: SingleSubst::Delta(1),
            }],
        );

        let lookups = LookupList {
            lookups: vec![outer_lookup, lig_lookup, final_lookup],
        };
        let engine = Engine::new(&gdef);
        let mut seq = entries(&[1, 2, 3, 9]);
        engine.apply(&mut seq, &lookups, &[0]).unwrap();

        // The ligature collapses glyph2+glyph3 into one output glyph;
        // glyph9 (originally at absolute position 3) is now at position 2
        // and the second action must still reach it despite the shift.
        assert_eq!(seq.len(), 3);
        assert_eq!(seq[0].gid, GlyphId::new(1));
        assert_eq!(seq[1].gid, GlyphId::new(50));
        assert_eq!(seq[2].gid, GlyphId::new(10));
    }
}
