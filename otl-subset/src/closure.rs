//! Expands a caller-supplied retain list to its transitive dependencies:
//! composite-glyph components and GSUB ligature outputs.
//!
//! Both expansions can feed each other (a ligature output can itself be a
//! composite glyph; a newly-pulled-in component could in principle be the
//! first glyph of a ligature whose other components are already retained),
//! so the two passes alternate until a full round adds nothing.

use std::collections::VecDeque;

use font_types::GlyphId;
use int_set::IntSet;
use otl::{GsubSubtable, LookupList};

use crate::error::{Result, SubsetError};

/// Bound on alternating composite/ligature rounds, well past anything a
/// real font's dependency depth could require; exists to turn a logic bug
/// into a clean error instead of a silent infinite loop.
const MAX_CLOSURE_ROUNDS: usize = 64;

/// An out-of-scope collaborator's view of composite TrueType glyphs: which
/// component glyphs a composite glyph references. Simple (non-composite)
/// glyphs and CFF glyphs return `None`.
pub trait GlyphComponents {
    fn components(&self, gid: GlyphId) -> Option<Vec<GlyphId>>;
}

/// A [`GlyphComponents`] that never reports any composite glyphs, for CFF
/// fonts or callers that don't need composite closure.
pub struct NoComposites;

impl GlyphComponents for NoComposites {
    fn components(&self, _gid: GlyphId) -> Option<Vec<GlyphId>> {
        None
    }
}

/// Expand `initial` (the caller's ordered retain list, `.notdef` first) to
/// include every composite component and every GSUB-4 ligature output
/// reachable from it.
///
/// The caller-supplied prefix is preserved verbatim and in order; anything
/// pulled in by closure is appended afterward in discovery order, which
/// keeps the result deterministic for a given input.
pub fn closure(
    initial: &[GlyphId],
    components: &dyn GlyphComponents,
    gsub: Option<&LookupList<GsubSubtable>>,
) -> Result<Vec<GlyphId>> {
    let mut retained: Vec<GlyphId> = initial.to_vec();
    let mut seen: IntSet<GlyphId> = IntSet::default();
    for &gid in initial {
        seen.insert(gid);
    }

    let mut queue: VecDeque<GlyphId> = initial.iter().copied().collect();
    let mut add = |gid: GlyphId,
                   seen: &mut IntSet<GlyphId>,
                   retained: &mut Vec<GlyphId>,
                   queue: &mut VecDeque<GlyphId>| {
        if seen.insert(gid) {
            retained.push(gid);
            queue.push_back(gid);
            true
        } else {
            false
        }
    };

    for round in 0.. {
        if round >= MAX_CLOSURE_ROUNDS {
            log::warn!(
                "glyph closure did not converge after {MAX_CLOSURE_ROUNDS} rounds, starting from {} glyphs",
                initial.len()
            );
            return Err(SubsetError::ClosureDidNotConverge(MAX_CLOSURE_ROUNDS));
        }

        let mut changed = false;

        while let Some(gid) = queue.pop_front() {
            if let Some(comps) = components.components(gid) {
                for comp in comps {
                    changed |= add(comp, &mut seen, &mut retained, &mut queue);
                }
            }
        }

        if let Some(gsub) = gsub {
            for lookup in &gsub.lookups {
                for sub in &lookup.subtables {
                    let GsubSubtable::Ligature {
                        coverage,
                        ligature_sets,
                    } = sub
                    else {
                        continue;
                    };
                    for first in coverage.iter() {
                        if !seen.contains(first) {
                            continue;
                        }
                        let Some(idx) = coverage.get_index(first) else {
                            continue;
                        };
                        let Some(set) = ligature_sets.get(idx as usize) else {
                            continue;
                        };
                        for lig in set {
                            if lig.components.iter().all(|c| seen.contains(*c)) {
                                changed |= add(lig.glyph, &mut seen, &mut retained, &mut queue);
                            }
                        }
                    }
                }
            }
        }

        if !changed {
            break;
        }
    }

    log::debug!(
        "closure expanded {} caller-supplied glyphs to {}",
        initial.len(),
        retained.len()
    );
    Ok(retained)
}
