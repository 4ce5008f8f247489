//! Rewrites a GSUB LookupList through a gid map.
//!
//! Single, multiple, alternate and ligature substitution rewrite in full:
//! their coverage keys and glyph-valued outputs are both glyph ids, so
//! both sides go through `new_gid`, and any entry that touches a glyph the
//! subset doesn't retain is dropped. Format 1 single substitution (a
//! constant delta) always downgrades to format 2 (an explicit list), since
//! a delta computed against old gids essentially never survives
//! renumbering.
//!
//! Contextual and chaining contextual substitution (lookup types 5, 6) and
//! reverse chaining single substitution (type 8) key their rules on glyphs
//! too (directly in formats 1/3, through a `ClassDef` in format 2), so the
//! same "rewrite keys and values through `new_gid`, drop what no longer
//! resolves" rule applies: a rule whose glyph-keyed sequence (backtrack,
//! input or lookahead) touches a dropped glyph is dropped, and a
//! coverage-keyed position (format 3, or a reverse-chaining backtrack/
//! lookahead coverage) that would become empty makes the whole subtable
//! unmatchable, so the subtable is dropped instead. The nested lookups a
//! rule fires are referenced by index and are left alone -- this module
//! doesn't renumber the `LookupList` itself.

use font_types::GlyphId;
use otl::classdef::ClassDef;
use otl::context::{
    ChainedSequenceContext, ChainedSequenceRule, ChainedSequenceRuleSet, SequenceContext,
    SequenceRule, SequenceRuleSet,
};
use otl::coverage::Coverage;
use otl::gsub::{Ligature, SingleSubst};
use otl::{GsubSubtable, Lookup, LookupList};

use crate::gidmap::GidMap;

/// Remap a coverage's glyphs through `new_gid`, dropping any that weren't
/// retained.
fn remap_coverage(coverage: &Coverage, gids: &GidMap) -> Coverage {
    let glyphs: Vec<GlyphId> = coverage.iter().filter_map(|g| gids.get(g)).collect();
    Coverage::from_glyphs(&glyphs)
}

fn coverage_is_empty(coverage: &Coverage) -> bool {
    coverage.iter().next().is_none()
}

/// Remap a class def's glyph keys through `new_gid`; class numbers
/// themselves are data, not glyph ids, and are left alone.
fn remap_class_def(class_def: &ClassDef, gids: &GidMap) -> ClassDef {
    let classes = class_def
        .iter()
        .filter_map(|(old, class)| gids.get(old).map(|new| (new, class)))
        .collect();
    ClassDef::new(classes)
}

/// Remap a glyph-keyed rule's raw `u16` sequence (backtrack, `input[1..]`,
/// or lookahead) through `new_gid`, or `None` if any entry wasn't retained.
fn remap_glyph_sequence(values: &[u16], gids: &GidMap) -> Option<Vec<u16>> {
    values
        .iter()
        .map(|&v| gids.get(GlyphId::new(v)).map(|g| g.to_u16()))
        .collect()
}

fn rewrite_sequence_rule(rule: &SequenceRule, gids: &GidMap) -> Option<SequenceRule> {
    let mut input = vec![0u16];
    input.extend(remap_glyph_sequence(&rule.input[1..], gids)?);
    Some(SequenceRule {
        input,
        actions: rule.actions.clone(),
    })
}

fn rewrite_chained_sequence_rule(
    rule: &ChainedSequenceRule,
    gids: &GidMap,
) -> Option<ChainedSequenceRule> {
    let backtrack = remap_glyph_sequence(&rule.backtrack, gids)?;
    let mut input = vec![0u16];
    input.extend(remap_glyph_sequence(&rule.input[1..], gids)?);
    let lookahead = remap_glyph_sequence(&rule.lookahead, gids)?;
    Some(ChainedSequenceRule {
        backtrack,
        input,
        lookahead,
        actions: rule.actions.clone(),
    })
}

/// Rewrite a GSUB 5 / GPOS 7 sequence context. Returns `None` if nothing
/// survives (no coverage entry keeps a usable rule, for formats 1/2; an
/// empty position coverage, for format 3).
fn rewrite_context(ctx: &SequenceContext, gids: &GidMap) -> Option<SequenceContext> {
    match ctx {
        SequenceContext::Format1 {
            coverage,
            rule_sets,
        } => {
            let mut new_in = Vec::new();
            let mut new_rule_sets = Vec::new();
            for old_in in coverage.iter() {
                let idx = coverage.get_index(old_in)? as usize;
                let Some(new_first) = gids.get(old_in) else {
                    continue;
                };
                let Some(Some(rule_set)) = rule_sets.get(idx) else {
                    continue;
                };
                let new_rules: Vec<SequenceRule> = rule_set
                    .rules
                    .iter()
                    .filter_map(|rule| rewrite_sequence_rule(rule, gids))
                    .collect();
                if new_rules.is_empty() {
                    continue;
                }
                new_in.push(new_first);
                new_rule_sets.push(Some(SequenceRuleSet { rules: new_rules }));
            }
            if new_in.is_empty() {
                return None;
            }
            Some(SequenceContext::Format1 {
                coverage: Coverage::from_glyphs(&new_in),
                rule_sets: new_rule_sets,
            })
        }
        SequenceContext::Format2 {
            coverage,
            class_def,
            rule_sets,
        } => {
            let new_coverage = remap_coverage(coverage, gids);
            if coverage_is_empty(&new_coverage) {
                return None;
            }
            Some(SequenceContext::Format2 {
                coverage: new_coverage,
                class_def: remap_class_def(class_def, gids),
                rule_sets: rule_sets.clone(),
            })
        }
        SequenceContext::Format3 { coverages, actions } => {
            let new_coverages: Vec<Coverage> = coverages
                .iter()
                .map(|c| remap_coverage(c, gids))
                .collect();
            if new_coverages.iter().any(coverage_is_empty) {
                return None;
            }
            Some(SequenceContext::Format3 {
                coverages: new_coverages,
                actions: actions.clone(),
            })
        }
    }
}

/// Rewrite a GSUB 6 / GPOS 8 chained sequence context; same shape as
/// [`rewrite_context`] but over backtrack/input/lookahead triples.
fn rewrite_chain_context(
    ctx: &ChainedSequenceContext,
    gids: &GidMap,
) -> Option<ChainedSequenceContext> {
    match ctx {
        ChainedSequenceContext::Format1 {
            coverage,
            rule_sets,
        } => {
            let mut new_in = Vec::new();
            let mut new_rule_sets = Vec::new();
            for old_in in coverage.iter() {
                let idx = coverage.get_index(old_in)? as usize;
                let Some(new_first) = gids.get(old_in) else {
                    continue;
                };
                let Some(Some(rule_set)) = rule_sets.get(idx) else {
                    continue;
                };
                let new_rules: Vec<ChainedSequenceRule> = rule_set
                    .rules
                    .iter()
                    .filter_map(|rule| rewrite_chained_sequence_rule(rule, gids))
                    .collect();
                if new_rules.is_empty() {
                    continue;
                }
                new_in.push(new_first);
                new_rule_sets.push(Some(ChainedSequenceRuleSet { rules: new_rules }));
            }
            if new_in.is_empty() {
                return None;
            }
            Some(ChainedSequenceContext::Format1 {
                coverage: Coverage::from_glyphs(&new_in),
                rule_sets: new_rule_sets,
            })
        }
        ChainedSequenceContext::Format2 {
            coverage,
            backtrack_class_def,
            input_class_def,
            lookahead_class_def,
            rule_sets,
        } => {
            let new_coverage = remap_coverage(coverage, gids);
            if coverage_is_empty(&new_coverage) {
                return None;
            }
            Some(ChainedSequenceContext::Format2 {
                coverage: new_coverage,
                backtrack_class_def: remap_class_def(backtrack_class_def, gids),
                input_class_def: remap_class_def(input_class_def, gids),
                lookahead_class_def: remap_class_def(lookahead_class_def, gids),
                rule_sets: rule_sets.clone(),
            })
        }
        ChainedSequenceContext::Format3 {
            backtrack_coverages,
            input_coverages,
            lookahead_coverages,
            actions,
        } => {
            let remap_all = |covs: &[Coverage]| -> Option<Vec<Coverage>> {
                let new_covs: Vec<Coverage> = covs.iter().map(|c| remap_coverage(c, gids)).collect();
                if new_covs.iter().any(coverage_is_empty) {
                    None
                } else {
                    Some(new_covs)
                }
            };
            Some(ChainedSequenceContext::Format3 {
                backtrack_coverages: remap_all(backtrack_coverages)?,
                input_coverages: remap_all(input_coverages)?,
                lookahead_coverages: remap_all(lookahead_coverages)?,
                actions: actions.clone(),
            })
        }
    }
}

fn rewrite_reverse_chain_single(
    coverage: &Coverage,
    backtrack_coverages: &[Coverage],
    lookahead_coverages: &[Coverage],
    substitutes: &[GlyphId],
    gids: &GidMap,
) -> Option<GsubSubtable> {
    let remap_all = |covs: &[Coverage]| -> Option<Vec<Coverage>> {
        let new_covs: Vec<Coverage> = covs.iter().map(|c| remap_coverage(c, gids)).collect();
        if new_covs.iter().any(coverage_is_empty) {
            None
        } else {
            Some(new_covs)
        }
    };
    let new_backtrack = remap_all(backtrack_coverages)?;
    let new_lookahead = remap_all(lookahead_coverages)?;

    let mut new_in = Vec::new();
    let mut new_subs = Vec::new();
    for old_in in coverage.iter() {
        let idx = coverage.get_index(old_in)? as usize;
        let Some(&old_out) = substitutes.get(idx) else {
            continue;
        };
        let (Some(new_in_gid), Some(new_out_gid)) = (gids.get(old_in), gids.get(old_out)) else {
            continue;
        };
        new_in.push(new_in_gid);
        new_subs.push(new_out_gid);
    }
    if new_in.is_empty() {
        return None;
    }
    Some(GsubSubtable::ReverseChainSingle {
        coverage: Coverage::from_glyphs(&new_in),
        backtrack_coverages: new_backtrack,
        lookahead_coverages: new_lookahead,
        substitutes: new_subs,
    })
}

/// Rewrite every lookup in `list`, dropping subtables that touch a removed
/// glyph and dropping lookups left with no subtables.
pub fn rewrite_gsub(list: &LookupList<GsubSubtable>, gids: &GidMap) -> LookupList<GsubSubtable> {
    let lookups = list
        .lookups
        .iter()
        .filter_map(|lookup| rewrite_lookup(lookup, gids))
        .collect();
    LookupList { lookups }
}

fn rewrite_lookup(
    lookup: &Lookup<GsubSubtable>,
    gids: &GidMap,
) -> Option<Lookup<GsubSubtable>> {
    let subtables: Vec<GsubSubtable> = lookup
        .subtables
        .iter()
        .filter_map(|sub| rewrite_subtable(sub, gids))
        .collect();
    if subtables.is_empty() {
        return None;
    }
    Some(Lookup::new(
        lookup.flags,
        lookup.mark_filtering_set,
        subtables,
    ))
}

fn rewrite_subtable(sub: &GsubSubtable, gids: &GidMap) -> Option<GsubSubtable> {
    match sub {
        GsubSubtable::Single { coverage, subst } => rewrite_single(coverage, subst, gids),
        GsubSubtable::Multiple {
            coverage,
            sequences,
        } => rewrite_multiple(coverage, sequences, gids),
        GsubSubtable::Alternate {
            coverage,
            alternate_sets,
        } => rewrite_alternate(coverage, alternate_sets, gids),
        GsubSubtable::Ligature {
            coverage,
            ligature_sets,
        } => rewrite_ligature(coverage, ligature_sets, gids),
        GsubSubtable::Context(ctx) => rewrite_context(ctx, gids).map(GsubSubtable::Context),
        GsubSubtable::ChainContext(ctx) => {
            rewrite_chain_context(ctx, gids).map(GsubSubtable::ChainContext)
        }
        GsubSubtable::ReverseChainSingle {
            coverage,
            backtrack_coverages,
            lookahead_coverages,
            substitutes,
        } => rewrite_reverse_chain_single(
            coverage,
            backtrack_coverages,
            lookahead_coverages,
            substitutes,
            gids,
        ),
    }
}

fn rewrite_single(coverage: &Coverage, subst: &SingleSubst, gids: &GidMap) -> Option<GsubSubtable> {
    let mut new_in = Vec::new();
    let mut new_out = Vec::new();
    for old_in in coverage.iter() {
        let Some(idx) = coverage.get_index(old_in) else {
            continue;
        };
        let old_out = match subst {
            SingleSubst::Delta(delta) => {
                GlyphId::new((old_in.to_u16() as i32 + *delta as i32) as u16)
            }
            SingleSubst::List(list) => match list.get(idx as usize) {
                Some(g) => *g,
                None => continue,
            },
        };
        let (Some(new_in_gid), Some(new_out_gid)) = (gids.get(old_in), gids.get(old_out)) else {
            continue;
        };
        new_in.push(new_in_gid);
        new_out.push(new_out_gid);
    }
    if new_in.is_empty() {
        return None;
    }
    Some(GsubSubtable::Single {
        coverage: Coverage::from_glyphs(&new_in),
        subst: SingleSubst::List(new_out),
    })
}

fn rewrite_multiple(
    coverage: &Coverage,
    sequences: &[Vec<GlyphId>],
    gids: &GidMap,
) -> Option<GsubSubtable> {
    let mut new_in = Vec::new();
    let mut new_sequences = Vec::new();
    for old_in in coverage.iter() {
        let Some(idx) = coverage.get_index(old_in) else {
            continue;
        };
        let Some(targets) = sequences.get(idx as usize) else {
            continue;
        };
        if !gids.contains_old(old_in) {
            continue;
        }
        let Some(new_targets) = remap_all(targets, gids) else {
            continue;
        };
        new_in.push(gids.get(old_in).unwrap());
        new_sequences.push(new_targets);
    }
    if new_in.is_empty() {
        return None;
    }
    Some(GsubSubtable::Multiple {
        coverage: Coverage::from_glyphs(&new_in),
        sequences: new_sequences,
    })
}

fn rewrite_alternate(
    coverage: &Coverage,
    alternate_sets: &[Vec<GlyphId>],
    gids: &GidMap,
) -> Option<GsubSubtable> {
    let mut new_in = Vec::new();
    let mut new_sets = Vec::new();
    for old_in in coverage.iter() {
        let Some(idx) = coverage.get_index(old_in) else {
            continue;
        };
        let Some(alts) = alternate_sets.get(idx as usize) else {
            continue;
        };
        if !gids.contains_old(old_in) {
            continue;
        }
        let retained_alts: Vec<GlyphId> = alts.iter().filter_map(|g| gids.get(*g)).collect();
        if retained_alts.is_empty() {
            continue;
        }
        new_in.push(gids.get(old_in).unwrap());
        new_sets.push(retained_alts);
    }
    if new_in.is_empty() {
        return None;
    }
    Some(GsubSubtable::Alternate {
        coverage: Coverage::from_glyphs(&new_in),
        alternate_sets: new_sets,
    })
}

fn rewrite_ligature(
    coverage: &Coverage,
    ligature_sets: &[Vec<Ligature>],
    gids: &GidMap,
) -> Option<GsubSubtable> {
    let mut new_in = Vec::new();
    let mut new_sets = Vec::new();
    for old_in in coverage.iter() {
        let Some(idx) = coverage.get_index(old_in) else {
            continue;
        };
        let Some(set) = ligature_sets.get(idx as usize) else {
            continue;
        };
        let Some(new_first) = gids.get(old_in) else {
            continue;
        };
        let mut new_ligs = Vec::new();
        for lig in set {
            let (Some(new_components), Some(new_glyph)) =
                (remap_all(&lig.components, gids), gids.get(lig.glyph))
            else {
                continue;
            };
            new_ligs.push(Ligature {
                components: new_components,
                glyph: new_glyph,
            });
        }
        if new_ligs.is_empty() {
            continue;
        }
        new_in.push(new_first);
        new_sets.push(new_ligs);
    }
    if new_in.is_empty() {
        return None;
    }
    Some(GsubSubtable::Ligature {
        coverage: Coverage::from_glyphs(&new_in),
        ligature_sets: new_sets,
    })
}

/// Remap every glyph in `glyphs`, or `None` if any of them was dropped.
fn remap_all(glyphs: &[GlyphId], gids: &GidMap) -> Option<Vec<GlyphId>> {
    glyphs.iter().map(|g| gids.get(*g)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use otl::keep::LookupFlag;
    use otl::NestedLookup;

    fn gid(n: u16) -> GlyphId {
        GlyphId::new(n)
    }

    fn map_with(pairs: &[(u16, u16)]) -> GidMap {
        let mut m = GidMap::with_capacity(pairs.len());
        // ensure new gids come out in the order given.
        let mut ordered: Vec<(u16, u16)> = pairs.to_vec();
        ordered.sort_by_key(|(_, new)| *new);
        for (old, _) in ordered {
            m.add(gid(old));
        }
        m
    }

    #[test]
    fn single_format1_downgrades_to_list_and_drops_unretained() {
        let coverage = Coverage::from_glyphs(&[gid(10), gid(11), gid(12)]);
        let sub = GsubSubtable::Single {
            coverage,
            subst: SingleSubst::Delta(5),
        };
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let list = LookupList {
            lookups: vec![lookup],
        };

        // retain 10->15 and 12->17, drop 11 (so 11->16 disappears too).
        let gids = map_with(&[(10, 0), (15, 1), (12, 2), (17, 3)]);

        let rewritten = rewrite_gsub(&list, &gids);
        assert_eq!(rewritten.lookups.len(), 1);
        let GsubSubtable::Single { coverage, subst } = &rewritten.lookups[0].subtables[0] else {
            panic!("expected single subst");
        };
        assert!(matches!(subst, SingleSubst::List(_)));
        assert!(coverage.contains(gids.get(gid(10)).unwrap()));
        assert!(!coverage.contains(gids.get(gid(11)).unwrap_or(gid(99))));
    }

    #[test]
    fn ligature_drops_when_a_component_is_not_retained() {
        let coverage = Coverage::from_glyphs(&[gid(1)]);
        let ligature_sets = vec![vec![Ligature {
            components: vec![gid(2)],
            glyph: gid(50),
        }]];
        let sub = GsubSubtable::Ligature {
            coverage,
            ligature_sets,
        };
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let list = LookupList {
            lookups: vec![lookup],
        };

        let mut gids = GidMap::with_capacity(2);
        gids.add(gid(0));
        gids.add(gid(1));
        // gid(2) never retained.

        let rewritten = rewrite_gsub(&list, &gids);
        assert!(rewritten.lookups.is_empty());
    }

    #[test]
    fn ligature_rewrites_through_new_gids_when_fully_retained() {
        let coverage = Coverage::from_glyphs(&[gid(1)]);
        let ligature_sets = vec![vec![Ligature {
            components: vec![gid(2)],
            glyph: gid(50),
        }]];
        let sub = GsubSubtable::Ligature {
            coverage,
            ligature_sets,
        };
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let list = LookupList {
            lookups: vec![lookup],
        };

        let mut gids = GidMap::with_capacity(4);
        gids.add(gid(0));
        gids.add(gid(1));
        gids.add(gid(2));
        gids.add(gid(50));

        let rewritten = rewrite_gsub(&list, &gids);
        assert_eq!(rewritten.lookups.len(), 1);
        let GsubSubtable::Ligature {
            coverage,
            ligature_sets,
        } = &rewritten.lookups[0].subtables[0]
        else {
            panic!("expected ligature subst");
        };
        assert!(coverage.contains(gids.get(gid(1)).unwrap()));
        assert_eq!(ligature_sets[0][0].glyph, gids.get(gid(50)).unwrap());
    }

    #[test]
    fn context_format1_drops_rule_touching_unretained_glyph_and_rewrites_survivors() {
        let coverage = Coverage::from_glyphs(&[gid(1), gid(2)]);
        let rule_sets = vec![
            Some(SequenceRuleSet {
                rules: vec![SequenceRule {
                    input: vec![0, 10],
                    actions: vec![NestedLookup {
                        sequence_index: 1,
                        lookup_index: 0,
                    }],
                }],
            }),
            Some(SequenceRuleSet {
                rules: vec![SequenceRule {
                    input: vec![0, 99],
                    actions: vec![],
                }],
            }),
        ];
        let ctx = SequenceContext::Format1 {
            coverage,
            rule_sets,
        };
        let sub = GsubSubtable::Context(ctx);
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let list = LookupList {
            lookups: vec![lookup],
        };

        let mut gids = GidMap::with_capacity(3);
        gids.add(gid(0));
        gids.add(gid(1));
        gids.add(gid(10));
        // gid(2) and gid(99) are not retained, so the second rule set drops.

        let rewritten = rewrite_gsub(&list, &gids);
        assert_eq!(rewritten.lookups.len(), 1);
        let GsubSubtable::Context(SequenceContext::Format1 {
            coverage,
            rule_sets,
        }) = &rewritten.lookups[0].subtables[0]
        else {
            panic!("expected format 1 sequence context");
        };
        assert_eq!(rule_sets.len(), 1);
        assert!(coverage.contains(gids.get(gid(1)).unwrap()));
        assert_eq!(
            rule_sets[0].as_ref().unwrap().rules[0].input[1],
            gids.get(gid(10)).unwrap().to_u16()
        );
    }

    #[test]
    fn context_format3_drops_whole_subtable_when_a_position_coverage_empties() {
        let ctx = SequenceContext::Format3 {
            coverages: vec![
                Coverage::from_glyphs(&[gid(1)]),
                Coverage::from_glyphs(&[gid(2)]),
            ],
            actions: vec![],
        };
        let sub = GsubSubtable::Context(ctx);
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let list = LookupList {
            lookups: vec![lookup],
        };

        let mut gids = GidMap::with_capacity(2);
        gids.add(gid(0));
        gids.add(gid(1));
        // gid(2) is dropped, so the second position can never match.

        let rewritten = rewrite_gsub(&list, &gids);
        assert!(rewritten.lookups.is_empty());
    }

    #[test]
    fn chain_context_format2_remaps_class_defs_through_new_gid() {
        let mut input_classes = fnv::FnvHashMap::default();
        input_classes.insert(gid(1), 1u16);
        let ctx = ChainedSequenceContext::Format2 {
            coverage: Coverage::from_glyphs(&[gid(1)]),
            backtrack_class_def: ClassDef::new(fnv::FnvHashMap::default()),
            input_class_def: ClassDef::new(input_classes),
            lookahead_class_def: ClassDef::new(fnv::FnvHashMap::default()),
            rule_sets: vec![None, Some(ChainedSequenceRuleSet { rules: vec![] })],
        };
        let sub = GsubSubtable::ChainContext(ctx);
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let list = LookupList {
            lookups: vec![lookup],
        };

        let mut gids = GidMap::with_capacity(2);
        gids.add(gid(0));
        gids.add(gid(1));

        let rewritten = rewrite_gsub(&list, &gids);
        assert_eq!(rewritten.lookups.len(), 1);
        let GsubSubtable::ChainContext(ChainedSequenceContext::Format2 {
            coverage,
            input_class_def,
            ..
        }) = &rewritten.lookups[0].subtables[0]
        else {
            panic!("expected format 2 chained sequence context");
        };
        let new_gid1 = gids.get(gid(1)).unwrap();
        assert!(coverage.contains(new_gid1));
        assert_eq!(input_class_def.get(new_gid1), 1);
    }

    #[test]
    fn reverse_chain_single_drops_when_a_backtrack_coverage_empties() {
        let sub = GsubSubtable::ReverseChainSingle {
            coverage: Coverage::from_glyphs(&[gid(1)]),
            backtrack_coverages: vec![Coverage::from_glyphs(&[gid(2)])],
            lookahead_coverages: vec![],
            substitutes: vec![gid(50)],
        };
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let list = LookupList {
            lookups: vec![lookup],
        };

        let mut gids = GidMap::with_capacity(3);
        gids.add(gid(0));
        gids.add(gid(1));
        gids.add(gid(50));
        // gid(2), the only backtrack glyph, is not retained.

        let rewritten = rewrite_gsub(&list, &gids);
        assert!(rewritten.lookups.is_empty());
    }

    #[test]
    fn reverse_chain_single_rewrites_coverage_and_substitutes_through_new_gid() {
        let sub = GsubSubtable::ReverseChainSingle {
            coverage: Coverage::from_glyphs(&[gid(1)]),
            backtrack_coverages: vec![Coverage::from_glyphs(&[gid(2)])],
            lookahead_coverages: vec![],
            substitutes: vec![gid(50)],
        };
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![sub]);
        let list = LookupList {
            lookups: vec![lookup],
        };

        let mut gids = GidMap::with_capacity(4);
        gids.add(gid(0));
        gids.add(gid(1));
        gids.add(gid(2));
        gids.add(gid(50));

        let rewritten = rewrite_gsub(&list, &gids);
        assert_eq!(rewritten.lookups.len(), 1);
        let GsubSubtable::ReverseChainSingle {
            coverage,
            substitutes,
            ..
        } = &rewritten.lookups[0].subtables[0]
        else {
            panic!("expected reverse chain single subst");
        };
        assert!(coverage.contains(gids.get(gid(1)).unwrap()));
        assert_eq!(substitutes[0], gids.get(gid(50)).unwrap());
    }
}
