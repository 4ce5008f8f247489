//! Rewrites a GPOS LookupList through a gid map.
//!
//! Only pair positioning (lookup type 2) is rewritten; every other GPOS
//! lookup type references glyphs in ways this subsetter does not yet
//! follow through (anchor-indexed mark attachment, contextual lookup
//! chaining), so those subtables are dropped rather than left referencing
//! glyphs that no longer exist.

use otl::classdef::ClassDef;
use otl::coverage::Coverage;
use otl::gpos::{PairKind, PairSubtable};
use otl::{GposSubtable, Lookup, LookupList};

use crate::gidmap::GidMap;

pub fn rewrite_gpos(list: &LookupList<GposSubtable>, gids: &GidMap) -> LookupList<GposSubtable> {
    let lookups = list
        .lookups
        .iter()
        .filter_map(|lookup| rewrite_lookup(lookup, gids))
        .collect();
    LookupList { lookups }
}

fn rewrite_lookup(
    lookup: &Lookup<GposSubtable>,
    gids: &GidMap,
) -> Option<Lookup<GposSubtable>> {
    let subtables: Vec<GposSubtable> = lookup
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

fn rewrite_subtable(sub: &GposSubtable, gids: &GidMap) -> Option<GposSubtable> {
    match sub {
        GposSubtable::Pair(pair) => rewrite_pair(pair, gids).map(GposSubtable::Pair),
        _ => None,
    }
}

fn rewrite_pair(pair: &PairSubtable, gids: &GidMap) -> Option<PairSubtable> {
    match &pair.kind {
        PairKind::Glyph(sets) => rewrite_pair_glyph(pair, sets, gids),
        PairKind::Class {
            class_def1,
            class_def2,
            matrix,
        } => rewrite_pair_class(pair, class_def1, class_def2, matrix, gids),
    }
}

fn rewrite_pair_glyph(
    pair: &PairSubtable,
    sets: &[Vec<(font_types::GlyphId, otl::ValueRecord, otl::ValueRecord)>],
    gids: &GidMap,
) -> Option<PairSubtable> {
    let mut new_in = Vec::new();
    let mut new_sets = Vec::new();
    for old_in in pair.coverage.iter() {
        let Some(idx) = pair.coverage.get_index(old_in) else {
            continue;
        };
        let Some(set) = sets.get(idx as usize) else {
            continue;
        };
        let Some(new_first) = gids.get(old_in) else {
            continue;
        };
        let new_set: Vec<_> = set
            .iter()
            .filter_map(|(second, v1, v2)| {
                gids.get(*second).map(|new_second| (new_second, *v1, *v2))
            })
            .collect();
        if new_set.is_empty() {
            continue;
        }
        new_in.push(new_first);
        new_sets.push(new_set);
    }
    if new_in.is_empty() {
        return None;
    }
    Some(PairSubtable {
        coverage: Coverage::from_glyphs(&new_in),
        value_format1: pair.value_format1,
        value_format2: pair.value_format2,
        kind: PairKind::Glyph(new_sets),
    })
}

fn rewrite_pair_class(
    pair: &PairSubtable,
    class_def1: &ClassDef,
    class_def2: &ClassDef,
    matrix: &[Vec<(otl::ValueRecord, otl::ValueRecord)>],
    gids: &GidMap,
) -> Option<PairSubtable> {
    let new_in: Vec<_> = pair.coverage.iter().filter_map(|g| gids.get(g)).collect();
    if new_in.is_empty() {
        return None;
    }

    let remap_classdef = |cd: &ClassDef| -> ClassDef {
        let classes = cd
            .iter()
            .filter_map(|(old, class)| gids.get(old).map(|new| (new, class)))
            .collect();
        ClassDef::new(classes)
    };

    Some(PairSubtable {
        coverage: Coverage::from_glyphs(&new_in),
        value_format1: pair.value_format1,
        value_format2: pair.value_format2,
        kind: PairKind::Class {
            class_def1: remap_classdef(class_def1),
            class_def2: remap_classdef(class_def2),
            matrix: matrix.to_vec(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use font_types::GlyphId;
    use otl::keep::LookupFlag;
    use otl::value_record::{ValueFormat, ValueRecord};

    fn gid(n: u16) -> GlyphId {
        GlyphId::new(n)
    }

    #[test]
    fn pair_glyph_drops_entries_touching_removed_glyphs() {
        let coverage = Coverage::from_glyphs(&[gid(1), gid(2)]);
        let sets = vec![
            vec![(gid(10), ValueRecord::default(), ValueRecord::default())],
            vec![(gid(11), ValueRecord::default(), ValueRecord::default())],
        ];
        let pair = PairSubtable {
            coverage,
            value_format1: ValueFormat::default(),
            value_format2: ValueFormat::default(),
            kind: PairKind::Glyph(sets),
        };
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![GposSubtable::Pair(pair)]);
        let list = LookupList {
            lookups: vec![lookup],
        };

        let mut gids = GidMap::with_capacity(4);
        gids.add(gid(0));
        gids.add(gid(1));
        gids.add(gid(10));
        // gid(2) and gid(11) are not retained.

        let rewritten = rewrite_gpos(&list, &gids);
        assert_eq!(rewritten.lookups.len(), 1);
        let GposSubtable::Pair(pair) = &rewritten.lookups[0].subtables[0] else {
            panic!("expected pair subst");
        };
        assert!(pair.coverage.contains(gids.get(gid(1)).unwrap()));
        assert!(!pair.coverage.contains(gid(2)));
    }

    #[test]
    fn pair_class_remaps_classdef_keys_and_keeps_matrix() {
        let coverage = Coverage::from_glyphs(&[gid(1), gid(2)]);
        let mut cd1 = fnv::FnvHashMap::default();
        cd1.insert(gid(1), 1u16);
        cd1.insert(gid(2), 2u16);
        let mut cd2 = fnv::FnvHashMap::default();
        cd2.insert(gid(5), 1u16);
        let matrix = vec![
            vec![(ValueRecord::default(), ValueRecord::default()); 2],
            vec![(ValueRecord::default(), ValueRecord::default()); 2],
            vec![(ValueRecord::default(), ValueRecord::default()); 2],
        ];
        let pair = PairSubtable {
            coverage,
            value_format1: ValueFormat::default(),
            value_format2: ValueFormat::default(),
            kind: PairKind::Class {
                class_def1: ClassDef::new(cd1),
                class_def2: ClassDef::new(cd2),
                matrix,
            },
        };
        let lookup = Lookup::new(LookupFlag::empty(), None, vec![GposSubtable::Pair(pair)]);
        let list = LookupList {
            lookups: vec![lookup],
        };

        let mut gids = GidMap::with_capacity(4);
        gids.add(gid(0));
        gids.add(gid(1));
        gids.add(gid(5));
        // gid(2) is not retained.

        let rewritten = rewrite_gpos(&list, &gids);
        let GposSubtable::Pair(pair) = &rewritten.lookups[0].subtables[0] else {
            panic!("expected pair subst");
        };
        let PairKind::Class {
            class_def1,
            class_def2,
            ..
        } = &pair.kind
        else {
            panic!("expected class kind");
        };
        assert_eq!(class_def1.get(gids.get(gid(1)).unwrap()), 1);
        assert_eq!(class_def2.get(gids.get(gid(5)).unwrap()), 1);
    }
}
