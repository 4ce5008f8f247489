//! The old-gid to new-gid bijection the rest of the subsetter rewrites
//! through.
//!
//! Modeled on the incremental bijective map pattern used to allocate new
//! glyph ids as a font is built up one retained glyph at a time: the first
//! glyph added gets new id 0, the second gets 1, and so on, while still
//! answering "what old glyph landed at new id N" for the tables that walk
//! the output in new-gid order (cmap, outline loca).

use fnv::FnvHashMap;
use font_types::GlyphId;

/// Assigns new glyph ids in insertion order and remembers both directions
/// of the mapping.
///
/// The caller is responsible for inserting glyphs in the order they should
/// appear in the subset font: the caller-supplied retain list first (so
/// that prefix is never reordered), then any glyphs pulled in by closure.
#[derive(Clone, Debug, Default)]
pub struct GidMap {
    forward: FnvHashMap<GlyphId, GlyphId>,
    backward: Vec<GlyphId>,
}

impl GidMap {
    pub fn with_capacity(capacity: usize) -> Self {
        GidMap {
            forward: FnvHashMap::with_capacity_and_hasher(capacity, Default::default()),
            backward: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.backward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backward.is_empty()
    }

    /// Insert `old` if it isn't already mapped, assigning it the next
    /// sequential new gid. Returns the new gid either way.
    pub fn add(&mut self, old: GlyphId) -> GlyphId {
        if let Some(new) = self.forward.get(&old) {
            return *new;
        }
        let new = GlyphId::new(self.backward.len() as u16);
        self.forward.insert(old, new);
        self.backward.push(old);
        new
    }

    /// The new gid a retained old gid was assigned, or `None` if `old` was
    /// not retained.
    pub fn get(&self, old: GlyphId) -> Option<GlyphId> {
        self.forward.get(&old).copied()
    }

    /// The old gid that ended up at new gid `new`, or `None` if the subset
    /// font has fewer than `new + 1` glyphs.
    pub fn get_backward(&self, new: GlyphId) -> Option<GlyphId> {
        self.backward.get(new.to_u16() as usize).copied()
    }

    /// Old glyph ids in the order they were added (i.e. in new-gid order).
    pub fn old_gids(&self) -> &[GlyphId] {
        &self.backward
    }

    pub fn contains_old(&self, old: GlyphId) -> bool {
        self.forward.contains_key(&old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_sequential_new_gids_in_insertion_order() {
        let mut map = GidMap::with_capacity(4);
        assert_eq!(map.add(GlyphId::new(0)), GlyphId::new(0));
        assert_eq!(map.add(GlyphId::new(50)), GlyphId::new(1));
        assert_eq!(map.add(GlyphId::new(7)), GlyphId::new(2));
        // re-adding an already-mapped glyph returns its existing new gid.
        assert_eq!(map.add(GlyphId::new(50)), GlyphId::new(1));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn looks_up_both_directions() {
        let mut map = GidMap::with_capacity(2);
        map.add(GlyphId::new(0));
        map.add(GlyphId::new(42));
        assert_eq!(map.get(GlyphId::new(42)), Some(GlyphId::new(1)));
        assert_eq!(map.get(GlyphId::new(99)), None);
        assert_eq!(map.get_backward(GlyphId::new(1)), Some(GlyphId::new(42)));
        assert_eq!(map.get_backward(GlyphId::new(5)), None);
    }
}
