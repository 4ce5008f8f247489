//! Rewrites cmap subtables through a gid map, dropping entries whose
//! target glyph was not retained.

use font_types::GlyphId;
use otl::codec::cmap::{decode_format4, decode_format12, encode_minimal};

use crate::gidmap::GidMap;
use crate::error::Result;

/// Decode a format 4 or format 12 cmap subtable, drop entries mapping to a
/// glyph the subset doesn't retain, remap the rest through `gids`, and
/// re-encode in whichever of the two formats is smaller.
///
/// `format` is the subtable's on-disk format field; other formats (0, 2, 6,
/// 8, 10, 13, 14) are an out-of-scope collaborator's problem here, same as
/// in the engine's own codec -- the caller decides whether to pass them
/// through opaquely or drop them.
pub fn rewrite_cmap_subtable(format: u16, data: &[u8], gids: &GidMap) -> Result<(u16, Vec<u8>)> {
    let mappings = match format {
        4 => decode_format4(data)?,
        12 => decode_format12(data)?,
        _ => {
            return Err(otl::Error::unsupported(
                "subset-cmap",
                "only cmap formats 4 and 12 can be rewritten",
            )
            .into())
        }
    };

    let remapped = remap_mappings(&mappings, gids);
    Ok(encode_minimal(&remapped))
}

fn remap_mappings(mappings: &[(u32, GlyphId)], gids: &GidMap) -> Vec<(u32, GlyphId)> {
    let mut out = Vec::with_capacity(mappings.len());
    for &(codepoint, old_gid) in mappings {
        if let Some(new_gid) = gids.get(old_gid) {
            out.push((codepoint, new_gid));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use otl::codec::cmap::encode_format4;

    #[test]
    fn drops_entries_for_removed_glyphs_and_remaps_survivors() {
        let mappings = vec![
            (0x41, GlyphId::new(5)),
            (0x42, GlyphId::new(6)),
            (0x43, GlyphId::new(7)),
        ];
        let encoded = encode_format4(&mappings).unwrap();

        let mut gids = GidMap::with_capacity(3);
        gids.add(GlyphId::new(0));
        gids.add(GlyphId::new(5));
        // glyph 6 is never added: it was not retained.
        gids.add(GlyphId::new(7));

        let (format, rewritten) = rewrite_cmap_subtable(4, &encoded, &gids).unwrap();
        let decoded = if format == 4 {
            decode_format4(&rewritten).unwrap()
        } else {
            decode_format12(&rewritten).unwrap()
        };

        assert_eq!(decoded.len(), 2);
        assert!(decoded.contains(&(0x41, GlyphId::new(1))));
        assert!(decoded.contains(&(0x43, GlyphId::new(2))));
        assert!(!decoded.iter().any(|(cp, _)| *cp == 0x42));
    }

    #[test]
    fn rejects_unsupported_formats() {
        let gids = GidMap::with_capacity(1);
        assert!(rewrite_cmap_subtable(6, &[], &gids).is_err());
    }
}
