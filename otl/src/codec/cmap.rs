//! CMap subtable format 4 (segmented, BMP-only) and format 12 (segmented,
//! full Unicode) codecs.
//!
//! Both formats decode to the same flat, sorted `(codepoint, GlyphId)`
//! representation; the platform/encoding subtable directory that wraps a
//! cmap's individual subtables is an external-collaborator concern (see the
//! crate docs) and is not modeled here.

use font_types::GlyphId;

use crate::codec::cursor::{Cursor, Writer};
use crate::error::{Error, Result};

const SUBSYSTEM: &str = "cmap";

/// Groups collapse more codepoints than any real font needs; this bounds
/// the memory a maliciously crafted format-12 subtable can force us to
/// allocate while expanding groups into individual mappings.
const MAX_FORMAT12_ENTRIES: usize = 65_536;

const MAX_UNICODE: u32 = 0x10_FFFF;

pub fn decode_format4(data: &[u8]) -> Result<Vec<(u32, GlyphId)>> {
    let mut cur = Cursor::new(data);
    let format = cur.read_u16(SUBSYSTEM)?;
    if format != 4 {
        return Err(Error::malformed(SUBSYSTEM, "not a format 4 subtable"));
    }
    let _length = cur.read_u16(SUBSYSTEM)?;
    let _language = cur.read_u16(SUBSYSTEM)?;
    let seg_count_x2 = cur.read_u16(SUBSYSTEM)?;
    if seg_count_x2 % 2 != 0 {
        return Err(Error::malformed(SUBSYSTEM, "segCountX2 is odd"));
    }
    let seg_count = (seg_count_x2 / 2) as usize;
    cur.read_u16(SUBSYSTEM)?; // searchRange
    cur.read_u16(SUBSYSTEM)?; // entrySelector
    cur.read_u16(SUBSYSTEM)?; // rangeShift

    let mut end_codes = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        end_codes.push(cur.read_u16(SUBSYSTEM)?);
    }
    let reserved_pad = cur.read_u16(SUBSYSTEM)?;
    if reserved_pad != 0 {
        return Err(Error::malformed(SUBSYSTEM, "reservedPad must be zero"));
    }
    let mut start_codes = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        start_codes.push(cur.read_u16(SUBSYSTEM)?);
    }
    let mut deltas = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        deltas.push(cur.read_i16(SUBSYSTEM)?);
    }
    let range_offset_table_pos = cur.pos();
    let mut range_offsets = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        range_offsets.push(cur.read_u16(SUBSYSTEM)?);
    }

    if seg_count == 0 || end_codes[seg_count - 1] != 0xFFFF {
        return Err(Error::malformed(
            SUBSYSTEM,
            "final segment must end at codepoint 0xFFFF",
        ));
    }

    let mut mappings = Vec::new();
    let mut prev_end: Option<u16> = None;
    for i in 0..seg_count {
        let start = start_codes[i];
        let end = end_codes[i];
        if end < start {
            return Err(Error::malformed(SUBSYSTEM, "segment end precedes start"));
        }
        if let Some(prev) = prev_end {
            if start <= prev {
                return Err(Error::malformed(SUBSYSTEM, "overlapping or out-of-order segments"));
            }
        }
        prev_end = Some(end);

        for c in start..=end {
            let gid = if range_offsets[i] == 0 {
                (c as i32).wrapping_add(deltas[i] as i32) as u16
            } else {
                let idx_pos = range_offset_table_pos
                    + i * 2
                    + range_offsets[i] as usize
                    + 2 * (c - start) as usize;
                let raw = read_u16_at(data, idx_pos)?;
                if raw == 0 {
                    0
                } else {
                    (raw as i32).wrapping_add(deltas[i] as i32) as u16
                }
            };
            if gid != 0 {
                mappings.push((c as u32, GlyphId::new(gid)));
            }
            if c == 0xFFFF {
                break; // avoid wrapping the loop counter
            }
        }
    }
    Ok(mappings)
}

fn read_u16_at(data: &[u8], pos: usize) -> Result<u16> {
    let bytes = data
        .get(pos..pos + 2)
        .ok_or_else(|| Error::malformed(SUBSYSTEM, "glyphIdArray read out of bounds"))?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub fn decode_format12(data: &[u8]) -> Result<Vec<(u32, GlyphId)>> {
    let mut cur = Cursor::new(data);
    let format = cur.read_u16(SUBSYSTEM)?;
    if format != 12 {
        return Err(Error::malformed(SUBSYSTEM, "not a format 12 subtable"));
    }
    let reserved = cur.read_u16(SUBSYSTEM)?;
    if reserved != 0 {
        return Err(Error::malformed(SUBSYSTEM, "reserved field must be zero"));
    }
    let _length = cur.read_u32(SUBSYSTEM)?;
    let _language = cur.read_u32(SUBSYSTEM)?;
    let num_groups = cur.read_u32(SUBSYSTEM)? as usize;

    let mut mappings = Vec::new();
    let mut prev_end: Option<u32> = None;
    let mut total = 0usize;
    for _ in 0..num_groups {
        let start = cur.read_u32(SUBSYSTEM)?;
        let end = cur.read_u32(SUBSYSTEM)?;
        let start_glyph = cur.read_u32(SUBSYSTEM)?;
        if end < start {
            return Err(Error::malformed(SUBSYSTEM, "group end precedes start"));
        }
        if end > MAX_UNICODE {
            return Err(Error::malformed(SUBSYSTEM, "group end exceeds U+10FFFF"));
        }
        if let Some(prev) = prev_end {
            if start <= prev {
                return Err(Error::malformed(SUBSYSTEM, "overlapping or out-of-order groups"));
            }
        }
        prev_end = Some(end);

        let count = (end - start + 1) as usize;
        total += count;
        if total > MAX_FORMAT12_ENTRIES {
            return Err(Error::resource_limit(
                SUBSYSTEM,
                "format 12 subtable expands beyond the supported entry cap",
            ));
        }
        for (i, c) in (start..=end).enumerate() {
            let gid = start_glyph + i as u32;
            if gid > 0xFFFF {
                return Err(Error::malformed(SUBSYSTEM, "glyph ID exceeds 16 bits"));
            }
            if gid != 0 {
                mappings.push((c, GlyphId::new(gid as u16)));
            }
        }
    }
    Ok(mappings)
}

/// A format-4 segment, as chosen by [`encode_format4`]'s per-run cost
/// comparison.
enum Segment {
    /// `idRangeOffset` is 0; every glyph in `start..=end` is `idDelta`
    /// away from its codepoint.
    Delta { start: u16, end: u16, delta: i32 },
    /// `idRangeOffset` addresses `gids`, one entry per codepoint in
    /// `start..=end`, used for a run whose glyphs aren't in arithmetic
    /// progression.
    Array { start: u16, end: u16, gids: Vec<u16> },
}

impl Segment {
    fn start(&self) -> u16 {
        match self {
            Segment::Delta { start, .. } | Segment::Array { start, .. } => *start,
        }
    }

    fn end(&self) -> u16 {
        match self {
            Segment::Delta { end, .. } | Segment::Array { end, .. } => *end,
        }
    }
}

/// Split a contiguous run of codepoints (`mappings[i..=j]`, consecutive
/// codepoints, not necessarily arithmetic glyphs) into `idDelta` segments,
/// one per maximal constant-delta sub-run.
fn delta_segments(mappings: &[(u32, GlyphId)]) -> Vec<(u16, u16, i32)> {
    let mut segments = Vec::new();
    let mut i = 0;
    while i < mappings.len() {
        let (start_cp, start_gid) = mappings[i];
        let delta = start_gid.to_u16() as i32 - start_cp as i32;
        let mut j = i;
        while j + 1 < mappings.len()
            && mappings[j + 1].0 == mappings[j].0 + 1
            && (mappings[j + 1].1.to_u16() as i32 - mappings[j + 1].0 as i32) == delta
        {
            j += 1;
        }
        segments.push((start_cp as u16, mappings[j].0 as u16, delta));
        i = j + 1;
    }
    segments
}

/// Choose the smaller of an `idDelta`-segmented or a single array-backed
/// encoding for one maximal contiguous-codepoint run.
///
/// Each `idDelta` segment costs 4 words (8 bytes) of header regardless of
/// its length; a single array segment costs 4 words plus 2 bytes per
/// codepoint in the run. A run that is one constant-delta progression
/// always wins as a single delta segment; a run with no arithmetic
/// structure at all is cheaper as one array segment once it's longer than
/// a handful of codepoints.
fn segment_run(mappings: &[(u32, GlyphId)]) -> Vec<Segment> {
    let deltas = delta_segments(mappings);
    if deltas.len() == 1 {
        let (start, end, delta) = deltas[0];
        return vec![Segment::Delta { start, end, delta }];
    }

    let delta_cost = deltas.len() * 8;
    let array_cost = 8 + mappings.len() * 2;
    if array_cost < delta_cost {
        vec![Segment::Array {
            start: mappings[0].0 as u16,
            end: mappings[mappings.len() - 1].0 as u16,
            gids: mappings.iter().map(|(_, g)| g.to_u16()).collect(),
        }]
    } else {
        deltas
            .into_iter()
            .map(|(start, end, delta)| Segment::Delta { start, end, delta })
            .collect()
    }
}

/// Encode as format 4, preferring `idDelta` segments but falling back to
/// `idRangeOffset`-addressed `glyphIdArray` segments for runs of codepoints
/// whose target glyphs aren't in arithmetic progression, whichever is
/// smaller for that run.
///
/// Returns an error if any codepoint exceeds the BMP (format 4 cannot
/// represent it); callers should fall back to [`encode_format12`] first.
pub fn encode_format4(mappings: &[(u32, GlyphId)]) -> Result<Vec<u8>> {
    for (cp, _) in mappings {
        if *cp > 0xFFFF {
            return Err(Error::malformed(SUBSYSTEM, "codepoint exceeds format 4's BMP range"));
        }
        if *cp == 0xFFFF {
            return Err(Error::malformed(
                SUBSYSTEM,
                "U+FFFF is reserved as format 4's terminator and cannot be mapped",
            ));
        }
    }

    let mut segments: Vec<Segment> = Vec::new();
    let mut i = 0;
    while i < mappings.len() {
        let mut j = i;
        while j + 1 < mappings.len() && mappings[j + 1].0 == mappings[j].0 + 1 {
            j += 1;
        }
        segments.extend(segment_run(&mappings[i..=j]));
        i = j + 1;
    }
    // terminator segment: maps 0xFFFF to .notdef via wraparound delta.
    segments.push(Segment::Delta {
        start: 0xFFFF,
        end: 0xFFFF,
        delta: 1,
    });

    let seg_count = segments.len();
    let seg_count_x2 = (seg_count * 2) as u16;
    let entry_selector = (usize::BITS - 1 - seg_count.max(1).leading_zeros()) as u16;
    let search_range = (1u16 << entry_selector) * 2;
    let range_shift = seg_count_x2.saturating_sub(search_range);

    let mut w = Writer::new();
    w.u16(4);
    let length_slot = w.reserve_u16();
    w.u16(0); // language
    w.u16(seg_count_x2);
    w.u16(search_range);
    w.u16(entry_selector);
    w.u16(range_shift);
    for seg in &segments {
        w.u16(seg.end());
    }
    w.u16(0); // reservedPad
    for seg in &segments {
        w.u16(seg.start());
    }
    for seg in &segments {
        match seg {
            Segment::Delta { delta, .. } => w.i16(*delta as i16),
            Segment::Array { .. } => w.i16(0),
        }
    }
    let range_offset_table_pos = w.len();
    let range_offset_slots: Vec<usize> = segments.iter().map(|_| w.reserve_u16()).collect();

    for (idx, seg) in segments.iter().enumerate() {
        if let Segment::Array { gids, .. } = seg {
            let array_pos = w.len();
            for gid in gids {
                w.u16(*gid);
            }
            let slot_pos = range_offset_table_pos + idx * 2;
            let range_offset = (array_pos - slot_pos) as u16;
            w.patch_u16(range_offset_slots[idx], range_offset);
        }
    }

    let len = w.len();
    w.patch_u16(length_slot, len as u16);
    Ok(w.into_bytes())
}

/// Encode as format 12, merging consecutive `(codepoint, glyph)` pairs with
/// a constant glyph stride into `SequentialMapGroup`s.
pub fn encode_format12(mappings: &[(u32, GlyphId)]) -> Vec<u8> {
    let mut groups: Vec<(u32, u32, u32)> = Vec::new();
    for &(cp, gid) in mappings {
        let gid = gid.to_u16() as u32;
        if let Some(last) = groups.last_mut() {
            if last.1 + 1 == cp && last.2 + (last.1 - last.0 + 1) == gid {
                last.1 = cp;
                continue;
            }
        }
        groups.push((cp, cp, gid));
    }

    let mut w = Writer::new();
    w.u16(12);
    w.u16(0); // reserved
    let length_slot = w.reserve_u32();
    w.u32(0); // language
    w.u32(groups.len() as u32);
    for (start, end, start_glyph) in groups {
        w.u32(start);
        w.u32(end);
        w.u32(start_glyph);
    }
    let len = w.len();
    w.patch_u32(length_slot, len as u32);
    w.into_bytes()
}

/// Pick whichever format is smaller; format 4 is only a candidate when
/// every codepoint fits in the BMP.
pub fn encode_minimal(mappings: &[(u32, GlyphId)]) -> (u16, Vec<u8>) {
    let format12 = encode_format12(mappings);
    match encode_format4(mappings) {
        Ok(format4) if format4.len() <= format12.len() => (4, format4),
        _ => (12, format12),
    }
}
