//! The LookupList binary codec, generic over GSUB/GPOS via [`Subtable`].
//!
//! Decoding transparently unwraps extension subtables (lookup type 7 for
//! GSUB, 9 for GPOS) into the real subtable they wrap, so the rest of this
//! crate never has to think about extensions. Encoding does the reverse:
//! it lays a lookup out directly first, and only wraps every one of its
//! subtables in an extension record if a 16-bit subtable offset would
//! otherwise overflow. Real-world fonts promote a whole lookup at once
//! rather than mixing extension and direct subtables within it, and this
//! codec follows that convention.

use crate::codec::cursor::{Cursor, Writer};
use crate::error::{Error, Result};
use crate::keep::LookupFlag;
use crate::lookup::{Lookup, LookupList, Subtable};

const SUBSYSTEM: &str = "lookuplist";

/// Total subtables a LookupList may contain across all its lookups. Far
/// beyond anything a real font needs; exists to bound memory use against a
/// maliciously crafted offset table.
const MAX_SUBTABLES: usize = 6000;

pub fn decode_lookup_list<S: Subtable>(data: &[u8]) -> Result<LookupList<S>> {
    let mut cur = Cursor::new(data);
    let count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
    }
    let mut lookups = Vec::with_capacity(count);
    let mut total_subtables = 0usize;
    for off in offsets {
        let lookup_data = data
            .get(off..)
            .ok_or_else(|| Error::malformed(SUBSYSTEM, "lookup offset out of bounds"))?;
        let lookup = decode_lookup::<S>(lookup_data)?;
        total_subtables += lookup.subtables.len();
        if total_subtables > MAX_SUBTABLES {
            return Err(Error::resource_limit(
                SUBSYSTEM,
                "LookupList exceeds the maximum supported subtable count",
            ));
        }
        lookups.push(lookup);
    }
    Ok(LookupList { lookups })
}

fn decode_lookup<S: Subtable>(data: &[u8]) -> Result<Lookup<S>> {
    let mut cur = Cursor::new(data);
    let lookup_type = cur.read_u16(SUBSYSTEM)?;
    let flags = LookupFlag::from_bits(cur.read_u16(SUBSYSTEM)?);
    let subtable_count = cur.read_u16(SUBSYSTEM)? as usize;
    let mut sub_offsets = Vec::with_capacity(subtable_count);
    for _ in 0..subtable_count {
        sub_offsets.push(cur.read_u16(SUBSYSTEM)? as usize);
    }
    let mark_filtering_set = if flags.contains(LookupFlag::USE_MARK_FILTERING_SET) {
        Some(cur.read_u16(SUBSYSTEM)?)
    } else {
        None
    };

    let mut subtables = Vec::with_capacity(subtable_count);
    for off in sub_offsets {
        subtables.push(decode_subtable::<S>(data, off, lookup_type)?);
    }
    let resolved_type = subtables
        .first()
        .map(|s| s.lookup_type())
        .unwrap_or(lookup_type);

    Ok(Lookup {
        lookup_type: resolved_type,
        flags,
        mark_filtering_set,
        subtables,
    })
}

fn decode_subtable<S: Subtable>(data: &[u8], base_off: usize, lookup_type: u16) -> Result<S> {
    let sub_data = data
        .get(base_off..)
        .ok_or_else(|| Error::malformed(SUBSYSTEM, "subtable offset out of bounds"))?;
    if lookup_type == S::EXTENSION_LOOKUP_TYPE {
        let mut cur = Cursor::new(sub_data);
        let format = cur.read_u16(SUBSYSTEM)?;
        if format != 1 {
            return Err(Error::malformed(SUBSYSTEM, "unknown extension subtable format"));
        }
        let real_type = cur.read_u16(SUBSYSTEM)?;
        if real_type == S::EXTENSION_LOOKUP_TYPE {
            return Err(Error::malformed(SUBSYSTEM, "extension subtable references itself"));
        }
        let ext_offset = cur.read_u32(SUBSYSTEM)? as usize;
        let real_data = data
            .get(base_off + ext_offset..)
            .ok_or_else(|| Error::malformed(SUBSYSTEM, "extension offset out of bounds"))?;
        S::decode(real_type, real_data)
    } else {
        S::decode(lookup_type, sub_data)
    }
}

pub fn encode_lookup_list<S: Subtable>(list: &LookupList<S>) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(list.lookups.len() as u16);
    let slots: Vec<usize> = list.lookups.iter().map(|_| w.reserve_u16()).collect();
    for (slot, lookup) in slots.into_iter().zip(&list.lookups) {
        let here = w.len();
        w.patch_u16(slot, here as u16);
        encode_lookup(&mut w, lookup);
    }
    w.into_bytes()
}

fn encode_lookup<S: Subtable>(w: &mut Writer, lookup: &Lookup<S>) {
    let lookup_start = w.len();
    let encoded: Vec<Vec<u8>> = lookup.subtables.iter().map(|s| s.encode()).collect();

    let has_mfs = lookup.flags.contains(LookupFlag::USE_MARK_FILTERING_SET);
    let header_len = 2 + 2 + 2 + encoded.len() * 2 + if has_mfs { 2 } else { 0 };
    let mut offset = header_len;
    let mut overflow = false;
    for bytes in &encoded {
        if offset > 0xFFFF {
            overflow = true;
        }
        offset += bytes.len();
    }

    let lookup_type = if overflow {
        S::EXTENSION_LOOKUP_TYPE
    } else {
        lookup.lookup_type
    };
    w.u16(lookup_type);
    w.u16(lookup.flags.to_bits());
    w.u16(encoded.len() as u16);
    let slots: Vec<usize> = encoded.iter().map(|_| w.reserve_u16()).collect();
    if let Some(mfs) = lookup.mark_filtering_set {
        w.u16(mfs);
    }

    for (slot, (bytes, subtable)) in slots.into_iter().zip(encoded.iter().zip(&lookup.subtables)) {
        let here = w.len();
        w.patch_u16(slot, (here - lookup_start) as u16);
        if overflow {
            let ext_start = w.len();
            w.u16(1);
            w.u16(subtable.lookup_type());
            let ext_off_slot = w.reserve_u32();
            let real_here = w.len();
            w.patch_u32(ext_off_slot, (real_here - ext_start) as u32);
            w.bytes(bytes);
        } else {
            w.bytes(bytes);
        }
    }
}
