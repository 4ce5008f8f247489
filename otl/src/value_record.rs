//! GPOS value records: the per-glyph (xPlacement, yPlacement, xAdvance,
//! yAdvance) adjustment, plus the format bitmask that says which fields are
//! present on the wire.

use crate::codec::cursor::Cursor;
use crate::error::Result;
use crate::glyph::GlyphEntry;

const SUBSYSTEM: &str = "gpos:value_record";

/// Which fields a ValueRecord carries; device/variation-index fields are
/// parsed (to keep the cursor aligned) but not applied -- font variations
/// are out of scope here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValueFormat(u16);

impl ValueFormat {
    pub const X_PLACEMENT: Self = Self(0x0001);
    pub const Y_PLACEMENT: Self = Self(0x0002);
    pub const X_ADVANCE: Self = Self(0x0004);
    pub const Y_ADVANCE: Self = Self(0x0008);
    pub const X_PLACEMENT_DEVICE: Self = Self(0x0010);
    pub const Y_PLACEMENT_DEVICE: Self = Self(0x0020);
    pub const X_ADVANCE_DEVICE: Self = Self(0x0040);
    pub const Y_ADVANCE_DEVICE: Self = Self(0x0080);

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn to_bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for ValueFormat {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValueRecord {
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
    pub y_advance: i16,
}

impl ValueRecord {
    pub fn decode(cur: &mut Cursor, format: ValueFormat) -> Result<Self> {
        let mut record = ValueRecord::default();
        if format.contains(ValueFormat::X_PLACEMENT) {
            record.x_placement = cur.read_i16(SUBSYSTEM)?;
        }
        if format.contains(ValueFormat::Y_PLACEMENT) {
            record.y_placement = cur.read_i16(SUBSYSTEM)?;
        }
        if format.contains(ValueFormat::X_ADVANCE) {
            record.x_advance = cur.read_i16(SUBSYSTEM)?;
        }
        if format.contains(ValueFormat::Y_ADVANCE) {
            record.y_advance = cur.read_i16(SUBSYSTEM)?;
        }
        // device/variation-index offsets: skip without resolving.
        for flag in [
            ValueFormat::X_PLACEMENT_DEVICE,
            ValueFormat::Y_PLACEMENT_DEVICE,
            ValueFormat::X_ADVANCE_DEVICE,
            ValueFormat::Y_ADVANCE_DEVICE,
        ] {
            if format.contains(flag) {
                cur.read_u16(SUBSYSTEM)?;
            }
        }
        Ok(record)
    }

    /// Number of bytes a record in this format occupies on the wire.
    pub fn encoded_len(format: ValueFormat) -> usize {
        format.to_bits().count_ones() as usize * 2
    }

    pub fn encode(&self, w: &mut crate::codec::cursor::Writer, format: ValueFormat) {
        if format.contains(ValueFormat::X_PLACEMENT) {
            w.i16(self.x_placement);
        }
        if format.contains(ValueFormat::Y_PLACEMENT) {
            w.i16(self.y_placement);
        }
        if format.contains(ValueFormat::X_ADVANCE) {
            w.i16(self.x_advance);
        }
        if format.contains(ValueFormat::Y_ADVANCE) {
            w.i16(self.y_advance);
        }
    }

    /// Apply this record's adjustments to a glyph entry.
    pub fn apply_to(&self, entry: &mut GlyphEntry) {
        entry.x_offset = entry.x_offset.saturating_add(self.x_placement);
        entry.y_offset = entry.y_offset.saturating_add(self.y_placement);
        entry.advance = entry.advance.saturating_add_signed(self.x_advance);
    }
}
