//! Binary codecs: big-endian cursor/writer primitives, the LookupList
//! codec shared by GSUB/GPOS, and the cmap format 4 / format 12 codec.

pub mod cmap;
pub mod cursor;
pub mod lookuplist;
