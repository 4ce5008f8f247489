//! The error taxonomy used by decoders, encoders and the shaping engine.
//!
//! Decoders refuse malformed input rather than repair it: repairing a
//! font-authoring bug masks the bug and creates interoperability hazards
//! down the line. The engine itself never returns an error -- invalid
//! runtime states are prevented by decoder validation and by the
//! [`Keep`](crate::keep::Keep) / matcher preconditions, so a failed match is
//! just a normal `None`, not an `Err`.

use thiserror::Error as ThisError;

/// A subsystem tag, attached to every error so callers can tell which
/// decoder or encoder produced it.
pub type Subsystem = &'static str;

#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
    /// Input that is structurally invalid: truncated data, bad offsets,
    /// overlapping cmap segments, offset overflow in an encoder, a cyclic
    /// extension reference.
    #[error("[{0}] malformed input: {1}")]
    Malformed(Subsystem, &'static str),
    /// A format that is recognized but intentionally not implemented, e.g.
    /// CFF2 outlines or cmap subtable formats 2/8/10/13/14 when the caller
    /// asks for manipulation rather than opaque pass-through.
    #[error("[{0}] unsupported: {1}")]
    Unsupported(Subsystem, &'static str),
    /// An operation was refused because it would require allocating or
    /// addressing beyond a configured cap (cmap format 12's 65 536-entry
    /// cap, the LookupList's 6 000-subtable cap).
    #[error("[{0}] resource limit: {1}")]
    ResourceLimit(Subsystem, &'static str),
    /// An internal invariant was violated: an unreachable branch, such as
    /// popping an empty nested-lookup stack, or encoding a coverage that
    /// lost its sort order. These indicate bugs in this crate, not bad
    /// input.
    #[error("[{0}] internal invariant violated: {1}")]
    Invariant(Subsystem, &'static str),
}

impl Error {
    pub fn malformed(subsystem: Subsystem, reason: &'static str) -> Self {
        Error::Malformed(subsystem, reason)
    }

    pub fn unsupported(subsystem: Subsystem, reason: &'static str) -> Self {
        Error::Unsupported(subsystem, reason)
    }

    pub fn resource_limit(subsystem: Subsystem, reason: &'static str) -> Self {
        Error::ResourceLimit(subsystem, reason)
    }

    pub fn invariant(subsystem: Subsystem, reason: &'static str) -> Self {
        Error::Invariant(subsystem, reason)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
