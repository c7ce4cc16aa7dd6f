//! Error taxonomy for the codec and registry surfaces.

use thiserror::Error;

/// Structural failures while reading DER input.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Asn1Error {
    /// Input ended in the middle of an element.
    #[error("unexpected end of encoded data")]
    EndOfData,

    /// The tag octet does not match the expected structure.
    #[error("tag does not match the expected structure")]
    BadTag,

    /// The element is present but violates DER rules.
    #[error("encoding violates DER rules")]
    Corrupt,

    /// Length octets exceed four bytes, or the value exceeds the handler's
    /// native width.
    #[error("length or value too large for this handler")]
    TooLarge,
}

/// Failures surfaced by the public codec and registry operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Output capacity is insufficient; `needed` is the required size.
    #[error("output buffer too small, {needed} bytes required")]
    BufferTooSmall { needed: usize },

    /// A required argument is missing, empty, or mismatched for this
    /// operation.
    #[error("invalid parameter")]
    InvalidParameter,

    /// The structure identifier is not built in and no plugin is registered
    /// for it.
    #[error("no codec found for this structure identifier")]
    NotFound,

    /// The input is not acceptable DER for the requested structure.
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] Asn1Error),

    /// The value cannot be represented in the requested encoding.
    #[error("value outside the representable range of the encoding")]
    BadEncode,

    /// The construct is recognized but this handler does not implement it.
    #[error("unsupported {0}")]
    Unsupported(&'static str),

    /// A caller or plugin violated an interface contract that cannot be
    /// expressed in the type system. The built-in codecs never produce this.
    #[error("caller contract violated")]
    AccessViolation,
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
