//! DER codecs for the certificate structure menu.
//!
//! Every codec exposes the same two-phase capacity contract. Encoders take
//! `out: Option<&mut [u8]>`: `None` is the sizing call and returns the
//! bytes needed, `Some(buf)` writes and returns the bytes written, failing
//! with [`Error::BufferTooSmall`](crate::Error::BufferTooSmall) when the
//! buffer is short. The sizing result always equals the written count for
//! the same value. Decoders split the same way into a `decoded_size_*`
//! sizing call and a `decode_*` call writing trailers into an
//! [`Arena`](crate::Arena).
//!
//! Writers always produce canonical DER. Readers reject non-canonical
//! forms by default; [`Leniency`] relaxes this for consuming real-world
//! near-DER data where the deviation is correctable.

pub mod int;
pub mod len;
pub mod name;
pub mod oid;
pub mod strings;
pub mod time;

use {
    crate::error::{Asn1Error, Result},
    core::fmt,
    tracing::warn,
};

/// ASN.1 universal tag octets used by the certificate menu.
pub(crate) mod tag {
    pub const INTEGER: u8 = 0x02;
    pub const BITSTRING: u8 = 0x03;
    pub const OCTETSTRING: u8 = 0x04;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const ENUMERATED: u8 = 0x0a;
    pub const SEQUENCE: u8 = 0x10;
    pub const SET_OF: u8 = 0x11;
    pub const NUMERIC_STRING: u8 = 0x12;
    pub const PRINTABLE_STRING: u8 = 0x13;
    pub const IA5_STRING: u8 = 0x16;
    pub const UTC_TIME: u8 = 0x17;
    pub const GENERALIZED_TIME: u8 = 0x18;
    pub const CONSTRUCTED: u8 = 0x20;
}

/// How to handle correctable deviations from canonical DER when decoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Leniency {
    /// Accept silently.
    Allow,

    /// Accept, but log a warning.
    Warn,

    /// Reject as corrupt.
    #[default]
    Strict,
}

pub(crate) fn lenient(leniency: Leniency, msg: &'static str) -> Result<()> {
    match leniency {
        Leniency::Strict => Err(Asn1Error::Corrupt.into()),
        Leniency::Warn => {
            warn!(msg);
            Ok(())
        }
        Leniency::Allow => Ok(()),
    }
}

/// Decoder behavior switches shared by every decode entry point.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecodeOptions {
    /// Decoded blobs alias the input buffer instead of copying into the
    /// arena. Ties the decoded value's lifetime to the input buffer's.
    pub no_copy: bool,

    /// Hint that decoded object identifier text may be shared. Best-effort;
    /// the built-in codecs accept and ignore it.
    pub share_oid: bool,

    /// Treatment of non-minimal length and integer encodings.
    pub minimality: Leniency,
}

/// Borrowed octet-string contents.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ByteBlob<'a>(pub &'a [u8]);

impl<'a> ByteBlob<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> From<&'a [u8]> for ByteBlob<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for ByteBlob<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteBlob({})", hex::encode(self.0))
    }
}
