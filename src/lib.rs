//! DER encoding and decoding of X.509 certificate structures.
//!
//! The crate implements the Distinguished Encoding Rules for the fixed
//! menu of ASN.1 structures that certificate handling needs: integers
//! (native-width, big-number signed and unsigned, enumerated), bit and
//! octet strings, object identifiers, UTCTime and GeneralizedTime, and
//! distinguished names. It is not a general BER implementation: readers
//! reject indefinite lengths, constructed primitives, and (by default)
//! non-minimal encodings, and writers always produce the canonical form.
//!
//! Dispatch happens by structure identifier through [`ObjectCodec`]: a
//! numeric id from the closed [`StructKind`] enumeration or an object
//! identifier string. Identifiers the built-in table does not serve are
//! referred to the plugin registry (see [`registry`]), so third-party
//! modules can supply codecs with the same signatures as the built-ins.
//!
//! Every codec is stateless and follows one two-phase capacity contract:
//! a sizing call reports the bytes needed, a writing call checks capacity
//! first and then produces exactly that many bytes. Decoded values keep
//! their variable-length parts in a caller-supplied [`Arena`] (or alias
//! the input buffer in no-copy mode), so one backing buffer covers a whole
//! decoded tree.

pub mod arena;
pub mod asn1;
pub mod dispatch;
pub mod error;
pub mod registry;

pub use self::{
    arena::{Allocator, Arena, SystemAllocator},
    asn1::{
        int::IntBlob,
        name::{Name, NameValue, Rdn, RdnAttr, StringKind},
        strings::BitBlob,
        time::Timestamp,
        ByteBlob, DecodeOptions, Leniency,
    },
    dispatch::{
        Decoded, EncodingType, ObjectCodec, StructKind, StructValue, StructureId,
        OID_CRL_REASON_CODE, OID_KEY_USAGE, OID_RSA_SIGNING_TIME, OID_SUBJECT_KEY_IDENTIFIER,
    },
    error::{Asn1Error, Error, Result},
};

/// Guard a condition, returning the given error when it does not hold.
#[macro_export]
macro_rules! ensure_err {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}
