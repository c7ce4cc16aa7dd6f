//! Structure-id driven dispatch: the public encode/decode entry points.
//!
//! Two pairs of entry points share the per-type codecs. The plain pair
//! ([`ObjectCodec::encode_object`], [`ObjectCodec::decode_object`]) is the
//! fixed-output-buffer contract; the `_ex` pair adds decode options
//! (no-copy aliasing, leniency) and, via [`ObjectCodec::encode_object_alloc`],
//! output allocated through the [`Allocator`] capability. Identifiers not
//! in the built-in table are referred to the plugin registry.

use {
    crate::{
        arena::{Allocator, Arena},
        asn1::{
            int::{
                decode_enumerated, decode_int, decode_integer, decode_uint, decoded_size_integer,
                decoded_size_uint, encode_enumerated, encode_int, encode_integer, encode_uint,
                IntBlob,
            },
            name::{decode_name, decoded_size_name, encode_name, Name},
            strings::{
                decode_bits, decode_octets, decoded_size_bits, decoded_size_octets, encode_bits,
                encode_octets, BitBlob,
            },
            time::{
                decode_choice_of_time, decode_utc_time, encode_choice_of_time, encode_utc_time,
                Timestamp,
            },
            ByteBlob, DecodeOptions,
        },
        ensure_err,
        error::{Error, Result},
        registry::{self, PluginResolver, RegistryStore},
    },
    num_enum::{IntoPrimitive, TryFromPrimitive},
    tracing::{trace, warn},
};

/// Encoding families packed into one word: the low half selects a
/// certificate family, the high half a message family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EncodingType(u32);

impl EncodingType {
    pub const X509_ASN1: EncodingType = EncodingType(1);
    pub const PKCS7_ASN1: EncodingType = EncodingType(0x1_0000);

    const CERT_MASK: u32 = 0xffff;
    const MSG_MASK: u32 = 0xffff_0000;

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The certificate half of the word.
    pub const fn cert_encoding(self) -> u32 {
        self.0 & Self::CERT_MASK
    }

    /// The message half of the word.
    pub const fn msg_encoding(self) -> u32 {
        self.0 & Self::MSG_MASK
    }

    /// Whether either half names a family this crate serves.
    pub(crate) const fn is_recognized(self) -> bool {
        self.cert_encoding() == Self::X509_ASN1.0 || self.msg_encoding() == Self::PKCS7_ASN1.0
    }
}

/// The closed numeric structure-id enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum StructKind {
    Name = 7,
    KeyUsage = 14,
    UtcTime = 17,
    OctetString = 25,
    BitString = 26,
    Int = 27,
    BigInt = 28,
    Enumerated = 29,
    ChoiceOfTime = 30,
    BigUint = 38,
}

/// Well-known object identifiers served by built-in codecs.
pub const OID_RSA_SIGNING_TIME: &str = "1.2.840.113549.1.9.5";
pub const OID_CRL_REASON_CODE: &str = "2.5.29.21";
pub const OID_KEY_USAGE: &str = "2.5.29.15";
pub const OID_SUBJECT_KEY_IDENTIFIER: &str = "2.5.29.14";

/// A structure identifier: a small number from the closed enumeration, or
/// an object identifier string consulted against the well-known table and
/// the plugin registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StructureId {
    Numeric(u16),
    Oid(String),
}

impl StructureId {
    pub fn oid(oid: impl Into<String>) -> Self {
        Self::Oid(oid.into())
    }

    /// Key form used by the registry: the identifier string itself, or
    /// `#N` for numeric identifiers.
    pub(crate) fn registry_key(&self) -> String {
        match self {
            Self::Numeric(n) => format!("#{n}"),
            Self::Oid(oid) => oid.clone(),
        }
    }
}

impl From<StructKind> for StructureId {
    fn from(kind: StructKind) -> Self {
        Self::Numeric(kind.into())
    }
}

/// Encoder input for a dispatched structure.
#[derive(Clone, Copy, Debug)]
pub enum StructValue<'a> {
    Int(i32),
    BigInt(IntBlob<'a>),
    BigUint(IntBlob<'a>),
    Enumerated(u32),
    Bits(BitBlob<'a>),
    Octets(ByteBlob<'a>),
    Time(Timestamp),
    Name(&'a Name<'a>),
}

/// Decoder output for a dispatched structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded<'a> {
    Int(i32),
    BigInt(IntBlob<'a>),
    BigUint(IntBlob<'a>),
    Enumerated(u32),
    Bits(BitBlob<'a>),
    Octets(ByteBlob<'a>),
    Time(Timestamp),
    Name(Name<'a>),
}

#[derive(Clone, Copy, Debug)]
enum Builtin {
    Name,
    Octets,
    Bits,
    Int,
    BigInt,
    BigUint,
    Enumerated,
    ChoiceOfTime,
    UtcTime,
}

fn builtin_for(id: &StructureId) -> Option<Builtin> {
    let builtin = match id {
        StructureId::Numeric(n) => match StructKind::try_from(*n).ok()? {
            StructKind::Name => Builtin::Name,
            StructKind::OctetString => Builtin::Octets,
            StructKind::BitString | StructKind::KeyUsage => Builtin::Bits,
            StructKind::Int => Builtin::Int,
            StructKind::BigInt => Builtin::BigInt,
            StructKind::BigUint => Builtin::BigUint,
            StructKind::Enumerated => Builtin::Enumerated,
            StructKind::ChoiceOfTime => Builtin::ChoiceOfTime,
            StructKind::UtcTime => Builtin::UtcTime,
        },
        StructureId::Oid(oid) => match oid.as_str() {
            OID_RSA_SIGNING_TIME => Builtin::UtcTime,
            OID_CRL_REASON_CODE => Builtin::Enumerated,
            OID_KEY_USAGE => Builtin::Bits,
            OID_SUBJECT_KEY_IDENTIFIER => Builtin::Octets,
            _ => return None,
        },
    };
    Some(builtin)
}

/// Structure-id driven encode/decode dispatch, optionally extended by a
/// plugin registry.
///
/// Decoding is two-phase: size first, then decode into an arena over a
/// backing buffer the caller owns (obtained from an [`Allocator`] when the
/// storage policy is not the caller's own).
///
/// ```
/// use cert_der::{
///     Allocator, Arena, EncodingType, ObjectCodec, StructKind, StructureId, SystemAllocator,
/// };
///
/// # fn main() -> cert_der::Result<()> {
/// let codec = ObjectCodec::new();
/// let id = StructureId::Numeric(StructKind::OctetString.into());
/// let wire = [0x04, 0x03, 0x01, 0x02, 0x03];
/// let size = codec.decode_object_size(EncodingType::X509_ASN1, &id, &wire)?;
/// let mut backing = SystemAllocator.alloc(size);
/// let mut arena = Arena::new(&mut backing);
/// let decoded = codec.decode_object(EncodingType::X509_ASN1, &id, &wire, &mut arena)?;
/// # let _ = decoded;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Default)]
pub struct ObjectCodec<'e> {
    registry: Option<&'e dyn RegistryStore>,
    resolver: Option<&'e dyn PluginResolver>,
}

impl<'e> ObjectCodec<'e> {
    /// Dispatch over the built-in codecs only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch that refers unknown structure identifiers to registered
    /// plugin modules.
    pub fn with_registry(
        registry: &'e dyn RegistryStore,
        resolver: &'e dyn PluginResolver,
    ) -> Self {
        Self {
            registry: Some(registry),
            resolver: Some(resolver),
        }
    }

    /// Encode under the fixed-output-buffer contract. `out: None` is the
    /// sizing call. A registered override of this entry point wins over
    /// the built-in table.
    pub fn encode_object(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        value: &StructValue<'_>,
        mut out: Option<&mut [u8]>,
    ) -> Result<usize> {
        if let Some(result) =
            self.plugin_encode(encoding, id, registry::FUNC_ENCODE_OBJECT, value, out.as_deref_mut())
        {
            return result;
        }
        self.encode_object_ex(encoding, id, value, out)
    }

    /// Encode with the richer contract: built-ins first, then plugins
    /// registered under the extended entry point.
    pub fn encode_object_ex(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        value: &StructValue<'_>,
        out: Option<&mut [u8]>,
    ) -> Result<usize> {
        ensure_err!(encoding.is_recognized(), Error::NotFound);
        match builtin_for(id) {
            Some(builtin) => {
                trace!(?id, ?builtin, "dispatching built-in encoder");
                encode_builtin(builtin, value, out)
            }
            None => {
                warn!(?id, "structure id not built in, consulting registry");
                self.plugin_encode(encoding, id, registry::FUNC_ENCODE_OBJECT_EX, value, out)
                    .unwrap_or(Err(Error::NotFound))
            }
        }
    }

    /// Encode into storage obtained from the [`Allocator`] capability.
    pub fn encode_object_alloc(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        value: &StructValue<'_>,
        allocator: &dyn Allocator,
    ) -> Result<Box<[u8]>> {
        let needed = self.encode_object_ex(encoding, id, value, None)?;
        let mut buf = allocator.alloc(needed);
        ensure_err!(buf.len() >= needed, Error::BufferTooSmall { needed });
        self.encode_object_ex(encoding, id, value, Some(&mut buf))?;
        Ok(buf)
    }

    /// Arena bytes a [`Self::decode_object`] call will consume.
    pub fn decode_object_size(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        input: &[u8],
    ) -> Result<usize> {
        let opts = DecodeOptions::default();
        if let Some(result) =
            self.plugin_decode_size(encoding, id, registry::FUNC_DECODE_OBJECT, input, &opts)
        {
            return result;
        }
        self.decode_object_size_ex(encoding, id, input, &opts)
    }

    /// Decode under the fixed-output-buffer contract with default options.
    /// A registered override of this entry point wins over the built-in
    /// table.
    pub fn decode_object<'a>(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        input: &'a [u8],
        arena: &mut Arena<'a>,
    ) -> Result<Decoded<'a>> {
        let opts = DecodeOptions::default();
        if let Some(result) =
            self.plugin_decode(encoding, id, registry::FUNC_DECODE_OBJECT, input, &opts, arena)
        {
            return result;
        }
        self.decode_object_ex(encoding, id, input, &opts, arena)
    }

    /// Arena bytes a [`Self::decode_object_ex`] call will consume.
    pub fn decode_object_size_ex(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        input: &[u8],
        opts: &DecodeOptions,
    ) -> Result<usize> {
        ensure_err!(encoding.is_recognized(), Error::NotFound);
        match builtin_for(id) {
            Some(builtin) => decoded_size_builtin(builtin, input, opts),
            None => self
                .plugin_decode_size(encoding, id, registry::FUNC_DECODE_OBJECT_EX, input, opts)
                .unwrap_or(Err(Error::NotFound)),
        }
    }

    /// Decode with the richer contract: no-copy aliasing and leniency via
    /// `opts`, built-ins first, then plugins registered under the extended
    /// entry point.
    pub fn decode_object_ex<'a>(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        input: &'a [u8],
        opts: &DecodeOptions,
        arena: &mut Arena<'a>,
    ) -> Result<Decoded<'a>> {
        ensure_err!(encoding.is_recognized(), Error::NotFound);
        if opts.share_oid {
            trace!("share-oid hint ignored");
        }
        match builtin_for(id) {
            Some(builtin) => {
                trace!(?id, ?builtin, "dispatching built-in decoder");
                let needed = decoded_size_builtin(builtin, input, opts)?;
                ensure_err!(arena.remaining() >= needed, Error::BufferTooSmall { needed });
                decode_builtin(builtin, input, opts, arena)
            }
            None => {
                warn!(?id, "structure id not built in, consulting registry");
                self.plugin_decode(encoding, id, registry::FUNC_DECODE_OBJECT_EX, input, opts, arena)
                    .unwrap_or(Err(Error::NotFound))
            }
        }
    }

    fn plugin_encode(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        func_name: &str,
        value: &StructValue<'_>,
        out: Option<&mut [u8]>,
    ) -> Option<Result<usize>> {
        let hit = registry::lookup(self.registry?, encoding, func_name, id)?;
        let module = self.load_module(&hit)?;
        let encoder = module.encoder(&hit.symbol)?;
        Some(encoder.encode(encoding, id, value, out))
    }

    fn plugin_decode_size(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        func_name: &str,
        input: &[u8],
        opts: &DecodeOptions,
    ) -> Option<Result<usize>> {
        let hit = registry::lookup(self.registry?, encoding, func_name, id)?;
        let module = self.load_module(&hit)?;
        let decoder = module.decoder(&hit.symbol)?;
        Some(decoder.decoded_size(encoding, id, input, opts))
    }

    fn plugin_decode<'a>(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        func_name: &str,
        input: &'a [u8],
        opts: &DecodeOptions,
        arena: &mut Arena<'a>,
    ) -> Option<Result<Decoded<'a>>> {
        let hit = registry::lookup(self.registry?, encoding, func_name, id)?;
        let module = self.load_module(&hit)?;
        let decoder = module.decoder(&hit.symbol)?;
        Some(decoder.decode(encoding, id, input, opts, arena))
    }

    fn load_module(&self, hit: &registry::PluginRef) -> Option<Box<dyn registry::PluginModule + 'e>> {
        match self.resolver?.load(&hit.module) {
            Ok(module) => Some(module),
            Err(error) => {
                warn!(module = %hit.module, %error, "plugin module failed to load");
                None
            }
        }
    }
}

fn encode_builtin(
    builtin: Builtin,
    value: &StructValue<'_>,
    out: Option<&mut [u8]>,
) -> Result<usize> {
    match (builtin, value) {
        (Builtin::Name, StructValue::Name(name)) => encode_name(name, out),
        (Builtin::Octets, StructValue::Octets(blob)) => encode_octets(blob, out),
        (Builtin::Bits, StructValue::Bits(blob)) => encode_bits(blob, out),
        (Builtin::Int, StructValue::Int(val)) => encode_int(*val, out),
        (Builtin::BigInt, StructValue::BigInt(blob)) => encode_integer(blob, out),
        (Builtin::BigUint, StructValue::BigUint(blob)) => encode_uint(blob, out),
        (Builtin::Enumerated, StructValue::Enumerated(val)) => encode_enumerated(*val, out),
        (Builtin::ChoiceOfTime, StructValue::Time(timestamp)) => {
            encode_choice_of_time(*timestamp, out)
        }
        (Builtin::UtcTime, StructValue::Time(timestamp)) => encode_utc_time(*timestamp, out),
        _ => Err(Error::InvalidParameter),
    }
}

fn decoded_size_builtin(builtin: Builtin, input: &[u8], opts: &DecodeOptions) -> Result<usize> {
    match builtin {
        Builtin::Name => decoded_size_name(input, opts),
        Builtin::Octets => decoded_size_octets(input, opts),
        Builtin::Bits => decoded_size_bits(input, opts),
        Builtin::BigInt => decoded_size_integer(input, opts),
        Builtin::BigUint => decoded_size_uint(input, opts),
        // native-width and time results carry no trailers
        Builtin::Int | Builtin::Enumerated | Builtin::ChoiceOfTime | Builtin::UtcTime => Ok(0),
    }
}

fn decode_builtin<'a>(
    builtin: Builtin,
    input: &'a [u8],
    opts: &DecodeOptions,
    arena: &mut Arena<'a>,
) -> Result<Decoded<'a>> {
    let decoded = match builtin {
        Builtin::Name => Decoded::Name(decode_name(input, opts, arena)?),
        Builtin::Octets => Decoded::Octets(decode_octets(input, opts, arena)?),
        Builtin::Bits => Decoded::Bits(decode_bits(input, opts, arena)?),
        Builtin::Int => Decoded::Int(decode_int(input, opts.minimality)?),
        Builtin::BigInt => Decoded::BigInt(decode_integer(input, opts, arena)?),
        Builtin::BigUint => Decoded::BigUint(decode_uint(input, opts, arena)?),
        Builtin::Enumerated => Decoded::Enumerated(decode_enumerated(input, opts.minimality)?),
        Builtin::ChoiceOfTime => Decoded::Time(decode_choice_of_time(input, opts.minimality)?),
        Builtin::UtcTime => Decoded::Time(decode_utc_time(input, opts.minimality)?),
    };
    Ok(decoded)
}
