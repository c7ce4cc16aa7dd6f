//! Distinguished Name codecs: typed attribute values, RDN attributes,
//! relative distinguished names (SET OF, DER-sorted), and full names
//! (SEQUENCE OF).

use {
    super::{
        len::{element, encode_len, len_len},
        oid::{decode_oid, decoded_size_oid, encode_oid},
        tag, ByteBlob, DecodeOptions,
    },
    crate::{
        arena::Arena,
        ensure_err,
        error::{Asn1Error, Error, Result},
    },
    tracing::warn,
};

/// String type of an attribute value.
///
/// Only the kinds that certificate name attributes actually use are
/// implemented; other wire string tags decode as
/// [`Error::Unsupported`](crate::Error::Unsupported).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringKind {
    Numeric,
    Printable,
    Ia5,
}

impl StringKind {
    fn wire_tag(self) -> u8 {
        match self {
            Self::Numeric => tag::NUMERIC_STRING,
            Self::Printable => tag::PRINTABLE_STRING,
            Self::Ia5 => tag::IA5_STRING,
        }
    }

    fn from_wire_tag(wire_tag: u8) -> Option<Self> {
        match wire_tag {
            tag::NUMERIC_STRING => Some(Self::Numeric),
            tag::PRINTABLE_STRING => Some(Self::Printable),
            tag::IA5_STRING => Some(Self::Ia5),
            _ => None,
        }
    }
}

/// A typed attribute value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NameValue<'a> {
    pub kind: StringKind,
    pub value: ByteBlob<'a>,
}

/// One attribute of a relative distinguished name: an object identifier
/// and its typed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RdnAttr<'a> {
    pub oid: &'a str,
    pub value: NameValue<'a>,
}

/// A relative distinguished name. On the wire a SET OF whose members are
/// sorted by their encoded bytes; the decoded order is the wire order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rdn<'a> {
    pub attrs: Vec<RdnAttr<'a>>,
}

/// A distinguished name: a SEQUENCE OF RDNs, order preserved both ways.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Name<'a> {
    pub rdns: Vec<Rdn<'a>>,
}

/// Encode a typed attribute value under its string tag.
pub fn encode_name_value(value: &NameValue<'_>, out: Option<&mut [u8]>) -> Result<usize> {
    let content_len = value.value.len();
    let needed = 1 + len_len(content_len)? + content_len;
    let Some(out) = out else {
        return Ok(needed);
    };
    ensure_err!(out.len() >= needed, Error::BufferTooSmall { needed });
    out[0] = value.kind.wire_tag();
    let at = 1 + encode_len(content_len, Some(&mut out[1..]))?;
    out[at..needed].copy_from_slice(value.value.as_bytes());
    Ok(needed)
}

/// Encode an RDN attribute as `SEQUENCE { OID, value }`.
pub fn encode_rdn_attr(attr: &RdnAttr<'_>, out: Option<&mut [u8]>) -> Result<usize> {
    let oid_len = encode_oid(attr.oid, None)?;
    let value_len = encode_name_value(&attr.value, None)?;
    let content_len = oid_len + value_len;
    let needed = 1 + len_len(content_len)? + content_len;
    let Some(out) = out else {
        return Ok(needed);
    };
    ensure_err!(out.len() >= needed, Error::BufferTooSmall { needed });
    out[0] = tag::CONSTRUCTED | tag::SEQUENCE;
    let mut at = 1 + encode_len(content_len, Some(&mut out[1..]))?;
    at += encode_oid(attr.oid, Some(&mut out[at..at + oid_len]))?;
    encode_name_value(&attr.value, Some(&mut out[at..needed]))?;
    Ok(needed)
}

/// Encode an RDN as a SET OF its attributes.
///
/// DER requires SET OF members in ascending order of their encoded bytes,
/// so each attribute is encoded into its own scratch buffer, the buffers
/// are sorted, and the result is concatenated.
pub fn encode_rdn(rdn: &Rdn<'_>, out: Option<&mut [u8]>) -> Result<usize> {
    let mut content_len = 0;
    for attr in &rdn.attrs {
        content_len += encode_rdn_attr(attr, None)?;
    }
    let needed = 1 + len_len(content_len)? + content_len;
    let Some(out) = out else {
        return Ok(needed);
    };
    ensure_err!(out.len() >= needed, Error::BufferTooSmall { needed });
    let mut members: Vec<Vec<u8>> = Vec::with_capacity(rdn.attrs.len());
    for attr in &rdn.attrs {
        let size = encode_rdn_attr(attr, None)?;
        let mut buf = vec![0; size];
        encode_rdn_attr(attr, Some(&mut buf))?;
        members.push(buf);
    }
    // byte-wise order with shorter-is-less ties is exactly slice ordering
    members.sort_unstable();
    out[0] = tag::CONSTRUCTED | tag::SET_OF;
    let mut at = 1 + encode_len(content_len, Some(&mut out[1..]))?;
    for member in &members {
        out[at..at + member.len()].copy_from_slice(member);
        at += member.len();
    }
    Ok(needed)
}

/// Encode a distinguished name as a SEQUENCE OF its RDNs, in order.
pub fn encode_name(name: &Name<'_>, out: Option<&mut [u8]>) -> Result<usize> {
    let mut content_len = 0;
    for rdn in &name.rdns {
        content_len += encode_rdn(rdn, None)?;
    }
    let needed = 1 + len_len(content_len)? + content_len;
    let Some(out) = out else {
        return Ok(needed);
    };
    ensure_err!(out.len() >= needed, Error::BufferTooSmall { needed });
    out[0] = tag::CONSTRUCTED | tag::SEQUENCE;
    let mut at = 1 + encode_len(content_len, Some(&mut out[1..]))?;
    for rdn in &name.rdns {
        at += encode_rdn(rdn, Some(&mut out[at..needed]))?;
    }
    Ok(needed)
}

/// Arena bytes needed to decode a typed attribute value.
pub fn decoded_size_name_value(input: &[u8], opts: &DecodeOptions) -> Result<usize> {
    let el = element(input, opts.minimality)?;
    if StringKind::from_wire_tag(el.tag).is_none() {
        warn!(tag = el.tag, "unimplemented string type");
        return Err(Error::Unsupported("string kind"));
    }
    Ok(if opts.no_copy { 0 } else { el.contents.len() })
}

/// Decode a typed attribute value.
pub fn decode_name_value<'a>(
    input: &'a [u8],
    opts: &DecodeOptions,
    arena: &mut Arena<'a>,
) -> Result<NameValue<'a>> {
    let el = element(input, opts.minimality)?;
    let Some(kind) = StringKind::from_wire_tag(el.tag) else {
        warn!(tag = el.tag, "unimplemented string type");
        return Err(Error::Unsupported("string kind"));
    };
    let bytes = if opts.no_copy {
        el.contents
    } else {
        arena.copy_bytes(el.contents)?
    };
    Ok(NameValue {
        kind,
        value: ByteBlob(bytes),
    })
}

/// The SEQUENCE body of an attribute must hold at least two header pairs.
const MIN_RDN_ATTR_LEN: usize = 4;

fn rdn_attr_contents<'a>(input: &'a [u8], opts: &DecodeOptions) -> Result<&'a [u8]> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::CONSTRUCTED | tag::SEQUENCE, Asn1Error::BadTag);
    ensure_err!(el.contents.len() >= MIN_RDN_ATTR_LEN, Asn1Error::EndOfData);
    Ok(el.contents)
}

/// Arena bytes needed to decode an RDN attribute.
pub fn decoded_size_rdn_attr(input: &[u8], opts: &DecodeOptions) -> Result<usize> {
    let contents = rdn_attr_contents(input, opts)?;
    let oid_el = element(contents, opts.minimality)?;
    let oid_size = decoded_size_oid(&contents[..oid_el.size], opts)?;
    let value_size = decoded_size_name_value(&contents[oid_el.size..], opts)?;
    Ok(oid_size + value_size)
}

/// Decode an RDN attribute. The value bytes land in the arena before the
/// identifier text, so a no-copy decode consumes only the identifier.
pub fn decode_rdn_attr<'a>(
    input: &'a [u8],
    opts: &DecodeOptions,
    arena: &mut Arena<'a>,
) -> Result<RdnAttr<'a>> {
    let contents = rdn_attr_contents(input, opts)?;
    let oid_el = element(contents, opts.minimality)?;
    let value = decode_name_value(&contents[oid_el.size..], opts, arena)?;
    let oid = decode_oid(&contents[..oid_el.size], opts, arena)?;
    Ok(RdnAttr { oid, value })
}

fn walk_children<'a>(
    contents: &'a [u8],
    opts: &DecodeOptions,
    mut visit: impl FnMut(&'a [u8]) -> Result<()>,
) -> Result<()> {
    let mut rest = contents;
    while !rest.is_empty() {
        let child = element(rest, opts.minimality)?;
        visit(&rest[..child.size])?;
        rest = &rest[child.size..];
    }
    Ok(())
}

fn rdn_contents<'a>(input: &'a [u8], opts: &DecodeOptions) -> Result<&'a [u8]> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::CONSTRUCTED | tag::SET_OF, Asn1Error::BadTag);
    Ok(el.contents)
}

/// Arena bytes needed to decode an RDN.
pub fn decoded_size_rdn(input: &[u8], opts: &DecodeOptions) -> Result<usize> {
    let contents = rdn_contents(input, opts)?;
    let mut size = 0;
    walk_children(contents, opts, |child| {
        size += decoded_size_rdn_attr(child, opts)?;
        Ok(())
    })?;
    Ok(size)
}

/// Decode an RDN. Members are taken in wire order; no sortedness is
/// assumed or checked.
pub fn decode_rdn<'a>(
    input: &'a [u8],
    opts: &DecodeOptions,
    arena: &mut Arena<'a>,
) -> Result<Rdn<'a>> {
    let contents = rdn_contents(input, opts)?;
    let mut attrs = Vec::new();
    walk_children(contents, opts, |child| {
        attrs.push(decode_rdn_attr(child, opts, arena)?);
        Ok(())
    })?;
    Ok(Rdn { attrs })
}

fn name_contents<'a>(input: &'a [u8], opts: &DecodeOptions) -> Result<&'a [u8]> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::CONSTRUCTED | tag::SEQUENCE, Asn1Error::BadTag);
    Ok(el.contents)
}

/// Arena bytes needed to decode a distinguished name.
pub fn decoded_size_name(input: &[u8], opts: &DecodeOptions) -> Result<usize> {
    let contents = name_contents(input, opts)?;
    let mut size = 0;
    walk_children(contents, opts, |child| {
        size += decoded_size_rdn(child, opts)?;
        Ok(())
    })?;
    Ok(size)
}

/// Decode a distinguished name, preserving RDN order.
pub fn decode_name<'a>(
    input: &'a [u8],
    opts: &DecodeOptions,
    arena: &mut Arena<'a>,
) -> Result<Name<'a>> {
    let contents = name_contents(input, opts)?;
    let mut rdns = Vec::new();
    walk_children(contents, opts, |child| {
        rdns.push(decode_rdn(child, opts, arena)?);
        Ok(())
    })?;
    Ok(Name { rdns })
}
