//! OCTET STRING and BIT STRING codecs.

use {
    super::{
        len::{element, encode_len, len_len},
        tag, ByteBlob, DecodeOptions,
    },
    crate::{
        arena::Arena,
        ensure_err,
        error::{Asn1Error, Error, Result},
    },
};

/// Bit-string contents plus the count of unused bits at the end.
///
/// `unused_bits` is not constrained to `< 8`; whole unused trailing bytes
/// are dropped when encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitBlob<'a> {
    pub bytes: ByteBlob<'a>,
    pub unused_bits: u32,
}

/// Encode an OCTET STRING: contents copied verbatim, zero length allowed.
pub fn encode_octets(blob: &ByteBlob<'_>, out: Option<&mut [u8]>) -> Result<usize> {
    let content_len = blob.len();
    let needed = 1 + len_len(content_len)? + content_len;
    let Some(out) = out else {
        return Ok(needed);
    };
    ensure_err!(out.len() >= needed, Error::BufferTooSmall { needed });
    out[0] = tag::OCTETSTRING;
    let at = 1 + encode_len(content_len, Some(&mut out[1..]))?;
    out[at..needed].copy_from_slice(blob.as_bytes());
    Ok(needed)
}

/// Arena bytes needed to decode an OCTET STRING.
pub fn decoded_size_octets(input: &[u8], opts: &DecodeOptions) -> Result<usize> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::OCTETSTRING, Asn1Error::BadTag);
    Ok(if opts.no_copy { 0 } else { el.contents.len() })
}

/// Decode an OCTET STRING.
pub fn decode_octets<'a>(
    input: &'a [u8],
    opts: &DecodeOptions,
    arena: &mut Arena<'a>,
) -> Result<ByteBlob<'a>> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::OCTETSTRING, Asn1Error::BadTag);
    let bytes = if opts.no_copy {
        el.contents
    } else {
        arena.copy_bytes(el.contents)?
    };
    Ok(ByteBlob(bytes))
}

/// Encode a BIT STRING.
///
/// Whole unused trailing bytes implied by `unused_bits >= 8` are dropped:
/// the content covers `ceil((8 * byte_count - unused_bits) / 8)` bytes and
/// the wire unused count is `unused_bits % 8`. Unused bits in the final
/// content byte are masked to zero.
pub fn encode_bits(blob: &BitBlob<'_>, out: Option<&mut [u8]>) -> Result<usize> {
    let total_bits = blob.bytes.len() as u64 * 8;
    let (data_bytes, unused) = if total_bits > u64::from(blob.unused_bits) {
        let significant = total_bits - u64::from(blob.unused_bits);
        (significant.div_ceil(8) as usize, (blob.unused_bits % 8) as u8)
    } else {
        (0, 0)
    };
    let content_len = data_bytes + 1;
    let needed = 1 + len_len(content_len)? + content_len;
    let Some(out) = out else {
        return Ok(needed);
    };
    ensure_err!(out.len() >= needed, Error::BufferTooSmall { needed });
    out[0] = tag::BITSTRING;
    let mut at = 1 + encode_len(content_len, Some(&mut out[1..]))?;
    out[at] = unused;
    at += 1;
    if data_bytes > 0 {
        out[at..needed].copy_from_slice(&blob.bytes.as_bytes()[..data_bytes]);
        out[needed - 1] &= 0xff << unused;
    }
    Ok(needed)
}

fn unused_mask(unused_bits: u32) -> u8 {
    if unused_bits >= 8 {
        0
    } else {
        0xff << unused_bits
    }
}

/// Arena bytes needed to decode a BIT STRING.
pub fn decoded_size_bits(input: &[u8], opts: &DecodeOptions) -> Result<usize> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::BITSTRING, Asn1Error::BadTag);
    ensure_err!(!el.contents.is_empty(), Asn1Error::Corrupt);
    Ok(if opts.no_copy { 0 } else { el.contents.len() - 1 })
}

/// Decode a BIT STRING. The wire unused-bit count is taken verbatim; the
/// unused bits of the final content byte are masked to zero when copying
/// (a no-copy decode aliases the input unmodified).
pub fn decode_bits<'a>(
    input: &'a [u8],
    opts: &DecodeOptions,
    arena: &mut Arena<'a>,
) -> Result<BitBlob<'a>> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::BITSTRING, Asn1Error::BadTag);
    ensure_err!(!el.contents.is_empty(), Asn1Error::Corrupt);
    let unused_bits = u32::from(el.contents[0]);
    let data = &el.contents[1..];
    let bytes = if opts.no_copy {
        data
    } else {
        let slot = arena.alloc(data.len())?;
        slot.copy_from_slice(data);
        if let [.., last] = slot {
            *last &= unused_mask(unused_bits);
        }
        &*slot
    };
    Ok(BitBlob {
        bytes: ByteBlob(bytes),
        unused_bits,
    })
}
