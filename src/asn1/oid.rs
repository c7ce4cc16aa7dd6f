//! OBJECT IDENTIFIER codec: dotted-decimal text to base-128 arcs and back.

use {
    super::{
        len::{element, encode_len, len_len},
        tag, DecodeOptions,
    },
    crate::{
        arena::Arena,
        ensure_err,
        error::{Asn1Error, Error, Result},
    },
    core::fmt::Write as _,
};

/// Wire bytes an arc occupies in base-128 form. Arcs fit in 32 bits.
fn arc_len(arc: u32) -> usize {
    match arc {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x1f_ffff => 3,
        0x20_0000..=0xfff_ffff => 4,
        _ => 5,
    }
}

/// Decimal digits in an arc's text form.
fn digits(mut arc: u32) -> usize {
    let mut n = 1;
    while arc >= 10 {
        arc /= 10;
        n += 1;
    }
    n
}

/// Parse the leading two arcs into the combined first content octet and
/// return an iterator over the remaining arcs.
fn parse_arcs(oid: &str) -> Result<(u8, impl Iterator<Item = Result<u32>> + '_)> {
    let mut arcs = oid.split('.').map(|part| {
        part.parse::<u32>()
            .map_err(|_| Error::from(Asn1Error::Corrupt))
    });
    let arc1 = arcs.next().transpose()?.ok_or(Asn1Error::Corrupt)?;
    let arc2 = arcs.next().transpose()?.ok_or(Asn1Error::Corrupt)?;
    ensure_err!(arc1 <= 2, Asn1Error::Corrupt);
    ensure_err!(arc2 < 40 || arc1 == 2, Asn1Error::Corrupt);
    let first = (40 * arc1)
        .checked_add(arc2)
        .and_then(|v| u8::try_from(v).ok())
        .ok_or(Asn1Error::Corrupt)?;
    Ok((first, arcs))
}

/// Encode a dotted-decimal object identifier as a full DER element. The
/// first two arcs pack into one octet, the rest are big-endian base-128
/// with the high bit set on every octet but the last.
pub fn encode_oid(oid: &str, out: Option<&mut [u8]>) -> Result<usize> {
    let (first, arcs) = parse_arcs(oid)?;
    let mut content_len = 1;
    for arc in arcs {
        content_len += arc_len(arc?);
    }
    let needed = 1 + len_len(content_len)? + content_len;
    let Some(out) = out else {
        return Ok(needed);
    };
    ensure_err!(out.len() >= needed, Error::BufferTooSmall { needed });
    out[0] = tag::OBJECT_IDENTIFIER;
    let mut at = 1 + encode_len(content_len, Some(&mut out[1..]))?;
    out[at] = first;
    at += 1;
    for arc in parse_arcs(oid)?.1 {
        let arc = arc?;
        let n = arc_len(arc);
        for i in (0..n).rev() {
            let mut b = ((arc >> (7 * i)) & 0x7f) as u8;
            if i > 0 {
                b |= 0x80;
            }
            out[at] = b;
            at += 1;
        }
    }
    Ok(needed)
}

/// Walk the base-128 arcs after the combined first octet.
fn walk_arcs(contents: &[u8], mut visit: impl FnMut(u32)) -> Result<()> {
    let mut at = 1;
    while at < contents.len() {
        let mut arc = 0u64;
        while at < contents.len() && contents[at] & 0x80 != 0 {
            arc = arc << 7 | u64::from(contents[at] & 0x7f);
            ensure_err!(arc <= u64::from(u32::MAX >> 7), Asn1Error::TooLarge);
            at += 1;
        }
        // a continuation run must not reach the end of the contents
        ensure_err!(at < contents.len(), Asn1Error::Corrupt);
        arc = arc << 7 | u64::from(contents[at]);
        at += 1;
        visit(arc as u32);
    }
    Ok(())
}

/// Arena bytes needed for the dotted-decimal text of a decoded identifier.
pub fn decoded_size_oid(input: &[u8], opts: &DecodeOptions) -> Result<usize> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::OBJECT_IDENTIFIER, Asn1Error::BadTag);
    if el.contents.is_empty() {
        return Ok(0);
    }
    let first = el.contents[0];
    let mut size = digits(u32::from(first / 40)) + 1 + digits(u32::from(first % 40));
    walk_arcs(el.contents, |arc| size += 1 + digits(arc))?;
    Ok(size)
}

/// Decode an OBJECT IDENTIFIER element into dotted-decimal text.
pub fn decode_oid<'a>(
    input: &'a [u8],
    opts: &DecodeOptions,
    arena: &mut Arena<'a>,
) -> Result<&'a str> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::OBJECT_IDENTIFIER, Asn1Error::BadTag);
    if el.contents.is_empty() {
        return Ok("");
    }
    let first = el.contents[0];
    let mut text = String::new();
    let _ = write!(text, "{}.{}", first / 40, first % 40);
    walk_arcs(el.contents, |arc| {
        let _ = write!(text, ".{arc}");
    })?;
    arena.copy_str(&text)
}
