//! INTEGER and ENUMERATED codecs.
//!
//! Big-number blobs carry their bytes little-endian in memory and
//! big-endian on the wire. Encoders emit the minimal two's-complement
//! form: no leading `0x00` except to keep a non-negative value
//! non-negative, no leading `0xff` except to keep a negative value
//! negative.

use {
    super::{
        len::{element, encode_len, len_len},
        lenient, tag, DecodeOptions, Leniency,
    },
    crate::{
        arena::Arena,
        ensure_err,
        error::{Asn1Error, Error, Result},
    },
    core::fmt,
};

/// Borrowed little-endian integer contents. Signedness is per-operation.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IntBlob<'a>(pub &'a [u8]);

impl<'a> IntBlob<'a> {
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

impl<'a> From<&'a [u8]> for IntBlob<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for IntBlob<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntBlob(le:{})", hex::encode(self.0))
    }
}

fn encode_content(tag: u8, content: &[u8], pad: Option<u8>, out: Option<&mut [u8]>) -> Result<usize> {
    let content_len = content.len() + pad.map_or(0, |_| 1);
    let needed = 1 + len_len(content_len)? + content_len;
    let Some(out) = out else {
        return Ok(needed);
    };
    ensure_err!(out.len() >= needed, Error::BufferTooSmall { needed });
    out[0] = tag;
    let mut at = 1 + encode_len(content_len, Some(&mut out[1..]))?;
    if let Some(pad) = pad {
        out[at] = pad;
        at += 1;
    }
    // blob bytes are little-endian, the wire is big-endian
    for (dst, &src) in out[at..needed].iter_mut().zip(content.iter().rev()) {
        *dst = src;
    }
    Ok(needed)
}

/// Encode a native signed 32-bit value as INTEGER.
pub fn encode_int(val: i32, out: Option<&mut [u8]>) -> Result<usize> {
    encode_integer(&IntBlob(&val.to_le_bytes()), out)
}

/// Encode a little-endian signed big number as INTEGER.
pub fn encode_integer(blob: &IntBlob<'_>, out: Option<&mut [u8]>) -> Result<usize> {
    let bytes = blob.0;
    // strip redundant sign bytes from the big end
    let mut sig = bytes.len();
    while sig > 1
        && ((bytes[sig - 1] == 0x00 && bytes[sig - 2] < 0x80)
            || (bytes[sig - 1] == 0xff && bytes[sig - 2] >= 0x80))
    {
        sig -= 1;
    }
    encode_content(tag::INTEGER, &bytes[..sig], None, out)
}

fn encode_unsigned(wire_tag: u8, bytes: &[u8], out: Option<&mut [u8]>) -> Result<usize> {
    let mut sig = bytes.len();
    while sig > 0 && bytes[sig - 1] == 0 {
        sig -= 1;
    }
    let pad = (sig > 0 && bytes[sig - 1] > 0x7f).then_some(0x00);
    encode_content(wire_tag, &bytes[..sig], pad, out)
}

/// Encode a little-endian unsigned big number as INTEGER, padding with a
/// leading `0x00` when the top bit would read as a sign.
pub fn encode_uint(blob: &IntBlob<'_>, out: Option<&mut [u8]>) -> Result<usize> {
    encode_unsigned(tag::INTEGER, blob.0, out)
}

/// Encode an ENUMERATED value. Shares the unsigned integer encoder with the
/// ENUMERATED tag octet.
pub fn encode_enumerated(val: u32, out: Option<&mut [u8]>) -> Result<usize> {
    encode_unsigned(tag::ENUMERATED, &val.to_le_bytes(), out)
}

fn check_signed_minimality(contents: &[u8], minimality: Leniency) -> Result<()> {
    if contents.len() >= 2
        && ((contents[0] == 0x00 && contents[1] < 0x80)
            || (contents[0] == 0xff && contents[1] >= 0x80))
    {
        lenient(minimality, "non-minimal INTEGER encoding")?;
    }
    Ok(())
}

/// Decode an INTEGER into a native signed 32-bit value. Contents longer
/// than four bytes are too large for this handler.
pub fn decode_int(input: &[u8], minimality: Leniency) -> Result<i32> {
    let el = element(input, minimality)?;
    ensure_err!(el.tag == tag::INTEGER, Asn1Error::BadTag);
    ensure_err!(!el.contents.is_empty(), Asn1Error::Corrupt);
    ensure_err!(el.contents.len() <= 4, Asn1Error::TooLarge);
    check_signed_minimality(el.contents, minimality)?;
    let mut val: i32 = if el.contents[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in el.contents {
        val = val << 8 | i32::from(b);
    }
    Ok(val)
}

/// Arena bytes needed to decode an INTEGER blob.
pub fn decoded_size_integer(input: &[u8], opts: &DecodeOptions) -> Result<usize> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::INTEGER, Asn1Error::BadTag);
    ensure_err!(!el.contents.is_empty(), Asn1Error::Corrupt);
    Ok(el.contents.len())
}

/// Decode an INTEGER into a little-endian signed blob, preserving any pad
/// byte. The bytes are reversed into the arena, so this codec copies even
/// in no-copy mode.
pub fn decode_integer<'a>(
    input: &'a [u8],
    opts: &DecodeOptions,
    arena: &mut Arena<'a>,
) -> Result<IntBlob<'a>> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::INTEGER, Asn1Error::BadTag);
    ensure_err!(!el.contents.is_empty(), Asn1Error::Corrupt);
    check_signed_minimality(el.contents, opts.minimality)?;
    let slot = arena.alloc(el.contents.len())?;
    for (dst, &src) in slot.iter_mut().zip(el.contents.iter().rev()) {
        *dst = src;
    }
    Ok(IntBlob(slot))
}

/// Arena bytes needed to decode an unsigned INTEGER blob.
pub fn decoded_size_uint(input: &[u8], opts: &DecodeOptions) -> Result<usize> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::INTEGER, Asn1Error::BadTag);
    ensure_err!(!el.contents.is_empty(), Asn1Error::Corrupt);
    let pad = usize::from(el.contents[0] == 0);
    Ok(el.contents.len() - pad)
}

/// Decode an INTEGER as an unsigned little-endian blob, dropping exactly
/// one leading `0x00` pad byte if present.
pub fn decode_uint<'a>(
    input: &'a [u8],
    opts: &DecodeOptions,
    arena: &mut Arena<'a>,
) -> Result<IntBlob<'a>> {
    let el = element(input, opts.minimality)?;
    ensure_err!(el.tag == tag::INTEGER, Asn1Error::BadTag);
    ensure_err!(!el.contents.is_empty(), Asn1Error::Corrupt);
    let mut contents = el.contents;
    if let [0x00, rest @ ..] = contents {
        if rest.first().is_some_and(|&b| b < 0x80) {
            lenient(opts.minimality, "non-minimal INTEGER encoding")?;
        }
        contents = rest;
    }
    let slot = arena.alloc(contents.len())?;
    for (dst, &src) in slot.iter_mut().zip(contents.iter().rev()) {
        *dst = src;
    }
    Ok(IntBlob(slot))
}

/// Decode an ENUMERATED into a native unsigned 32-bit value. A fifth
/// leading sign octet is tolerated so a full 32-bit value round-trips.
pub fn decode_enumerated(input: &[u8], minimality: Leniency) -> Result<u32> {
    let el = element(input, minimality)?;
    ensure_err!(el.tag == tag::ENUMERATED, Asn1Error::BadTag);
    ensure_err!(!el.contents.is_empty(), Asn1Error::Corrupt);
    ensure_err!(el.contents.len() <= 5, Asn1Error::TooLarge);
    let mut val = 0u64;
    for &b in el.contents {
        val = val << 8 | u64::from(b);
    }
    Ok(val as u32)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::asn1::Leniency,
        hex_literal::hex,
    };

    fn encode(f: impl Fn(Option<&mut [u8]>) -> Result<usize>) -> Vec<u8> {
        let size = f(None).unwrap();
        let mut buf = vec![0; size];
        assert_eq!(f(Some(&mut buf)).unwrap(), size);
        buf
    }

    #[test]
    fn int_wire_vectors() {
        assert_eq!(encode(|out| encode_int(127, out)), hex!("02017f"));
        assert_eq!(encode(|out| encode_int(128, out)), hex!("02020080"));
        assert_eq!(encode(|out| encode_int(-1, out)), hex!("0201ff"));
        assert_eq!(encode(|out| encode_int(0, out)), hex!("020100"));
        assert_eq!(encode(|out| encode_int(-128, out)), hex!("020180"));
        assert_eq!(encode(|out| encode_int(256, out)), hex!("02020100"));
    }

    #[test]
    fn int_round_trip() {
        for val in [0, 1, -1, 127, 128, -128, -129, 32767, -32768, i32::MAX, i32::MIN] {
            let bytes = encode(|out| encode_int(val, out));
            assert_eq!(decode_int(&bytes, Leniency::Strict).unwrap(), val);
        }
    }

    #[test]
    fn int_decode_limits() {
        assert_eq!(
            decode_int(&hex!("0200"), Leniency::Strict),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
        assert_eq!(
            decode_int(&hex!("02050011223344"), Leniency::Strict),
            Err(Error::Asn1(Asn1Error::TooLarge))
        );
        assert_eq!(
            decode_int(&hex!("0a0101"), Leniency::Strict),
            Err(Error::Asn1(Asn1Error::BadTag))
        );
    }

    #[test]
    fn int_decode_sign_extends() {
        assert_eq!(decode_int(&hex!("020180"), Leniency::Strict).unwrap(), -128);
        assert_eq!(decode_int(&hex!("0202ff00"), Leniency::Strict).unwrap(), -256);
    }

    #[test]
    fn non_minimal_int_is_lenient() {
        // 0x7f with a redundant leading zero
        let bytes = hex!("0202007f");
        assert_eq!(
            decode_int(&bytes, Leniency::Strict),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
        assert_eq!(decode_int(&bytes, Leniency::Allow).unwrap(), 127);
        // -1 with a redundant leading 0xff
        let bytes = hex!("0202ffff");
        assert_eq!(
            decode_int(&bytes, Leniency::Strict),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
        assert_eq!(decode_int(&bytes, Leniency::Allow).unwrap(), -1);
    }

    #[test]
    fn integer_blob_encoding() {
        // little-endian 128 needs its explicit pad preserved
        assert_eq!(
            encode(|out| encode_integer(&IntBlob(&hex!("8000")), out)),
            hex!("02020080")
        );
        // redundant little-endian sign bytes are stripped
        assert_eq!(
            encode(|out| encode_integer(&IntBlob(&hex!("01000000")), out)),
            hex!("020101")
        );
        assert_eq!(
            encode(|out| encode_integer(&IntBlob(&hex!("ffffffff")), out)),
            hex!("0201ff")
        );
    }

    #[test]
    fn integer_blob_round_trip() {
        let mut backing = [0u8; 32];
        for le in [
            &hex!("7f") as &[u8],
            &hex!("8000"),
            &hex!("ff"),
            &hex!("0080"),
            &hex!("d2029649"),
        ] {
            let bytes = encode(|out| encode_integer(&IntBlob(le), out));
            let mut arena = Arena::new(&mut backing);
            let opts = DecodeOptions::default();
            assert_eq!(
                decoded_size_integer(&bytes, &opts).unwrap(),
                bytes.len() - 2
            );
            let blob = decode_integer(&bytes, &opts, &mut arena).unwrap();
            assert_eq!(blob.0, le);
        }
    }

    #[test]
    fn uint_pads_high_top_bit() {
        assert_eq!(
            encode(|out| encode_uint(&IntBlob(&hex!("ff")), out)),
            hex!("020200ff")
        );
        assert_eq!(
            encode(|out| encode_uint(&IntBlob(&hex!("7f")), out)),
            hex!("02017f")
        );
    }

    #[test]
    fn empty_integer_contents_rejected() {
        let opts = DecodeOptions::default();
        let mut backing = [0u8; 4];
        assert_eq!(
            decoded_size_integer(&hex!("0200"), &opts),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
        let mut arena = Arena::new(&mut backing);
        assert_eq!(
            decode_integer(&hex!("0200"), &opts, &mut arena),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
        assert_eq!(
            decoded_size_uint(&hex!("0200"), &opts),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
        let mut arena = Arena::new(&mut backing);
        assert_eq!(
            decode_uint(&hex!("0200"), &opts, &mut arena),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
    }

    #[test]
    fn uint_decode_drops_one_pad() {
        let mut backing = [0u8; 8];
        let mut arena = Arena::new(&mut backing);
        let opts = DecodeOptions::default();
        assert_eq!(decoded_size_uint(&hex!("020200ff"), &opts).unwrap(), 1);
        let blob = decode_uint(&hex!("020200ff"), &opts, &mut arena).unwrap();
        assert_eq!(blob.0, hex!("ff"));
    }

    #[test]
    fn enumerated_uses_its_own_tag() {
        assert_eq!(encode(|out| encode_enumerated(5, out)), hex!("0a0105"));
        assert_eq!(
            encode(|out| encode_enumerated(0xffff_ffff, out)),
            hex!("0a0500ffffffff")
        );
        assert_eq!(
            decode_enumerated(&hex!("0a0105"), Leniency::Strict).unwrap(),
            5
        );
        // a sign octet before a full 32-bit value is accepted
        assert_eq!(
            decode_enumerated(&hex!("0a0500ffffffff"), Leniency::Strict).unwrap(),
            0xffff_ffff
        );
        assert_eq!(
            decode_enumerated(&hex!("0a06000011223344"), Leniency::Strict),
            Err(Error::Asn1(Asn1Error::TooLarge))
        );
    }
}
