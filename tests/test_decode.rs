use {
    anyhow::{bail, ensure, Result},
    cert_der::{
        Arena, Asn1Error, DecodeOptions, Decoded, EncodingType, Error, Leniency, ObjectCodec,
        StructKind, StructValue, StructureId, Timestamp,
    },
    hex_literal::hex,
};

const X509: EncodingType = EncodingType::X509_ASN1;

fn id(kind: StructKind) -> StructureId {
    StructureId::Numeric(kind.into())
}

fn decode<'a>(
    codec: &ObjectCodec<'_>,
    kind: StructKind,
    input: &'a [u8],
    backing: &'a mut Vec<u8>,
) -> Result<Decoded<'a>, Error> {
    let size = codec.decode_object_size(X509, &id(kind), input)?;
    backing.resize(size, 0);
    let mut arena = Arena::new(backing);
    let decoded = codec.decode_object(X509, &id(kind), input, &mut arena)?;
    assert_eq!(arena.used(), size, "sizing must match arena consumption");
    Ok(decoded)
}

#[test]
fn distinguished_name_scenario() -> Result<()> {
    // Name { CN="Test" } { O="Example" }: two RDNs in sequence order
    let codec = ObjectCodec::new();
    let wire = hex!(
        "3021"
        "310d300b0603550403130454657374"
        "3110300e060355040a13074578616d706c65"
    );
    let mut backing = Vec::new();
    let Decoded::Name(name) = decode(&codec, StructKind::Name, &wire, &mut backing)? else {
        bail!("expected a name");
    };
    ensure!(name.rdns.len() == 2);
    ensure!(name.rdns[0].attrs.len() == 1);
    ensure!(name.rdns[1].attrs.len() == 1);
    let cn = &name.rdns[0].attrs[0];
    ensure!(cn.oid == "2.5.4.3");
    ensure!(cn.value.value.as_bytes() == b"Test");
    let org = &name.rdns[1].attrs[0];
    ensure!(org.oid == "2.5.4.10");
    ensure!(org.value.value.as_bytes() == b"Example");
    Ok(())
}

#[test]
fn integer_scenarios() {
    let codec = ObjectCodec::new();
    let mut backing = Vec::new();
    for (wire, expected) in [
        (&hex!("02017f") as &[u8], 127),
        (&hex!("02020080"), 128),
        (&hex!("0201ff"), -1),
    ] {
        assert_eq!(
            decode(&codec, StructKind::Int, wire, &mut backing).unwrap(),
            Decoded::Int(expected)
        );
    }
}

#[test]
fn oversized_lengths_rejected() {
    let codec = ObjectCodec::new();
    let mut backing = Vec::new();
    // five length octets
    assert_eq!(
        decode(&codec, StructKind::OctetString, &hex!("04850000000001ff"), &mut backing),
        Err(Error::Asn1(Asn1Error::TooLarge))
    );
    // five content bytes for a native-width integer
    assert_eq!(
        decode(&codec, StructKind::Int, &hex!("02050011223344"), &mut backing),
        Err(Error::Asn1(Asn1Error::TooLarge))
    );
}

#[test]
fn utc_year_pivot() -> Result<()> {
    let codec = ObjectCodec::new();
    let mut backing = Vec::new();
    let cases = [
        (b"\x17\x0d491231235959Z".to_vec(), 2049),
        (b"\x17\x0d500101000000Z".to_vec(), 1950),
        (b"\x17\x0d991231235959Z".to_vec(), 1999),
    ];
    for (wire, year) in cases {
        let Decoded::Time(decoded) = decode(&codec, StructKind::UtcTime, &wire, &mut backing)?
        else {
            bail!("expected a time");
        };
        let month = if year == 1950 { 1 } else { 12 };
        let day = if year == 1950 { 1 } else { 31 };
        let (hour, minute, second) = if year == 1950 { (0, 0, 0) } else { (23, 59, 59) };
        ensure!(decoded == Timestamp::from_calendar(year, month, day, hour, minute, second, 0)?);
    }
    Ok(())
}

#[test]
fn generalized_fractions_through_choice() -> Result<()> {
    let codec = ObjectCodec::new();
    let mut backing = Vec::new();
    let base = Timestamp::from_calendar(2151, 4, 15, 12, 0, 0, 0)?;
    for (frac, millis) in [(",5", 500), (".12", 120), (".123", 123), (".1234", 123)] {
        let text = format!("21510415120000{frac}Z");
        let mut wire = vec![0x18, text.len() as u8];
        wire.extend_from_slice(text.as_bytes());
        let Decoded::Time(decoded) =
            decode(&codec, StructKind::ChoiceOfTime, &wire, &mut backing)?
        else {
            bail!("expected a time");
        };
        ensure!(decoded.unix_millis() == base.unix_millis() + millis);
    }
    Ok(())
}

#[test]
fn bit_string_boundary() -> Result<()> {
    let codec = ObjectCodec::new();
    let mut backing = Vec::new();
    let Decoded::Bits(blob) =
        decode(&codec, StructKind::BitString, &hex!("030207ff"), &mut backing)?
    else {
        bail!("expected a bit string");
    };
    ensure!(blob.unused_bits == 7);
    ensure!(blob.bytes.as_bytes() == hex!("80"));
    Ok(())
}

#[test]
fn round_trip_bit_string_re_encodes_identically() -> Result<()> {
    let codec = ObjectCodec::new();
    let wire = hex!("030306ffc0");
    let mut backing = Vec::new();
    let Decoded::Bits(blob) = decode(&codec, StructKind::BitString, &wire, &mut backing)? else {
        bail!("expected a bit string");
    };
    let size = codec.encode_object(X509, &id(StructKind::BitString), &StructValue::Bits(blob), None)?;
    let mut out = vec![0; size];
    codec.encode_object(
        X509,
        &id(StructKind::BitString),
        &StructValue::Bits(blob),
        Some(&mut out),
    )?;
    ensure!(out == wire);
    Ok(())
}

#[test]
fn no_copy_blobs_alias_the_input() -> Result<()> {
    let codec = ObjectCodec::new();
    let wire = hex!(
        "3021"
        "310d300b0603550403130454657374"
        "3110300e060355040a13074578616d706c65"
    );
    let opts = DecodeOptions {
        no_copy: true,
        ..DecodeOptions::default()
    };
    let copy_size = codec.decode_object_size(X509, &id(StructKind::Name), &wire)?;
    let size = codec.decode_object_size_ex(X509, &id(StructKind::Name), &wire, &opts)?;
    // no-copy needs arena space for identifier text only
    ensure!(size < copy_size);
    let mut backing = vec![0; size];
    let mut arena = Arena::new(&mut backing);
    let Decoded::Name(name) = codec.decode_object_ex(X509, &id(StructKind::Name), &wire, &opts, &mut arena)?
    else {
        bail!("expected a name");
    };
    let input_range = wire.as_ptr_range();
    for rdn in &name.rdns {
        for attr in &rdn.attrs {
            ensure!(input_range.contains(&attr.value.value.as_bytes().as_ptr()));
        }
    }
    Ok(())
}

#[test]
fn strict_minimality_with_leniency_escape() {
    let codec = ObjectCodec::new();
    // INTEGER 127 with a redundant leading zero
    let wire = hex!("0202007f");
    let mut backing = Vec::new();
    assert_eq!(
        decode(&codec, StructKind::Int, &wire, &mut backing),
        Err(Error::Asn1(Asn1Error::Corrupt))
    );
    let opts = DecodeOptions {
        minimality: Leniency::Allow,
        ..DecodeOptions::default()
    };
    let mut empty = [0u8; 0];
    let mut arena = Arena::new(&mut empty);
    assert_eq!(
        codec.decode_object_ex(X509, &id(StructKind::Int), &wire, &opts, &mut arena),
        Ok(Decoded::Int(127))
    );
}

#[test]
fn unknown_ids_without_a_registry_are_not_found() {
    let codec = ObjectCodec::new();
    let mut empty = [0u8; 0];
    let mut arena = Arena::new(&mut empty);
    assert_eq!(
        codec.decode_object(
            X509,
            &StructureId::oid("1.2.3.4"),
            &hex!("020100"),
            &mut arena
        ),
        Err(Error::NotFound)
    );
}
