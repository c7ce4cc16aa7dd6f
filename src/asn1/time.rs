//! UTCTime and GeneralizedTime codecs, plus the choice between them.
//!
//! Formatters emit the ISO field order (year, month, day) with a trailing
//! `Z`. Decoders parse positionally, accept optional seconds, fractional
//! seconds (GeneralizedTime), and a trailing `Z` or `+HHMM`/`-HHMM`/`+HH`
//! offset; the offset is applied to the parsed wall time, `+` adding and
//! `-` subtracting, in epoch arithmetic so carries across day and month
//! boundaries are exact.

use {
    super::{len::element, tag, Leniency},
    crate::{
        ensure_err,
        error::{Asn1Error, Error, Result},
    },
    time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time},
};

/// A calendar instant as signed milliseconds since the Unix epoch, UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn unix_millis(self) -> i64 {
        self.0
    }

    /// Builds an instant from UTC calendar fields. Out-of-range fields fail
    /// with [`Error::BadEncode`].
    pub fn from_calendar(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        millisecond: u16,
    ) -> Result<Self> {
        let month = Month::try_from(month).map_err(|_| Error::BadEncode)?;
        let date = Date::from_calendar_date(year, month, day).map_err(|_| Error::BadEncode)?;
        let time =
            Time::from_hms_milli(hour, minute, second, millisecond).map_err(|_| Error::BadEncode)?;
        Ok(Self::from_datetime(PrimitiveDateTime::new(date, time).assume_utc()))
    }

    fn from_datetime(datetime: OffsetDateTime) -> Self {
        Self((datetime.unix_timestamp_nanos() / 1_000_000) as i64)
    }

    fn to_datetime(self) -> Result<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0) * 1_000_000)
            .map_err(|_| Error::BadEncode)
    }
}

fn encode_time_string(wire_tag: u8, text: &str, out: Option<&mut [u8]>) -> Result<usize> {
    // date strings are far below the short-form length limit
    let needed = 2 + text.len();
    let Some(out) = out else {
        return Ok(needed);
    };
    ensure_err!(out.len() >= needed, Error::BufferTooSmall { needed });
    out[0] = wire_tag;
    out[1] = text.len() as u8;
    out[2..needed].copy_from_slice(text.as_bytes());
    Ok(needed)
}

/// Encode a UTCTime (`YYMMDDHHMMSSZ`). Years outside 1950..=2050 are not
/// representable with a two-digit year.
pub fn encode_utc_time(timestamp: Timestamp, out: Option<&mut [u8]>) -> Result<usize> {
    let dt = timestamp.to_datetime()?;
    ensure_err!((1950..=2050).contains(&dt.year()), Error::BadEncode);
    let yy = if dt.year() >= 2000 {
        dt.year() - 2000
    } else {
        dt.year() - 1900
    };
    let text = format!(
        "{:02}{:02}{:02}{:02}{:02}{:02}Z",
        yy,
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    );
    encode_time_string(tag::UTC_TIME, &text, out)
}

/// Encode a GeneralizedTime (`YYYYMMDDHHMMSSZ`).
pub fn encode_generalized_time(timestamp: Timestamp, out: Option<&mut [u8]>) -> Result<usize> {
    let dt = timestamp.to_datetime()?;
    ensure_err!((0..=9999).contains(&dt.year()), Error::BadEncode);
    let text = format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}Z",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    );
    encode_time_string(tag::GENERALIZED_TIME, &text, out)
}

/// Encode a time as UTCTime when the year permits it, otherwise as
/// GeneralizedTime.
pub fn encode_choice_of_time(timestamp: Timestamp, out: Option<&mut [u8]>) -> Result<usize> {
    let dt = timestamp.to_datetime()?;
    if (1950..=2050).contains(&dt.year()) {
        encode_utc_time(timestamp, out)
    } else {
        encode_generalized_time(timestamp, out)
    }
}

/// Consume up to `max` digits, or fewer if the input ends first.
fn get_digits(s: &mut &[u8], max: usize) -> Result<u32> {
    let mut val = 0u32;
    let mut taken = 0;
    while taken < max && !s.is_empty() {
        ensure_err!(s[0].is_ascii_digit(), Asn1Error::Corrupt);
        val = val * 10 + u32::from(s[0] - b'0');
        *s = &s[1..];
        taken += 1;
    }
    Ok(val)
}

/// Parse an optional trailing `+HHMM`/`-HHMM`/`+HH` offset into signed
/// minutes. Anything else at the tail (including `Z`) contributes nothing.
fn decode_offset(s: &[u8]) -> Result<i64> {
    if s.len() < 3 || (s[0] != b'+' && s[0] != b'-') {
        return Ok(0);
    }
    let sign: i64 = if s[0] == b'+' { 1 } else { -1 };
    let mut rest = &s[1..];
    let hours = get_digits(&mut rest, 2)?;
    ensure_err!(hours < 24, Asn1Error::Corrupt);
    let mut minutes = 0;
    if rest.len() >= 2 {
        minutes = get_digits(&mut rest, 2)?;
        ensure_err!(minutes < 60, Asn1Error::Corrupt);
    }
    Ok(sign * i64::from(hours * 60 + minutes))
}

struct WallTime {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
}

/// Interpret parsed wall-time fields as a UTC instant, then apply the
/// offset.
fn build_instant(wall: &WallTime, offset_minutes: i64) -> Result<Timestamp> {
    let month = u8::try_from(wall.month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or(Asn1Error::Corrupt)?;
    let day = u8::try_from(wall.day).map_err(|_| Asn1Error::Corrupt)?;
    let date =
        Date::from_calendar_date(wall.year, month, day).map_err(|_| Asn1Error::Corrupt)?;
    let time = Time::from_hms_milli(
        u8::try_from(wall.hour).map_err(|_| Asn1Error::Corrupt)?,
        u8::try_from(wall.minute).map_err(|_| Asn1Error::Corrupt)?,
        u8::try_from(wall.second).map_err(|_| Asn1Error::Corrupt)?,
        wall.millis as u16,
    )
    .map_err(|_| Asn1Error::Corrupt)?;
    let base = Timestamp::from_datetime(PrimitiveDateTime::new(date, time).assume_utc());
    Ok(Timestamp(base.0 + offset_minutes * 60_000))
}

const MIN_ENCODED_TIME_LENGTH: usize = 10;

fn time_contents<'a>(input: &'a [u8], expected_tag: u8, minimality: Leniency) -> Result<&'a [u8]> {
    let el = element(input, minimality)?;
    ensure_err!(el.tag == expected_tag, Asn1Error::BadTag);
    // long-form lengths cannot occur in valid date strings
    ensure_err!(input[1] <= 0x7f, Asn1Error::Corrupt);
    ensure_err!(el.contents.len() >= MIN_ENCODED_TIME_LENGTH, Asn1Error::Corrupt);
    Ok(el.contents)
}

/// Decode a UTCTime: two-digit year (>= 50 is 19xx, else 20xx), month,
/// day, hour, minute, optional one- or two-digit seconds, optional offset.
pub fn decode_utc_time(input: &[u8], minimality: Leniency) -> Result<Timestamp> {
    let mut s = time_contents(input, tag::UTC_TIME, minimality)?;
    let year2 = get_digits(&mut s, 2)?;
    let year = if year2 >= 50 {
        1900 + year2 as i32
    } else {
        2000 + year2 as i32
    };
    let month = get_digits(&mut s, 2)?;
    let day = get_digits(&mut s, 2)?;
    let hour = get_digits(&mut s, 2)?;
    let minute = get_digits(&mut s, 2)?;
    let mut second = 0;
    let mut offset = 0;
    if !s.is_empty() {
        if s.len() >= 2 && s[0].is_ascii_digit() && s[1].is_ascii_digit() {
            second = get_digits(&mut s, 2)?;
        } else if s[0].is_ascii_digit() {
            second = get_digits(&mut s, 1)?;
        }
        offset = decode_offset(s)?;
    }
    build_instant(
        &WallTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millis: 0,
        },
        offset,
    )
}

/// Decode a GeneralizedTime: four-digit year, month, day, hour, optional
/// minute and second, optional fractional seconds introduced by `.` or `,`
/// (up to three digits of precision), optional offset.
pub fn decode_generalized_time(input: &[u8], minimality: Leniency) -> Result<Timestamp> {
    let mut s = time_contents(input, tag::GENERALIZED_TIME, minimality)?;
    let year = get_digits(&mut s, 4)? as i32;
    let month = get_digits(&mut s, 2)?;
    let day = get_digits(&mut s, 2)?;
    let hour = get_digits(&mut s, 2)?;
    let mut minute = 0;
    let mut second = 0;
    let mut millis = 0;
    let mut offset = 0;
    if !s.is_empty() {
        if s[0].is_ascii_digit() {
            minute = get_digits(&mut s, 2)?;
        }
        if !s.is_empty() && s[0].is_ascii_digit() {
            second = get_digits(&mut s, 2)?;
        }
        if !s.is_empty() && (s[0] == b'.' || s[0] == b',') {
            s = &s[1..];
            let run = s.iter().take_while(|b| b.is_ascii_digit()).count();
            ensure_err!(run > 0, Asn1Error::Corrupt);
            let mut frac = &s[..run.min(3)];
            let precision = frac.len();
            let val = get_digits(&mut frac, 3)?;
            millis = val
                * match precision {
                    1 => 100,
                    2 => 10,
                    _ => 1,
                };
            // digits beyond millisecond precision are dropped
            s = &s[run..];
        }
        offset = decode_offset(s)?;
    }
    build_instant(
        &WallTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millis,
        },
        offset,
    )
}

/// Decode whichever of UTCTime or GeneralizedTime the tag announces.
pub fn decode_choice_of_time(input: &[u8], minimality: Leniency) -> Result<Timestamp> {
    match input.first() {
        None => Err(Asn1Error::EndOfData.into()),
        Some(&tag::UTC_TIME) => decode_utc_time(input, minimality),
        Some(&tag::GENERALIZED_TIME) => decode_generalized_time(input, minimality),
        Some(_) => Err(Asn1Error::BadTag.into()),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    fn ts(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Timestamp {
        Timestamp::from_calendar(year, month, day, hour, minute, second, 0).unwrap()
    }

    fn encode(f: impl Fn(Option<&mut [u8]>) -> Result<usize>) -> Vec<u8> {
        let size = f(None).unwrap();
        let mut buf = vec![0; size];
        assert_eq!(f(Some(&mut buf)).unwrap(), size);
        buf
    }

    #[test]
    fn utc_time_wire_vector() {
        // 2015-04-15T00:00:00Z, month before day
        let wire = encode(|out| encode_utc_time(ts(2015, 4, 15, 0, 0, 0), out));
        assert_eq!(wire, hex!("170d3135303431353030303030305a"));
        assert_eq!(
            decode_utc_time(&wire, Leniency::Strict).unwrap(),
            ts(2015, 4, 15, 0, 0, 0)
        );
    }

    #[test]
    fn utc_time_year_range() {
        assert_eq!(
            encode_utc_time(ts(1949, 12, 31, 23, 59, 59), None),
            Err(Error::BadEncode)
        );
        assert_eq!(
            encode_utc_time(ts(2051, 1, 1, 0, 0, 0), None),
            Err(Error::BadEncode)
        );
        let wire = encode(|out| encode_utc_time(ts(1950, 1, 1, 0, 0, 0), out));
        assert_eq!(&wire[2..4], b"50");
    }

    #[test]
    fn generalized_time_wire_shape() {
        let wire = encode(|out| encode_generalized_time(ts(2151, 8, 9, 1, 2, 3), out));
        assert_eq!(wire, *b"\x18\x0f21510809010203Z");
        assert_eq!(
            decode_generalized_time(&wire, Leniency::Strict).unwrap(),
            ts(2151, 8, 9, 1, 2, 3)
        );
    }

    #[test]
    fn choice_of_time_picks_by_year() {
        let utc = encode(|out| encode_choice_of_time(ts(2015, 4, 15, 0, 0, 0), out));
        assert_eq!(utc[0], 0x17);
        let general = encode(|out| encode_choice_of_time(ts(2151, 4, 15, 0, 0, 0), out));
        assert_eq!(general[0], 0x18);
        assert_eq!(
            decode_choice_of_time(&utc, Leniency::Strict).unwrap(),
            ts(2015, 4, 15, 0, 0, 0)
        );
        assert_eq!(
            decode_choice_of_time(&general, Leniency::Strict).unwrap(),
            ts(2151, 4, 15, 0, 0, 0)
        );
        assert_eq!(
            decode_choice_of_time(&hex!("020100"), Leniency::Strict),
            Err(Error::Asn1(Asn1Error::BadTag))
        );
    }

    #[test]
    fn utc_year_pivot() {
        let mut wire = b"\x17\x0d491231235959Z".to_vec();
        assert_eq!(
            decode_utc_time(&wire, Leniency::Strict).unwrap(),
            ts(2049, 12, 31, 23, 59, 59)
        );
        wire[2..4].copy_from_slice(b"50");
        assert_eq!(
            decode_utc_time(&wire, Leniency::Strict).unwrap(),
            ts(1950, 12, 31, 23, 59, 59)
        );
        wire[2..4].copy_from_slice(b"99");
        assert_eq!(
            decode_utc_time(&wire, Leniency::Strict).unwrap(),
            ts(1999, 12, 31, 23, 59, 59)
        );
    }

    #[test]
    fn utc_optional_seconds() {
        assert_eq!(
            decode_utc_time(b"\x17\x0b9912312359Z", Leniency::Strict).unwrap(),
            ts(1999, 12, 31, 23, 59, 0)
        );
        assert_eq!(
            decode_utc_time(b"\x17\x0c99123123595", Leniency::Strict).unwrap(),
            ts(1999, 12, 31, 23, 59, 5)
        );
    }

    #[test]
    fn generalized_minute_is_optional() {
        // hour precision with a trailing Z
        assert_eq!(
            decode_generalized_time(b"\x18\x0b2015041512Z", Leniency::Strict).unwrap(),
            ts(2015, 4, 15, 12, 0, 0)
        );
        // hour precision with an offset
        assert_eq!(
            decode_generalized_time(b"\x18\x0f2015041512+0100", Leniency::Strict).unwrap(),
            ts(2015, 4, 15, 13, 0, 0)
        );
    }

    #[test]
    fn generalized_fractional_seconds() {
        let decode = |text: &str| {
            let mut wire = vec![0x18, text.len() as u8];
            wire.extend_from_slice(text.as_bytes());
            decode_generalized_time(&wire, Leniency::Strict).unwrap()
        };
        let base = Timestamp::from_calendar(2015, 4, 15, 12, 0, 0, 0).unwrap();
        assert_eq!(decode("20150415120000,5Z").unix_millis(), base.unix_millis() + 500);
        assert_eq!(decode("20150415120000.12Z").unix_millis(), base.unix_millis() + 120);
        assert_eq!(decode("20150415120000.123Z").unix_millis(), base.unix_millis() + 123);
        // the fourth digit is dropped, the rest is timezone
        assert_eq!(decode("20150415120000.1234Z").unix_millis(), base.unix_millis() + 123);
    }

    #[test]
    fn timezone_offsets() {
        assert_eq!(
            decode_utc_time(b"\x17\x11150415000000+0130", Leniency::Strict).unwrap(),
            ts(2015, 4, 15, 1, 30, 0)
        );
        assert_eq!(
            decode_utc_time(b"\x17\x0d1504150000-01", Leniency::Strict),
            Ok(ts(2015, 4, 14, 23, 0, 0))
        );
    }

    #[test]
    fn timezone_carries_across_month_boundary() {
        assert_eq!(
            decode_utc_time(b"\x17\x11150401003000-0100", Leniency::Strict).unwrap(),
            ts(2015, 3, 31, 23, 30, 0)
        );
    }

    #[test]
    fn timezone_out_of_range() {
        assert_eq!(
            decode_utc_time(b"\x17\x11150415000000+2400", Leniency::Strict),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
        assert_eq!(
            decode_utc_time(b"\x17\x11150415000000-0160", Leniency::Strict),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
    }

    #[test]
    fn calendar_fields_validated() {
        // month 13
        assert_eq!(
            decode_utc_time(b"\x17\x0d991331235959Z", Leniency::Strict),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
        // too short
        assert_eq!(
            decode_utc_time(b"\x17\x09991231235", Leniency::Strict),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
        // non-digit in a mandatory field
        assert_eq!(
            decode_utc_time(b"\x17\x0d99x231235959Z", Leniency::Strict),
            Err(Error::Asn1(Asn1Error::Corrupt))
        );
    }
}
