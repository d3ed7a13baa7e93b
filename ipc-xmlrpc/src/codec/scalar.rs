//! Text conversions for the scalar wire types.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDateTime;

use crate::codec::{DecodeError, BASE_64, BOOLEAN, DATE_TIME_ISO_8601, DOUBLE, I4};

/// `yyyyMMdd'T'HH:mm:ss`, no timezone and no fractional seconds.
pub const DATE_TIME_FORMAT: &str = "%Y%m%dT%H:%M:%S";

const TRUE: &str = "1";
const FALSE: &str = "0";

pub fn decode_boolean(text: &str) -> Result<bool, DecodeError> {
    match text {
        TRUE => Ok(true),
        FALSE => Ok(false),
        other => Err(DecodeError::InvalidBoolean(BOOLEAN, other.to_string())),
    }
}

pub fn encode_boolean(value: bool) -> &'static str {
    if value {
        TRUE
    } else {
        FALSE
    }
}

/// Shared by `<i4>` and `<int>`, the caller passes the element name for error reporting.
pub fn decode_int(name: &'static str, text: &str) -> Result<i32, DecodeError> {
    text.trim()
        .parse()
        .map_err(|_| DecodeError::InvalidNumber(name, text.to_string()))
}

pub fn encode_int(value: i32) -> String {
    value.to_string()
}

pub fn decode_double(text: &str) -> Result<f64, DecodeError> {
    text.trim()
        .parse()
        .map_err(|_| DecodeError::InvalidNumber(DOUBLE, text.to_string()))
}

pub fn encode_double(value: f64) -> String {
    let text = value.to_string();

    if value.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}

pub fn decode_date_time(text: &str) -> Result<NaiveDateTime, DecodeError> {
    NaiveDateTime::parse_from_str(text.trim(), DATE_TIME_FORMAT)
        .map_err(|_| DecodeError::InvalidDateTime(DATE_TIME_ISO_8601, text.to_string()))
}

pub fn encode_date_time(value: &NaiveDateTime) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

/// Line breaks and other whitespace inside the encoded text are ignored.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    STANDARD
        .decode(compact)
        .map_err(|e| DecodeError::InvalidBase64(BASE_64, e.to_string()))
}

pub fn encode_base64(value: &[u8]) -> String {
    STANDARD.encode(value)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn boolean_is_strict() {
        assert_eq!(decode_boolean("1"), Ok(true));
        assert_eq!(decode_boolean("0"), Ok(false));

        for text in ["true", "false", " 1", "2", ""] {
            assert!(
                matches!(decode_boolean(text), Err(DecodeError::InvalidBoolean(..))),
                "{text:?} should not decode as a boolean"
            );
        }
    }

    #[test]
    fn int_parsing() {
        assert_eq!(decode_int(I4, "42"), Ok(42));
        assert_eq!(decode_int(I4, " -7\n"), Ok(-7));
        assert_eq!(decode_int(I4, "+3"), Ok(3));
        assert!(decode_int(I4, "4.2").is_err());
        assert!(decode_int(I4, "forty-two").is_err());
        assert!(decode_int(I4, "2147483648").is_err());
    }

    #[test]
    fn double_formatting() {
        assert_eq!(encode_double(1.0), "1.0");
        assert_eq!(encode_double(-0.5), "-0.5");
        assert_eq!(encode_double(1e-7), "0.0000001");
        assert_eq!(decode_double("3.25"), Ok(3.25));
        assert_eq!(decode_double(&encode_double(1e21)), Ok(1e21));
        assert!(decode_double("three").is_err());
    }

    #[test]
    fn date_time_pattern() {
        let expected = NaiveDate::from_ymd_opt(1998, 7, 17)
            .unwrap()
            .and_hms_opt(14, 8, 55)
            .unwrap();

        assert_eq!(decode_date_time("19980717T14:08:55"), Ok(expected));
        assert_eq!(encode_date_time(&expected), "19980717T14:08:55");

        for text in [
            "1998-07-17T14:08:55",
            "19980717T14:08:55Z",
            "19980717T14:08:55.123",
            "19980717",
        ] {
            assert!(decode_date_time(text).is_err(), "{text:?} should be rejected");
        }
    }

    #[test]
    fn base64_round_trip() {
        assert_eq!(encode_base64(b"hello"), "aGVsbG8=");
        assert_eq!(decode_base64("aGVs\n bG8="), Ok(b"hello".to_vec()));
        assert!(matches!(
            decode_base64("not base64!"),
            Err(DecodeError::InvalidBase64(..))
        ));
    }
}
