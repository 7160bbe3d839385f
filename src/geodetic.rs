//! Fixed-width hex DMS codec used on the acoustic air interface (component C1).
//!
//! Each coordinate encodes to 8 lowercase hex characters, high nibble first:
//! 2 digits of integer degrees, 2 digits of integer arc-minutes, 3 digits of
//! arc-seconds scaled to `[0, 0xfff]`, and 1 digit whose low bit carries the
//! sign. A lat/lon pair concatenates two such groups (16 hex characters).

use crate::error::{BeaconError, Result};

/// Arc-seconds are scaled into this many steps per 60 seconds.
const SEC_SCALE: u32 = 0xfff;

/// Encode a signed decimal-degree value into an 8-character lowercase hex string.
///
/// `deg` must satisfy `|deg| <= 180`; larger magnitudes are rejected rather
/// than silently truncated, since the wire format's 2 degree digits could
/// otherwise wrap.
pub fn encode(deg: f64) -> Result<String> {
    if !deg.is_finite() || deg.abs() > 180.0 {
        return Err(BeaconError::DegreesOutOfRange(deg));
    }

    let negative = deg.is_sign_negative() && deg != 0.0;
    let mag = deg.abs();

    let d = mag.floor();
    let rem_min = (mag - d) * 60.0;
    let m = rem_min.floor();
    let rem_sec = (rem_min - m) * 60.0;
    let s = (rem_sec * SEC_SCALE as f64 / 60.0).floor() as u32;

    let sign_nibble: u8 = if negative { 1 } else { 0 };

    Ok(format!(
        "{:02x}{:02x}{:03x}{:01x}",
        d as u32, m as u32, s, sign_nibble
    ))
}

/// Decode an 8-character hex DMS string back into a signed decimal degree.
pub fn decode(hex: &str) -> Result<f64> {
    if hex.len() != 8 || !hex.is_ascii() {
        return Err(BeaconError::InvalidHex);
    }

    let d = parse_nibbles(&hex[0..2])?;
    let m = parse_nibbles(&hex[2..4])?;
    let s = parse_nibbles_n(&hex[4..7], 3)?;
    let sign = parse_nibbles(&hex[7..8])?;

    let deg = d as f64 + m as f64 / 60.0 + (s as f64 * 60.0 / SEC_SCALE as f64) / 3600.0;

    Ok(if sign & 1 == 1 { -deg } else { deg })
}

/// Encode a lat/lon pair as a 16-character hex string (lat then lon).
pub fn encode_ll(lat: f64, lon: f64) -> Result<String> {
    let mut s = encode(lat)?;
    s.push_str(&encode(lon)?);
    Ok(s)
}

/// Decode a 16-character hex string into (lat, lon).
pub fn decode_ll(hex: &str) -> Result<(f64, f64)> {
    if hex.len() != 16 {
        return Err(BeaconError::InvalidHex);
    }
    let lat = decode(&hex[0..8])?;
    let lon = decode(&hex[8..16])?;
    Ok((lat, lon))
}

fn parse_nibbles(s: &str) -> Result<u32> {
    u32::from_str_radix(s, 16).map_err(|_| BeaconError::InvalidHex)
}

fn parse_nibbles_n(s: &str, expected_len: usize) -> Result<u32> {
    if s.len() != expected_len {
        return Err(BeaconError::InvalidHex);
    }
    parse_nibbles(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One part in 0xfff of one arc-second, in degrees — the guaranteed round-trip tolerance.
    const TOLERANCE_DEG: f64 = 60.0 / SEC_SCALE as f64 / 3600.0;

    #[test]
    fn test_roundtrip_positive() {
        let x = 12.34567;
        let hex = encode(x).unwrap();
        let back = decode(&hex).unwrap();
        assert!((back - x).abs() <= TOLERANCE_DEG, "back={back} x={x}");
    }

    #[test]
    fn test_roundtrip_negative() {
        let x = -76.54321;
        let hex = encode(x).unwrap();
        let back = decode(&hex).unwrap();
        assert!((back - x).abs() <= TOLERANCE_DEG);
    }

    #[test]
    fn test_roundtrip_zero() {
        let hex = encode(0.0).unwrap();
        let back = decode(&hex).unwrap();
        assert!((back - 0.0).abs() <= TOLERANCE_DEG);
    }

    #[test]
    fn test_roundtrip_extremes() {
        for x in [180.0, -180.0, 90.0, -90.0, 179.999999, -0.000001] {
            let hex = encode(x).unwrap();
            let back = decode(&hex).unwrap();
            assert!((back - x).abs() <= TOLERANCE_DEG, "x={x} back={back}");
        }
    }

    #[test]
    fn test_out_of_range() {
        assert!(encode(180.5).is_err());
        assert!(encode(-200.0).is_err());
    }

    #[test]
    fn test_sign_nibble_only_difference() {
        let pos = encode(45.5).unwrap();
        let neg = encode(-45.5).unwrap();
        assert_eq!(pos.len(), neg.len());
        let diff: Vec<(usize, (char, char))> = pos
            .chars()
            .zip(neg.chars())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .collect();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].0, 7, "only the sign nibble (index 7) should differ");
    }

    #[test]
    fn test_encode_ll_length() {
        let hex = encode_ll(12.34567, -76.54321).unwrap();
        assert_eq!(hex.len(), 16);
    }

    #[test]
    fn test_decode_ll_roundtrip() {
        let (lat, lon) = (12.34567, -76.54321);
        let hex = encode_ll(lat, lon).unwrap();
        let (lat2, lon2) = decode_ll(&hex).unwrap();
        assert!((lat - lat2).abs() <= TOLERANCE_DEG);
        assert!((lon - lon2).abs() <= TOLERANCE_DEG);
    }

    #[test]
    fn test_decode_invalid_hex() {
        assert!(decode("zzzzzzzz").is_err());
        assert!(decode("abc").is_err());
    }

    #[test]
    fn test_lowercase_output() {
        let hex = encode(123.456).unwrap();
        assert_eq!(hex, hex.to_lowercase());
    }
}
