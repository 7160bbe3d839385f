//! Incoming modem response decoding (component C2).
//!
//! Dispatches on [`crate::protocol::RawLine`]'s prefix character. Anything
//! that doesn't fit an enumerated shape — unknown prefix, truncated field,
//! non-decimal digit where one is required — decodes to `None` ("no
//! message") rather than an error: the reader must never crash on bad bytes
//! (spec §4.2, §7, §8).

use crate::protocol::RawLine;

/// A decoded modem response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// `#A{src:03d}[V{raw:05d}]` — status query reply.
    Status { src: u16, voltage: Option<f64> },
    /// `#B{len:02d}` — local broadcast-accepted acknowledgment (no remote source).
    BroadcastAck { len: u16 },
    /// `#B{src:03d}{len:02d}{payload}` — a broadcast received from another node.
    Broadcast { src: u16, payload: String },
    /// `#U{len:02d}{payload}` — a unicast received (source address not carried on the wire).
    Unicast { payload: String },
    /// `R{src:03d}T{ticks:05d}` — a ranging return; `range_m` is derived from `sound_speed`.
    Range { src: u16, range_m: f64 },
}

/// Parse one already-line-split raw frame. `sound_speed` (m/s) is required to
/// convert range-return tick counts into meters per spec §4.2.
pub fn parse(bytes: &[u8], sound_speed: f64) -> Option<Response> {
    let raw = RawLine::parse(bytes)?;
    match raw.prefix {
        'A' => parse_status(&raw),
        'B' => parse_broadcast(&raw),
        'U' => parse_unicast(&raw),
        'R' => parse_range(&raw, sound_speed),
        _ => None,
    }
}

fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_status(raw: &RawLine) -> Option<Response> {
    let body = raw.body(); // "A{src:03d}[V{raw:05d}]"
    let src = digits(body.get(1..4)?)? as u16;

    if raw.line.len() <= 5 {
        return Some(Response::Status { src, voltage: None });
    }

    if body.as_bytes().get(4).copied()? != b'V' {
        return None;
    }
    let raw_v = digits(body.get(5..10)?)?;
    let voltage = raw_v as f64 * 15.0 / 65536.0;
    Some(Response::Status {
        src,
        voltage: Some(voltage),
    })
}

fn parse_broadcast(raw: &RawLine) -> Option<Response> {
    let body = raw.body(); // "B{len:02d}" or "B{src:03d}{len:02d}{payload}"

    if raw.line.len() <= 4 {
        let len = digits(body.get(1..3)?)? as u16;
        return Some(Response::BroadcastAck { len });
    }

    let src = digits(body.get(1..4)?)? as u16;
    let len = digits(body.get(4..6)?)? as usize;
    let payload = body.get(6..)?;
    if payload.len() != len {
        return None;
    }
    Some(Response::Broadcast {
        src,
        payload: payload.to_string(),
    })
}

fn parse_unicast(raw: &RawLine) -> Option<Response> {
    let body = raw.body(); // "U{len:02d}{payload}"
    let len = digits(body.get(1..3)?)? as usize;
    let payload = body.get(3..)?;
    if payload.len() != len {
        return None;
    }
    Some(Response::Unicast {
        payload: payload.to_string(),
    })
}

fn parse_range(raw: &RawLine, sound_speed: f64) -> Option<Response> {
    let body = raw.body(); // "{src:03d}T{ticks:05d}" (the leading 'R' was the dispatch prefix)
    let src = digits(body.get(0..3)?)? as u16;
    if body.as_bytes().get(3).copied()? != b'T' {
        return None;
    }
    let ticks = digits(body.get(4..9)?)?;
    let range_m = sound_speed * 3.125e-5 * ticks as f64;
    Some(Response::Range { src, range_m })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_with_voltage() {
        // spec §8 scenario 1
        let resp = parse(b"#A042V32768", 1500.0).unwrap();
        assert_eq!(
            resp,
            Response::Status {
                src: 42,
                voltage: Some(7.5)
            }
        );
    }

    #[test]
    fn test_status_without_voltage() {
        let resp = parse(b"#A042", 1500.0).unwrap();
        assert_eq!(
            resp,
            Response::Status {
                src: 42,
                voltage: None
            }
        );
    }

    #[test]
    fn test_range_ingestion() {
        // spec §8 scenario 2
        let resp = parse(b"R017T10000", 1500.0).unwrap();
        match resp {
            Response::Range { src, range_m } => {
                assert_eq!(src, 17);
                assert!((range_m - 468.75).abs() < 1e-9);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_broadcast_position() {
        let hex = crate::geodetic::encode_ll(12.34567, -76.54321).unwrap();
        let line = format!("#B017{:02}{hex}", hex.len());
        let resp = parse(line.as_bytes(), 1500.0).unwrap();
        match resp {
            Response::Broadcast { src, payload } => {
                assert_eq!(src, 17);
                let (lat, lon) = crate::geodetic::decode_ll(&payload).unwrap();
                assert!((lat - 12.34567).abs() < 1e-4);
                assert!((lon - (-76.54321)).abs() < 1e-4);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_broadcast_ack() {
        let resp = parse(b"#B07", 1500.0).unwrap();
        assert_eq!(resp, Response::BroadcastAck { len: 7 });
    }

    #[test]
    fn test_unicast() {
        let resp = parse(b"#U02hi", 1500.0).unwrap();
        assert_eq!(
            resp,
            Response::Unicast {
                payload: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_prefix_dropped() {
        assert!(parse(b"#Zgarbage", 1500.0).is_none());
    }

    #[test]
    fn test_truncated_dropped() {
        assert!(parse(b"#", 1500.0).is_none());
        assert!(parse(b"", 1500.0).is_none());
        assert!(parse(b"R017T1", 1500.0).is_none());
    }

    #[test]
    fn test_non_ascii_dropped() {
        assert!(parse(&[0x23, 0xff, 0x41], 1500.0).is_none());
    }

    #[test]
    fn test_broadcast_length_mismatch_dropped() {
        assert!(parse(b"#B01799toolongforthedeclaredlength", 1500.0).is_none());
    }

    #[test]
    fn test_frame_parse_totality_fuzz_like() {
        // spec §8: parse must never panic, for any byte string.
        let samples: &[&[u8]] = &[
            b"",
            b"#",
            b"$",
            b"#A",
            b"#B",
            b"#U",
            b"R",
            b"RT",
            b"#AxyzV00000",
            &[0x00, 0x01, 0x02],
            &[0xff; 20],
        ];
        for s in samples {
            let _ = parse(s, 1500.0);
        }
    }
}
