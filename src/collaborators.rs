//! GPS and pressure collaborator interfaces (SPEC_FULL §19).
//!
//! Spec §1 excludes GPS sentence parsing and pressure-to-depth scaling from
//! the core as external concerns; this module defines only the interface a
//! real collaborator would implement. `Null*` always reports "nothing new"
//! and is used when the node's own config entry has no `serial_gps`/
//! `serial_pressure` device. `Serial*` owns a real opened port — the device
//! is read, but sentence/frame parsing remains the stubbed concern the spec
//! places outside this crate.

use crate::error::Result;
use crate::transport::Transport;

/// A source of `{lat, lon}` updates, polled by `gps_ingest`.
pub trait PositionSource: Send {
    fn poll(&mut self) -> Result<Option<(f64, f64)>>;
}

/// A source of depth (`z`, meters, negative below sea level) updates,
/// polled by `pressure_monitor`.
pub trait DepthSource: Send {
    fn poll(&mut self) -> Result<Option<f64>>;
}

/// A `PositionSource` that never produces a value — used when no GPS
/// device is configured.
#[derive(Debug, Default)]
pub struct NullPositionSource;

impl PositionSource for NullPositionSource {
    fn poll(&mut self) -> Result<Option<(f64, f64)>> {
        Ok(None)
    }
}

/// A `DepthSource` that never produces a value — used when no pressure
/// sensor is configured.
#[derive(Debug, Default)]
pub struct NullDepthSource;

impl DepthSource for NullDepthSource {
    fn poll(&mut self) -> Result<Option<f64>> {
        Ok(None)
    }
}

/// A `PositionSource` backed by a real GPS serial device. Reads accumulate
/// into a line buffer; NMEA sentence parsing is out of scope (spec §1), so
/// `poll` never yields a position yet.
///
/// TODO: parse NMEA sentences out of the buffered bytes and extract lat/lon.
pub struct SerialPositionSource<T: Transport> {
    transport: T,
    buf: Vec<u8>,
}

impl<T: Transport> SerialPositionSource<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            buf: Vec::new(),
        }
    }
}

impl<T: Transport> PositionSource for SerialPositionSource<T> {
    fn poll(&mut self) -> Result<Option<(f64, f64)>> {
        let mut chunk = [0u8; 256];
        match self.transport.read(&mut chunk) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.buf.extend_from_slice(&chunk[..n]);
                Ok(None)
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// A `DepthSource` backed by a real pressure-sensor serial device.
/// Pressure-to-depth scaling is out of scope (spec §1), so `poll` never
/// yields a depth yet.
///
/// TODO: parse pressure readings out of the buffered bytes and scale to depth.
pub struct SerialDepthSource<T: Transport> {
    transport: T,
    buf: Vec<u8>,
}

impl<T: Transport> SerialDepthSource<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            buf: Vec::new(),
        }
    }
}

impl<T: Transport> DepthSource for SerialDepthSource<T> {
    fn poll(&mut self) -> Result<Option<f64>> {
        let mut chunk = [0u8; 256];
        match self.transport.read(&mut chunk) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.buf.extend_from_slice(&chunk[..n]);
                Ok(None)
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    #[test]
    fn test_null_sources_report_nothing() {
        assert_eq!(NullPositionSource.poll().unwrap(), None);
        assert_eq!(NullDepthSource.poll().unwrap(), None);
    }

    struct MockTransport {
        chunks: Vec<Vec<u8>>,
    }

    impl Transport for MockTransport {
        fn write_all(&mut self, _buf: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Err(io::Error::new(io::ErrorKind::TimedOut, "no data")),
            }
        }

        fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
            Ok(())
        }

        fn try_clone(&self) -> io::Result<Box<dyn Transport>> {
            Err(io::Error::other("mock cannot clone"))
        }
    }

    #[test]
    fn test_serial_position_source_buffers_without_parsing() {
        let transport = MockTransport {
            chunks: vec![b"$GPGGA,...\r\n".to_vec()],
        };
        let mut source = SerialPositionSource::new(transport);
        assert_eq!(source.poll().unwrap(), None);
        assert!(!source.buf.is_empty());
    }

    #[test]
    fn test_serial_position_source_timeout_is_not_an_error() {
        let transport = MockTransport { chunks: vec![] };
        let mut source = SerialPositionSource::new(transport);
        assert_eq!(source.poll().unwrap(), None);
    }

    #[test]
    fn test_serial_depth_source_buffers_without_parsing() {
        let transport = MockTransport {
            chunks: vec![b"1013.25\r\n".to_vec()],
        };
        let mut source = SerialDepthSource::new(transport);
        assert_eq!(source.poll().unwrap(), None);
        assert!(!source.buf.is_empty());
    }
}
