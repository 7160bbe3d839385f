use std::io;
use std::time::Duration;

#[cfg(feature = "serial")]
pub mod serial;

/// A byte-oriented transport for modem communication.
///
/// Implementors provide read/write access to a serial-like connection. The
/// transport is synchronous and blocking, matching the modem session's
/// single-reader/single-writer discipline (spec §4.3, §5).
pub trait Transport: Send {
    /// Write all bytes to the transport.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Flush any buffered output.
    fn flush(&mut self) -> io::Result<()>;

    /// Read bytes into the buffer. Returns the number of bytes read.
    /// Returns `Err(TimedOut)` on timeout rather than blocking forever.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Set the read timeout for subsequent `read()` calls.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Duplicate the underlying handle so a writer task and a reader task
    /// can each own one end of the same physical port without a mutex
    /// (spec §5's single-writer/single-reader discipline).
    fn try_clone(&self) -> io::Result<Box<dyn Transport>>;
}

impl Transport for Box<dyn Transport> {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        (**self).write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn try_clone(&self) -> io::Result<Box<dyn Transport>> {
        (**self).try_clone()
    }
}
