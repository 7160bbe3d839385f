//! Modem session (component C3): owns the acoustic serial port and enforces
//! the single-writer/single-reader discipline of spec §4.3 and §5.
//!
//! `ModemSession` exposes exactly two primitives — [`ModemSession::send`]
//! (fire-and-forget) and [`ModemSession::send_wait`] (a synchronous
//! transaction) — plus the five thin convenience wrappers spec §4.3 names.
//! It does not itself guarantee thread safety; that comes structurally from
//! §5's mode→task assignment, where each running task claims exactly one of
//! the reader or writer role and never both.

use std::time::{Duration, Instant};

use log::{trace, warn};

use crate::command::Command;
use crate::error::Result;
use crate::protocol::RawLine;
use crate::response::{self, Response};
use crate::transport::Transport;

/// A connection to the acoustic (or GPS) modem over a line-oriented transport.
pub struct ModemSession<T: Transport> {
    transport: T,
    /// Pacing between reads inside a `send_wait` transaction (`repeat_rate`).
    repeat_rate: Duration,
    /// The speed of sound used to convert range-return ticks to meters.
    sound_speed: f64,
    /// Internal byte accumulator for partial line reads.
    buf: Vec<u8>,
}

impl<T: Transport> ModemSession<T> {
    pub fn new(transport: T, sound_speed: f64, repeat_rate: Duration) -> Self {
        Self {
            transport,
            repeat_rate,
            sound_speed,
            buf: Vec::with_capacity(256),
        }
    }

    /// Fire-and-forget write: writes the command and returns immediately.
    /// Used by tasks that must keep the reader side unblocked (spec §4.3).
    pub fn send(&mut self, cmd: &Command) -> Result<()> {
        self.write_line(&cmd.to_line())
    }

    /// Write a command once, then read lines until `n` lines whose prefix is
    /// in `expected_prefixes` have arrived, or `timeout` elapses. Sleeps
    /// `repeat_rate` between reads. Returns the last matching parsed
    /// response, or `None` on timeout ("no message"). An empty
    /// `expected_prefixes` means any non-empty line counts.
    pub fn send_wait(
        &mut self,
        cmd: Option<&Command>,
        expected_prefixes: &[char],
        n: usize,
        timeout: Duration,
    ) -> Result<Option<Response>> {
        let deadline = Instant::now() + timeout;

        if let Some(cmd) = cmd {
            self.write_line(&cmd.to_line())?;
        }

        let mut matched = 0usize;
        let mut last = None;

        while matched < n {
            if Instant::now() >= deadline {
                return Ok(None);
            }

            match self.read_line(deadline)? {
                Some(line) => {
                    if let Some(raw) = RawLine::parse(&line)
                        && (expected_prefixes.is_empty() || expected_prefixes.contains(&raw.prefix))
                    {
                        matched += 1;
                        last = response::parse(&line, self.sound_speed);
                    }
                    std::thread::sleep(self.repeat_rate);
                }
                None => return Ok(None),
            }
        }

        Ok(last)
    }

    /// Block for up to `timeout` for the next decodable line, writing
    /// nothing. Used by the pure-reader tasks (`ingest_and_solve`,
    /// `debug_report`) that never hold the writer role.
    pub fn read_next(&mut self, timeout: Duration) -> Result<Option<Response>> {
        let deadline = Instant::now() + timeout;
        match self.read_line(deadline)? {
            Some(line) => Ok(response::parse(&line, self.sound_speed)),
            None => Ok(None),
        }
    }

    // --- Convenience wrappers (spec §4.3) ---

    pub fn status(&mut self, reply_timeout: Duration) -> Result<Option<Response>> {
        self.send_wait(Some(&Command::Status), &['A'], 1, reply_timeout)
    }

    pub fn set_address(&mut self, addr: u16, reply_timeout: Duration) -> Result<Option<Response>> {
        self.send_wait(Some(&Command::SetAddress(addr)), &['A'], 1, reply_timeout)
    }

    pub fn broadcast(&mut self, message: String) -> Result<()> {
        self.send(&Command::Broadcast(message))
    }

    pub fn unicast(&mut self, message: String, target: u16) -> Result<()> {
        self.send(&Command::Unicast { target, message })
    }

    /// Range-ping `target`. If `wait` is true, blocks for the two-step
    /// acknowledgment-then-range transaction; otherwise fires and forgets.
    pub fn ping(
        &mut self,
        target: u16,
        wait: bool,
        reply_timeout: Duration,
    ) -> Result<Option<Response>> {
        if wait {
            self.send_wait(Some(&Command::Ping(target)), &['P', 'R'], 2, reply_timeout)
        } else {
            self.send(&Command::Ping(target))?;
            Ok(None)
        }
    }

    // --- Internals ---

    fn write_line(&mut self, line: &str) -> Result<()> {
        trace!("TX: {line}");
        self.transport.write_all(line.as_bytes())?;
        self.transport.write_all(b"\n")?;
        self.transport.flush()?;
        Ok(())
    }

    /// Read one newline-terminated line, blocking (in short polls) until the
    /// deadline. Returns `None` on timeout without a complete line.
    fn read_line(&mut self, deadline: Instant) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop(); // drop the newline
                trace!("RX: {:?}", String::from_utf8_lossy(&line));
                return Ok(Some(line));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            self.transport
                .set_read_timeout(remaining.min(Duration::from_millis(100)))?;

            let mut tmp = [0u8; 256];
            match self.transport.read(&mut tmp) {
                Ok(0) => continue,
                Ok(n) => self.buf.extend_from_slice(&tmp[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    warn!("modem read error: {e}");
                    return Err(e.into());
                }
            }
        }
    }
}
