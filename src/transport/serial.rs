use std::io;
use std::time::Duration;

use log::info;

use crate::error::{BeaconError, Result};

use super::Transport;

/// Acoustic and GPS serial lines are both 9600 8-N-1 with a 100 ms read
/// timeout (spec §6).
const BAUD_RATE: u32 = 9600;
const READ_TIMEOUT: Duration = Duration::from_millis(100);
const DATA_BITS: serialport::DataBits = serialport::DataBits::Eight;
const STOP_BITS: serialport::StopBits = serialport::StopBits::One;
const PARITY: serialport::Parity = serialport::Parity::None;

/// A modem (or GPS) transport backed by a native serial port.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub fn new(port: Box<dyn serialport::SerialPort>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.port, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut self.port)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.port, buf)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| io::Error::other(e))
    }

    fn try_clone(&self) -> io::Result<Box<dyn Transport>> {
        let cloned = self.port.try_clone()?;
        Ok(Box::new(SerialTransport::new(cloned)))
    }
}

/// Open a serial port at the fixed 9600 8-N-1 / 100ms-timeout line settings
/// shared by the acoustic and GPS links (spec §6).
pub fn open_port(device: &str) -> Result<SerialTransport> {
    let port = serialport::new(device, BAUD_RATE)
        .data_bits(DATA_BITS)
        .stop_bits(STOP_BITS)
        .parity(PARITY)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(BeaconError::Serial)?;

    info!("opened {device} at {BAUD_RATE} baud");
    Ok(SerialTransport::new(port))
}
