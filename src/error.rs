use thiserror::Error;

pub type Result<T> = std::result::Result<T, BeaconError>;

#[derive(Debug, Error)]
pub enum BeaconError {
    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("acoustic modem serial port not found")]
    PortNotFound,

    #[error("invalid or truncated modem frame")]
    InvalidFrame,

    #[error("timeout waiting for modem response")]
    Timeout,

    #[error("invalid hex digit in geodetic field")]
    InvalidHex,

    #[error("degree value out of encodable range: {0}")]
    DegreesOutOfRange(f64),

    #[error("measurement reported for address {0} not present in the beacon registry")]
    UnknownAddress(u16),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}

impl BeaconError {
    /// True for I/O errors that mean the underlying port is gone rather
    /// than a transient hiccup — a task loop should exit on these (spec
    /// §4.5's "port closed" terminal transition) instead of logging and
    /// continuing.
    pub fn is_port_closed(&self) -> bool {
        matches!(
            self,
            BeaconError::Io(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::BrokenPipe
                        | std::io::ErrorKind::NotConnected
                        | std::io::ErrorKind::UnexpectedEof
                )
        )
    }
}
