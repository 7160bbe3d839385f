//! Outgoing modem commands (component C2).
//!
//! All fields are zero-padded decimal unless noted, per spec §4.2.

/// A command to send to the acoustic modem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `$?` — query node address and voltage.
    Status,
    /// `$A{a:03d}` — set this node's address.
    SetAddress(u16),
    /// `$B{len:02d}{m}` — broadcast a payload to all units in range.
    Broadcast(String),
    /// `$U{t:03d}{len:02d}{m}` — unicast a payload to a target address.
    Unicast { target: u16, message: String },
    /// `$P{t:03d}` — range-ping a target address.
    Ping(u16),
}

impl Command {
    /// Render the command to its wire representation (without the trailing newline).
    pub fn to_line(&self) -> String {
        match self {
            Command::Status => "$?".to_string(),
            Command::SetAddress(a) => format!("$A{a:03}"),
            Command::Broadcast(m) => format!("$B{:02}{m}", m.len()),
            Command::Unicast { target, message } => {
                format!("$U{target:03}{:02}{message}", message.len())
            }
            Command::Ping(t) => format!("$P{t:03}"),
        }
    }

    /// Prefixes of acceptable reply lines for this command, and how many
    /// matching lines a `send_wait` transaction should collect. An empty
    /// prefix set means "any non-empty frame counts" (spec §4.3).
    pub fn expected_replies(&self) -> (&'static [char], usize) {
        match self {
            Command::Status => (&['A'], 1),
            Command::SetAddress(_) => (&['A'], 1),
            Command::Broadcast(_) => (&['B'], 1),
            Command::Unicast { .. } => (&[], 0),
            Command::Ping(_) => (&['P', 'R'], 2),
        }
    }
}
