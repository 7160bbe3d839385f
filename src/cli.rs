//! CLI surface (ambient stack, SPEC_FULL §13). Pure plumbing: parsing picks
//! the operating mode and config path; the core never calls into this
//! module directly (spec §1 names CLI parsing an external collaborator).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "beacon", about = "Control firmware for an acoustic navigation beacon node")]
pub struct Cli {
    #[command(subcommand)]
    pub command: BeaconCommand,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Path to the node's JSON configuration file.
    #[arg(long, default_value = "beacon.json")]
    pub config: PathBuf,

    /// Acoustic modem serial device.
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub device: String,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
pub enum BeaconCommand {
    /// Set the modem's hardware address and exit.
    Set {
        /// 3-digit node address, 0-999.
        address: u16,
    },
    /// Run in active mode: range passive beacons and solve for position.
    Active,
    /// Run in passive mode: broadcast this node's position periodically.
    Passive,
    /// Diagnostic: emit a wall-clock timestamp every `period_s` seconds.
    Timer {
        period_s: f64,
        /// Unicast target; broadcasts to all units if omitted.
        target: Option<u16>,
    },
    /// Diagnostic: print every decoded frame seen on the modem port.
    Report,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses_active() {
        let cli = Cli::parse_from(["beacon", "active"]);
        assert!(matches!(cli.command, BeaconCommand::Active));
    }

    #[test]
    fn test_cli_parses_set_with_address() {
        let cli = Cli::parse_from(["beacon", "set", "42"]);
        match cli.command {
            BeaconCommand::Set { address } => assert_eq!(address, 42),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_timer_with_optional_target() {
        let cli = Cli::parse_from(["beacon", "timer", "5.0"]);
        match cli.command {
            BeaconCommand::Timer { period_s, target } => {
                assert_eq!(period_s, 5.0);
                assert_eq!(target, None);
            }
            other => panic!("unexpected: {other:?}"),
        }

        let cli = Cli::parse_from(["beacon", "timer", "5.0", "17"]);
        match cli.command {
            BeaconCommand::Timer { period_s, target } => {
                assert_eq!(period_s, 5.0);
                assert_eq!(target, Some(17));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
