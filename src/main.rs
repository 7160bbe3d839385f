use std::fs::File;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use beacon::cli::{BeaconCommand, Cli};
use beacon::collaborators::{
    DepthSource, NullDepthSource, NullPositionSource, PositionSource, SerialDepthSource,
    SerialPositionSource,
};
use beacon::config::Config;
use beacon::error::{BeaconError, Result};
use beacon::response::Response;
use beacon::runtime::{mode_tasks, Hardware, NodeShared, OperatingMode};
use beacon::session::ModemSession;
use beacon::solver::Solver;
use beacon::tables::Position;
use beacon::transport::Transport;

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default())
        .filter_level(cli.verbose.log_level_filter())
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Open a serial device at the acoustic/GPS/pressure line settings (spec §6:
/// all three ports share 9600 8-N-1 with a 100ms timeout).
#[cfg(feature = "serial")]
fn open_serial_device(device: &str) -> Result<Box<dyn Transport>> {
    Ok(Box::new(beacon::transport::serial::open_port(device)?))
}

#[cfg(not(feature = "serial"))]
fn open_serial_device(_device: &str) -> Result<Box<dyn Transport>> {
    Err(BeaconError::ConfigInvalid(
        "built without the 'serial' feature".to_string(),
    ))
}

fn run(cli: Cli) -> Result<()> {
    let config_file = File::open(&cli.config)?;
    let config = Config::from_reader(config_file)?;
    config.validate()?;

    let settings = config.settings.clone();
    let sound_speed = settings.sound_speed;
    let repeat_rate = Duration::from_secs_f64(settings.repeat_rate);
    let reply_timeout = Duration::from_secs_f64(settings.reply_timeout);

    let transport = open_serial_device(&cli.device)?;

    // Verify status and learn this node's own address (spec §4.5:
    // "open serial, verify status, populate tables").
    let mut probe = ModemSession::new(transport.try_clone()?, sound_speed, repeat_rate);
    let own_address = match probe.status(reply_timeout)? {
        Some(Response::Status { src, .. }) => src,
        _ => return Err(BeaconError::Timeout),
    };
    info!("beacon: modem reports address {own_address}");
    drop(probe);

    if let BeaconCommand::Set { address } = cli.command {
        let mut session = ModemSession::new(transport, sound_speed, repeat_rate);
        session.set_address(address, reply_timeout)?;
        info!("beacon: set address to {address}");
        return Ok(());
    }

    let (registry, positions) = config.build_tables()?;
    let solver = Solver::new(settings.coords()?);
    let own_position = registry
        .get(own_address)
        .and_then(|e| e.position)
        .unwrap_or(Position {
            lat: 0.0,
            lon: 0.0,
            depth: 0.0,
        });

    let mode = match &cli.command {
        BeaconCommand::Set { .. } => unreachable!("handled above"),
        BeaconCommand::Active => OperatingMode::Active,
        BeaconCommand::Passive => OperatingMode::Passive,
        BeaconCommand::Timer { period_s, target } => {
            if let Some(t) = target {
                config.validate_target(*t)?;
            }
            OperatingMode::Timer {
                period_s: *period_s,
                target: *target,
            }
        }
        BeaconCommand::Report => OperatingMode::Report,
    };

    let shared = NodeShared::new(settings, registry, positions, solver, own_position);

    let writer = ModemSession::new(transport.try_clone()?, sound_speed, repeat_rate);
    let reader = ModemSession::new(transport, sound_speed, repeat_rate);

    // "Configured" is driven solely by the node's own modem entry (spec
    // §4.5 items 2-3): a `serial_gps`/`serial_pressure` device path means
    // the corresponding collaborator task runs.
    let own_entry = config.modem(own_address)?;
    let gps_device = own_entry.and_then(|e| e.serial_gps.as_deref());
    let pressure_device = own_entry.and_then(|e| e.serial_pressure.as_deref());

    let position_source: Box<dyn PositionSource> = match gps_device {
        Some(device) => Box::new(SerialPositionSource::new(open_serial_device(device)?)),
        None => Box::new(NullPositionSource),
    };
    let depth_source: Box<dyn DepthSource> = match pressure_device {
        Some(device) => Box::new(SerialDepthSource::new(open_serial_device(device)?)),
        None => Box::new(NullDepthSource),
    };

    let hardware = Hardware {
        acoustic_writer: Some(writer),
        acoustic_reader: Some(reader),
        position_source,
        depth_source,
        pressure_configured: pressure_device.is_some(),
        gps_configured: gps_device.is_some(),
    };

    let tasks = mode_tasks(&mode, hardware)?;
    let handles: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            let shared = Arc::clone(&shared);
            let name = task.name();
            (name, thread::spawn(move || task.run(shared)))
        })
        .collect();

    let mut first_err = None;
    for (name, handle) in handles {
        match handle.join() {
            Ok(Ok(())) => info!("beacon: task {name} exited cleanly"),
            Ok(Err(e)) => {
                error!("beacon: task {name} failed: {e}");
                first_err.get_or_insert(e);
            }
            Err(_) => error!("beacon: task {name} panicked"),
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
