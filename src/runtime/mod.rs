//! Node runtime (component C5, spec §4.5 and §9's task-table design note).
//!
//! Rather than five bespoke `run()` branches, each operating mode resolves
//! to a list of [`Task`] values built by [`mode_tasks`]. Every task owns
//! exactly the I/O handle its role needs (so the writer/reader split of
//! spec §5 is enforced by construction, not by a lock) and shares only the
//! cross-task state — tables, settings, solver — via [`NodeShared`].

mod broadcast;
mod collab;
mod debug;
mod ingest;
mod ranging;

pub use broadcast::PositionBroadcaster;
pub use collab::{GpsIngest, PressureMonitor};
pub use debug::{DebugReport, DebugTimer};
pub use ingest::IngestAndSolve;
pub use ranging::RangingCycler;

use std::sync::{Arc, Mutex};

use crate::config::Settings;
use crate::error::Result;
use crate::session::ModemSession;
use crate::solver::Solver;
use crate::tables::{BeaconRegistry, Position, PositionTable, RangeTable};
use crate::transport::Transport;

/// The frozen settings plus the cross-task mutable state every task is
/// handed a shared reference to (spec §9 design note: bundle settings,
/// serial handles, and tables into one owning value; here the serial
/// handles themselves are NOT shared — each task privately owns its own).
pub struct NodeShared {
    pub settings: Settings,
    pub registry: BeaconRegistry,
    pub solver: Solver,
    pub ranges: Mutex<RangeTable>,
    pub positions: Mutex<PositionTable>,
    pub fix: Mutex<Option<Position>>,
    /// This node's own position, written by `gps_ingest`/config at startup
    /// and read by `position_broadcaster` in passive mode.
    pub current_position: Mutex<Position>,
}

impl NodeShared {
    pub fn new(
        settings: Settings,
        registry: BeaconRegistry,
        positions: PositionTable,
        solver: Solver,
        initial_position: Position,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            registry,
            solver,
            ranges: Mutex::new(RangeTable::new()),
            positions: Mutex::new(positions),
            fix: Mutex::new(None),
            current_position: Mutex::new(initial_position),
        })
    }
}

/// A uniform "run until the port closes" capability (spec §9). Each
/// concrete task is a straight-line loop with a single running state and
/// an implicit port-closed terminal transition (spec §4.5).
pub trait Task: Send {
    fn name(&self) -> &'static str;
    fn run(self: Box<Self>, shared: Arc<NodeShared>) -> Result<()>;
}

/// One of the five mutually exclusive operating modes (spec §4.5).
#[derive(Debug, Clone)]
pub enum OperatingMode {
    Set(u16),
    Active,
    Passive,
    Timer { period_s: f64, target: Option<u16> },
    Report,
}

/// The I/O handles and collaborators a mode's task set may draw on. Not
/// every field is used by every mode; `mode_tasks` takes only what each
/// mode's task contracts require and errors if something required is
/// missing (spec §7's "overlapping writer tasks" / missing-collaborator
/// fatal-at-startup checks).
pub struct Hardware {
    pub acoustic_writer: Option<ModemSession<Box<dyn Transport>>>,
    pub acoustic_reader: Option<ModemSession<Box<dyn Transport>>>,
    pub position_source: Box<dyn crate::collaborators::PositionSource>,
    pub depth_source: Box<dyn crate::collaborators::DepthSource>,
    pub pressure_configured: bool,
    pub gps_configured: bool,
}

/// Build the per-mode task list (spec §9: a table, not an if/elif chain).
/// `set` and nothing-to-run modes resolve to an empty vector, which the
/// caller interprets as "handled inline, no tasks to join".
pub fn mode_tasks(mode: &OperatingMode, hw: Hardware) -> Result<Vec<Box<dyn Task>>> {
    use crate::error::BeaconError;

    let mut tasks: Vec<Box<dyn Task>> = Vec::new();

    match mode {
        OperatingMode::Set(_) => {}

        OperatingMode::Active => {
            let writer = hw.acoustic_writer.ok_or_else(|| {
                BeaconError::ConfigInvalid("active mode requires an acoustic writer".to_string())
            })?;
            let reader = hw.acoustic_reader.ok_or_else(|| {
                BeaconError::ConfigInvalid("active mode requires an acoustic reader".to_string())
            })?;
            tasks.push(Box::new(RangingCycler::new(writer)));
            tasks.push(Box::new(IngestAndSolve::new(reader)));
            if hw.pressure_configured {
                tasks.push(Box::new(PressureMonitor::new(hw.depth_source)));
            }
        }

        OperatingMode::Passive => {
            let writer = hw.acoustic_writer.ok_or_else(|| {
                BeaconError::ConfigInvalid("passive mode requires an acoustic writer".to_string())
            })?;
            tasks.push(Box::new(PositionBroadcaster::new(writer)));
            if hw.gps_configured {
                tasks.push(Box::new(GpsIngest::new(hw.position_source)));
            }
            if hw.pressure_configured {
                tasks.push(Box::new(PressureMonitor::new(hw.depth_source)));
            }
        }

        OperatingMode::Timer { period_s, target } => {
            let writer = hw.acoustic_writer.ok_or_else(|| {
                BeaconError::ConfigInvalid("timer mode requires an acoustic writer".to_string())
            })?;
            let reader = hw.acoustic_reader.ok_or_else(|| {
                BeaconError::ConfigInvalid("timer mode requires an acoustic reader".to_string())
            })?;
            tasks.push(Box::new(DebugTimer::new(writer, *period_s, *target)));
            tasks.push(Box::new(DebugReport::new(reader)));
        }

        OperatingMode::Report => {
            let reader = hw.acoustic_reader.ok_or_else(|| {
                BeaconError::ConfigInvalid("report mode requires an acoustic reader".to_string())
            })?;
            tasks.push(Box::new(DebugReport::new(reader)));
        }
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{NullDepthSource, NullPositionSource};

    fn empty_hardware() -> Hardware {
        Hardware {
            acoustic_writer: None,
            acoustic_reader: None,
            position_source: Box::new(NullPositionSource),
            depth_source: Box::new(NullDepthSource),
            pressure_configured: false,
            gps_configured: false,
        }
    }

    #[test]
    fn test_set_mode_has_no_tasks() {
        let tasks = mode_tasks(&OperatingMode::Set(42), empty_hardware()).unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_active_mode_requires_acoustic_handles() {
        let err = mode_tasks(&OperatingMode::Active, empty_hardware());
        assert!(err.is_err());
    }

    #[test]
    fn test_report_mode_requires_only_reader() {
        let err = mode_tasks(&OperatingMode::Report, empty_hardware());
        assert!(err.is_err());
    }
}
