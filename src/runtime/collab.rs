//! `gps_ingest` and `pressure_monitor` tasks (spec §4.5). Both are thin
//! pollers over the stub collaborator interfaces of SPEC_FULL §19 — real
//! NMEA parsing or pressure-to-depth scaling lives outside this crate.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::collaborators::{DepthSource, PositionSource};
use crate::error::Result;

use super::{NodeShared, Task};

pub struct GpsIngest {
    source: Box<dyn PositionSource>,
}

impl GpsIngest {
    pub fn new(source: Box<dyn PositionSource>) -> Self {
        Self { source }
    }
}

impl Task for GpsIngest {
    fn name(&self) -> &'static str {
        "gps_ingest"
    }

    fn run(mut self: Box<Self>, shared: Arc<NodeShared>) -> Result<()> {
        let poll_interval = Duration::from_secs_f64(shared.settings.repeat_rate.max(0.05));
        loop {
            match self.source.poll() {
                Ok(Some((lat, lon))) => {
                    let mut pos = shared.current_position.lock().unwrap();
                    pos.lat = lat;
                    pos.lon = lon;
                    info!("gps_ingest: position updated to ({lat:.6}, {lon:.6})");
                }
                Ok(None) => {}
                Err(e) if e.is_port_closed() => return Err(e),
                Err(e) => warn!("gps_ingest: poll failed: {e}"),
            }
            thread::sleep(poll_interval);
        }
    }
}

pub struct PressureMonitor {
    source: Box<dyn DepthSource>,
}

impl PressureMonitor {
    pub fn new(source: Box<dyn DepthSource>) -> Self {
        Self { source }
    }
}

impl Task for PressureMonitor {
    fn name(&self) -> &'static str {
        "pressure_monitor"
    }

    fn run(mut self: Box<Self>, shared: Arc<NodeShared>) -> Result<()> {
        let poll_interval = Duration::from_secs_f64(shared.settings.repeat_rate.max(0.05));
        loop {
            match self.source.poll() {
                Ok(Some(depth)) => {
                    shared.current_position.lock().unwrap().depth = depth;
                    info!("pressure_monitor: depth updated to {depth:.2}");
                }
                Ok(None) => {}
                Err(e) if e.is_port_closed() => return Err(e),
                Err(e) => warn!("pressure_monitor: poll failed: {e}"),
            }
            thread::sleep(poll_interval);
        }
    }
}
