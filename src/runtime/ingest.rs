//! `ingest_and_solve` task (reader on the acoustic port, spec §4.5).

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::Result;
use crate::geodetic;
use crate::response::Response;
use crate::session::ModemSession;
use crate::tables::Position;
use crate::transport::Transport;

use super::{NodeShared, Task};

pub struct IngestAndSolve<T: Transport> {
    session: ModemSession<T>,
}

impl<T: Transport> IngestAndSolve<T> {
    pub fn new(session: ModemSession<T>) -> Self {
        Self { session }
    }

    fn handle(&self, resp: Response, shared: &NodeShared) {
        match resp {
            Response::Broadcast { src, payload } => {
                if !shared.registry.contains(src) {
                    warn!("ingest_and_solve: dropped broadcast from unregistered address {src}");
                    return;
                }
                if payload.len() != 16 {
                    debug!("ingest_and_solve: broadcast payload from {src} is not 16 hex chars");
                    return;
                }
                match geodetic::decode_ll(&payload) {
                    Ok((lat, lon)) => {
                        let depth = shared
                            .positions
                            .lock()
                            .unwrap()
                            .get(src)
                            .map(|p| p.depth)
                            .unwrap_or(0.0);
                        shared
                            .positions
                            .lock()
                            .unwrap()
                            .update(src, Position { lat, lon, depth });
                        info!("ingest_and_solve: updated position for {src}");
                        self.maybe_solve(shared);
                    }
                    Err(e) => debug!("ingest_and_solve: malformed position payload from {src}: {e}"),
                }
            }
            Response::Range { src, range_m } => {
                if !shared.registry.contains(src) {
                    warn!("ingest_and_solve: dropped range for unregistered address {src}");
                    return;
                }
                shared.ranges.lock().unwrap().update(src, range_m);
                self.maybe_solve(shared);
            }
            _ => {}
        }
    }

    fn maybe_solve(&self, shared: &NodeShared) {
        let ranges_snapshot = {
            let ranges = shared.ranges.lock().unwrap();
            if ranges.known_count() < 3 {
                return;
            }
            ranges.snapshot()
        };
        let positions_snapshot = shared.positions.lock().unwrap().snapshot();
        let initial_guess = *shared.fix.lock().unwrap();

        let fix = shared
            .solver
            .solve(&positions_snapshot, &ranges_snapshot, initial_guess);
        info!(
            "ingest_and_solve: solved fix lat={:.6} lon={:.6} depth={:.2}",
            fix.lat, fix.lon, fix.depth
        );
        *shared.fix.lock().unwrap() = Some(fix);
    }
}

impl<T: Transport> Task for IngestAndSolve<T> {
    fn name(&self) -> &'static str {
        "ingest_and_solve"
    }

    fn run(mut self: Box<Self>, shared: Arc<NodeShared>) -> Result<()> {
        let poll_timeout = Duration::from_secs_f64(shared.settings.repeat_rate.max(0.05));
        loop {
            match self.session.read_next(poll_timeout) {
                Ok(Some(resp)) => self.handle(resp, &shared),
                Ok(None) => {}
                Err(e) if e.is_port_closed() => return Err(e),
                Err(e) => warn!("ingest_and_solve: read error: {e}"),
            }
        }
    }
}
