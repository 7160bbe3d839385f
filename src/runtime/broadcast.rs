//! `position_broadcaster` task (writer on the acoustic port, spec §4.5).

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::warn;
use rand::Rng;

use crate::error::Result;
use crate::geodetic;
use crate::session::ModemSession;
use crate::transport::Transport;

use super::{NodeShared, Task};

pub struct PositionBroadcaster<T: Transport> {
    session: ModemSession<T>,
}

impl<T: Transport> PositionBroadcaster<T> {
    pub fn new(session: ModemSession<T>) -> Self {
        Self { session }
    }
}

impl<T: Transport> Task for PositionBroadcaster<T> {
    fn name(&self) -> &'static str {
        "position_broadcaster"
    }

    fn run(mut self: Box<Self>, shared: Arc<NodeShared>) -> Result<()> {
        let mut rng = rand::thread_rng();
        loop {
            let (lat, lon) = {
                let pos = shared.current_position.lock().unwrap();
                (pos.lat, pos.lon)
            };

            match geodetic::encode_ll(lat, lon) {
                Ok(payload) => match self.session.broadcast(payload) {
                    Ok(()) => {}
                    Err(e) if e.is_port_closed() => return Err(e),
                    Err(e) => warn!("position_broadcaster: broadcast failed: {e}"),
                },
                Err(e) => warn!("position_broadcaster: cannot encode current position: {e}"),
            }

            let jitter = if shared.settings.randomize > 0.0 {
                rng.gen_range(0.0..shared.settings.randomize)
            } else {
                0.0
            };
            thread::sleep(Duration::from_secs_f64(
                shared.settings.broadcast_rate + jitter,
            ));
        }
    }
}
