//! `ranging_cycler` task (writer on the acoustic port, spec §4.5).

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::Rng;

use crate::error::Result;
use crate::session::ModemSession;
use crate::transport::Transport;

use super::{NodeShared, Task};

pub struct RangingCycler<T: Transport> {
    session: ModemSession<T>,
}

impl<T: Transport> RangingCycler<T> {
    pub fn new(session: ModemSession<T>) -> Self {
        Self { session }
    }
}

impl<T: Transport> Task for RangingCycler<T> {
    fn name(&self) -> &'static str {
        "ranging_cycler"
    }

    fn run(mut self: Box<Self>, shared: Arc<NodeShared>) -> Result<()> {
        let targets = shared.registry.passive_addresses();
        if targets.is_empty() {
            info!("ranging_cycler: no passive beacons configured, nothing to do");
            return Ok(());
        }

        let mut rng = rand::thread_rng();
        let mut idx = 0usize;
        let mut next_deadline = Instant::now();

        loop {
            let target = targets[idx % targets.len()];
            idx += 1;

            let now = Instant::now();
            if now < next_deadline {
                thread::sleep(next_deadline - now);
            }

            let reply_timeout = Duration::from_secs_f64(shared.settings.reply_timeout);
            match self.session.ping(target, false, reply_timeout) {
                Ok(_) => {}
                Err(e) if e.is_port_closed() => return Err(e),
                Err(e) => warn!("ranging_cycler: ping to {target} failed: {e}"),
            }

            let jitter = if shared.settings.randomize > 0.0 {
                rng.gen_range(0.0..shared.settings.randomize)
            } else {
                0.0
            };
            next_deadline =
                Instant::now() + Duration::from_secs_f64(shared.settings.range_rate + jitter);
        }
    }
}
