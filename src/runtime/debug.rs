//! Diagnostic tasks: `debug_report` (reader) and `debug_timer` (writer),
//! spec §4.5.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Local;
use log::{info, warn};

use crate::error::Result;
use crate::session::ModemSession;
use crate::transport::Transport;

use super::{NodeShared, Task};

pub struct DebugReport<T: Transport> {
    session: ModemSession<T>,
}

impl<T: Transport> DebugReport<T> {
    pub fn new(session: ModemSession<T>) -> Self {
        Self { session }
    }
}

impl<T: Transport> Task for DebugReport<T> {
    fn name(&self) -> &'static str {
        "debug_report"
    }

    fn run(mut self: Box<Self>, shared: Arc<NodeShared>) -> Result<()> {
        let poll_timeout = Duration::from_secs_f64(shared.settings.repeat_rate.max(0.05));
        loop {
            match self.session.read_next(poll_timeout) {
                Ok(Some(resp)) => info!("debug_report: {resp:?}"),
                Ok(None) => {}
                Err(e) if e.is_port_closed() => return Err(e),
                Err(e) => warn!("debug_report: read error: {e}"),
            }
        }
    }
}

pub struct DebugTimer<T: Transport> {
    session: ModemSession<T>,
    period_s: f64,
    target: Option<u16>,
}

impl<T: Transport> DebugTimer<T> {
    pub fn new(session: ModemSession<T>, period_s: f64, target: Option<u16>) -> Self {
        Self {
            session,
            period_s,
            target,
        }
    }
}

impl<T: Transport> Task for DebugTimer<T> {
    fn name(&self) -> &'static str {
        "debug_timer"
    }

    fn run(mut self: Box<Self>, _shared: Arc<NodeShared>) -> Result<()> {
        loop {
            let message = Local::now().format("%H:%M:%S").to_string();

            let result = match self.target {
                Some(target) => self.session.unicast(message, target),
                None => self.session.broadcast(message),
            };
            match result {
                Ok(()) => {}
                Err(e) if e.is_port_closed() => return Err(e),
                Err(e) => warn!("debug_timer: emit failed: {e}"),
            }

            thread::sleep(Duration::from_secs_f64(self.period_s.max(0.0)));
        }
    }
}
