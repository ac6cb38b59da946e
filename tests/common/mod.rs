// Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use printer_control::channel::RecordingChannel;
use printer_control::model::{ExtruderModel, PrinterModel};
use printer_control::preheat::{PreheatScheduler, SimClock};

pub struct Rig {
    pub channel: Arc<RecordingChannel>,
    pub clock: Arc<SimClock>,
    pub scheduler: PreheatScheduler,
    pub printer: Arc<PrinterModel>,
    pub extruders: Vec<Arc<ExtruderModel>>,
}

impl Rig {
    pub fn new(extruder_count: usize) -> Self {
        let channel = Arc::new(RecordingChannel::new());
        let clock = Arc::new(SimClock::new());
        let scheduler = PreheatScheduler::new(channel.clone(), clock.clone());
        let (printer, extruders) = PrinterModel::with_extruders("test printer", extruder_count);
        Self {
            channel,
            clock,
            scheduler,
            printer,
            extruders,
        }
    }

    /// Move simulated time forward and run whatever fell due.
    pub fn advance(&mut self, secs: u64) -> usize {
        self.clock.advance(Duration::from_secs(secs));
        self.scheduler.fire_expired()
    }
}
