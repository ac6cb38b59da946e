// src/preheat/mod.rs - Bed and hotend pre-heat scheduling
//! Pre-heating sets a target temperature and arms a countdown. When the
//! countdown runs out the target drops back to zero and the pre-heating flag
//! is cleared.
//!
//! The bed has one timer and one target printer; a new request replaces the
//! old one. All hotends share a single timer: every request restarts it with
//! the newly requested duration, so the most recent request decides when every
//! armed hotend is switched off.
//!
//! Nothing here blocks or spawns. The owner of the scheduler calls
//! [`PreheatScheduler::fire_expired`] from the same task that issues requests,
//! using [`PreheatScheduler::next_deadline`] to know when to wake up.

pub mod timer;
pub mod value;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::channel::CommandChannel;
use crate::command;
use crate::error::ControlError;
use crate::model::{Extruder, ExtruderKey, Printer, PrinterId};

pub use timer::{Clock, MonotonicClock, SimClock, TimerQueue};
pub use value::PreheatValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreheatTimer {
    Bed,
    Hotends,
}

/// The printer whose bed was last pre-heated. Kept after expiry so the
/// last target stays inspectable; armed-ness lives in the timer queue.
#[derive(Default)]
pub struct BedPreheatState {
    target: Option<Arc<dyn Printer>>,
}

#[derive(Default)]
pub struct HotendPreheatState {
    armed: BTreeMap<ExtruderKey, Arc<dyn Extruder>>,
    last_printer: Option<Arc<dyn Printer>>,
}

pub struct PreheatScheduler {
    channel: Arc<dyn CommandChannel>,
    clock: Arc<dyn Clock>,
    timers: TimerQueue<PreheatTimer>,
    bed: BedPreheatState,
    hotends: HotendPreheatState,
}

impl PreheatScheduler {
    pub fn new(channel: Arc<dyn CommandChannel>, clock: Arc<dyn Clock>) -> Self {
        Self {
            channel,
            clock,
            timers: TimerQueue::new(),
            bed: BedPreheatState::default(),
            hotends: HotendPreheatState::default(),
        }
    }

    /// Heat the bed to `temperature` and switch it off after `duration`
    /// seconds. Replaces any pending bed pre-heat.
    pub fn preheat_bed(
        &mut self,
        printer: Arc<dyn Printer>,
        temperature: impl Into<PreheatValue>,
        duration: impl Into<PreheatValue>,
    ) -> Result<(), ControlError> {
        let (temperature, duration) = whole_pair(temperature.into(), duration.into())?;

        self.channel.send(command::set_bed_temperature(temperature));
        self.timers.start(
            PreheatTimer::Bed,
            self.clock.now(),
            Duration::from_secs(duration.into()),
        );
        printer.update_is_preheating(true);
        tracing::info!(
            "Pre-heating bed of {} to {} for {}s",
            printer.id(),
            temperature,
            duration
        );
        self.bed.target = Some(printer);
        Ok(())
    }

    /// Force the bed target to zero and disarm the bed timer.
    pub fn cancel_preheat_bed(&mut self, printer: Arc<dyn Printer>) -> Result<(), ControlError> {
        self.preheat_bed(printer.clone(), 0, 0)?;
        self.timers.stop(PreheatTimer::Bed);
        printer.update_is_preheating(false);
        tracing::info!("Cancelled bed pre-heat of {}", printer.id());
        Ok(())
    }

    /// Heat one hotend and (re)start the shared hotend timer with `duration`.
    pub fn preheat_hotend(
        &mut self,
        extruder: Arc<dyn Extruder>,
        temperature: impl Into<PreheatValue>,
        duration: impl Into<PreheatValue>,
    ) -> Result<(), ControlError> {
        let printer = extruder.printer();
        let position = extruder.position();
        let extruder_count = printer.extruder_count();
        if position >= extruder_count {
            tracing::debug!(
                "Ignoring pre-heat for extruder {} on {}: only {} extruders",
                position,
                printer.id(),
                extruder_count
            );
            return Err(ControlError::StaleExtruder {
                position,
                extruder_count,
            });
        }
        let (temperature, duration) = whole_pair(temperature.into(), duration.into())?;

        self.channel
            .send(command::set_hotend_temperature(position, temperature));
        self.timers.start(
            PreheatTimer::Hotends,
            self.clock.now(),
            Duration::from_secs(duration.into()),
        );
        self.hotends.armed.insert(extruder.key(), extruder.clone());
        extruder.update_is_preheating(true);
        tracing::info!(
            "Pre-heating hotend {} of {} to {} for {}s ({} armed)",
            position,
            printer.id(),
            temperature,
            duration,
            self.hotends.armed.len()
        );
        self.hotends.last_printer = Some(printer);
        Ok(())
    }

    /// Force one hotend to zero and stop the shared hotend timer.
    ///
    /// Stopping the shared timer also drops the pending switch-off of every
    /// other armed hotend; they stay armed until the next hotend pre-heat
    /// restarts the timer.
    pub fn cancel_preheat_hotend(
        &mut self,
        extruder: Arc<dyn Extruder>,
    ) -> Result<(), ControlError> {
        if let Err(e) = self.preheat_hotend(extruder.clone(), 0, 0) {
            tracing::debug!("Cancelling hotend pre-heat without switch-off: {}", e);
        }
        self.timers.stop(PreheatTimer::Hotends);
        self.hotends.armed.remove(&extruder.key());
        extruder.update_is_preheating(false);
        tracing::info!("Cancelled hotend {} pre-heat", extruder.position());
        Ok(())
    }

    /// Run every expiry that is due. Returns how many timers fired.
    pub fn fire_expired(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some(timer) = self.timers.pop_expired(now) {
            match timer {
                PreheatTimer::Bed => self.on_bed_expired(),
                PreheatTimer::Hotends => self.on_hotends_expired(),
            }
            fired += 1;
        }
        fired
    }

    /// When the next armed timer is due, on the scheduler's clock.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Time left until the next expiry, zero if one is already due.
    pub fn time_until_next(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.next_deadline()
            .map(|deadline| deadline.saturating_sub(now))
    }

    pub fn is_bed_armed(&self) -> bool {
        self.timers.is_armed(PreheatTimer::Bed)
    }

    pub fn bed_target(&self) -> Option<PrinterId> {
        self.bed.target.as_ref().map(|printer| printer.id())
    }

    pub fn is_hotend_timer_armed(&self) -> bool {
        self.timers.is_armed(PreheatTimer::Hotends)
    }

    pub fn armed_hotends(&self) -> Vec<ExtruderKey> {
        self.hotends.armed.keys().copied().collect()
    }

    pub fn deadline(&self, timer: PreheatTimer) -> Option<Duration> {
        self.timers.deadline(timer)
    }

    fn on_bed_expired(&mut self) {
        let Some(printer) = self.bed.target.clone() else {
            return;
        };
        self.channel.send(command::set_bed_temperature(0));
        printer.update_is_preheating(false);
        tracing::info!("Bed pre-heat of {} expired", printer.id());
    }

    fn on_hotends_expired(&mut self) {
        let armed = std::mem::take(&mut self.hotends.armed);
        for extruder in armed.values() {
            self.channel
                .send(command::set_hotend_temperature(extruder.position(), 0));
        }
        // Only the printer of the most recent request is told; extruder
        // flags are left as they are.
        if let Some(printer) = &self.hotends.last_printer {
            printer.update_is_preheating(false);
        }
        tracing::info!("Hotend pre-heat expired for {} extruders", armed.len());
    }
}

fn whole_pair(
    temperature: PreheatValue,
    duration: PreheatValue,
) -> Result<(u32, u32), ControlError> {
    let result = temperature
        .require_whole("temperature")
        .and_then(|t| duration.require_whole("duration").map(|d| (t, d)));
    if let Err(e) = &result {
        tracing::debug!("Ignoring pre-heat request: {}", e);
    }
    result
}
