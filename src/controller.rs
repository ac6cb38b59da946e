// src/controller.rs - Output controller: job, manual and pre-heat control
use std::sync::Arc;

use crate::channel::CommandChannel;
use crate::command::{self, Number};
use crate::config::CapabilitiesConfig;
use crate::error::ControlError;
use crate::job::JobController;
use crate::model::{Extruder, PrintJob, Printer};
use crate::preheat::{Clock, PreheatScheduler, PreheatValue};

/// Front door for everything a user interface can ask of a connected printer.
///
/// Disabled capabilities are refused with [`ControlError::Unsupported`]
/// before anything reaches the device.
pub struct OutputController {
    channel: Arc<dyn CommandChannel>,
    capabilities: CapabilitiesConfig,
    jobs: JobController,
    preheat: PreheatScheduler,
}

impl OutputController {
    pub fn new(
        channel: Arc<dyn CommandChannel>,
        clock: Arc<dyn Clock>,
        capabilities: CapabilitiesConfig,
    ) -> Self {
        Self {
            jobs: JobController::new(channel.clone()),
            preheat: PreheatScheduler::new(channel.clone(), clock),
            channel,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> &CapabilitiesConfig {
        &self.capabilities
    }

    pub fn scheduler(&self) -> &PreheatScheduler {
        &self.preheat
    }

    pub fn scheduler_mut(&mut self) -> &mut PreheatScheduler {
        &mut self.preheat
    }

    pub fn set_job_state(&self, job: &dyn PrintJob, requested: &str) -> Result<(), ControlError> {
        match requested {
            "pause" | "print" => self.require(self.capabilities.can_pause, "pausing")?,
            "abort" => self.require(self.capabilities.can_abort, "aborting")?,
            _ => {}
        }
        self.jobs.set_job_state(job, requested)
    }

    pub fn set_target_bed_temperature(
        &self,
        printer: &dyn Printer,
        temperature: impl Into<Number>,
    ) -> Result<(), ControlError> {
        self.manual()?;
        let batch = command::set_bed_temperature(temperature);
        tracing::info!("Setting bed target of {}: {}", printer.id(), batch);
        self.channel.send(batch);
        Ok(())
    }

    pub fn set_target_hotend_temperature(
        &self,
        printer: &dyn Printer,
        position: usize,
        temperature: impl Into<Number>,
    ) -> Result<(), ControlError> {
        self.manual()?;
        let batch = command::set_hotend_temperature(position, temperature);
        tracing::info!("Setting hotend target of {}: {}", printer.id(), batch);
        self.channel.send(batch);
        Ok(())
    }

    /// Relative move of the head, sent as one batch.
    pub fn move_head(
        &self,
        printer: &dyn Printer,
        x: impl Into<Number>,
        y: impl Into<Number>,
        z: impl Into<Number>,
        speed: impl Into<Number>,
    ) -> Result<(), ControlError> {
        self.manual()?;
        let batch = command::relative_move(x.into(), y.into(), z.into(), speed.into());
        tracing::info!("Moving head of {}: {}", printer.id(), batch);
        self.channel.send(batch);
        Ok(())
    }

    pub fn home_bed(&self, printer: &dyn Printer) -> Result<(), ControlError> {
        self.manual()?;
        tracing::info!("Homing bed of {}", printer.id());
        self.channel.send(command::home_bed());
        Ok(())
    }

    pub fn home_head(&self, printer: &dyn Printer) -> Result<(), ControlError> {
        self.manual()?;
        tracing::info!("Homing head of {}", printer.id());
        self.channel.send(command::home_head());
        Ok(())
    }

    pub fn preheat_bed(
        &mut self,
        printer: Arc<dyn Printer>,
        temperature: impl Into<PreheatValue>,
        duration: impl Into<PreheatValue>,
    ) -> Result<(), ControlError> {
        self.require(self.capabilities.can_pre_heat_bed, "bed pre-heating")?;
        self.preheat.preheat_bed(printer, temperature, duration)
    }

    pub fn cancel_preheat_bed(&mut self, printer: Arc<dyn Printer>) -> Result<(), ControlError> {
        self.require(self.capabilities.can_pre_heat_bed, "bed pre-heating")?;
        self.preheat.cancel_preheat_bed(printer)
    }

    pub fn preheat_hotend(
        &mut self,
        extruder: Arc<dyn Extruder>,
        temperature: impl Into<PreheatValue>,
        duration: impl Into<PreheatValue>,
    ) -> Result<(), ControlError> {
        self.require(self.capabilities.can_pre_heat_hotends, "hotend pre-heating")?;
        self.preheat.preheat_hotend(extruder, temperature, duration)
    }

    pub fn cancel_preheat_hotend(
        &mut self,
        extruder: Arc<dyn Extruder>,
    ) -> Result<(), ControlError> {
        self.require(self.capabilities.can_pre_heat_hotends, "hotend pre-heating")?;
        self.preheat.cancel_preheat_hotend(extruder)
    }

    /// Run due pre-heat expiries.
    pub fn fire_expired(&mut self) -> usize {
        self.preheat.fire_expired()
    }

    fn manual(&self) -> Result<(), ControlError> {
        self.require(self.capabilities.can_control_manually, "manual control")
    }

    fn require(&self, enabled: bool, what: &'static str) -> Result<(), ControlError> {
        if enabled {
            Ok(())
        } else {
            tracing::debug!("Refusing request: {} is disabled", what);
            Err(ControlError::Unsupported(what))
        }
    }
}
