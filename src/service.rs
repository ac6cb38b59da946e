// src/service.rs - Control loop for a single printer
//! Owns the [`OutputController`] and the entities it acts on, and is the
//! only task that touches them. Requests and pre-heat expiries are handled
//! one at a time on that task.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::channel::CommandChannel;
use crate::config::{Config, PreheatConfig, PrinterConfig};
use crate::controller::OutputController;
use crate::error::ControlError;
use crate::model::{Extruder, ExtruderModel, JobModel, JobState, Printer, PrinterModel};
use crate::preheat::{Clock, PreheatTimer, PreheatValue};
use crate::request::ControlRequest;

/// The printer, its extruders and the current job.
#[derive(Debug)]
pub struct Workspace {
    pub printer: Arc<PrinterModel>,
    pub extruders: Vec<Arc<ExtruderModel>>,
    pub job: Arc<JobModel>,
}

impl Workspace {
    pub fn new(config: &PrinterConfig) -> Self {
        let (printer, extruders) = PrinterModel::with_extruders(&config.name, config.extruders);
        Self {
            printer,
            extruders,
            job: Arc::new(JobModel::new()),
        }
    }

    /// Handle for the extruder at `position`. Unknown positions get a fresh
    /// handle so the controller can reject it.
    pub fn extruder(&self, position: usize) -> Arc<ExtruderModel> {
        self.extruders
            .get(position)
            .cloned()
            .unwrap_or_else(|| ExtruderModel::new(self.printer.clone(), position))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotendStatus {
    pub position: usize,
    pub preheating: bool,
    pub armed: bool,
}

/// Snapshot reported for a `status` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlStatus {
    pub printer: String,
    pub job_state: JobState,
    pub bed_preheating: bool,
    pub bed_timer_remaining_secs: Option<f64>,
    pub hotends: Vec<HotendStatus>,
    pub hotend_timer_remaining_secs: Option<f64>,
}

pub struct ControlService {
    controller: OutputController,
    workspace: Workspace,
    clock: Arc<dyn Clock>,
    defaults: PreheatConfig,
}

impl ControlService {
    pub fn new(config: &Config, channel: Arc<dyn CommandChannel>, clock: Arc<dyn Clock>) -> Self {
        Self {
            controller: OutputController::new(channel, clock.clone(), config.capabilities.clone()),
            workspace: Workspace::new(&config.printer),
            clock,
            defaults: config.preheat.clone(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn controller(&self) -> &OutputController {
        &self.controller
    }

    /// Apply one request. `status` requests return a snapshot.
    pub fn handle(
        &mut self,
        request: ControlRequest,
    ) -> Result<Option<ControlStatus>, ControlError> {
        tracing::debug!("Handling {:?}", request);
        let printer = self.workspace.printer.clone();
        match request {
            ControlRequest::SetJobState { state } => {
                self.controller
                    .set_job_state(&*self.workspace.job, &state)?;
            }
            ControlRequest::SetBedTemperature { temperature } => {
                self.controller
                    .set_target_bed_temperature(&*printer, temperature)?;
            }
            ControlRequest::SetHotendTemperature {
                extruder,
                temperature,
            } => {
                self.controller
                    .set_target_hotend_temperature(&*printer, extruder, temperature)?;
            }
            ControlRequest::MoveHead { x, y, z, speed } => {
                self.controller.move_head(&*printer, x, y, z, speed)?;
            }
            ControlRequest::HomeBed => self.controller.home_bed(&*printer)?,
            ControlRequest::HomeHead => self.controller.home_head(&*printer)?,
            ControlRequest::PreheatBed {
                temperature,
                duration,
            } => {
                let temperature =
                    temperature.unwrap_or(PreheatValue::Float(self.defaults.bed_temperature));
                let duration = duration.unwrap_or(self.default_duration());
                self.controller.preheat_bed(printer, temperature, duration)?;
            }
            ControlRequest::CancelPreheatBed => self.controller.cancel_preheat_bed(printer)?,
            ControlRequest::PreheatHotend {
                extruder,
                temperature,
                duration,
            } => {
                let temperature =
                    temperature.unwrap_or(PreheatValue::Float(self.defaults.hotend_temperature));
                let duration = duration.unwrap_or(self.default_duration());
                let extruder = self.workspace.extruder(extruder);
                self.controller
                    .preheat_hotend(extruder, temperature, duration)?;
            }
            ControlRequest::CancelPreheatHotend { extruder } => {
                let extruder = self.workspace.extruder(extruder);
                self.controller.cancel_preheat_hotend(extruder)?;
            }
            ControlRequest::Status => return Ok(Some(self.status())),
        }
        Ok(None)
    }

    pub fn status(&self) -> ControlStatus {
        let scheduler = self.controller.scheduler();
        let now = self.clock.now();
        let remaining = |timer| {
            scheduler
                .deadline(timer)
                .map(|deadline: Duration| deadline.saturating_sub(now).as_secs_f64())
        };
        let armed = scheduler.armed_hotends();
        let printer_id = self.workspace.printer.id();
        let hotends = self
            .workspace
            .extruders
            .iter()
            .map(|extruder| {
                let position = extruder.position();
                HotendStatus {
                    position,
                    preheating: extruder.is_preheating(),
                    armed: armed
                        .iter()
                        .any(|key| key.printer == printer_id && key.position == position),
                }
            })
            .collect();

        ControlStatus {
            printer: self.workspace.printer.name.clone(),
            job_state: self.workspace.job.state(),
            bed_preheating: self.workspace.printer.is_preheating(),
            bed_timer_remaining_secs: remaining(PreheatTimer::Bed),
            hotends,
            hotend_timer_remaining_secs: remaining(PreheatTimer::Hotends),
        }
    }

    pub fn fire_expired(&mut self) -> usize {
        self.controller.fire_expired()
    }

    /// Serve requests until the request channel closes and no pre-heat timer
    /// is left armed. Status snapshots go to `status_tx`.
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<ControlRequest>,
        status_tx: mpsc::UnboundedSender<ControlStatus>,
    ) -> Self {
        let mut accepting = true;
        loop {
            self.fire_expired();
            let wait = self.controller.scheduler().time_until_next();
            if !accepting && wait.is_none() {
                break;
            }
            tokio::select! {
                request = requests.recv(), if accepting => match request {
                    Some(request) => match self.handle(request) {
                        Ok(Some(status)) => {
                            let _ = status_tx.send(status);
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!("Request dropped: {}", e),
                    },
                    None => {
                        tracing::info!("Request channel closed");
                        accepting = false;
                    }
                },
                _ = sleep_for(wait) => {}
            }
        }
        tracing::info!("Control loop stopped");
        self
    }

    fn default_duration(&self) -> PreheatValue {
        PreheatValue::from(self.defaults.duration_secs)
    }
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}
