// src/job.rs - Job state transitions
use std::str::FromStr;
use std::sync::Arc;

use crate::channel::CommandChannel;
use crate::error::ControlError;
use crate::model::{JobState, PrintJob};

/// A job transition requested by the user interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStateRequest {
    Pause,
    Print,
    Abort,
}

impl FromStr for JobStateRequest {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pause" => Ok(JobStateRequest::Pause),
            "print" => Ok(JobStateRequest::Print),
            "abort" => Ok(JobStateRequest::Abort),
            other => Err(ControlError::UnknownJobState(other.to_string())),
        }
    }
}

pub struct JobController {
    channel: Arc<dyn CommandChannel>,
}

impl JobController {
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self { channel }
    }

    /// Map a requested state name to a device call and a local status update.
    ///
    /// Unknown names are dropped without touching the device or the job.
    pub fn set_job_state(&self, job: &dyn PrintJob, requested: &str) -> Result<(), ControlError> {
        let request = requested.parse::<JobStateRequest>().inspect_err(|e| {
            tracing::debug!("Ignoring job state request: {}", e);
        })?;
        self.apply(job, request);
        Ok(())
    }

    pub fn apply(&self, job: &dyn PrintJob, request: JobStateRequest) {
        match request {
            JobStateRequest::Pause => {
                self.channel.pause_print();
                job.update_state(JobState::Paused);
            }
            JobStateRequest::Print => {
                self.channel.resume_print();
                job.update_state(JobState::Printing);
            }
            // The device reports the aborted state itself.
            JobStateRequest::Abort => self.channel.cancel_print(),
        }
        tracing::info!("Job request {:?} dispatched", request);
    }
}
