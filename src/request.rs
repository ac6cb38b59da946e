// src/request.rs - Line-delimited JSON control requests
//! Defines the control requests accepted by the service, one JSON object per
//! line, e.g. `{"op": "preheat_bed", "temperature": 60, "duration": 600}`.

use std::io::BufRead;
use std::thread::{self, JoinHandle};

use serde::Deserialize;
use tokio::sync::mpsc;

use crate::command::Number;
use crate::preheat::PreheatValue;

/// A request sent to the control service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Pause, resume or abort the current job (`pause`, `print`, `abort`).
    SetJobState { state: String },
    SetBedTemperature { temperature: Number },
    SetHotendTemperature { extruder: usize, temperature: Number },
    /// Relative head move.
    MoveHead {
        #[serde(default)]
        x: Number,
        #[serde(default)]
        y: Number,
        #[serde(default)]
        z: Number,
        speed: Number,
    },
    HomeBed,
    HomeHead,
    /// Missing values fall back to the configured pre-heat defaults.
    PreheatBed {
        #[serde(default)]
        temperature: Option<PreheatValue>,
        #[serde(default)]
        duration: Option<PreheatValue>,
    },
    CancelPreheatBed,
    PreheatHotend {
        extruder: usize,
        #[serde(default)]
        temperature: Option<PreheatValue>,
        #[serde(default)]
        duration: Option<PreheatValue>,
    },
    CancelPreheatHotend { extruder: usize },
    /// Report the current state on the status output.
    Status,
}

impl ControlRequest {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Read requests from `reader` on a dedicated thread and forward them to `tx`.
///
/// Blank lines are skipped and unparsable ones logged. The thread ends at end
/// of input, on a read error, or once the receiving side is gone. The host
/// does not join it, so a reader stuck in a blocking read does not keep the
/// process alive.
pub fn spawn_request_reader<R>(reader: R, tx: mpsc::Sender<ControlRequest>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Failed to read request: {}", e);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match ControlRequest::parse(line) {
                Ok(request) => {
                    if tx.blocking_send(request).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("Invalid request {:?}: {}", line, e),
            }
        }
        tracing::debug!("Request reader finished");
    })
}
