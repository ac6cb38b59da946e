// src/model.rs - Job, printer and extruder capabilities
//! The control layer never owns jobs, printers or extruders. It receives
//! `Arc<dyn …>` handles and only uses the accessors and mutators below.
//! The `*Model` types are plain in-memory implementations.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PrinterId(pub Uuid);

impl fmt::Display for PrinterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an extruder: its printer plus its index on that printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtruderKey {
    pub printer: PrinterId,
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Printing,
    Paused,
    Aborted,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Idle => "idle",
            JobState::Printing => "printing",
            JobState::Paused => "paused",
            JobState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

pub trait PrintJob: Send + Sync {
    fn update_state(&self, state: JobState);
}

pub trait Printer: Send + Sync {
    fn id(&self) -> PrinterId;
    /// Number of extruders the printer currently reports.
    fn extruder_count(&self) -> usize;
    fn update_is_preheating(&self, preheating: bool);
}

pub trait Extruder: Send + Sync {
    fn printer(&self) -> Arc<dyn Printer>;
    fn position(&self) -> usize;
    fn update_is_preheating(&self, preheating: bool);

    fn key(&self) -> ExtruderKey {
        ExtruderKey {
            printer: self.printer().id(),
            position: self.position(),
        }
    }
}

#[derive(Debug)]
pub struct JobModel {
    pub id: Uuid,
    state: RwLock<JobState>,
}

impl JobModel {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: RwLock::new(JobState::Idle),
        }
    }

    pub fn with_state(state: JobState) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: RwLock::new(state),
        }
    }

    pub fn state(&self) -> JobState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for JobModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PrintJob for JobModel {
    fn update_state(&self, state: JobState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

#[derive(Debug)]
pub struct PrinterModel {
    id: PrinterId,
    pub name: String,
    extruder_count: AtomicUsize,
    is_preheating: AtomicBool,
}

impl PrinterModel {
    pub fn new(name: impl Into<String>, extruder_count: usize) -> Arc<Self> {
        Arc::new(Self {
            id: PrinterId(Uuid::new_v4()),
            name: name.into(),
            extruder_count: AtomicUsize::new(extruder_count),
            is_preheating: AtomicBool::new(false),
        })
    }

    /// Build a printer together with one handle per extruder.
    pub fn with_extruders(
        name: impl Into<String>,
        extruder_count: usize,
    ) -> (Arc<Self>, Vec<Arc<ExtruderModel>>) {
        let printer = Self::new(name, extruder_count);
        let extruders = (0..extruder_count)
            .map(|position| ExtruderModel::new(printer.clone(), position))
            .collect();
        (printer, extruders)
    }

    /// Change the reported extruder count. Handles at or past the new count
    /// become stale.
    pub fn set_extruder_count(&self, count: usize) {
        self.extruder_count.store(count, Ordering::SeqCst);
    }

    pub fn is_preheating(&self) -> bool {
        self.is_preheating.load(Ordering::SeqCst)
    }
}

impl Printer for PrinterModel {
    fn id(&self) -> PrinterId {
        self.id
    }

    fn extruder_count(&self) -> usize {
        self.extruder_count.load(Ordering::SeqCst)
    }

    fn update_is_preheating(&self, preheating: bool) {
        self.is_preheating.store(preheating, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct ExtruderModel {
    printer: Arc<PrinterModel>,
    position: usize,
    is_preheating: AtomicBool,
}

impl ExtruderModel {
    pub fn new(printer: Arc<PrinterModel>, position: usize) -> Arc<Self> {
        Arc::new(Self {
            printer,
            position,
            is_preheating: AtomicBool::new(false),
        })
    }

    pub fn is_preheating(&self) -> bool {
        self.is_preheating.load(Ordering::SeqCst)
    }
}

impl Extruder for ExtruderModel {
    fn printer(&self) -> Arc<dyn Printer> {
        self.printer.clone()
    }

    fn position(&self) -> usize {
        self.position
    }

    fn update_is_preheating(&self, preheating: bool) {
        self.is_preheating.store(preheating, Ordering::SeqCst);
    }
}
