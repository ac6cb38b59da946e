// printer-control: pre-heat scheduling and command dispatch for a connected printer

pub mod channel;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod job;
pub mod model;
pub mod preheat;
pub mod request;
pub mod service;

pub use channel::{CommandChannel, QueuedChannel, RecordingChannel};
pub use controller::OutputController;
pub use error::ControlError;
pub use preheat::PreheatScheduler;
pub use service::ControlService;
