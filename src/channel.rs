// src/channel.rs - Command channel to the output device
//! The control layer hands commands to a [`CommandChannel`] and never looks
//! at the result. Delivery, framing and retries belong to the channel.

use std::sync::Mutex;

use serial2_tokio::SerialPort;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::command::{CommandBatch, JobAction};

/// An already-connected link to the device.
pub trait CommandChannel: Send + Sync {
    /// Deliver a batch of command lines without interleaving other traffic.
    fn send(&self, batch: CommandBatch);
    fn pause_print(&self);
    fn resume_print(&self);
    fn cancel_print(&self);
}

/// Unit of work for a channel writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    Commands(CommandBatch),
    Job(JobAction),
}

impl ChannelMessage {
    /// Lines to put on a serial link for this message.
    ///
    /// Job actions use the firmware's SD print control codes.
    pub fn wire_lines(&self) -> Vec<String> {
        match self {
            ChannelMessage::Commands(batch) => batch.lines().to_vec(),
            ChannelMessage::Job(JobAction::Pause) => vec!["M25".to_string()],
            ChannelMessage::Job(JobAction::Resume) => vec!["M24".to_string()],
            ChannelMessage::Job(JobAction::Cancel) => vec!["M524".to_string()],
        }
    }
}

/// Channel backed by an unbounded queue drained by a writer task.
#[derive(Debug, Clone)]
pub struct QueuedChannel {
    tx: mpsc::UnboundedSender<ChannelMessage>,
}

impl QueuedChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChannelMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, message: ChannelMessage) {
        if let Err(e) = self.tx.send(message) {
            tracing::warn!("Command channel closed, dropping {:?}", e.0);
        }
    }
}

impl CommandChannel for QueuedChannel {
    fn send(&self, batch: CommandBatch) {
        self.push(ChannelMessage::Commands(batch));
    }

    fn pause_print(&self) {
        self.push(ChannelMessage::Job(JobAction::Pause));
    }

    fn resume_print(&self) {
        self.push(ChannelMessage::Job(JobAction::Resume));
    }

    fn cancel_print(&self) {
        self.push(ChannelMessage::Job(JobAction::Cancel));
    }
}

/// Drain `rx` into a serial port, one newline-terminated line per command.
///
/// A failed write drops the rest of that message; there is no retry.
pub fn spawn_serial_writer(
    port: SerialPort,
    mut rx: mpsc::UnboundedReceiver<ChannelMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            for line in message.wire_lines() {
                tracing::debug!("Serial TX: {}", line);
                let framed = format!("{}\n", line);
                if let Err(e) = port.write_all(framed.as_bytes()).await {
                    tracing::error!("Serial write error: {}", e);
                    break;
                }
            }
        }
        tracing::info!("Serial writer shutting down");
    })
}

/// Drain `rx` into the log. Used for dry runs without a device.
pub fn spawn_log_writer(mut rx: mpsc::UnboundedReceiver<ChannelMessage>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            for line in message.wire_lines() {
                tracing::info!("TX: {}", line);
            }
        }
    })
}

/// Keeps every message in order. Handy for tests and for inspecting what a
/// sequence of operations would send.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    messages: Mutex<Vec<ChannelMessage>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<ChannelMessage> {
        self.lock().clone()
    }

    /// Every command line sent so far, flattened across batches.
    pub fn lines(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|m| match m {
                ChannelMessage::Commands(batch) => Some(batch.lines().to_vec()),
                ChannelMessage::Job(_) => None,
            })
            .flatten()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ChannelMessage>> {
        // A poisoned recorder still holds valid data.
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, message: ChannelMessage) {
        self.lock().push(message);
    }
}

impl CommandChannel for RecordingChannel {
    fn send(&self, batch: CommandBatch) {
        self.record(ChannelMessage::Commands(batch));
    }

    fn pause_print(&self) {
        self.record(ChannelMessage::Job(JobAction::Pause));
    }

    fn resume_print(&self) {
        self.record(ChannelMessage::Job(JobAction::Resume));
    }

    fn cancel_print(&self) {
        self.record(ChannelMessage::Job(JobAction::Cancel));
    }
}
