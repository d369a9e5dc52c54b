/*!
 * Progress/event channel shared between a translation task and its
 * external observer.
 *
 * Events are appended by many concurrent producers and drained by a
 * single consumer in emission order. Delivery is destructive: each
 * event is observed at most once. A consumer that waits longer than
 * `HEARTBEAT_TIMEOUT` without a new event receives a synthesized
 * `Heartbeat` so transport-level silence is never mistaken for a
 * disconnect. Heartbeats carry no payload and are never terminal.
 */

use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// How long the consumer waits on an empty channel before synthesizing
/// a heartbeat.
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(120);

/// Maximum characters of source/translated text echoed into log lines
pub const LOG_TEXT_PREVIEW: usize = 200;

/// Severity tag carried by log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLogLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl EventLogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// A single entry on a task's event channel
#[derive(Debug, Clone)]
pub enum Event {
    /// Free-form log line for the observer
    Log {
        message: String,
        level: EventLogLevel,
    },

    /// Progress snapshot; percentages are monotonically non-decreasing
    Progress {
        current: usize,
        total: usize,
        percentage: u8,
        message: String,
        input_tokens: u64,
        output_tokens: u64,
        estimated_cost: f64,
        elapsed_secs: f64,
        estimated_remaining_secs: f64,
    },

    /// Terminal: the task finished and produced an output artifact
    Completed { output_file: String },

    /// Terminal: the task failed fatally
    Error { error: String },

    /// Terminal: the task was cancelled by an external request
    Cancelled,

    /// Keep-alive with no payload; never terminal
    Heartbeat,
}

impl Event {
    /// Convenience constructor for log events
    pub fn log(level: EventLogLevel, message: impl Into<String>) -> Self {
        Self::Log { message: message.into(), level }
    }

    /// Whether this event ends the task's stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. } | Self::Cancelled)
    }

    /// JSON payload in the wire format the streaming endpoint emits.
    /// Heartbeats have no payload and return `None`.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Log { message, level } => Some(json!({
                "type": "log",
                "message": message,
                "log_type": level.as_str(),
            })),
            Self::Progress {
                current,
                total,
                percentage,
                message,
                input_tokens,
                output_tokens,
                estimated_cost,
                elapsed_secs,
                estimated_remaining_secs,
            } => Some(json!({
                "current": current,
                "total": total,
                "percentage": percentage,
                "message": message,
                "input_tokens": input_tokens,
                "output_tokens": output_tokens,
                "estimated_cost": (estimated_cost * 10_000.0).round() / 10_000.0,
                "elapsed_time": (elapsed_secs * 10.0).round() / 10.0,
                "estimated_remaining": (estimated_remaining_secs * 10.0).round() / 10.0,
            })),
            Self::Completed { output_file } => Some(json!({
                "status": "completed",
                "output_file": output_file,
            })),
            Self::Error { error } => Some(json!({
                "status": "error",
                "error": error,
            })),
            Self::Cancelled => Some(json!({ "status": "cancelled" })),
            Self::Heartbeat => None,
        }
    }

    /// Encode as one server-push stream frame. Data events become
    /// `data: <json>\n\n`; heartbeats become the comment frame
    /// `: heartbeat\n\n` that parsers must ignore.
    pub fn to_sse_frame(&self) -> String {
        match self.to_json() {
            Some(value) => format!("data: {}\n\n", value),
            None => ": heartbeat\n\n".to_string(),
        }
    }
}

/// Truncate a text for inclusion in a log line
pub fn preview(text: &str) -> String {
    if text.chars().count() > LOG_TEXT_PREVIEW {
        let truncated: String = text.chars().take(LOG_TEXT_PREVIEW).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

/// Producer half of a task's channel, plus its cancellation flag.
///
/// Cheap to clone; every worker holds one. Emission through the sender
/// serializes interleaved producers without reordering any single
/// producer's own sequence.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    task_id: String,
    cancelled: Arc<AtomicBool>,
    sender: UnboundedSender<Event>,
}

impl TaskHandle {
    /// The task identifier this handle belongs to
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Emit an event. A disconnected consumer makes this a no-op: a
    /// task keeps running when nobody is watching.
    pub fn emit(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    /// Emit a log event
    pub fn log(&self, level: EventLogLevel, message: impl Into<String>) {
        self.emit(Event::log(level, message));
    }

    /// Snapshot of the cancellation flag. Checked at explicit
    /// checkpoints only; never raced into mid-operation decisions.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Request cancellation. Monotonic: false to true, at most once.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Shared cancellation flag, for registry bookkeeping
    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

/// Consumer half of a task's channel
#[derive(Debug)]
pub struct EventStream {
    receiver: UnboundedReceiver<Event>,
}

impl EventStream {
    /// Wait for the next event with the standard heartbeat timeout
    pub async fn next_event(&mut self) -> Option<Event> {
        self.next_event_timeout(HEARTBEAT_TIMEOUT).await
    }

    /// Wait for the next event, synthesizing a `Heartbeat` after the
    /// given idle period. Returns `None` once every producer handle is
    /// dropped and the buffer is drained.
    pub async fn next_event_timeout(&mut self, idle: Duration) -> Option<Event> {
        match tokio::time::timeout(idle, self.receiver.recv()).await {
            Ok(event) => event,
            Err(_) => Some(Event::Heartbeat),
        }
    }
}

/// Create a connected handle/stream pair for a task
pub fn channel(task_id: impl Into<String>) -> (TaskHandle, EventStream) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let handle = TaskHandle {
        task_id: task_id.into(),
        cancelled: Arc::new(AtomicBool::new(false)),
        sender,
    };
    (handle, EventStream { receiver })
}
