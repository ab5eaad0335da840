//! # Simple stdout subscriber for demos.
//!
//! [`LogWriter`] echoes every journal line to stdout and adds bracketed notes for
//! runtime events that have no journal line.
//!
//! ## Output format
//! ```text
//! - (A) (Mobile) Arrived
//! - Connection 1: A Occupied
//! [admission-timed-out] device=B timeout_ms=500
//! [sink-failed] op=append err=disk full
//! [shutdown-requested]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Stdout printer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        if let Some(line) = e.log_line() {
            println!("{line}");
            return;
        }
        let device = e.device.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::AdmissionCancelled => {
                println!("[admission-cancelled] device={device} reason={reason}");
            }
            EventKind::AdmissionTimedOut => {
                println!(
                    "[admission-timed-out] device={device} timeout_ms={}",
                    e.timeout_ms.unwrap_or_default()
                );
            }
            EventKind::WorkerFailed => {
                println!("[worker-failed] device={device} reason={reason}");
            }
            EventKind::SinkFailed => println!("[sink-failed] {reason}"),
            EventKind::SubscriberOverflow => println!("[subscriber-overflow] {reason}"),
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={device} info={reason}");
            }
            EventKind::ShutdownRequested => println!("[shutdown-requested]"),
            EventKind::AllStoppedWithin => println!("[all-stopped-within-grace]"),
            EventKind::GraceExceeded => println!("[grace-exceeded]"),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
