//! Shared helper for posting diagnostic messages onto the bus and into `tracing`, used by every
//! task.

use std::time::Instant;

use crate::bus::EventBus;
use crate::event::{DiagEvent, Event, Severity};

pub fn diag(bus: &EventBus, service_name: &'static str, severity: Severity, message: impl Into<String>) {
    diag_with_error(bus, service_name, severity, message, None)
}

pub fn diag_with_error(
    bus: &EventBus,
    service_name: &'static str,
    severity: Severity,
    message: impl Into<String>,
    error: Option<String>,
) {
    let message = message.into();
    match severity {
        Severity::Info => tracing::info!(service = service_name, %message, "diag"),
        Severity::Warn => tracing::warn!(service = service_name, %message, error = ?error, "diag"),
        Severity::Error => tracing::error!(service = service_name, %message, error = ?error, "diag"),
    }
    bus.publish(Event::Diag(DiagEvent {
        when: Instant::now(),
        service_name,
        severity,
        message,
        error,
    }));
}
