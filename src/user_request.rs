//! User Request Adapter: reads newline-delimited commands from stdin and republishes recognized
//! ones as typed `UserRequest` events.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;

use crate::bus::EventBus;
use crate::diag::diag;
use crate::event::{Event, Severity, UserRequestEvent};

const SERVICE_NAME: &str = "UserRequestAdapter";

/// Runs the stdin-reading loop on a dedicated thread since `BufRead::lines()` has no cancellable
/// read; the thread is left to exit naturally at EOF rather than joined on `stop`.
pub fn run(bus: Arc<EventBus>, stop: Receiver<()>) {
    diag(&bus, SERVICE_NAME, Severity::Info, "service started");

    let reader_bus = bus.clone();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Some(request) = crate::event::UserRequest::parse(&line) {
                reader_bus.publish(Event::UserRequest(UserRequestEvent {
                    when: std::time::Instant::now(),
                    request,
                }));
            } else if !line.trim().is_empty() {
                diag(
                    &reader_bus,
                    SERVICE_NAME,
                    Severity::Warn,
                    format!("unrecognized user request: {line:?}"),
                );
            }
        }
    });

    let _ = stop.recv();
}
