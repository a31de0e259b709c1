//! Order Source: loads orders from a JSON file and publishes `NewOrder` at exponentially
//! distributed intervals, cycling through the file's contents indefinitely.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use rand::rng;
use rand_distr::{Distribution, Exp};
use uuid::Uuid;

use crate::bus::EventBus;
use crate::config::Config;
use crate::diag::diag;
use crate::error::BootstrapError;
use crate::event::{Event, NewOrderEvent, OrderInput, Severity, Topic, UserRequest};

const SERVICE_NAME: &str = "OrderSource";

pub fn load_orders(path: &str) -> Result<Vec<OrderInput>, BootstrapError> {
    let raw = fs::read_to_string(path).map_err(|source| BootstrapError::Io {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| BootstrapError::Decode {
        path: path.to_string(),
        source,
    })
}

pub fn run(
    bus: Arc<EventBus>,
    config: &Config,
    orders: Vec<OrderInput>,
    paused: Arc<AtomicBool>,
    stop: Receiver<()>,
) {
    diag(&bus, SERVICE_NAME, Severity::Info, "service started");

    if orders.is_empty() {
        diag(
            &bus,
            SERVICE_NAME,
            Severity::Error,
            "orders file contained no entries; source is idle",
        );
        let _ = stop.recv();
        return;
    }

    let exp = Exp::new(config.arrival_rate).expect("positive arrival rate");
    let mut index = 0usize;

    loop {
        let wait = exp.sample(&mut rng());
        match stop.recv_timeout(Duration::from_secs_f64(wait)) {
            Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
        }

        if !paused.load(Ordering::SeqCst) {
            let order = orders[index % orders.len()].clone().into_order(Uuid::new_v4());
            bus.publish(Event::NewOrder(NewOrderEvent {
                when: Instant::now(),
                order,
            }));
        }
        index += 1;
    }
}

/// Watches `userRequest` for `pauseIncomingOrders`/`resumeIncomingOrders` and flips `paused`.
/// Run as a companion thread to [`run`] so the publish loop above never blocks on bus receipt.
pub fn run_pause_watcher(bus: Arc<EventBus>, paused: Arc<AtomicBool>, stop: Receiver<()>) {
    let sub = bus.subscribe(&[Topic::UserRequest]);
    loop {
        crossbeam_channel::select! {
            recv(sub.receiver()) -> msg => {
                match msg {
                    Ok(Event::UserRequest(e)) => match e.request {
                        UserRequest::PauseIncomingOrders => paused.store(true, Ordering::SeqCst),
                        UserRequest::ResumeIncomingOrders => paused.store(false, Ordering::SeqCst),
                        _ => {}
                    },
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
            recv(stop) -> _ => break,
        }
    }
}
