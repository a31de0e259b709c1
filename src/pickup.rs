//! Pickup Scheduler: arms a courier timer on every `Shelved` event, publishes `Pickup` when it
//! fires, and cancels on `Expired`. Pause/resume is driven by `userRequest` events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use rand::rng;
use rand_distr::{Distribution, Uniform};
use uuid::Uuid;

use crate::bus::EventBus;
use crate::config::Config;
use crate::diag::diag;
use crate::event::{Event, PickupEvent, Severity, Topic, UserRequest};

const SERVICE_NAME: &str = "PickupScheduler";

/// A handle the scheduler uses to cancel a timer that hasn't fired its `Pickup` yet. Cancelling a
/// timer that already fired but hasn't published is best-effort: the flag is checked right before
/// publication, but the check-then-publish isn't atomic with the Shelf Manager's own handling, so
/// a late `Pickup` can still race an `Expired`.
struct Scheduled {
    cancelled: Arc<AtomicBool>,
}

pub fn run(bus: Arc<EventBus>, config: &Config, stop: Receiver<()>) {
    let sub = bus.subscribe(&[Topic::Shelved, Topic::Expired, Topic::UserRequest]);
    let scheduled: Arc<Mutex<HashMap<Uuid, Scheduled>>> = Arc::new(Mutex::new(HashMap::new()));
    let paused = Arc::new(AtomicBool::new(false));
    let delay_range = Uniform::new_inclusive(config.pickup_delay_min, config.pickup_delay_max)
        .expect("valid pickup delay range");

    diag(&bus, SERVICE_NAME, Severity::Info, "service started");

    loop {
        crossbeam_channel::select! {
            recv(sub.receiver()) -> msg => {
                let Ok(event) = msg else { break };
                match event {
                    Event::Shelved(e) => {
                        let delay = delay_range.sample(&mut rng());
                        let cancelled = Arc::new(AtomicBool::new(false));
                        scheduled.lock().unwrap().insert(
                            e.order.id,
                            Scheduled { cancelled: cancelled.clone() },
                        );
                        spawn_timer(
                            bus.clone(),
                            scheduled.clone(),
                            paused.clone(),
                            cancelled,
                            e.order,
                            e.when,
                            delay,
                            delay_range.clone(),
                        );
                    }
                    Event::Expired(e) => {
                        if let Some(entry) = scheduled.lock().unwrap().remove(&e.order.id) {
                            entry.cancelled.store(true, Ordering::SeqCst);
                        }
                    }
                    Event::UserRequest(e) => match e.request {
                        UserRequest::PausePickup => paused.store(true, Ordering::SeqCst),
                        UserRequest::ResumePickup => paused.store(false, Ordering::SeqCst),
                        _ => {}
                    },
                    _ => {}
                }
            }
            recv(stop) -> _ => break,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_timer(
    bus: Arc<EventBus>,
    scheduled: Arc<Mutex<HashMap<Uuid, Scheduled>>>,
    paused: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    order: crate::event::Order,
    when: Instant,
    delay_secs: f64,
    delay_range: Uniform<f64>,
) {
    thread::spawn(move || {
        thread::sleep(Duration::from_secs_f64(delay_secs));

        // Hold the fired timer while paused, redrawing a further delay each cycle.
        while paused.load(Ordering::SeqCst) {
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            let extra = delay_range.sample(&mut rng());
            thread::sleep(Duration::from_secs_f64(extra));
        }

        if cancelled.load(Ordering::SeqCst) {
            return;
        }

        scheduled.lock().unwrap().remove(&order.id);
        bus.publish(Event::Pickup(PickupEvent { when, order }));
    });
}
