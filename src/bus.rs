//! Topic-based publish/subscribe fabric. The sole shared object between tasks: shelf state and
//! residency state are never shared directly, only events crossing the bus.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::event::{DiagEvent, Event, Severity, Topic};

/// A subscriber's handle onto the bus: a bounded FIFO receiver fed by every `publish` call on any
/// of the topics it subscribed to.
pub struct Subscription {
    rx: Receiver<Event>,
}

impl Subscription {
    pub fn recv(&self) -> Result<Event, crossbeam_channel::RecvError> {
        self.rx.recv()
    }

    pub fn receiver(&self) -> &Receiver<Event> {
        &self.rx
    }
}

pub struct EventBus {
    buffer_size: usize,
    subscribers: Mutex<HashMap<Topic, Vec<Sender<Event>>>>,
}

impl EventBus {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new subscriber for the given topics. Must be called before any `publish` the
    /// caller wants to observe — there's no backfill of past publications.
    pub fn subscribe(&self, topics: &[Topic]) -> Subscription {
        let (tx, rx) = bounded(self.buffer_size);
        let mut subs = self.subscribers.lock().unwrap();
        for topic in topics {
            subs.entry(*topic).or_default().push(tx.clone());
        }
        Subscription { rx }
    }

    /// Deliver `event` to every current subscriber of its topic. Non-blocking: a subscriber whose
    /// buffer is full has this message dropped, and a `Diag` is published describing the drop
    /// (unless the drop itself was on the `Diag` topic, to avoid unbounded recursion).
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        let senders = {
            let subs = self.subscribers.lock().unwrap();
            subs.get(&topic).cloned().unwrap_or_default()
        };

        let mut dropped = 0usize;
        for sender in &senders {
            if let Err(TrySendError::Full(_)) = sender.try_send(event.clone()) {
                dropped += 1;
            }
        }

        if dropped > 0 && topic != Topic::Diag {
            self.publish(Event::Diag(DiagEvent {
                when: Instant::now(),
                service_name: "EventBus",
                severity: Severity::Warn,
                message: format!(
                    "dropped publication on topic {topic:?} for {dropped} slow subscriber(s)"
                ),
                error: None,
            }));
        }
    }
}
