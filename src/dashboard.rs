//! Dashboard: a thin, replaceable subscriber that renders a running text summary. The core
//! subsystems have no dependency on it; the bus behaves identically with zero dashboard
//! subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::event::{Event, ShelfId, Topic};

const SERVICE_NAME: &str = "Dashboard";

pub fn run(bus: Arc<EventBus>, stop: Receiver<()>) {
    let sub = bus.subscribe(&[
        Topic::Shelved,
        Topic::Reshelved,
        Topic::Pickup,
        Topic::Expired,
        Topic::Waste,
        Topic::Value,
        Topic::Diag,
    ]);

    let mut occupancy: HashMap<Uuid, ShelfId> = HashMap::new();

    loop {
        crossbeam_channel::select! {
            recv(sub.receiver()) -> msg => {
                let Ok(event) = msg else { break };
                handle(&mut occupancy, event);
            }
            recv(stop) -> _ => break,
        }
    }
}

fn handle(occupancy: &mut HashMap<Uuid, ShelfId>, event: Event) {
    match event {
        Event::Shelved(e) => {
            occupancy.insert(e.order.id, e.shelf);
            tracing::info!(target: SERVICE_NAME, order = %e.order.id, shelf = %e.shelf, "shelved");
        }
        Event::Reshelved(e) => {
            tracing::info!(target: SERVICE_NAME, order = %e.order_id, "reshelved");
        }
        Event::Pickup(e) => {
            occupancy.remove(&e.order.id);
            tracing::info!(target: SERVICE_NAME, order = %e.order.id, "picked up");
        }
        Event::Expired(e) => {
            occupancy.remove(&e.order.id);
            tracing::info!(target: SERVICE_NAME, order = %e.order.id, "expired");
        }
        Event::Waste(e) => {
            tracing::warn!(target: SERVICE_NAME, order = %e.order.id, reason = e.reason.as_str(), "wasted");
        }
        Event::Value(e) => {
            tracing::debug!(
                target: SERVICE_NAME,
                order = %e.order.id,
                shelf = %e.shelf,
                value = e.value,
                norm_value = e.norm_value,
                "value"
            );
        }
        Event::Diag(e) => {
            tracing::debug!(target: SERVICE_NAME, service = e.service_name, message = %e.message, "diag relay");
        }
        _ => {}
    }
}
