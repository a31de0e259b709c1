//! Order State Registry and Shelf-Life Engine: per-order residency history, the freshness value
//! function, expiry detection, and periodic `Value` publication. Registry state is owned
//! exclusively by this task; nothing else ever reads or writes it directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::config::Config;
use crate::diag::diag;
use crate::error::ValueError;
use crate::event::{
    Event, ExpiredEvent, Order, Severity, ShelfId, Topic, ValueEvent,
};

const SERVICE_NAME: &str = "ShelfLifeEngine";

/// Per-order residency history: when it was last placed on its primary shelf, and when it was
/// originally placed on overflow, if ever.
#[derive(Debug, Clone)]
pub struct OrderResidency {
    pub order: Order,
    pub shelf: ShelfId,
    pub t_primary: Option<Instant>,
    pub t_overflow: Option<Instant>,
}

impl OrderResidency {
    /// Computes current freshness: shelf life minus elapsed age minus shelf-weighted decay,
    /// clamped at zero. Overflow time decays at twice the primary rate.
    pub fn value(&self, now: Instant) -> Result<f64, ValueError> {
        match (self.t_primary, self.t_overflow) {
            (None, None) => Err(ValueError::NeverShelved),
            (Some(p), Some(o)) if o > p => Err(ValueError::InvalidResidencyOrder),
            (t_primary, t_overflow) => {
                let dur_overflow = match t_overflow {
                    Some(o) => t_primary.unwrap_or(now).duration_since(o).as_secs_f64(),
                    None => 0.0,
                };
                let dur_primary = match t_primary {
                    Some(p) => now.duration_since(p).as_secs_f64(),
                    None => 0.0,
                };
                let age = dur_primary + dur_overflow;
                let value = self.order.shelf_life
                    - age
                    - self.order.decay_rate * dur_primary
                    - 2.0 * self.order.decay_rate * dur_overflow;
                Ok(value.max(0.0))
            }
        }
    }
}

pub struct Registry {
    residencies: HashMap<Uuid, OrderResidency>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            residencies: HashMap::new(),
        }
    }

    pub fn on_shelved(&mut self, order: Order, shelf: ShelfId, when: Instant) {
        let entry = self.residencies.entry(order.id).or_insert_with(|| OrderResidency {
            order: order.clone(),
            shelf,
            t_primary: None,
            t_overflow: None,
        });
        entry.shelf = shelf;
        if matches!(shelf, ShelfId::Overflow) {
            entry.t_overflow = Some(when);
        } else {
            entry.t_primary = Some(when);
        }
    }

    /// Returns `false` if there was no residency for `order_id` (a `Pickup` for it already ran).
    pub fn on_reshelved(&mut self, order_id: Uuid, temp: crate::event::Temp, when: Instant) -> bool {
        match self.residencies.get_mut(&order_id) {
            Some(r) => {
                r.shelf = ShelfId::Primary(temp);
                r.t_primary = Some(when);
                true
            }
            None => false,
        }
    }

    pub fn on_pickup(&mut self, order_id: Uuid) {
        self.residencies.remove(&order_id);
    }

    pub fn len(&self) -> usize {
        self.residencies.len()
    }

    pub fn get(&self, id: &Uuid) -> Option<&OrderResidency> {
        self.residencies.get(id)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn run(bus: Arc<EventBus>, config: &Config, stop: Receiver<()>) {
    let sub = bus.subscribe(&[Topic::Shelved, Topic::Reshelved, Topic::Pickup]);
    let mut registry = Registry::new();
    let keep_alive = Duration::from_secs_f64(config.keep_alive_period_secs);

    diag(&bus, SERVICE_NAME, Severity::Info, "service started");

    loop {
        crossbeam_channel::select! {
            recv(sub.receiver()) -> msg => {
                match msg {
                    Ok(event) => handle_event(&bus, &mut registry, event),
                    Err(_) => break,
                }
            }
            recv(stop) -> _ => break,
            default(keep_alive) => {}
        }
        publish_values(&bus, &mut registry);
    }
}

fn handle_event(bus: &EventBus, registry: &mut Registry, event: Event) {
    match event {
        Event::Shelved(e) => registry.on_shelved(e.order, e.shelf, e.when),
        Event::Reshelved(e) => {
            // We don't know the order's temp from the Reshelved event alone (it only carries the
            // ID); look it up from the existing residency rather than widen the event schema.
            if let Some(existing) = registry.get(&e.order_id) {
                let temp = existing.order.temp;
                if !registry.on_reshelved(e.order_id, temp, e.when) {
                    diag(
                        bus,
                        SERVICE_NAME,
                        Severity::Warn,
                        format!("reshelved unknown order {}", e.order_id),
                    );
                }
            } else {
                diag(
                    bus,
                    SERVICE_NAME,
                    Severity::Warn,
                    format!("reshelved unknown order {}", e.order_id),
                );
            }
        }
        Event::Pickup(e) => registry.on_pickup(e.order.id),
        _ => {}
    }
}

fn publish_values(bus: &EventBus, registry: &mut Registry) {
    let now = Instant::now();
    let mut expired: Vec<Uuid> = Vec::new();
    let ids: Vec<Uuid> = registry.residencies_keys();

    for id in ids {
        let Some(residency) = registry.get(&id) else {
            continue;
        };
        match residency.value(now) {
            Ok(value) if value <= 0.0 => {
                expired.push(id);
            }
            Ok(value) => {
                let norm_value = value / residency.order.shelf_life;
                bus.publish(Event::Value(ValueEvent {
                    when: now,
                    shelf: residency.shelf,
                    value,
                    norm_value,
                    order: residency.order.clone(),
                }));
            }
            Err(err) => diag(
                bus,
                SERVICE_NAME,
                Severity::Error,
                format!("value computation failed for {id}: {err}"),
            ),
        }
    }

    for id in expired {
        if let Some(residency) = registry.take(&id) {
            bus.publish(Event::Expired(ExpiredEvent {
                when: now,
                order: residency.order,
            }));
        }
    }
}

impl Registry {
    fn residencies_keys(&self) -> Vec<Uuid> {
        self.residencies.keys().copied().collect()
    }

    fn take(&mut self, id: &Uuid) -> Option<OrderResidency> {
        self.residencies.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Temp;
    use approx::assert_relative_eq;

    fn residency(shelf_life: f64, decay_rate: f64) -> OrderResidency {
        OrderResidency {
            order: Order {
                id: Uuid::new_v4(),
                name: "widget".into(),
                temp: Temp::Hot,
                shelf_life,
                decay_rate,
            },
            shelf: ShelfId::Primary(Temp::Hot),
            t_primary: None,
            t_overflow: None,
        }
    }

    #[test]
    fn scenario_d_primary_only_decay() {
        let mut r = residency(100.0, 0.1);
        let start = Instant::now();
        r.t_primary = Some(start);
        let now = start + Duration::from_secs(7);
        assert_relative_eq!(r.value(now).unwrap(), 92.3, epsilon = 1e-9);
    }

    #[test]
    fn scenario_d_overflow_only_decay() {
        let mut r = residency(100.0, 0.1);
        r.shelf = ShelfId::Overflow;
        let start = Instant::now();
        r.t_overflow = Some(start);
        let now = start + Duration::from_secs(4);
        assert_relative_eq!(r.value(now).unwrap(), 95.2, epsilon = 1e-9);
    }

    #[test]
    fn scenario_d_overflow_then_primary() {
        let mut r = residency(100.0, 0.1);
        let overflow_start = Instant::now();
        let primary_start = overflow_start + Duration::from_secs(2);
        r.t_overflow = Some(overflow_start);
        r.t_primary = Some(primary_start);
        let now = primary_start + Duration::from_secs(3);
        assert_relative_eq!(r.value(now).unwrap(), 94.3, epsilon = 1e-9);
    }

    #[test]
    fn never_shelved_is_an_error() {
        let r = residency(100.0, 0.1);
        assert_eq!(r.value(Instant::now()).unwrap_err(), ValueError::NeverShelved);
    }

    #[test]
    fn overflow_after_primary_is_invalid_order() {
        let mut r = residency(100.0, 0.1);
        let now = Instant::now();
        r.t_primary = Some(now);
        r.t_overflow = Some(now + Duration::from_secs(1));
        assert_eq!(
            r.value(now + Duration::from_secs(2)).unwrap_err(),
            ValueError::InvalidResidencyOrder
        );
    }

    #[test]
    fn value_is_monotone_non_increasing() {
        let mut r = residency(100.0, 0.2);
        let start = Instant::now();
        r.t_primary = Some(start);
        let mut previous = r.value(start).unwrap();
        for secs in 1..20 {
            let v = r.value(start + Duration::from_secs(secs)).unwrap();
            assert!(v <= previous);
            previous = v;
        }
    }

    #[test]
    fn round_trip_shelve_then_pickup_clears_registry() {
        let mut registry = Registry::new();
        let order = Order {
            id: Uuid::new_v4(),
            name: "widget".into(),
            temp: Temp::Hot,
            shelf_life: 100.0,
            decay_rate: 0.1,
        };
        registry.on_shelved(order.clone(), ShelfId::Primary(Temp::Hot), Instant::now());
        assert_eq!(registry.len(), 1);
        registry.on_pickup(order.id);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn reshelved_on_missing_residency_reports_false() {
        let mut registry = Registry::new();
        assert!(!registry.on_reshelved(Uuid::new_v4(), Temp::Hot, Instant::now()));
    }
}
