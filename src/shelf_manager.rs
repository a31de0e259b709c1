//! Placement, removal, and reshelf-on-vacancy policy across primary and overflow shelves. Owns
//! all shelf state exclusively; no other task ever touches a `PrimaryShelf` or `OverflowShelf`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Receiver;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::config::Config;
use crate::diag::diag;
use crate::error::ShelfError;
use crate::event::{
    Event, Order, ReshelvedEvent, ShelfId, ShelvedEvent, Temp, Topic, WasteEvent, WasteReason,
};
use crate::shelf::{OverflowShelf, PrimaryShelf};

const SERVICE_NAME: &str = "ShelfManager";

pub struct ShelfManager {
    primary: HashMap<Temp, PrimaryShelf>,
    overflow: OverflowShelf,
}

impl ShelfManager {
    pub fn new(primary_capacity: usize, overflow_capacity: usize) -> Self {
        let mut primary = HashMap::with_capacity(Temp::ALL.len());
        for temp in Temp::ALL {
            primary.insert(temp, PrimaryShelf::new(primary_capacity));
        }
        let overflow = OverflowShelf::new(overflow_capacity, &Temp::ALL);
        Self { primary, overflow }
    }

    fn primary_shelf(&self, temp: Temp) -> Result<&PrimaryShelf, ShelfError> {
        self.primary.get(&temp).ok_or(ShelfError::InvalidTemp(temp))
    }

    fn primary_shelf_mut(&mut self, temp: Temp) -> Result<&mut PrimaryShelf, ShelfError> {
        self.primary
            .get_mut(&temp)
            .ok_or(ShelfError::InvalidTemp(temp))
    }

    pub fn has(&self, id: Uuid, temp: Temp) -> Result<Option<ShelfId>, ShelfError> {
        if self.primary_shelf(temp)?.has(id) {
            return Ok(Some(ShelfId::Primary(temp)));
        }
        if self.overflow.has(id, temp)? {
            return Ok(Some(ShelfId::Overflow));
        }
        Ok(None)
    }

    /// Attempts primary placement, then overflow. Returns the shelf the order landed on, or
    /// `None` if both are full (the caller publishes `Waste`).
    pub fn store(&mut self, order: &Order, temp: Temp) -> Result<Option<ShelfId>, ShelfError> {
        if self.primary_shelf_mut(temp)?.store(order.id) {
            return Ok(Some(ShelfId::Primary(temp)));
        }
        if self.overflow.store(order.id, temp, order.decay_rate)? {
            return Ok(Some(ShelfId::Overflow));
        }
        Ok(None)
    }

    /// Removes `id` from wherever it's shelved for `temp`. A primary removal immediately attempts
    /// a reshelf from overflow; the reshelved order, if any, is returned alongside whether the
    /// removal itself found the order.
    pub fn remove(
        &mut self,
        id: Uuid,
        temp: Temp,
    ) -> Result<(bool, Option<Uuid>), ShelfError> {
        let primary = self.primary_shelf_mut(temp)?;
        if primary.remove(id) {
            let reshelved = self.reshelf(temp)?;
            return Ok((true, reshelved));
        }
        match self.overflow.remove(id, temp) {
            Ok(()) => Ok((true, None)),
            Err(ShelfError::NotFound) => Ok((false, None)),
            Err(e) => Err(e),
        }
    }

    fn reshelf(&mut self, temp: Temp) -> Result<Option<Uuid>, ShelfError> {
        let Some(id) = self.overflow.pop_max(temp)? else {
            return Ok(None);
        };
        // Space was just freed above; this cannot fail.
        self.primary_shelf_mut(temp)?.store(id);
        Ok(Some(id))
    }
}

pub fn run(bus: Arc<EventBus>, config: &Config, stop: Receiver<()>) {
    let sub = bus.subscribe(&[Topic::NewOrder, Topic::Pickup, Topic::Expired]);
    let mut manager = ShelfManager::new(config.primary_capacity, config.overflow_capacity);

    diag(&bus, SERVICE_NAME, crate::event::Severity::Info, "service started");

    loop {
        crossbeam_channel::select! {
            recv(sub.receiver()) -> msg => {
                let Ok(event) = msg else { break };
                handle_event(&bus, &mut manager, event);
            }
            recv(stop) -> _ => break,
        }
    }
}

fn handle_event(bus: &EventBus, manager: &mut ShelfManager, event: Event) {
    match event {
        Event::NewOrder(e) => {
            let when = e.when;
            match manager.store(&e.order, e.order.temp) {
                Ok(Some(shelf)) => {
                    bus.publish(Event::Shelved(ShelvedEvent {
                        when,
                        shelf,
                        order: e.order,
                    }));
                }
                Ok(None) => {
                    bus.publish(Event::Waste(WasteEvent {
                        when,
                        order: e.order,
                        reason: WasteReason::NoShelfSpace,
                    }));
                }
                Err(err) => diag(
                    bus,
                    SERVICE_NAME,
                    crate::event::Severity::Error,
                    format!("store failed: {err}"),
                ),
            }
        }
        Event::Pickup(e) => remove_and_maybe_reshelf(bus, manager, e.order.id, e.order.temp, e.when),
        Event::Expired(e) => remove_and_maybe_reshelf(bus, manager, e.order.id, e.order.temp, e.when),
        _ => {}
    }
}

fn remove_and_maybe_reshelf(
    bus: &EventBus,
    manager: &mut ShelfManager,
    id: Uuid,
    temp: Temp,
    when: Instant,
) {
    match manager.remove(id, temp) {
        Ok((true, Some(reshelved_id))) => {
            bus.publish(Event::Reshelved(ReshelvedEvent {
                when,
                order_id: reshelved_id,
            }));
        }
        Ok((true, None)) => {}
        Ok((false, _)) => diag(
            bus,
            SERVICE_NAME,
            crate::event::Severity::Warn,
            format!("remove of missing order {id}"),
        ),
        Err(err) => diag(
            bus,
            SERVICE_NAME,
            crate::event::Severity::Error,
            format!("remove failed: {err}"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Order;

    fn order(temp: Temp, decay_rate: f64) -> Order {
        Order {
            id: Uuid::new_v4(),
            name: "widget".into(),
            temp,
            shelf_life: 100.0,
            decay_rate,
        }
    }

    #[test]
    fn scenario_a_basic_placement() {
        let mut manager = ShelfManager::new(3, 5);

        let orders: Vec<Order> = (0..4).map(|_| order(Temp::Frozen, 1.0)).collect();
        let mut shelves = Vec::new();
        for o in &orders {
            let shelf = manager.store(o, Temp::Frozen).unwrap();
            shelves.push(shelf);
        }

        assert_eq!(
            shelves,
            vec![
                Some(ShelfId::Primary(Temp::Frozen)),
                Some(ShelfId::Primary(Temp::Frozen)),
                Some(ShelfId::Primary(Temp::Frozen)),
                Some(ShelfId::Overflow),
            ]
        );
    }

    #[test]
    fn scenario_b_waste_on_full() {
        let mut manager = ShelfManager::new(3, 5);
        for _ in 0..8 {
            let o = order(Temp::Frozen, 1.0);
            manager.store(&o, Temp::Frozen).unwrap();
        }
        let ninth = order(Temp::Frozen, 1.0);
        assert_eq!(manager.store(&ninth, Temp::Frozen).unwrap(), None);
    }

    #[test]
    fn scenario_c_reshelf_on_vacancy() {
        let mut manager = ShelfManager::new(3, 5);

        let a = order(Temp::Hot, 1.0);
        let b = order(Temp::Hot, 1.0);
        let c = order(Temp::Hot, 1.0);
        for o in [&a, &b, &c] {
            manager.store(o, Temp::Hot).unwrap();
        }

        let rates = [1.1, 1.6, 1.2, 1.7, 1.2];
        let overflow_orders: Vec<Order> = rates.iter().map(|r| order(Temp::Hot, *r)).collect();
        for o in &overflow_orders {
            manager.store(o, Temp::Hot).unwrap();
        }

        let (removed, reshelved) = manager.remove(b.id, Temp::Hot).unwrap();
        assert!(removed);
        let reshelved_id = reshelved.expect("expected a reshelf");
        assert_eq!(reshelved_id, overflow_orders[3].id); // decay rate 1.7

        assert!(!manager.overflow.has(overflow_orders[3].id, Temp::Hot).unwrap());
        assert!(manager.primary_shelf(Temp::Hot).unwrap().has(a.id));
        assert!(manager.primary_shelf(Temp::Hot).unwrap().has(c.id));
        assert!(manager.primary_shelf(Temp::Hot).unwrap().has(reshelved_id));
    }

    #[test]
    fn remove_of_missing_order_is_reported_not_fatal() {
        let mut manager = ShelfManager::new(3, 5);
        let (found, reshelved) = manager.remove(Uuid::new_v4(), Temp::Hot).unwrap();
        assert!(!found);
        assert_eq!(reshelved, None);
    }
}
