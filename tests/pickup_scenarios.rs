use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kitchen_sim::bus::EventBus;
use kitchen_sim::config::Config;
use kitchen_sim::event::{
    Event, ExpiredEvent, Order, ShelfId, ShelvedEvent, Temp, Topic, UserRequest, UserRequestEvent,
};
use kitchen_sim::pickup;
use uuid::Uuid;

fn sample_order() -> Order {
    Order {
        id: Uuid::new_v4(),
        name: "widget".into(),
        temp: Temp::Hot,
        shelf_life: 100.0,
        decay_rate: 0.1,
    }
}

fn config_with_delay(min: f64, max: f64) -> Config {
    let mut config = Config::default();
    config.pickup_delay_min = min;
    config.pickup_delay_max = max;
    config
}

/// Scenario E: a pickup cancels if the order expires before the timer fires.
#[test]
fn pickup_cancels_on_expire() {
    let bus = Arc::new(EventBus::new(64));
    let config = config_with_delay(0.2231, 0.2231);
    let (_stop_tx, stop_rx) = crossbeam_channel::unbounded();

    let pickup_sub = bus.subscribe(&[Topic::Pickup]);

    {
        let bus = bus.clone();
        let config = config.clone();
        thread::spawn(move || pickup::run(bus, &config, stop_rx));
    }
    thread::sleep(Duration::from_millis(5));

    let order = sample_order();
    bus.publish(Event::Shelved(ShelvedEvent {
        when: Instant::now(),
        shelf: ShelfId::Primary(Temp::Hot),
        order: order.clone(),
    }));

    thread::sleep(Duration::from_millis(10));
    bus.publish(Event::Expired(ExpiredEvent {
        when: Instant::now(),
        order,
    }));

    thread::sleep(Duration::from_millis(300));

    assert!(pickup_sub.receiver().try_recv().is_err());
}

/// Scenario F: a fired pickup is held while paused and released exactly once on resume.
#[test]
fn pickup_pause_then_resume_releases_exactly_one() {
    let bus = Arc::new(EventBus::new(64));
    let config = config_with_delay(0.05, 0.05);
    let (_stop_tx, stop_rx) = crossbeam_channel::unbounded();

    let pickup_sub = bus.subscribe(&[Topic::Pickup]);

    {
        let bus = bus.clone();
        let config = config.clone();
        thread::spawn(move || pickup::run(bus, &config, stop_rx));
    }
    thread::sleep(Duration::from_millis(5));

    bus.publish(Event::UserRequest(UserRequestEvent {
        when: Instant::now(),
        request: UserRequest::PausePickup,
    }));
    thread::sleep(Duration::from_millis(5));

    let order = sample_order();
    bus.publish(Event::Shelved(ShelvedEvent {
        when: Instant::now(),
        shelf: ShelfId::Primary(Temp::Hot),
        order,
    }));

    // Long enough for the timer to fire and spin on the paused redraw loop.
    thread::sleep(Duration::from_millis(200));
    assert!(
        pickup_sub.receiver().try_recv().is_err(),
        "pickup must not publish while paused"
    );

    bus.publish(Event::UserRequest(UserRequestEvent {
        when: Instant::now(),
        request: UserRequest::ResumePickup,
    }));

    thread::sleep(Duration::from_millis(200));
    assert!(matches!(pickup_sub.receiver().try_recv(), Ok(Event::Pickup(_))));
    assert!(pickup_sub.receiver().try_recv().is_err());
}
