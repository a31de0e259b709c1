//! The closed set of event types that flow over the [`crate::bus::EventBus`].
//!
//! The bus is parameterized by one closed `Event` enum, so a handler's `match` is exhaustive and
//! a mismatched variant is a compile error rather than a logged diagnostic.

use std::time::Instant;
use uuid::Uuid;

use serde::Deserialize;

/// An order's storage temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temp {
    Hot,
    Cold,
    Frozen,
}

impl Temp {
    pub const ALL: [Temp; 3] = [Temp::Hot, Temp::Cold, Temp::Frozen];

    pub fn as_str(&self) -> &'static str {
        match self {
            Temp::Hot => "hot",
            Temp::Cold => "cold",
            Temp::Frozen => "frozen",
        }
    }
}

impl std::fmt::Display for Temp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The physical shelf an order currently sits on: one of the three primary temperatures, or the
/// shared overflow tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShelfId {
    Primary(Temp),
    Overflow,
}

impl ShelfId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShelfId::Primary(t) => t.as_str(),
            ShelfId::Overflow => "overflow",
        }
    }
}

impl std::fmt::Display for ShelfId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static order data as read from the orders file, plus the ID assigned at emission time.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub name: String,
    pub temp: Temp,
    pub shelf_life: f64,
    pub decay_rate: f64,
}

/// The on-disk shape of one entry in the orders file; `id` is assigned by the Order Source, not
/// read from the file.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderInput {
    pub name: String,
    pub temp: Temp,
    #[serde(rename = "shelfLife")]
    pub shelf_life: f64,
    #[serde(rename = "decayRate")]
    pub decay_rate: f64,
}

impl OrderInput {
    pub fn into_order(self, id: Uuid) -> Order {
        Order {
            id,
            name: self.name,
            temp: self.temp,
            shelf_life: self.shelf_life,
            decay_rate: self.decay_rate,
        }
    }
}

/// Reason an order was declared waste.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasteReason {
    /// Reserved for completeness of the wire schema. The shelf-life engine reports expiry
    /// through its own `Expired` event rather than a `Waste` with this reason.
    Expired,
    NoShelfSpace,
}

impl WasteReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteReason::Expired => "expired",
            WasteReason::NoShelfSpace => "noShelfSpace",
        }
    }
}

/// Diagnostic severity, mirrored on `tracing`'s levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// A request issued by the operator, carried on the `userRequest` topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRequest {
    Quit,
    PausePickup,
    ResumePickup,
    PauseIncomingOrders,
    ResumeIncomingOrders,
}

impl UserRequest {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "quit" => Some(UserRequest::Quit),
            "pausePickup" => Some(UserRequest::PausePickup),
            "resumePickup" => Some(UserRequest::ResumePickup),
            "pauseIncomingOrders" => Some(UserRequest::PauseIncomingOrders),
            "resumeIncomingOrders" => Some(UserRequest::ResumeIncomingOrders),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewOrderEvent {
    pub when: Instant,
    pub order: Order,
}

#[derive(Debug, Clone)]
pub struct ShelvedEvent {
    pub when: Instant,
    pub shelf: ShelfId,
    pub order: Order,
}

#[derive(Debug, Clone)]
pub struct ReshelvedEvent {
    pub when: Instant,
    pub order_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct PickupEvent {
    pub when: Instant,
    pub order: Order,
}

#[derive(Debug, Clone)]
pub struct ExpiredEvent {
    pub when: Instant,
    pub order: Order,
}

#[derive(Debug, Clone)]
pub struct WasteEvent {
    pub when: Instant,
    pub order: Order,
    pub reason: WasteReason,
}

#[derive(Debug, Clone)]
pub struct ValueEvent {
    pub when: Instant,
    pub shelf: ShelfId,
    pub value: f64,
    pub norm_value: f64,
    pub order: Order,
}

#[derive(Debug, Clone)]
pub struct DiagEvent {
    pub when: Instant,
    pub service_name: &'static str,
    pub severity: Severity,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserRequestEvent {
    pub when: Instant,
    pub request: UserRequest,
}

/// The closed set of events carried on the bus. One variant per [`Topic`].
#[derive(Debug, Clone)]
pub enum Event {
    NewOrder(NewOrderEvent),
    Shelved(ShelvedEvent),
    Reshelved(ReshelvedEvent),
    Pickup(PickupEvent),
    Expired(ExpiredEvent),
    Waste(WasteEvent),
    Value(ValueEvent),
    UserRequest(UserRequestEvent),
    Diag(DiagEvent),
}

/// The closed set of topics. Subscribers name the topics they want; publishers name the one
/// topic a message goes out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    NewOrder,
    Shelved,
    Reshelved,
    Pickup,
    Expired,
    Waste,
    Value,
    UserRequest,
    Diag,
}

impl Event {
    /// The topic this event is published on. Kept in sync with the `Event`/`Topic` variant
    /// names by the exhaustive match below; adding an `Event` variant without a matching `Topic`
    /// arm is a compile error.
    pub fn topic(&self) -> Topic {
        match self {
            Event::NewOrder(_) => Topic::NewOrder,
            Event::Shelved(_) => Topic::Shelved,
            Event::Reshelved(_) => Topic::Reshelved,
            Event::Pickup(_) => Topic::Pickup,
            Event::Expired(_) => Topic::Expired,
            Event::Waste(_) => Topic::Waste,
            Event::Value(_) => Topic::Value,
            Event::UserRequest(_) => Topic::UserRequest,
            Event::Diag(_) => Topic::Diag,
        }
    }
}
