use super::{EncounterResolution, Role, Stage, Stop, StopKind, TrafficLightColor};

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    StageReached(Stage),
    StopReached { stop: Stop, kind: StopKind },
    PoliceEncounter { reason: String, fine: u32 },
    EncounterResolved(EncounterResolution),
    EncounterClosed,
    /// `penalty` is what was actually debited.
    ObstacleHit { index: usize, penalty: f64 },
    EconomyChanged { cash: f64, fuel: f64, passengers: u32 },
    TrafficLightChanged(TrafficLightColor),
    RoleChanged { role: Role, autopilot: bool },
    RouteStarted,
    RouteStopped { reason: StopReason },
    LapCompleted,
    /// Text for the player's message box.
    Message(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    FuelEmpty,
    Refueling,
}

pub type Listener = Box<dyn FnMut(&SimEvent)>;

/// Components publish here instead of calling each other; the owner of the
/// bus dispatches once per step.
#[derive(Default)]
pub struct EventBus {
    pending: Vec<SimEvent>,
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, event: SimEvent) {
        self.pending.push(event);
    }

    pub fn message(&mut self, text: impl Into<String>) {
        self.pending.push(SimEvent::Message(text.into()));
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn pending(&self) -> &[SimEvent] {
        &self.pending
    }

    /// Deliver queued events to every listener, in publish order, and hand
    /// them back to the caller.
    pub fn dispatch(&mut self) -> Vec<SimEvent> {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            for listener in &mut self.listeners {
                listener(event);
            }
        }
        events
    }
}
