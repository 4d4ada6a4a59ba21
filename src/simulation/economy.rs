use crate::config::EconomyParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopKind {
    #[default]
    None,
    PickUp,
    DropOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    PickUp,
    DropOff,
}

/// Where the passengers on board are headed.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub stage_id: u32,
    pub name: String,
    pub base_fare: f64,
}

/// Cash, fuel and passenger ledger.
///
/// Invariants: `passengers <= max_passengers`, `fuel` in [0, 100] and `cash`
/// never negative; debits that would overdraw clamp at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEconomy {
    cash: f64,
    fuel: f64,
    passengers: u32,
    max_passengers: u32,
    pub current_destination: Option<Destination>,
    pub current_stop_kind: StopKind,
}

pub const FULL_TANK: f64 = 100.0;

impl GameEconomy {
    pub fn new(params: &EconomyParams) -> Self {
        Self {
            cash: params.starting_cash.max(0.0),
            fuel: params.starting_fuel.clamp(0.0, FULL_TANK),
            passengers: 0,
            max_passengers: params.max_passengers,
            current_destination: None,
            current_stop_kind: StopKind::None,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn fuel(&self) -> f64 {
        self.fuel
    }

    pub fn passengers(&self) -> u32 {
        self.passengers
    }

    pub fn max_passengers(&self) -> u32 {
        self.max_passengers
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.max_passengers.saturating_sub(self.passengers)
    }

    pub fn is_fuel_empty(&self) -> bool {
        self.fuel <= 0.0
    }

    pub fn is_tank_full(&self) -> bool {
        self.fuel >= FULL_TANK
    }

    pub fn credit(&mut self, amount: f64) {
        self.cash += amount.max(0.0);
    }

    /// Deduct only if the full amount is available.
    pub fn try_debit(&mut self, amount: f64) -> bool {
        if self.cash >= amount {
            self.cash -= amount;
            true
        } else {
            false
        }
    }

    /// Deduct up to `amount`, stopping at zero. Returns what was taken.
    pub fn debit_clamped(&mut self, amount: f64) -> f64 {
        let taken = amount.clamp(0.0, self.cash);
        self.cash -= taken;
        taken
    }

    /// Board up to `count` passengers. Returns how many fit.
    pub fn board(&mut self, count: u32) -> u32 {
        let boarded = count.min(self.remaining_capacity());
        self.passengers += boarded;
        boarded
    }

    /// Everyone off. Returns how many alighted.
    pub fn alight_all(&mut self) -> u32 {
        std::mem::take(&mut self.passengers)
    }

    pub fn burn_fuel(&mut self, amount: f64) {
        self.fuel = (self.fuel - amount).clamp(0.0, FULL_TANK);
    }

    pub fn fill_tank(&mut self) {
        self.fuel = FULL_TANK;
    }

    // Scenario setup for the presentation layer and tests
    pub fn set_cash(&mut self, cash: f64) {
        self.cash = cash.max(0.0);
    }

    pub fn set_fuel(&mut self, fuel: f64) {
        self.fuel = fuel.clamp(0.0, FULL_TANK);
    }

    pub fn set_passengers(&mut self, passengers: u32) {
        self.passengers = passengers.min(self.max_passengers);
    }
}
