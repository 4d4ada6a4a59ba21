use super::{
    Destination, EncounterResolution, EventBus, GameEconomy, ObstacleField, PoliceCheckpoint,
    PoliceDecision, PoliceEncounter, PoliceOutcome, Role, RoutePath, SimEvent, Stage, Stop,
    StopAction, StopKind, StopReason, TrafficLight, TrafficLightColor, VehicleModel,
    ViolationCheck, ViolationOutcome,
};
use crate::config::{EconomyParams, GameplayParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::BernoulliError;

#[derive(Debug, Clone, PartialEq)]
pub enum StopActionOutcome {
    PickedUp { passengers: u32, fare: f64 },
    DroppedOff { passengers: u32, fare: f64 },
    VehicleFull,
    /// The action does not match the stop the vehicle is at.
    WrongStop,
    NotOnRoute,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefuelOutcome {
    Refueled { cost: f64 },
    AlreadyFull,
    InsufficientFunds { needed: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStartOutcome {
    Started,
    AlreadyRunning,
    FuelEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleHit {
    pub index: usize,
    /// Debited amount; less than the configured penalty when cash runs out.
    pub penalty: f64,
    pub speed_after: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EconomyTick {
    pub fuel_exhausted: bool,
}

/// Owns the economy ledger, the traffic light, the violation check, the
/// police encounter and the active role.
pub struct GameplayStateMachine {
    params: EconomyParams,
    obstacle_penalty: f64,
    obstacle_speed_factor: f32,
    economy: GameEconomy,
    traffic_light: TrafficLight,
    violations: ViolationCheck,
    police: PoliceCheckpoint,
    role: Role,
    trip_active: bool,
    last_published: (f64, f64, u32),
    rng: StdRng,
}

impl GameplayStateMachine {
    pub fn new(
        gameplay: &GameplayParams,
        economy: &EconomyParams,
        seed: Option<u64>,
    ) -> Result<Self, BernoulliError> {
        let rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        let ledger = GameEconomy::new(economy);
        let last_published = (ledger.cash(), ledger.fuel(), ledger.passengers());

        Ok(Self {
            params: economy.clone(),
            obstacle_penalty: gameplay.obstacle_penalty,
            obstacle_speed_factor: gameplay.obstacle_speed_factor,
            economy: ledger,
            traffic_light: TrafficLight::new(gameplay),
            violations: ViolationCheck::new(gameplay)?,
            police: PoliceCheckpoint::new(gameplay)?,
            role: Role::Driver,
            trip_active: false,
            last_published,
            rng,
        })
    }

    pub fn economy(&self) -> &GameEconomy {
        &self.economy
    }

    pub fn economy_mut(&mut self) -> &mut GameEconomy {
        &mut self.economy
    }

    pub fn traffic_light(&self) -> &TrafficLight {
        &self.traffic_light
    }

    pub fn traffic_light_mut(&mut self) -> &mut TrafficLight {
        &mut self.traffic_light
    }

    pub fn police(&self) -> &PoliceCheckpoint {
        &self.police
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_trip_active(&self) -> bool {
        self.trip_active
    }

    pub fn is_modal_open(&self) -> bool {
        self.police.is_modal_open()
    }

    // --- Traffic light and enforcement ---

    pub fn tick_traffic_light(&mut self, dt: f32, bus: &mut EventBus) {
        if let Some(color) = self.traffic_light.tick(dt) {
            log::debug!("Traffic light is now {}", color);
            bus.publish(SimEvent::TrafficLightChanged(color));
        }
    }

    pub fn tick_police(&mut self, now: f64, bus: &mut EventBus) {
        if self.police.tick(now) {
            bus.publish(SimEvent::EncounterClosed);
            bus.message("Matatu is back on the road.");
        }
    }

    /// Red-light and speeding checks; only the driver is held responsible
    /// and nothing is checked while an encounter is open.
    pub fn check_violations(
        &mut self,
        vehicle: &mut VehicleModel,
        bus: &mut EventBus,
    ) -> ViolationOutcome {
        if self.role != Role::Driver || self.is_modal_open() {
            return ViolationOutcome::Clean;
        }

        let speed = vehicle.state().speed;
        let outcome = self.violations.check(self.traffic_light.color(), speed, &mut self.rng);
        match &outcome {
            ViolationOutcome::Clean => {}
            ViolationOutcome::Rewarded(reward) => self.economy.credit(*reward),
            ViolationOutcome::Caught { reason } => {
                let fine = self.police.draw_fine(&mut self.rng);
                self.trigger_police_encounter(
                    PoliceEncounter {
                        reason: reason.clone(),
                        fine,
                    },
                    vehicle,
                    bus,
                );
            }
        }
        outcome
    }

    /// Hitting a cone costs money and most of the vehicle's speed, in
    /// either role. Nothing is checked while an encounter is open.
    pub fn check_obstacles(
        &mut self,
        obstacles: &mut ObstacleField,
        vehicle: &mut VehicleModel,
        bus: &mut EventBus,
    ) -> Option<ObstacleHit> {
        if self.is_modal_open() {
            return None;
        }

        let index = obstacles.strike(vehicle.state())?;
        let penalty = self.economy.debit_clamped(self.obstacle_penalty);
        vehicle.set_speed(vehicle.state().speed * self.obstacle_speed_factor);

        log::info!("Hit obstacle {}, charged KSh {:.0}", index, penalty);
        bus.publish(SimEvent::ObstacleHit { index, penalty });
        bus.message(format!(
            "Hit an obstacle (Cone)! KSh {:.0} penalty for property damage!",
            self.obstacle_penalty
        ));

        Some(ObstacleHit {
            index,
            penalty,
            speed_after: vehicle.state().speed,
        })
    }

    /// Stop the vehicle and open the encounter modal.
    pub fn trigger_police_encounter(
        &mut self,
        encounter: PoliceEncounter,
        vehicle: &mut VehicleModel,
        bus: &mut EventBus,
    ) -> bool {
        let event = SimEvent::PoliceEncounter {
            reason: encounter.reason.clone(),
            fine: encounter.fine,
        };

        if !self.police.open(encounter) {
            return false;
        }

        vehicle.force_stop();
        bus.publish(event);
        true
    }

    pub fn resolve_encounter(
        &mut self,
        decision: PoliceDecision,
        now: f64,
        bus: &mut EventBus,
    ) -> Option<EncounterResolution> {
        let resolution = self.police.resolve(decision, &mut self.economy, now, &mut self.rng)?;

        if resolution.insufficient_funds {
            bus.message("Not enough cash! Detention risk increases...");
        }

        match &resolution.outcome {
            PoliceOutcome::BribePaid { amount } => {
                bus.message(format!("Bribe paid (KSh {:.0}). Matatu is back on the road.", amount));
            }
            PoliceOutcome::LetGo => bus.message("You talked your way out! Drive safe."),
            PoliceOutcome::Detained { penalty } => {
                bus.message(format!(
                    "Detained! Paid KSh {:.0} official fine. Lose time & money.",
                    penalty
                ));
            }
        }

        bus.publish(SimEvent::EncounterResolved(resolution.clone()));
        Some(resolution)
    }

    // --- Role and trip ---

    /// Refused while an encounter is open.
    pub fn set_role(&mut self, role: Role) -> bool {
        if self.is_modal_open() {
            log::warn!("Cannot switch role during a police encounter");
            return false;
        }

        if self.role != role {
            log::info!("Role switched to {}", role);
        }
        self.role = role;
        true
    }

    pub fn begin_trip(&mut self, route: &RoutePath, bus: &mut EventBus) -> RouteStartOutcome {
        if self.economy.is_fuel_empty() {
            log::warn!("Cannot start route with an empty tank");
            bus.message("Cannot start route. Fuel is empty!");
            return RouteStartOutcome::FuelEmpty;
        }

        if self.trip_active {
            return RouteStartOutcome::AlreadyRunning;
        }

        if self.economy.current_destination.is_none() {
            self.select_next_destination(route);
        }

        self.trip_active = true;
        log::info!("Route '{}' started", route.name());
        bus.publish(SimEvent::RouteStarted);
        bus.message("Route started!");
        RouteStartOutcome::Started
    }

    pub fn end_trip(&mut self, reason: StopReason, bus: &mut EventBus) -> bool {
        if !self.trip_active {
            return false;
        }

        self.trip_active = false;
        log::info!("Route stopped ({:?})", reason);
        bus.publish(SimEvent::RouteStopped { reason });
        bus.message("Route STOPPED.");
        true
    }

    pub fn refuel(&mut self, bus: &mut EventBus) -> RefuelOutcome {
        if self.economy.is_tank_full() {
            bus.message("Fuel is already full!");
            return RefuelOutcome::AlreadyFull;
        }

        let cost = self.params.refuel_cost;
        if !self.economy.try_debit(cost) {
            log::warn!("Refuel refused: need KSh {:.0}, have {:.0}", cost, self.economy.cash());
            bus.message(format!("Insufficient funds! KSh {:.0} needed to refuel.", cost));
            return RefuelOutcome::InsufficientFunds { needed: cost };
        }

        self.economy.fill_tank();
        log::info!("Refueled for KSh {:.0}", cost);
        bus.message("Refueled! Back to 100%. Keep the money flowing!");
        RefuelOutcome::Refueled { cost }
    }

    // --- Stages, stops and fares ---

    pub fn on_stage_reached(&mut self, stage: Stage, bus: &mut EventBus) {
        log::info!("Reached stage {} ({})", stage.id, stage.name);
        bus.publish(SimEvent::StageReached(stage));
    }

    /// A stop belonging to the current destination is a drop-off; any other
    /// stop is a pick-up.
    pub fn on_stop_reached(&mut self, stop: Stop, bus: &mut EventBus) -> StopKind {
        let is_destination = self
            .economy
            .current_destination
            .as_ref()
            .map_or(false, |d| d.stage_id == stop.stage_id);

        let kind = if is_destination {
            bus.message(format!("Arrived at {}. Drop off passengers!", stop.name));
            StopKind::DropOff
        } else {
            bus.message("Stop for passengers! Quick pick up!");
            StopKind::PickUp
        };

        log::info!("Stop reached: {} ({:?})", stop.name, kind);
        self.economy.current_stop_kind = kind;
        bus.publish(SimEvent::StopReached { stop, kind });
        kind
    }

    pub fn handle_stop_action(
        &mut self,
        action: StopAction,
        route: &RoutePath,
        bus: &mut EventBus,
    ) -> StopActionOutcome {
        if !self.trip_active {
            bus.message("The matatu must be on its route for business!");
            return StopActionOutcome::NotOnRoute;
        }

        let outcome = match (action, self.economy.current_stop_kind) {
            (StopAction::PickUp, StopKind::PickUp) => self.pick_up(route, bus),
            (StopAction::DropOff, StopKind::DropOff) => self.drop_off(route, bus),
            _ => {
                bus.message("Wait for the right stop/destination.");
                return StopActionOutcome::WrongStop;
            }
        };

        self.economy.current_stop_kind = StopKind::None;
        outcome
    }

    fn pick_up(&mut self, route: &RoutePath, bus: &mut EventBus) -> StopActionOutcome {
        let batch = self
            .rng
            .gen_range(self.params.min_pickup_batch..=self.params.max_pickup_batch);
        let boarded = self.economy.board(batch);

        if boarded == 0 {
            log::warn!("Pick-up refused: vehicle full ({} passengers)", self.economy.passengers());
            bus.message("Matatu is full! Get going!");
            return StopActionOutcome::VehicleFull;
        }

        let fare = boarded as f64 * self.params.pickup_fare;
        self.economy.credit(fare);
        bus.message(format!("Wacha tupande! Picked up {} passengers. KSh {:.0}.", boarded, fare));
        self.select_next_destination(route);

        StopActionOutcome::PickedUp {
            passengers: boarded,
            fare,
        }
    }

    fn drop_off(&mut self, route: &RoutePath, bus: &mut EventBus) -> StopActionOutcome {
        let base_fare = self
            .economy
            .current_destination
            .as_ref()
            .map_or(0.0, |d| d.base_fare);
        let passengers = self.economy.alight_all();
        let fare = passengers as f64 * base_fare;
        self.economy.credit(fare);

        log::info!("Dropped off {} passengers for KSh {:.0}", passengers, fare);
        bus.message(format!(
            "Tushukishe! Dropped off all passengers. KSh {:.0} total profit!",
            fare
        ));
        self.select_next_destination(route);

        StopActionOutcome::DroppedOff { passengers, fare }
    }

    /// Pick uniformly among stops other than the current destination.
    pub fn select_next_destination(&mut self, route: &RoutePath) -> Option<&Destination> {
        let current = self.economy.current_destination.as_ref().map(|d| d.stage_id);
        let mut candidates: Vec<&Stop> =
            route.stops().iter().filter(|s| Some(s.stage_id) != current).collect();
        if candidates.is_empty() {
            candidates = route.stops().iter().collect();
        }

        let next = if candidates.is_empty() {
            None
        } else {
            let stop = candidates[self.rng.gen_range(0..candidates.len())];
            route.stage_by_id(stop.stage_id).map(|stage| Destination {
                stage_id: stage.id,
                name: stage.name.clone(),
                base_fare: stage.base_fare,
            })
        };

        if let Some(destination) = &next {
            log::info!("Next destination: {}", destination.name);
        }
        self.economy.current_destination = next;
        self.economy.current_destination.as_ref()
    }

    // --- Passive economy ---

    /// Slow-timer effects: fuel burn while moving and passive fares while the
    /// conductor lets the autopilot drive.
    pub fn passive_tick(
        &mut self,
        vehicle_moving: bool,
        autopilot_engaged: bool,
        bus: &mut EventBus,
    ) -> EconomyTick {
        if !self.trip_active || self.is_modal_open() {
            return EconomyTick::default();
        }

        if vehicle_moving {
            self.economy.burn_fuel(self.params.fuel_consumption);
        }

        if self.role == Role::Conductor && autopilot_engaged {
            let spread = if self.params.passive_fare_spread == 0 {
                0
            } else {
                self.rng.gen_range(0..self.params.passive_fare_spread)
            };
            let fare = (self.params.passive_fare_base + spread) as f64;
            self.economy.credit(fare);
        }

        let fuel_exhausted = self.economy.is_fuel_empty();
        if fuel_exhausted {
            log::warn!("Fuel exhausted");
            bus.message("Fuel is empty! Route stopped.");
        }

        EconomyTick { fuel_exhausted }
    }

    pub fn publish_economy_if_changed(&mut self, bus: &mut EventBus) {
        let snapshot = (self.economy.cash(), self.economy.fuel(), self.economy.passengers());
        if snapshot != self.last_published {
            self.last_published = snapshot;
            bus.publish(SimEvent::EconomyChanged {
                cash: snapshot.0,
                fuel: snapshot.1,
                passengers: snapshot.2,
            });
        }
    }

    pub fn light_color(&self) -> TrafficLightColor {
        self.traffic_light.color()
    }
}
