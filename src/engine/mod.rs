use crate::config::SimulationConfig;
use crate::simulation::{
    AutopilotController, AutopilotMode, DriveCommand, EncounterResolution, EventBus,
    GameplayStateMachine, ObstacleField, PoliceDecision, PoliceEncounter, Pose, RefuelOutcome,
    Role, RouteObservation, RoutePath, RouteStartOutcome, SimEvent, StopAction,
    StopActionOutcome, StopReason, VehicleModel,
};
use anyhow::Result;

pub mod clock;
pub mod perf;

pub use clock::*;
pub use perf::*;

/// One simulated matatu: route, vehicle, autopilot and gameplay, wired
/// together through the event bus.
pub struct Simulation {
    config: SimulationConfig,
    route: RoutePath,
    obstacles: ObstacleField,
    vehicle: VehicleModel,
    autopilot: AutopilotController,
    gameplay: GameplayStateMachine,
    clock: SimulationClock,
    bus: EventBus,
    manual_command: DriveCommand,
}

impl Simulation {
    /// `seed` overrides the configured seed; with neither, entropy is used.
    /// The configuration is validated first, so bad tuning fails here
    /// rather than mid-session.
    pub fn new(config: SimulationConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let seed = seed.or(config.vehicle.random.seed);

        let route = RoutePath::build(&config.route.route)?;
        let route_config = &config.route.route;
        let obstacles = ObstacleField::new(&route_config.obstacles, &route_config.geometry);
        let vehicle = VehicleModel::new(config.vehicle.vehicle.clone());
        let autopilot = AutopilotController::new(config.vehicle.autopilot.clone(), seed);
        let gameplay =
            GameplayStateMachine::new(&config.vehicle.gameplay, &config.vehicle.economy, seed)?;
        let clock = SimulationClock::new(&config.vehicle.clock);

        log::info!(
            "Simulation ready: route '{}' ({} waypoints, {} stops, {} obstacles), seed {:?}",
            route.name(),
            route.len(),
            route.stops().len(),
            obstacles.len(),
            seed
        );

        Ok(Self {
            config,
            route,
            obstacles,
            vehicle,
            autopilot,
            gameplay,
            clock,
            bus: EventBus::new(),
            manual_command: DriveCommand::default(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn route(&self) -> &RoutePath {
        &self.route
    }

    pub fn obstacles(&self) -> &ObstacleField {
        &self.obstacles
    }

    pub fn vehicle(&self) -> &VehicleModel {
        &self.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut VehicleModel {
        &mut self.vehicle
    }

    pub fn autopilot(&self) -> &AutopilotController {
        &self.autopilot
    }

    pub fn gameplay(&self) -> &GameplayStateMachine {
        &self.gameplay
    }

    pub fn gameplay_mut(&mut self) -> &mut GameplayStateMachine {
        &mut self.gameplay
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn pose(&self) -> Pose {
        self.vehicle.pose()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SimEvent) + 'static) {
        self.bus.subscribe(Box::new(listener));
    }

    /// Deliver events raised outside `step`, e.g. by a rejected command.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.bus.dispatch()
    }

    // --- Commands ---

    /// Manual throttle and steer in [-1, 1]; used while the autopilot is off.
    pub fn set_command(&mut self, throttle: f32, steer: f32) {
        self.manual_command = DriveCommand::new(throttle, steer).clamped();
    }

    pub fn set_autopilot_engaged(&mut self, engaged: bool) {
        self.autopilot.set_engaged(engaged);
        if engaged {
            self.autopilot.set_mode(self.autopilot_mode());
        }
    }

    fn autopilot_mode(&self) -> AutopilotMode {
        if self.gameplay.is_trip_active() && self.gameplay.economy().current_destination.is_some() {
            AutopilotMode::Tracking
        } else {
            AutopilotMode::Idle
        }
    }

    /// Conductor hands the wheel to the autopilot and starts the route;
    /// driver takes it back. Refused while an encounter is open.
    pub fn switch_role(&mut self, role: Role) -> bool {
        if self.gameplay.role() == role {
            return true;
        }
        if !self.gameplay.set_role(role) {
            self.bus.message("Deal with the police first!");
            return false;
        }

        match role {
            Role::Conductor => {
                self.autopilot.set_engaged(true);
                if !self.gameplay.is_trip_active() {
                    self.start_route();
                }
                self.autopilot.set_mode(self.autopilot_mode());
                self.bus.message("Driver taking the wheel (Autopilot Active)!");
            }
            Role::Driver => {
                self.autopilot.set_engaged(false);
                self.bus.message("You are the driver now. Watch the lights!");
            }
        }

        self.bus.publish(SimEvent::RoleChanged {
            role,
            autopilot: self.autopilot.is_engaged(),
        });
        true
    }

    pub fn handle_stop_action(&mut self, action: StopAction) -> StopActionOutcome {
        self.gameplay.handle_stop_action(action, &self.route, &mut self.bus)
    }

    /// A successful refuel ends the current trip.
    pub fn refuel(&mut self) -> RefuelOutcome {
        let outcome = self.gameplay.refuel(&mut self.bus);
        if let RefuelOutcome::Refueled { .. } = outcome {
            self.halt_route(StopReason::Refueling);
        }
        outcome
    }

    pub fn start_route(&mut self) -> RouteStartOutcome {
        let outcome = self.gameplay.begin_trip(&self.route, &mut self.bus);
        if outcome == RouteStartOutcome::Started {
            if self.gameplay.role() == Role::Conductor && !self.autopilot.is_engaged() {
                self.autopilot.set_engaged(true);
            }
            if self.autopilot.is_engaged() {
                self.autopilot.set_mode(self.autopilot_mode());
            }
        }
        outcome
    }

    /// Halts the vehicle and detaches the autopilot. Stage and stop memory
    /// are kept.
    pub fn stop_route(&mut self) -> bool {
        self.halt_route(StopReason::Requested)
    }

    fn halt_route(&mut self, reason: StopReason) -> bool {
        if !self.gameplay.end_trip(reason, &mut self.bus) {
            return false;
        }
        self.vehicle.force_stop();
        self.autopilot.set_engaged(false);
        true
    }

    pub fn resolve_encounter(&mut self, decision: PoliceDecision) -> Option<EncounterResolution> {
        self.gameplay
            .resolve_encounter(decision, self.clock.elapsed(), &mut self.bus)
    }

    /// Open an encounter directly, as a checkpoint on the road would.
    pub fn trigger_police_encounter(&mut self, reason: impl Into<String>, fine: u32) -> bool {
        let encounter = PoliceEncounter {
            reason: reason.into(),
            fine,
        };
        self.gameplay
            .trigger_police_encounter(encounter, &mut self.vehicle, &mut self.bus)
    }

    pub fn reset_route(&mut self) {
        self.route.reset();
        self.obstacles.reset();

        let start = self.route.waypoint(0).map(|w| w.position);
        let next = self.route.waypoint(1).map(|w| w.position);
        if let (Some(start), Some(next)) = (start, next) {
            let direction = next - start;
            self.vehicle.teleport(start, direction.y.atan2(direction.x));
        } else if let Some(start) = start {
            let heading = self.vehicle.state().heading;
            self.vehicle.teleport(start, heading);
        }

        let engaged = self.autopilot.is_engaged();
        self.autopilot.set_engaged(engaged);
        log::info!("Route '{}' reset", self.route.name());
    }

    // --- Stepping ---

    /// Run whole fixed steps for `real_elapsed` seconds of wall time.
    pub fn advance(&mut self, real_elapsed: f32) -> Vec<SimEvent> {
        let steps = self.clock.queue(real_elapsed);
        let dt = self.clock.fixed_dt();
        let mut events = Vec::new();
        for _ in 0..steps {
            events.extend(self.step(dt));
        }
        events
    }

    pub fn step(&mut self, dt: f32) -> Vec<SimEvent> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        // --- 1. Clocks and timed states ---
        let tick = self.clock.tick(dt);
        let now = self.clock.elapsed();
        self.gameplay.tick_traffic_light(dt, &mut self.bus);
        self.gameplay.tick_police(now, &mut self.bus);

        // --- 2. Motion ---
        if self.gameplay.is_modal_open() {
            self.vehicle.force_stop();
        } else if self.gameplay.economy().is_fuel_empty() {
            self.vehicle.force_stop();
            if self.gameplay.is_trip_active() {
                self.bus.message("Fuel is empty! Route stopped.");
                self.halt_route(StopReason::FuelEmpty);
            }
        } else {
            self.drive(dt);
            self.gameplay.check_violations(&mut self.vehicle, &mut self.bus);
            self.gameplay
                .check_obstacles(&mut self.obstacles, &mut self.vehicle, &mut self.bus);
        }

        // --- 3. Slow economy timer ---
        for _ in 0..tick.economy_ticks {
            let result = self.gameplay.passive_tick(
                self.vehicle.is_moving(),
                self.autopilot.is_engaged(),
                &mut self.bus,
            );
            if result.fuel_exhausted {
                self.halt_route(StopReason::FuelEmpty);
            }
        }

        // --- 4. Publish ---
        self.gameplay.publish_economy_if_changed(&mut self.bus);
        self.bus.dispatch()
    }

    fn drive(&mut self, dt: f32) {
        if self.autopilot.is_engaged() {
            let mode = self.autopilot_mode();
            self.autopilot.set_mode(mode);
        }

        let mut observation = None;
        let command = if self.autopilot.is_engaged() {
            let output = self.autopilot.compute(self.vehicle.state(), &mut self.route, dt);
            observation = output.observation;
            output.command
        } else {
            self.manual_command
        };

        self.vehicle.integrate(command, dt);

        if observation.is_none() && self.gameplay.is_trip_active() {
            observation = Some(self.route.observe(&self.vehicle.state().position));
        }

        if let Some(observation) = observation {
            self.apply_observation(observation);
        }
    }

    fn apply_observation(&mut self, observation: RouteObservation) {
        if observation.lap_completed {
            log::info!("Lap of '{}' completed", self.route.name());
            self.bus.publish(SimEvent::LapCompleted);
        }

        if !self.gameplay.is_trip_active() {
            return;
        }

        if let Some(stage) = observation.stage {
            self.gameplay.on_stage_reached(stage, &mut self.bus);
        }
        if let Some(stop) = observation.stop {
            self.gameplay.on_stop_reached(stop, &mut self.bus);
        }
    }
}
