use super::{DriveCommand, Point, RouteObservation, RoutePath, VehicleState, Waypoint};
use crate::config::AutopilotParams;
use nalgebra::Rotation2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Smallest timestep used for the derivative term.
const MIN_PID_DT: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct PidController {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    integral_limit: f32,
    integral: f32,
    previous_error: Option<f32>,
}

impl PidController {
    pub fn new(kp: f32, ki: f32, kd: f32, integral_limit: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_limit,
            integral: 0.0,
            previous_error: None,
        }
    }

    pub fn update(&mut self, error: f32, dt: f32) -> f32 {
        let dt = dt.max(MIN_PID_DT);
        let limit = self.integral_limit;
        self.integral = (self.integral + error * dt).clamp(-limit, limit);
        let derivative = match self.previous_error {
            Some(previous) => (error - previous) / dt,
            None => 0.0,
        };
        self.previous_error = Some(error);

        self.kp * error + self.ki * self.integral + self.kd * derivative
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = None;
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn previous_error(&self) -> Option<f32> {
        self.previous_error
    }
}

/// Steering in [-1, 1] that aims the vehicle at `target`.
pub fn pure_pursuit_steer(state: &VehicleState, target: &Point, max_steer_angle: f32) -> f32 {
    let local = Rotation2::new(-state.heading) * (*target - state.position);
    let angle = local.y.atan2(local.x);
    (angle / max_steer_angle).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutopilotMode {
    /// No route target: cruise at a relaxed speed with occasional drift.
    Idle,
    /// Following the route.
    Tracking,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutopilotOutput {
    pub command: DriveCommand,
    /// Present only while tracking.
    pub observation: Option<RouteObservation>,
    pub lookahead: Option<Waypoint>,
}

pub struct AutopilotController {
    params: AutopilotParams,
    pid: PidController,
    engaged: bool,
    mode: AutopilotMode,
    drift: Option<Normal<f32>>,
    rng: StdRng,
}

impl AutopilotController {
    pub fn new(params: AutopilotParams, seed: Option<u64>) -> Self {
        let pid = PidController::new(params.kp, params.ki, params.kd, params.integral_limit);
        let drift = Normal::new(0.0, params.idle_drift_std_dev).ok();

        let rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        Self {
            params,
            pid,
            engaged: false,
            mode: AutopilotMode::Idle,
            drift,
            rng,
        }
    }

    pub fn params(&self) -> &AutopilotParams {
        &self.params
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn mode(&self) -> AutopilotMode {
        self.mode
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    /// Engaging and disengaging both start the PID from a clean history.
    pub fn set_engaged(&mut self, engaged: bool) {
        if self.engaged != engaged {
            log::debug!("Autopilot {}", if engaged { "engaged" } else { "disengaged" });
        }
        self.engaged = engaged;
        self.pid.reset();
        if !engaged {
            self.mode = AutopilotMode::Idle;
        }
    }

    pub fn set_mode(&mut self, mode: AutopilotMode) {
        if self.mode != mode {
            self.pid.reset();
            self.mode = mode;
        }
    }

    pub fn compute(
        &mut self,
        vehicle: &VehicleState,
        route: &mut RoutePath,
        dt: f32,
    ) -> AutopilotOutput {
        match self.mode {
            AutopilotMode::Idle => self.compute_idle(vehicle, dt),
            AutopilotMode::Tracking => self.compute_tracking(vehicle, route, dt),
        }
    }

    fn compute_idle(&mut self, vehicle: &VehicleState, dt: f32) -> AutopilotOutput {
        let cruise_speed = self.params.target_speed * self.params.idle_speed_factor;
        let throttle = self.regulate_speed(cruise_speed, vehicle.speed, dt);

        let steer = match self.drift {
            Some(drift) if self.rng.gen_bool(self.params.idle_drift_probability) => {
                drift.sample(&mut self.rng).clamp(-1.0, 1.0)
            }
            _ => 0.0,
        };

        AutopilotOutput {
            command: DriveCommand::new(throttle, steer),
            observation: None,
            lookahead: None,
        }
    }

    fn compute_tracking(
        &mut self,
        vehicle: &VehicleState,
        route: &mut RoutePath,
        dt: f32,
    ) -> AutopilotOutput {
        let observation = route.observe(&vehicle.position);
        let lookahead = route.lookahead_point(observation.nearest, self.params.lookahead_distance);

        let steer = pure_pursuit_steer(vehicle, &lookahead.position, self.params.max_steer_angle);
        let throttle = self.regulate_speed(self.params.target_speed, vehicle.speed, dt);

        log::debug!(
            "Autopilot: nearest {} lookahead ({:.1}, {:.1}) steer {:.3} throttle {:.3}",
            observation.nearest,
            lookahead.x(),
            lookahead.z(),
            steer,
            throttle
        );

        AutopilotOutput {
            command: DriveCommand::new(throttle, steer),
            observation: Some(observation),
            lookahead: Some(lookahead),
        }
    }

    fn regulate_speed(&mut self, target: f32, current: f32, dt: f32) -> f32 {
        let output = self.pid.update(target - current, dt);
        output.clamp(self.params.min_throttle, self.params.max_throttle)
    }
}
