use super::{normalize_angle, DriveCommand, Point, Pose, Vec2};
use crate::config::VehicleParams;

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub position: Point,
    /// Radians in (-PI, PI]; 0 faces +X, positive turns toward +Z.
    pub heading: f32,
    /// Signed scalar speed; negative is reverse.
    pub speed: f32,
    pub steer_command: f32,
    pub throttle_command: f32,
}

impl VehicleState {
    pub fn forward(&self) -> Vec2 {
        Vec2::new(self.heading.cos(), self.heading.sin())
    }
}

/// Kinematic vehicle: scalar speed along the heading, no lateral slip.
pub struct VehicleModel {
    params: VehicleParams,
    state: VehicleState,
}

impl VehicleModel {
    pub fn new(params: VehicleParams) -> Self {
        let state = VehicleState {
            position: Point::new(params.start_x, params.start_z),
            heading: normalize_angle(params.start_heading),
            speed: 0.0,
            steer_command: 0.0,
            throttle_command: 0.0,
        };

        Self { params, state }
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn params(&self) -> &VehicleParams {
        &self.params
    }

    pub fn pose(&self) -> Pose {
        Pose {
            x: self.state.position.x,
            z: self.state.position.y,
            heading: self.state.heading,
            speed: self.state.speed,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.state.speed.abs() > self.params.rest_threshold
    }

    /// Place the vehicle, e.g. at the start of a route. Speed is cleared.
    pub fn teleport(&mut self, position: Point, heading: f32) {
        self.state.position = position;
        self.state.heading = normalize_angle(heading);
        self.state.speed = 0.0;
    }

    /// Set speed directly, still honoring the caps.
    pub fn set_speed(&mut self, speed: f32) {
        let params = &self.params;
        self.state.speed = speed.clamp(-params.max_reverse_speed, params.max_forward_speed);
    }

    pub fn force_stop(&mut self) {
        self.state.speed = 0.0;
    }

    pub fn integrate(&mut self, command: DriveCommand, dt: f32) {
        let command = command.clamped();
        let params = &self.params;
        let state = &mut self.state;
        state.throttle_command = command.throttle;
        state.steer_command = command.steer;

        // Also rejects NaN
        if !(dt > 0.0) {
            return;
        }

        // --- 1. Longitudinal dynamics ---
        let throttle = command.throttle;
        let speed = state.speed;
        let mut new_speed = if throttle > 0.0 {
            if speed < -params.rest_threshold {
                // Forward input while rolling backwards brakes toward zero
                (speed + throttle * params.brake_deceleration * dt).min(0.0)
            } else {
                speed + throttle * params.acceleration * dt
            }
        } else if throttle < 0.0 {
            if speed > params.rest_threshold {
                (speed + throttle * params.brake_deceleration * dt).max(0.0)
            } else {
                speed + throttle * params.acceleration * dt
            }
        } else {
            let resistance = (params.drag_coefficient * speed.abs() + params.rolling_friction) * dt;
            if speed.abs() <= resistance || speed.abs() <= params.rest_threshold {
                0.0
            } else {
                speed - resistance * speed.signum()
            }
        };

        new_speed = new_speed.clamp(-params.max_reverse_speed, params.max_forward_speed);
        state.speed = new_speed;

        // --- 2. Steering, scaled by speed so the vehicle cannot pivot in place ---
        let speed_ratio = (new_speed / params.full_steer_speed).clamp(-1.0, 1.0);
        let yaw = command.steer * params.turn_rate * speed_ratio * dt;
        state.heading = normalize_angle(state.heading + yaw);

        // --- 3. Advance along the heading ---
        let direction = state.forward();
        state.position += direction * (new_speed * dt);
    }
}
