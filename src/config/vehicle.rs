use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use super::{Validate, check_probability};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct VehicleConfig {
    pub vehicle: VehicleParams,
    pub autopilot: AutopilotParams,
    pub gameplay: GameplayParams,
    pub economy: EconomyParams,
    pub clock: ClockParams,
    pub random: RandomConfig,
    pub performance: PerformanceConfig,
}

/// Longitudinal and steering limits. Speeds are world units per second.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VehicleParams {
    pub max_forward_speed: f32,
    pub max_reverse_speed: f32,
    pub acceleration: f32,
    pub brake_deceleration: f32,
    /// Coasting deceleration per unit of speed.
    pub drag_coefficient: f32,
    pub rolling_friction: f32,
    /// Heading rate in rad/s at full steer and full steering authority.
    pub turn_rate: f32,
    /// Speed at which steering reaches full authority.
    pub full_steer_speed: f32,
    /// Below this speed a coasting vehicle snaps to rest.
    pub rest_threshold: f32,
    pub start_x: f32,
    pub start_z: f32,
    pub start_heading: f32,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            max_forward_speed: 15.0,
            max_reverse_speed: 5.0,
            acceleration: 6.0,
            brake_deceleration: 12.0,
            drag_coefficient: 0.05,
            rolling_friction: 0.6,
            turn_rate: 1.2,
            full_steer_speed: 5.0,
            rest_threshold: 1e-3,
            start_x: 100.0,
            start_z: 0.0,
            start_heading: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AutopilotParams {
    pub target_speed: f32,
    /// Fraction of `target_speed` used while cruising without a route target.
    pub idle_speed_factor: f32,
    pub lookahead_distance: f32,
    pub max_steer_angle: f32,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub integral_limit: f32,
    pub min_throttle: f32,
    pub max_throttle: f32,
    pub idle_drift_probability: f64,
    pub idle_drift_std_dev: f32,
}

impl Default for AutopilotParams {
    fn default() -> Self {
        Self {
            target_speed: 10.0,
            idle_speed_factor: 0.7,
            lookahead_distance: 85.0,
            max_steer_angle: std::f32::consts::FRAC_PI_4,
            kp: 1.6,
            ki: 0.02,
            kd: 0.12,
            integral_limit: 50.0,
            min_throttle: -0.2,
            max_throttle: 1.0,
            idle_drift_probability: 0.01,
            idle_drift_std_dev: 0.5,
        }
    }
}

/// Traffic enforcement tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GameplayParams {
    pub green_duration: f32,
    pub yellow_duration: f32,
    pub red_duration: f32,
    pub red_light_speed_threshold: f32,
    pub red_light_violation_probability: f64,
    pub red_light_reward: f64,
    pub speed_limit: f32,
    pub speeding_violation_probability: f64,
    pub base_fine: u32,
    pub fine_spread: u32,
    pub let_go_probability: f64,
    pub detention_multiplier: f64,
    pub resolution_delay: f32,
    pub detention_delay: f32,
    /// Property-damage charge for hitting an obstacle.
    pub obstacle_penalty: f64,
    /// Speed is multiplied by this on impact.
    pub obstacle_speed_factor: f32,
}

impl Default for GameplayParams {
    fn default() -> Self {
        Self {
            green_duration: 10.0,
            yellow_duration: 10.0,
            red_duration: 10.0,
            red_light_speed_threshold: 0.005,
            red_light_violation_probability: 0.4,
            red_light_reward: 20.0,
            speed_limit: 13.0,
            speeding_violation_probability: 0.1,
            base_fine: 200,
            fine_spread: 200,
            let_go_probability: 0.5,
            detention_multiplier: 2.0,
            resolution_delay: 1.5,
            detention_delay: 5.0,
            obstacle_penalty: 50.0,
            obstacle_speed_factor: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EconomyParams {
    pub starting_cash: f64,
    pub starting_fuel: f64,
    pub max_passengers: u32,
    pub min_pickup_batch: u32,
    pub max_pickup_batch: u32,
    pub pickup_fare: f64,
    pub passive_fare_base: u32,
    pub passive_fare_spread: u32,
    /// Fuel percentage burned per economy tick while moving.
    pub fuel_consumption: f64,
    pub refuel_cost: f64,
}

impl Default for EconomyParams {
    fn default() -> Self {
        Self {
            starting_cash: 1000.0,
            starting_fuel: 100.0,
            max_passengers: 14,
            min_pickup_batch: 3,
            max_pickup_batch: 7,
            pickup_fare: 50.0,
            passive_fare_base: 5,
            passive_fare_spread: 5,
            fuel_consumption: 0.05,
            refuel_cost: 500.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClockParams {
    pub fixed_dt: f32,
    pub economy_interval: f32,
    pub max_substeps: u32,
}

impl Default for ClockParams {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            economy_interval: 0.5,
            max_substeps: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RandomConfig {
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerformanceConfig {
    pub timing_samples: u32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { timing_samples: 120 }
    }
}

impl Validate for VehicleConfig {
    fn validate(&self) -> Result<()> {
        // Validate vehicle dynamics
        let vehicle = &self.vehicle;
        if vehicle.max_forward_speed <= 0.0 || vehicle.max_reverse_speed <= 0.0 {
            return Err(anyhow!("Speed caps must be positive"));
        }

        if vehicle.max_reverse_speed >= vehicle.max_forward_speed {
            return Err(anyhow!("Reverse speed cap must be smaller than the forward cap"));
        }

        if vehicle.acceleration <= 0.0 || vehicle.brake_deceleration <= 0.0 {
            return Err(anyhow!("Acceleration and brake deceleration must be positive"));
        }

        if vehicle.drag_coefficient < 0.0 || vehicle.rolling_friction < 0.0 {
            return Err(anyhow!("Drag and rolling friction must be non-negative"));
        }

        if vehicle.turn_rate <= 0.0 || vehicle.full_steer_speed <= 0.0 {
            return Err(anyhow!("Turn rate and full-steer speed must be positive"));
        }

        // Validate autopilot tuning
        let autopilot = &self.autopilot;
        if autopilot.target_speed <= 0.0 || autopilot.target_speed > vehicle.max_forward_speed {
            return Err(anyhow!(
                "Autopilot target speed must be in (0, {}], got {}",
                vehicle.max_forward_speed,
                autopilot.target_speed
            ));
        }

        if !(0.0..=1.0).contains(&autopilot.idle_speed_factor) {
            return Err(anyhow!("Idle speed factor must be in range [0, 1]"));
        }

        if autopilot.lookahead_distance <= 0.0 {
            return Err(anyhow!("Lookahead distance must be positive"));
        }

        if autopilot.max_steer_angle <= 0.0 {
            return Err(anyhow!("Maximum steering angle must be positive"));
        }

        if autopilot.kp < 0.0 || autopilot.ki < 0.0 || autopilot.kd < 0.0 {
            return Err(anyhow!("PID gains must be non-negative"));
        }

        if autopilot.min_throttle < -1.0
            || autopilot.max_throttle > 1.0
            || autopilot.min_throttle >= autopilot.max_throttle
        {
            return Err(anyhow!("Autopilot throttle range must be an ordered sub-range of [-1, 1]"));
        }

        check_probability("Idle drift probability", autopilot.idle_drift_probability)?;

        if !(autopilot.idle_drift_std_dev >= 0.0) {
            return Err(anyhow!("Idle drift standard deviation must be non-negative"));
        }

        // Validate enforcement
        let gameplay = &self.gameplay;
        if gameplay.green_duration <= 0.0
            || gameplay.yellow_duration <= 0.0
            || gameplay.red_duration <= 0.0
        {
            return Err(anyhow!("Traffic light durations must be positive"));
        }

        check_probability(
            "Red light violation probability",
            gameplay.red_light_violation_probability,
        )?;
        check_probability(
            "Speeding violation probability",
            gameplay.speeding_violation_probability,
        )?;
        check_probability("Let-go probability", gameplay.let_go_probability)?;

        if gameplay.detention_multiplier < 1.0 {
            return Err(anyhow!("Detention multiplier must be at least 1"));
        }

        if gameplay.resolution_delay < 0.0 || gameplay.detention_delay < 0.0 {
            return Err(anyhow!("Encounter resolution delays must be non-negative"));
        }

        if !(gameplay.obstacle_penalty >= 0.0) {
            return Err(anyhow!("Obstacle penalty must be non-negative"));
        }

        if !(0.0..=1.0).contains(&gameplay.obstacle_speed_factor) {
            return Err(anyhow!("Obstacle speed factor must be in range [0, 1]"));
        }

        // Validate economy
        let economy = &self.economy;
        if economy.starting_cash < 0.0 {
            return Err(anyhow!("Starting cash must be non-negative"));
        }

        if !(0.0..=100.0).contains(&economy.starting_fuel) {
            return Err(anyhow!("Starting fuel must be in range [0, 100]"));
        }

        if economy.max_passengers == 0 {
            return Err(anyhow!("Max passengers must be greater than zero"));
        }

        if economy.min_pickup_batch > economy.max_pickup_batch {
            return Err(anyhow!("Pick-up batch range is inverted"));
        }

        if economy.fuel_consumption < 0.0 || economy.refuel_cost < 0.0 {
            return Err(anyhow!("Fuel consumption and refuel cost must be non-negative"));
        }

        // Validate clock
        let clock = &self.clock;
        if clock.fixed_dt <= 0.0 || clock.economy_interval <= 0.0 {
            return Err(anyhow!("Clock intervals must be positive"));
        }

        if clock.max_substeps == 0 {
            return Err(anyhow!("Max substeps must be greater than zero"));
        }

        if self.performance.timing_samples == 0 {
            return Err(anyhow!("Timing samples must be greater than zero"));
        }

        Ok(())
    }
}
