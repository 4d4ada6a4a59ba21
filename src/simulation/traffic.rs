use crate::config::GameplayParams;
use rand::Rng;
use rand_distr::{Bernoulli, BernoulliError, Distribution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficLightColor {
    Green,
    Yellow,
    Red,
}

impl TrafficLightColor {
    pub fn next(self) -> Self {
        match self {
            TrafficLightColor::Green => TrafficLightColor::Yellow,
            TrafficLightColor::Yellow => TrafficLightColor::Red,
            TrafficLightColor::Red => TrafficLightColor::Green,
        }
    }
}

impl std::fmt::Display for TrafficLightColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrafficLightColor::Green => write!(f, "GREEN"),
            TrafficLightColor::Yellow => write!(f, "YELLOW"),
            TrafficLightColor::Red => write!(f, "RED"),
        }
    }
}

/// Global light on a fixed Green → Yellow → Red cycle.
#[derive(Debug, Clone)]
pub struct TrafficLight {
    color: TrafficLightColor,
    remaining: f32,
    green_duration: f32,
    yellow_duration: f32,
    red_duration: f32,
}

impl TrafficLight {
    pub fn new(params: &GameplayParams) -> Self {
        Self {
            color: TrafficLightColor::Green,
            remaining: params.green_duration,
            green_duration: params.green_duration,
            yellow_duration: params.yellow_duration,
            red_duration: params.red_duration,
        }
    }

    pub fn color(&self) -> TrafficLightColor {
        self.color
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn duration_of(&self, color: TrafficLightColor) -> f32 {
        match color {
            TrafficLightColor::Green => self.green_duration,
            TrafficLightColor::Yellow => self.yellow_duration,
            TrafficLightColor::Red => self.red_duration,
        }
    }

    /// Advance the timer. Returns the final color if it changed; a long `dt`
    /// may skip through several phases.
    pub fn tick(&mut self, dt: f32) -> Option<TrafficLightColor> {
        let start = self.color;
        self.remaining -= dt;
        while self.remaining <= 0.0 {
            self.color = self.color.next();
            self.remaining += self.duration_of(self.color);
        }

        if self.color != start {
            Some(self.color)
        } else {
            None
        }
    }

    /// Jump straight to `color` with a fresh phase timer.
    pub fn force(&mut self, color: TrafficLightColor) {
        self.color = color;
        self.remaining = self.duration_of(color);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationOutcome {
    /// No rule broken this tick.
    Clean,
    /// Ran the red light and got away with it.
    Rewarded(f64),
    /// Caught: an encounter must be opened.
    Caught { reason: String },
}

/// Per-tick red-light and speeding checks.
#[derive(Debug, Clone)]
pub struct ViolationCheck {
    speed_threshold: f32,
    speed_limit: f32,
    red_light: Bernoulli,
    speeding: Bernoulli,
    reward: f64,
}

impl ViolationCheck {
    pub fn new(params: &GameplayParams) -> Result<Self, BernoulliError> {
        Ok(Self {
            speed_threshold: params.red_light_speed_threshold,
            speed_limit: params.speed_limit,
            red_light: Bernoulli::new(params.red_light_violation_probability)?,
            speeding: Bernoulli::new(params.speeding_violation_probability)?,
            reward: params.red_light_reward,
        })
    }

    pub fn check<R: Rng>(
        &self,
        light: TrafficLightColor,
        speed: f32,
        rng: &mut R,
    ) -> ViolationOutcome {
        let mut outcome = ViolationOutcome::Clean;

        if light == TrafficLightColor::Red && speed.abs() > self.speed_threshold {
            if self.red_light.sample(rng) {
                return ViolationOutcome::Caught {
                    reason: "Running a red light during rush hour.".to_string(),
                };
            }
            outcome = ViolationOutcome::Rewarded(self.reward);
        }

        if speed.abs() > self.speed_limit && self.speeding.sample(rng) {
            return ViolationOutcome::Caught {
                reason: format!("Over-speeding past the {:.0} km/h limit.", self.speed_limit * 3.6),
            };
        }

        outcome
    }
}
