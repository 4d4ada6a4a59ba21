use nalgebra::{Vector2, Point2};
use std::f32::consts::{PI, TAU};

pub mod route;
pub mod physics;
pub mod autopilot;
pub mod traffic;
pub mod obstacles;
pub mod police;
pub mod economy;
pub mod gameplay;
pub mod events;

pub use route::*;
pub use physics::*;
pub use autopilot::*;
pub use traffic::*;
pub use obstacles::*;
pub use police::*;
pub use economy::*;
pub use gameplay::*;
pub use events::*;

/// Planar vectors use `x` for world X and `y` for world Z.
pub type Vec2 = Vector2<f32>;
pub type Point = Point2<f32>;

/// Wrap an angle into (-PI, PI].
pub fn normalize_angle(angle: f32) -> f32 {
    let mut wrapped = angle % TAU;
    if wrapped <= -PI {
        wrapped += TAU;
    } else if wrapped > PI {
        wrapped -= TAU;
    }
    wrapped
}

/// What the presentation layer reads every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub z: f32,
    pub heading: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Driver,
    Conductor,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Driver => write!(f, "Driver"),
            Role::Conductor => write!(f, "Conductor"),
        }
    }
}

/// Normalized driving command. Values outside [-1, 1] are clamped on use.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveCommand {
    pub throttle: f32,
    pub steer: f32,
}

impl DriveCommand {
    pub fn new(throttle: f32, steer: f32) -> Self {
        Self { throttle, steer }
    }

    pub fn clamped(self) -> Self {
        Self {
            throttle: clamp_unit(self.throttle),
            steer: clamp_unit(self.steer),
        }
    }
}

// NaN inputs count as zero
fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}
