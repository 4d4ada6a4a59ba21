use super::{Point, Vec2, VehicleState};
use crate::config::{ObstacleConfig, RouteGeometry};

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub position: Point,
    home: Point,
}

impl Obstacle {
    pub fn home(&self) -> Point {
        self.home
    }

    pub fn is_displaced(&self) -> bool {
        self.position != self.home
    }
}

/// Cones on the road. A cone that is hit gets knocked sideways out of the
/// vehicle's path so it cannot trigger again on the same pass.
#[derive(Debug, Clone)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle>,
    radius: f32,
    clearance: f32,
}

impl ObstacleField {
    pub fn new(obstacles: &[ObstacleConfig], geometry: &RouteGeometry) -> Self {
        let obstacles = obstacles
            .iter()
            .map(|o| {
                let position = Point::new(o.x, o.z);
                Obstacle { position, home: position }
            })
            .collect();

        Self {
            obstacles,
            radius: geometry.obstacle_radius,
            clearance: geometry.obstacle_clearance,
        }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Index of the first obstacle within the hit radius, if any. That
    /// obstacle is pushed to the side it already leans toward, to
    /// `radius + clearance` off the vehicle's line of travel.
    pub fn strike(&mut self, vehicle: &VehicleState) -> Option<usize> {
        let radius = self.radius;
        let index = self
            .obstacles
            .iter()
            .position(|o| (o.position - vehicle.position).norm() <= radius)?;

        let forward = vehicle.forward();
        let lateral = Vec2::new(-forward.y, forward.x);
        let obstacle = &mut self.obstacles[index];
        let offset = obstacle.position - vehicle.position;
        let side = if offset.dot(&lateral) >= 0.0 { 1.0 } else { -1.0 };

        let along = forward * offset.dot(&forward);
        obstacle.position = vehicle.position + along + lateral * side * (radius + self.clearance);
        log::debug!(
            "Obstacle {} knocked to ({:.1}, {:.1})",
            index,
            obstacle.position.x,
            obstacle.position.y
        );

        Some(index)
    }

    /// Put every obstacle back where it started.
    pub fn reset(&mut self) {
        for obstacle in &mut self.obstacles {
            obstacle.position = obstacle.home;
        }
    }
}
