use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use std::collections::HashSet;
use super::Validate;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteConfig {
    pub route: Route,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Route {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub geometry: RouteGeometry,
    pub stages: Vec<StageConfig>,
    /// Cones standing on or near the road.
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ObstacleConfig {
    pub x: f32,
    pub z: f32,
}

/// One named segment of the route. Waypoints are interpolated from
/// `(start_x, start_z)` to `(end_x, end_z)`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    pub id: u32,
    pub name: String,
    pub start_x: f32,
    #[serde(default)]
    pub start_z: f32,
    pub end_x: f32,
    #[serde(default)]
    pub end_z: f32,
    /// Fare per passenger when this stage's stop is the drop-off destination.
    pub base_fare: f64,
}

impl StageConfig {
    pub fn length(&self) -> f32 {
        (self.end_x - self.start_x).hypot(self.end_z - self.start_z)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteGeometry {
    /// Approximate distance between interpolated waypoints.
    pub waypoint_spacing: f32,
    pub min_steps_per_stage: u32,
    /// Peak lateral offset of the periodic wiggle.
    pub lateral_amplitude: f32,
    pub lateral_frequency: f32,
    /// Splice the last stage's end back to the first stage's start.
    pub closing_loop: bool,
    pub loop_steps: u32,
    // Nearest-waypoint search window around the cached hint
    pub search_behind: usize,
    pub search_ahead: usize,
    /// A windowed match farther than this forces a full rescan.
    pub resync_distance: f32,
    pub stop_radius: f32,
    /// Vehicle-to-obstacle distance that counts as a hit.
    pub obstacle_radius: f32,
    /// Extra sideways margin an obstacle is knocked out by after a hit.
    pub obstacle_clearance: f32,
}

impl Default for RouteGeometry {
    fn default() -> Self {
        Self {
            waypoint_spacing: 30.0,
            min_steps_per_stage: 10,
            lateral_amplitude: 8.0,
            lateral_frequency: 1.2,
            closing_loop: true,
            loop_steps: 20,
            search_behind: 20,
            search_ahead: 120,
            resync_distance: 100.0,
            stop_radius: 80.0,
            obstacle_radius: 4.0,
            obstacle_clearance: 1.0,
        }
    }
}

impl Default for Route {
    fn default() -> Self {
        let cone = |x: f32, z: f32| ObstacleConfig { x, z };
        let stage = |id: u32, name: &str, start: (f32, f32), end: (f32, f32), base_fare: f64| {
            StageConfig {
                id,
                name: name.to_string(),
                start_x: start.0,
                start_z: start.1,
                end_x: end.0,
                end_z: end.1,
                base_fare,
            }
        };

        Self {
            name: "Nairobi CBD Loop".to_string(),
            description: "Ambassadeur to Railways and back".to_string(),
            geometry: RouteGeometry::default(),
            stages: vec![
                stage(1, "Ambassadeur", (100.0, 0.0), (500.0, 0.0), 150.0),
                stage(2, "Kencom", (500.0, 0.0), (500.0, 540.0), 100.0),
                stage(3, "Afya Centre", (500.0, 540.0), (10.0, 540.0), 200.0),
                stage(4, "Railways", (10.0, 540.0), (10.0, 160.0), 120.0),
            ],
            obstacles: vec![cone(300.0, 4.0), cone(497.0, 300.0), cone(250.0, 545.0)],
        }
    }
}

impl Validate for RouteConfig {
    fn validate(&self) -> Result<()> {
        let route = &self.route;
        if route.stages.is_empty() {
            return Err(anyhow!("Route '{}' must define at least one stage", route.name));
        }

        let mut seen = HashSet::new();
        for stage in &route.stages {
            if !seen.insert(stage.id) {
                return Err(anyhow!("Duplicate stage id {}", stage.id));
            }

            if stage.length() <= f32::EPSILON {
                return Err(anyhow!("Stage '{}' has zero length", stage.name));
            }

            if stage.base_fare < 0.0 {
                return Err(anyhow!("Base fare for stage '{}' must be non-negative", stage.name));
            }
        }

        let geometry = &route.geometry;
        if geometry.waypoint_spacing <= 0.0 {
            return Err(anyhow!("Waypoint spacing must be positive"));
        }

        if geometry.min_steps_per_stage == 0 {
            return Err(anyhow!("Each stage needs at least one interpolation step"));
        }

        if geometry.lateral_amplitude < 0.0 {
            return Err(anyhow!("Lateral amplitude must be non-negative"));
        }

        if geometry.closing_loop && geometry.loop_steps == 0 {
            return Err(anyhow!("A closing loop needs at least one transition step"));
        }

        if geometry.search_ahead == 0 {
            return Err(anyhow!("Nearest-waypoint search must look ahead at least one waypoint"));
        }

        if geometry.resync_distance <= 0.0 {
            return Err(anyhow!("Resync distance must be positive"));
        }

        if geometry.stop_radius <= 0.0 {
            return Err(anyhow!("Stop radius must be positive"));
        }

        if geometry.obstacle_radius <= 0.0 || geometry.obstacle_clearance < 0.0 {
            return Err(anyhow!("Obstacle radius must be positive and clearance non-negative"));
        }

        if route.obstacles.iter().any(|o| !o.x.is_finite() || !o.z.is_finite()) {
            return Err(anyhow!("Obstacle positions must be finite"));
        }

        Ok(())
    }
}
