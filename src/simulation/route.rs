use super::{Point, Vec2};
use crate::config::{Route, RouteGeometry};
use crate::error::RouteError;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Point,
    /// Index into the route's stage list.
    pub stage_index: usize,
}

impl Waypoint {
    pub fn new(x: f32, z: f32, stage_index: usize) -> Self {
        Self {
            position: Point::new(x, z),
            stage_index,
        }
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn z(&self) -> f32 {
        self.position.y
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub id: u32,
    pub name: String,
    pub base_fare: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub stage_id: u32,
    pub name: String,
    pub position: Point,
    pub waypoint_index: usize,
    pub collected: bool,
}

/// Result of feeding one pose through the route layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteObservation {
    pub nearest: usize,
    pub stage: Option<Stage>,
    pub stop: Option<Stop>,
    pub lap_completed: bool,
}

/// Ordered waypoints with per-stage stops. Built once; only the stop flags,
/// the stage memory and the search hint change afterwards.
#[derive(Debug, Clone)]
pub struct RoutePath {
    name: String,
    stages: Vec<Stage>,
    path: Vec<Waypoint>,
    stops: Vec<Stop>,
    looping: bool,
    search_behind: usize,
    search_ahead: usize,
    resync_distance: f32,
    stop_radius: f32,
    last_stage_index: Option<usize>,
    last_waypoint_hint: usize,
}

impl RoutePath {
    /// Interpolate every stage into waypoints and optionally splice a
    /// transition segment from the last waypoint back to the first.
    pub fn build(route: &Route) -> Result<Self, RouteError> {
        if route.stages.is_empty() {
            return Err(RouteError::NoStages);
        }

        let geometry = &route.geometry;
        let mut stages = Vec::with_capacity(route.stages.len());
        let mut path = Vec::new();

        for (s, stage) in route.stages.iter().enumerate() {
            let length = stage.length();
            if length <= f32::EPSILON {
                return Err(RouteError::DegenerateStage {
                    id: stage.id,
                    name: stage.name.clone(),
                });
            }

            let start = Point::new(stage.start_x, stage.start_z);
            let span = Vec2::new(stage.end_x - stage.start_x, stage.end_z - stage.start_z);
            let normal = Vec2::new(-span.y, span.x) / length;
            let steps = ((length / geometry.waypoint_spacing) as u32)
                .max(geometry.min_steps_per_stage)
                .max(1);

            for i in 0..=steps {
                let t = i as f32 / steps as f32;
                let phase = (s as f32 + t) * geometry.lateral_frequency;
                let wiggle = phase.sin() * geometry.lateral_amplitude;
                path.push(Waypoint {
                    position: start + span * t + normal * wiggle,
                    stage_index: s,
                });
            }

            stages.push(Stage {
                id: stage.id,
                name: stage.name.clone(),
                base_fare: stage.base_fare,
            });
        }

        if geometry.closing_loop {
            if let (Some(last), Some(first)) = (path.last().copied(), path.first().copied()) {
                // Tail is tagged with the first stage: it is the approach into it
                for i in 1..geometry.loop_steps {
                    let t = i as f32 / geometry.loop_steps as f32;
                    path.push(Waypoint {
                        position: last.position + (first.position - last.position) * t,
                        stage_index: 0,
                    });
                }
            }
        }

        Self::from_parts(&route.name, stages, path, geometry.closing_loop, geometry)
    }

    /// Assemble a route from explicit waypoints. One stop is placed on the
    /// last waypoint of each stage.
    pub fn from_parts(
        name: &str,
        stages: Vec<Stage>,
        path: Vec<Waypoint>,
        looping: bool,
        geometry: &RouteGeometry,
    ) -> Result<Self, RouteError> {
        if stages.is_empty() {
            return Err(RouteError::NoStages);
        }

        if path.is_empty() {
            return Err(RouteError::EmptyPath);
        }

        let mut ids = HashSet::new();
        for stage in &stages {
            if !ids.insert(stage.id) {
                return Err(RouteError::DuplicateStage(stage.id));
            }
        }

        let stops = stages
            .iter()
            .enumerate()
            .map(|(stage_index, stage)| {
                let waypoint_index = path
                    .iter()
                    .rposition(|w| w.stage_index == stage_index)
                    .unwrap_or(0);
                Stop {
                    stage_id: stage.id,
                    name: format!("{} Stop", stage.name),
                    position: path[waypoint_index].position,
                    waypoint_index,
                    collected: false,
                }
            })
            .collect();

        log::debug!(
            "Built route '{}' with {} waypoints and {} stages",
            name,
            path.len(),
            stages.len()
        );

        Ok(Self {
            name: name.to_string(),
            stages,
            path,
            stops,
            looping,
            search_behind: geometry.search_behind,
            search_ahead: geometry.search_ahead.max(1),
            resync_distance: geometry.resync_distance,
            stop_radius: geometry.stop_radius,
            last_stage_index: None,
            last_waypoint_hint: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.path
    }

    pub fn waypoint(&self, index: usize) -> Option<&Waypoint> {
        self.path.get(index)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_by_id(&self, id: u32) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn stop_radius(&self) -> f32 {
        self.stop_radius
    }

    pub fn last_waypoint_hint(&self) -> usize {
        self.last_waypoint_hint
    }

    pub fn last_stage_index(&self) -> Option<usize> {
        self.last_stage_index
    }

    /// Index of the waypoint closest to `position`, searching a window around
    /// `hint` first. Falls back to a full scan when the window is degenerate,
    /// at route start, or when its best match looks like a local artefact
    /// (pinned to the window edge or too far away). Ties go to the lowest index.
    pub fn nearest_waypoint(&self, position: &Point, hint: usize) -> usize {
        let len = self.path.len();
        let hint = hint.min(len.saturating_sub(1));
        let window = self.search_behind + self.search_ahead;

        if hint == 0 || window >= len {
            return self.full_scan(position);
        }

        let (best, best_dist, on_edge) = if self.looping {
            self.wrapped_window_scan(position, hint)
        } else {
            self.clamped_window_scan(position, hint)
        };

        if on_edge || best_dist > self.resync_distance * self.resync_distance {
            log::debug!("Nearest waypoint resync from hint {} (windowed best {})", hint, best);
            return self.full_scan(position);
        }

        best
    }

    fn full_scan(&self, position: &Point) -> usize {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (i, waypoint) in self.path.iter().enumerate() {
            let d = (waypoint.position - *position).norm_squared();
            if d < best_dist {
                best = i;
                best_dist = d;
            }
        }
        best
    }

    fn clamped_window_scan(&self, position: &Point, hint: usize) -> (usize, f32, bool) {
        let len = self.path.len();
        let start = hint.saturating_sub(self.search_behind);
        let end = (hint + self.search_ahead).min(len);

        let mut best = start;
        let mut best_dist = f32::INFINITY;
        for i in start..end {
            let d = (self.path[i].position - *position).norm_squared();
            if d < best_dist {
                best = i;
                best_dist = d;
            }
        }

        let on_edge = (best == start && start > 0) || (best + 1 == end && end < len);
        (best, best_dist, on_edge)
    }

    fn wrapped_window_scan(&self, position: &Point, hint: usize) -> (usize, f32, bool) {
        let len = self.path.len();
        let first = len + hint - self.search_behind;
        let count = self.search_behind + self.search_ahead;

        let mut best = first % len;
        let mut best_offset = 0;
        let mut best_dist = f32::INFINITY;
        for offset in 0..count {
            let i = (first + offset) % len;
            let d = (self.path[i].position - *position).norm_squared();
            if d < best_dist || (d == best_dist && i < best) {
                best = i;
                best_offset = offset;
                best_dist = d;
            }
        }

        let on_edge = best_offset == 0 || best_offset + 1 == count;
        (best, best_dist, on_edge)
    }

    /// Waypoint reached by walking forward from `from_index` until the
    /// accumulated arc length covers `distance`. Running off the end of the
    /// path yields the first waypoint.
    pub fn lookahead_point(&self, from_index: usize, distance: f32) -> Waypoint {
        let mut accumulated = 0.0;
        for i in from_index..self.path.len().saturating_sub(1) {
            accumulated += (self.path[i + 1].position - self.path[i].position).norm();
            if accumulated >= distance {
                return self.path[i + 1];
            }
        }
        self.path[0]
    }

    /// Report a stage change exactly once per crossing.
    pub fn stage_transition(&mut self, index: usize) -> Option<Stage> {
        let stage_index = self.path.get(index).map(|w| w.stage_index).unwrap_or(0);
        match self.last_stage_index {
            Some(previous) if previous == stage_index => None,
            Some(_) => {
                self.last_stage_index = Some(stage_index);
                self.stages.get(stage_index).cloned()
            }
            None => {
                self.last_stage_index = Some(stage_index);
                None
            }
        }
    }

    /// First uncollected stop within `threshold` of `position`, marked
    /// collected on return.
    pub fn stop_proximity(&mut self, position: &Point, threshold: f32) -> Option<Stop> {
        let threshold_sq = threshold * threshold;
        let stop = self
            .stops
            .iter_mut()
            .find(|s| !s.collected && (s.position - *position).norm_squared() <= threshold_sq)?;
        stop.collected = true;
        Some(stop.clone())
    }

    /// Update the search hint from `position` and run the stage and stop
    /// checks against it.
    pub fn observe(&mut self, position: &Point) -> RouteObservation {
        let previous = self.last_waypoint_hint;
        let nearest = self.nearest_waypoint(position, previous);
        self.last_waypoint_hint = nearest;

        let len = self.path.len();
        let lap_completed =
            self.looping && len >= 4 && previous >= len * 3 / 4 && nearest < len / 4;
        if lap_completed {
            log::debug!("Lap of '{}' completed", self.name);
            self.clear_stops();
        }

        let stage = self.stage_transition(nearest);
        let stop = self.stop_proximity(position, self.stop_radius);

        RouteObservation {
            nearest,
            stage,
            stop,
            lap_completed,
        }
    }

    /// Clear collected flags, stage memory and the search hint.
    pub fn reset(&mut self) {
        self.clear_stops();
        self.last_stage_index = None;
        self.last_waypoint_hint = 0;
    }

    fn clear_stops(&mut self) {
        for stop in &mut self.stops {
            stop.collected = false;
        }
    }
}
