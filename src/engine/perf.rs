use instant::Instant;
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTiming {
    pub frame_time: Duration,
    pub simulation_time: Duration,
    pub steps: u32,
}

/// Rolling window of frame and step timings for the status line.
#[derive(Debug)]
pub struct PerformanceTracker {
    window: VecDeque<FrameTiming>,
    capacity: usize,
    frame_started: Option<Instant>,
    steps_started: Option<Instant>,
    open: FrameTiming,
}

impl PerformanceTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            frame_started: None,
            steps_started: None,
            open: FrameTiming::default(),
        }
    }

    pub fn start_frame(&mut self) {
        self.frame_started = Some(Instant::now());
        self.open = FrameTiming::default();
    }

    pub fn start_simulation(&mut self) {
        self.steps_started = Some(Instant::now());
    }

    /// Close the simulation span; a frame may advance several fixed steps.
    pub fn end_simulation(&mut self, steps: u32) {
        let Some(started) = self.steps_started.take() else {
            return;
        };
        self.open.simulation_time += started.elapsed();
        self.open.steps += steps;
    }

    pub fn end_frame(&mut self) {
        let Some(started) = self.frame_started.take() else {
            return;
        };
        self.open.frame_time = started.elapsed();

        while self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(self.open);
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    fn mean_of(&self, field: impl Fn(&FrameTiming) -> Duration) -> Duration {
        match self.window.len() {
            0 => Duration::ZERO,
            n => self.window.iter().map(field).sum::<Duration>() / n as u32,
        }
    }

    pub fn average_frame_time(&self) -> Duration {
        self.mean_of(|t| t.frame_time)
    }

    pub fn average_simulation_time(&self) -> Duration {
        self.mean_of(|t| t.simulation_time)
    }

    pub fn average_steps(&self) -> f32 {
        match self.window.len() {
            0 => 0.0,
            n => self.window.iter().map(|t| t.steps).sum::<u32>() as f32 / n as f32,
        }
    }

    /// Fixed steps executed per second of real time spent simulating.
    pub fn steps_per_second(&self) -> f32 {
        let busy: Duration = self.window.iter().map(|t| t.simulation_time).sum();
        if busy.is_zero() {
            return 0.0;
        }
        self.window.iter().map(|t| t.steps).sum::<u32>() as f32 / busy.as_secs_f32()
    }

    pub fn fps(&self) -> f32 {
        let frame = self.average_frame_time();
        if frame.is_zero() {
            0.0
        } else {
            frame.as_secs_f32().recip()
        }
    }
}
