use crate::config::ClockParams;

/// What one fixed step owes the slower timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockTick {
    pub economy_ticks: u32,
}

/// Fixed-step clock. Real frame time is queued into whole `fixed_dt` steps;
/// each step also advances the economy timer.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    fixed_dt: f32,
    economy_interval: f64,
    max_substeps: u32,
    frame_accumulator: f64,
    economy_accumulator: f64,
    elapsed: f64,
    steps: u64,
}

impl SimulationClock {
    pub fn new(params: &ClockParams) -> Self {
        Self {
            fixed_dt: params.fixed_dt,
            economy_interval: params.economy_interval as f64,
            max_substeps: params.max_substeps.max(1),
            frame_accumulator: 0.0,
            economy_accumulator: 0.0,
            elapsed: 0.0,
            steps: 0,
        }
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Simulated seconds since creation.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Queue `real_elapsed` seconds of wall time and return how many fixed
    /// steps are due. Backlog past `max_substeps` is dropped so a long stall
    /// cannot spiral.
    pub fn queue(&mut self, real_elapsed: f32) -> u32 {
        if real_elapsed.is_finite() && real_elapsed > 0.0 {
            self.frame_accumulator += real_elapsed as f64;
        }

        let dt = self.fixed_dt as f64;
        let mut due = 0;
        while self.frame_accumulator >= dt && due < self.max_substeps {
            self.frame_accumulator -= dt;
            due += 1;
        }

        if self.frame_accumulator >= dt {
            log::warn!(
                "Simulation falling behind, dropping {:.3}s of backlog",
                self.frame_accumulator
            );
            self.frame_accumulator %= dt;
        }

        due
    }

    /// Advance simulated time by `dt` and report which slow timers fired.
    pub fn tick(&mut self, dt: f32) -> ClockTick {
        let dt = dt.max(0.0) as f64;
        self.elapsed += dt;
        self.steps += 1;

        let mut tick = ClockTick::default();
        if self.economy_interval > 0.0 {
            self.economy_accumulator += dt;
            while self.economy_accumulator >= self.economy_interval {
                self.economy_accumulator -= self.economy_interval;
                tick.economy_ticks += 1;
            }
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> SimulationClock {
        SimulationClock::new(&ClockParams {
            fixed_dt: 0.25,
            economy_interval: 0.5,
            max_substeps: 4,
        })
    }

    #[test]
    fn queue_splits_wall_time_into_fixed_steps() {
        let mut clock = clock();
        assert_eq!(clock.queue(0.6), 2);
        assert_eq!(clock.queue(0.15), 1);
        assert_eq!(clock.queue(0.0), 0);
    }

    #[test]
    fn queue_drops_backlog_past_the_substep_cap() {
        let mut clock = clock();
        assert_eq!(clock.queue(10.0), 4);
        assert_eq!(clock.queue(0.0), 0);
    }

    #[test]
    fn economy_timer_fires_every_interval() {
        let mut clock = clock();
        let fired: u32 = (0..8).map(|_| clock.tick(0.25).economy_ticks).sum();
        assert_eq!(fired, 4);
        assert!((clock.elapsed() - 2.0).abs() < 1e-9);
        assert_eq!(clock.steps(), 8);
    }
}
