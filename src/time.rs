/// Simulation clock owned by a single behaviour.
///
/// Advanced only by the `delta_time` the host passes to `on_update`, so two runs fed the
/// same deltas observe the same timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    elapsed: f64,
    delta: f64,
    ticks: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(elapsed: f64) -> Self {
        Self { elapsed, ..Self::default() }
    }

    pub fn advance(&mut self, delta_time: f64) {
        self.delta = delta_time;
        self.elapsed += delta_time;
        self.ticks += 1;
    }

    pub fn delta_seconds(&self) -> f64 {
        self.delta
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
