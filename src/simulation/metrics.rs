//! Reward and observation extraction
//!
//! Samples segment state after every tick and folds it into the reward
//! (total distance driven, a throughput proxy) and the per-segment
//! observation averaged over the ticks of one external step.

use super::segment::Segment;

/// Per-segment observation over one external step.
///
/// Both vectors are aligned with segment index order.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Mean velocity per segment, averaged over the step's ticks
    pub mean_velocity: Vec<f64>,
    /// Mean car count per segment, averaged over the step's ticks
    pub mean_num_cars: Vec<f64>,
}

/// Aggregates folded out of the accumulator at the end of a step.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    /// Total distance driven by all cars over all ticks of the step
    pub reward: f64,
    pub observation: Observation,
    /// Mean velocity over every car observation in the step; 0 if none
    pub mean_speed: f64,
    /// Mean number of cars on the road per tick; 0 before the first tick
    pub mean_n_cars: f64,
}

/// Per-step mutable counters sampled once per tick.
#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    tick_count: u32,
    total_distance: f64,
    mean_velocity_sum: Vec<f64>,
    car_count_sum: Vec<f64>,
}

impl MetricsAccumulator {
    pub fn new(num_segments: usize) -> Self {
        Self {
            tick_count: 0,
            total_distance: 0.0,
            mean_velocity_sum: vec![0.0; num_segments],
            car_count_sum: vec![0.0; num_segments],
        }
    }

    /// Zero all counters at the start of an external step.
    pub fn reset(&mut self) {
        self.tick_count = 0;
        self.total_distance = 0.0;
        self.mean_velocity_sum.fill(0.0);
        self.car_count_sum.fill(0.0);
    }

    /// Fold one tick's segment state into the counters.
    pub fn sample(&mut self, segments: &[Segment]) {
        self.tick_count += 1;
        for (i, segment) in segments.iter().enumerate() {
            self.total_distance += f64::from(segment.total_distance());
            self.mean_velocity_sum[i] += segment.mean_velocity();
            self.car_count_sum[i] += segment.num_cars() as f64;
        }
    }

    /// Aggregate the counters into reward, observation and summary rates.
    pub fn report(&self) -> MetricsReport {
        let ticks = f64::from(self.tick_count.max(1));
        let observation = Observation {
            mean_velocity: self.mean_velocity_sum.iter().map(|&v| v / ticks).collect(),
            mean_num_cars: self.car_count_sum.iter().map(|&c| c / ticks).collect(),
        };
        let total_cars: f64 = self.car_count_sum.iter().sum();
        let mean_speed = if total_cars > 0.0 {
            self.total_distance / total_cars
        } else {
            0.0
        };
        let mean_n_cars = if self.tick_count > 0 {
            total_cars / f64::from(self.tick_count)
        } else {
            0.0
        };
        MetricsReport {
            reward: self.total_distance,
            observation,
            mean_speed,
            mean_n_cars,
        }
    }

    /// Instantaneous observation of the current segment state, used for
    /// the post-reset observation before any tick has run.
    pub fn snapshot_observation(segments: &[Segment]) -> Observation {
        Observation {
            mean_velocity: segments.iter().map(Segment::mean_velocity).collect(),
            mean_num_cars: segments.iter().map(|s| s.num_cars() as f64).collect(),
        }
    }
}
