//! Simulation configuration
//!
//! All tunables consumed by the core: automaton parameters, traffic-light
//! timing, episode shape and graph topology. Validated once before the
//! road graph is built.

use super::error::ConfigError;
use super::types::Side;

/// A directed road segment in the topology description.
///
/// `(100, 0, Right, 1, Left)` is a segment of length 100 going from the
/// right side of intersection 0 to the left side of intersection 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSpec {
    /// Segment length in cells
    pub length: usize,
    /// Source intersection index
    pub from: usize,
    /// Side of the source intersection this segment leaves from
    pub from_side: Side,
    /// Destination intersection index
    pub to: usize,
    /// Side of the destination intersection this segment feeds
    pub to_side: Side,
}

/// Full configuration surface of a simulation instance.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Probability that a cell starts occupied after a reset
    pub car_density: f64,
    /// Maximum velocity in cells per tick
    pub max_v: u8,
    /// Per-car probability of stochastic braking each tick
    pub prob_slow_down: f64,
    /// Table of selectable red-light durations, in seconds
    pub red_durations_raw: Vec<u32>,
    /// Wall-clock seconds represented by one tick
    pub seconds_per_tick: f64,
    /// Wall-clock seconds represented by one external step
    pub step_length_seconds: f64,
    /// Number of external steps before an episode is done
    pub max_steps_per_episode: u32,
    /// Whether intersections arbitrate turning movements
    pub turn_capable: bool,
    /// Number of intersections in the road graph
    pub num_intersections: usize,
    /// Directed segments wiring the intersections together
    pub edges: Vec<EdgeSpec>,
}

impl SimConfig {
    /// Create a configuration with the default automaton and light
    /// parameters for the given topology.
    pub fn new(num_intersections: usize, edges: Vec<EdgeSpec>) -> Self {
        Self {
            car_density: 0.125,
            max_v: 5,
            prob_slow_down: 0.1,
            red_durations_raw: vec![0, 20, 40, 60],
            seconds_per_tick: 2.7,
            step_length_seconds: 60.0,
            max_steps_per_episode: 200,
            turn_capable: false,
            num_intersections,
            edges,
        }
    }

    /// Red durations converted to tick counts.
    pub fn red_durations(&self) -> Vec<u32> {
        self.red_durations_raw
            .iter()
            .map(|&raw| (raw as f64 / self.seconds_per_tick).round() as u32)
            .collect()
    }

    /// Number of ticks run per external step.
    pub fn ticks_per_step(&self) -> u32 {
        ((self.step_length_seconds / self.seconds_per_tick) as u32).max(1)
    }

    /// Check every parameter range before the graph is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.car_density) {
            return Err(ConfigError::InvalidParameter {
                name: "car_density",
                reason: format!("{} is not a probability", self.car_density),
            });
        }
        if !(0.0..=1.0).contains(&self.prob_slow_down) {
            return Err(ConfigError::InvalidParameter {
                name: "prob_slow_down",
                reason: format!("{} is not a probability", self.prob_slow_down),
            });
        }
        if self.max_v == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_v",
                reason: "cars must be able to move at least one cell".into(),
            });
        }
        if self.red_durations_raw.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "red_durations_raw",
                reason: "at least one red duration is required".into(),
            });
        }
        if self.seconds_per_tick <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "seconds_per_tick",
                reason: "must be positive".into(),
            });
        }
        if let Some(&raw) = self
            .red_durations_raw
            .iter()
            .find(|&&raw| raw as f64 > self.step_length_seconds)
        {
            return Err(ConfigError::InvalidParameter {
                name: "red_durations_raw",
                reason: format!(
                    "duration {raw}s exceeds the step length of {}s",
                    self.step_length_seconds
                ),
            });
        }
        if self.num_intersections == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "num_intersections",
                reason: "the road graph needs at least one intersection".into(),
            });
        }
        if self.edges.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "edges",
                reason: "the road graph needs at least one segment".into(),
            });
        }
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.length == 0 {
                return Err(ConfigError::InvalidParameter {
                    name: "edges",
                    reason: format!("edge {i} has zero length"),
                });
            }
            if edge.from >= self.num_intersections {
                return Err(ConfigError::UnknownIntersection {
                    edge: i,
                    index: edge.from,
                });
            }
            if edge.to >= self.num_intersections {
                return Err(ConfigError::UnknownIntersection {
                    edge: i,
                    index: edge.to,
                });
            }
        }
        Ok(())
    }
}
