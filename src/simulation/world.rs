//! Main simulation world that ties everything together
//!
//! `SimWorld` owns the road graph, the seeded RNG and the metrics
//! accumulator, and exposes the step/reset boundary an external
//! controller drives.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::SimConfig;
use super::error::{ConfigError, SimError};
use super::metrics::{MetricsAccumulator, MetricsReport, Observation};
use super::road_graph::RoadGraph;
use super::types::{LightState, SegmentId};

/// Result of one external step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    /// Total distance driven during the step, a throughput proxy
    pub reward: f64,
    /// True once the episode reached its configured step limit
    pub done: bool,
    pub info: StepInfo,
}

/// Auxiliary per-step diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Mean velocity over every car observation in the step
    pub mean_speed: f64,
    /// Mean number of cars on the road per tick
    pub mean_n_cars: f64,
    /// Raw red durations (seconds) selected by the applied action
    pub applied_red_durations: Vec<u32>,
}

/// Read-only view of one segment's state.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentState {
    pub id: SegmentId,
    pub length: usize,
    pub occupancy: Vec<bool>,
    pub velocities: Vec<u8>,
}

/// Read-only view of one intersection's state.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionState {
    pub light: LightState,
    pub countdown: u32,
    /// Interior cell occupancy, present for turn-capable intersections
    pub interior_occupancy: Option<[[bool; 2]; 2]>,
}

/// Read-only snapshot of the whole graph, for external renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphState {
    pub segments: Vec<SegmentState>,
    pub intersections: Vec<IntersectionState>,
}

/// The main simulation world.
///
/// Multiple independent worlds can run side by side; all state, including
/// the RNG, lives in the instance.
pub struct SimWorld {
    config: SimConfig,
    graph: RoadGraph,
    rng: StdRng,
    metrics: MetricsAccumulator,
    current_step: u32,
}

impl SimWorld {
    /// Create a world with an entropy-derived seed.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let seed = rand::rng().random();
        Self::new_with_seed(config, seed)
    }

    /// Create a world with a fixed seed for reproducible episodes.
    pub fn new_with_seed(config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        let graph = RoadGraph::build(&config)?;
        let num_segments = graph.segments().len();
        let mut world = Self {
            config,
            graph,
            rng: StdRng::seed_from_u64(seed),
            metrics: MetricsAccumulator::new(num_segments),
            current_step: 0,
        };
        world.reset(None);
        Ok(world)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Place a car on a segment, for deterministic scenario setups.
    pub fn place_car(&mut self, segment: SegmentId, cell: usize, velocity: u8) {
        self.graph.segment_mut(segment).place_car(cell, velocity);
    }

    /// Start a new episode: reseed every segment, zero the metrics and
    /// return the observation of the freshly sampled state.
    ///
    /// With `seed` given, the RNG restarts from it, making the episode
    /// reproducible; otherwise the current RNG stream continues.
    pub fn reset(&mut self, seed: Option<u64>) -> Observation {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.graph.reset(&mut self.rng);
        self.metrics.reset();
        self.current_step = 0;
        MetricsAccumulator::snapshot_observation(self.graph.segments())
    }

    /// Apply a light-timing action without running any ticks.
    ///
    /// One element per intersection, each indexing the red-duration table.
    pub fn apply_action(&mut self, action: &[usize]) -> Result<(), ConfigError> {
        self.graph.apply_action(action)
    }

    /// Run a single tick and sample the metrics.
    pub fn tick(&mut self) -> Result<(), SimError> {
        self.graph.tick(&mut self.rng)?;
        self.metrics.sample(self.graph.segments());
        Ok(())
    }

    /// Aggregated metrics of the ticks run since the last step began.
    pub fn read_metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    /// Run one external step: apply the action once, then run the
    /// configured number of ticks, sampling metrics after each.
    pub fn step(&mut self, action: &[usize]) -> Result<StepOutcome, SimError> {
        self.graph.apply_action(action)?;
        self.metrics.reset();
        for _ in 0..self.config.ticks_per_step() {
            self.graph.tick(&mut self.rng)?;
            self.metrics.sample(self.graph.segments());
        }
        self.current_step += 1;
        let done = self.current_step >= self.config.max_steps_per_episode;

        let report = self.metrics.report();
        debug!(
            "step {}: reward {:.1}, {:.1} cars on the road",
            self.current_step, report.reward, report.mean_n_cars
        );
        let applied_red_durations = action
            .iter()
            .map(|&choice| self.config.red_durations_raw[choice])
            .collect();
        Ok(StepOutcome {
            observation: report.observation,
            reward: report.reward,
            done,
            info: StepInfo {
                mean_speed: report.mean_speed,
                mean_n_cars: report.mean_n_cars,
                applied_red_durations,
            },
        })
    }

    /// Read-only snapshot of occupancy, velocities and light state.
    ///
    /// The simulation never depends on this being called.
    pub fn render_snapshot(&self) -> GraphState {
        GraphState {
            segments: self
                .graph
                .segments()
                .iter()
                .map(|segment| SegmentState {
                    id: segment.id(),
                    length: segment.length(),
                    occupancy: segment.occupancy().to_vec(),
                    velocities: segment.velocities().to_vec(),
                })
                .collect(),
            intersections: self
                .graph
                .intersections()
                .iter()
                .map(|intersection| IntersectionState {
                    light: intersection.light(),
                    countdown: intersection.countdown(),
                    interior_occupancy: intersection.interior_occupancy(),
                })
                .collect(),
        }
    }
}
