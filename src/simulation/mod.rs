//! Headless traffic simulation core
//!
//! A Nagel-Schreckenberg cellular automaton running on a directed road
//! graph. The module is self-contained: an external controller (an RL
//! agent, a CLI driver, a renderer) only needs `SimWorld` and the types
//! re-exported here.

mod config;
mod error;
mod intersection;
mod metrics;
pub mod presets;
mod road_graph;
mod segment;
mod types;
mod world;

pub use config::{EdgeSpec, SimConfig};
pub use error::{ConfigError, InvariantViolation, SimError};
pub use intersection::Intersection;
pub use metrics::{MetricsAccumulator, MetricsReport, Observation};
pub use road_graph::RoadGraph;
pub use segment::Segment;
pub use types::{
    Axis, CrossedCar, EntryPermit, Handoff, IntersectionId, LightState, MovementKind, SegmentId,
    Side,
};
pub use world::{GraphState, IntersectionState, SegmentState, SimWorld, StepInfo, StepOutcome};
