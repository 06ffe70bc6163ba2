//! Road graph wiring and the two-phase tick driver
//!
//! Owns all segments and intersections, wires them from an edge list, and
//! drives the fixed per-tick update order: segment motion, interior
//! turning movements, hand-off delivery, light countdowns.

use log::warn;
use petgraph::algo::connected_components;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;

use super::config::SimConfig;
use super::error::{ConfigError, InvariantViolation};
use super::intersection::Intersection;
use super::segment::Segment;
use super::types::{Handoff, IntersectionId, SegmentId};

/// The directed road graph: segments, intersections and their wiring.
///
/// Wiring is immutable after construction; only car and light state
/// changes from tick to tick.
pub struct RoadGraph {
    segments: Vec<Segment>,
    intersections: Vec<Intersection>,
    /// Topology mirror used for validation and adjacency queries
    topology: DiGraph<(), SegmentId>,
    nodes: Vec<NodeIndex>,
    tick_no: u64,
}

impl RoadGraph {
    /// Build and finalize the graph described by the configuration.
    pub fn build(config: &SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut topology = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..config.num_intersections)
            .map(|_| topology.add_node(()))
            .collect();
        let mut intersections: Vec<Intersection> = (0..config.num_intersections)
            .map(|i| Intersection::new(IntersectionId(i), config))
            .collect();

        let mut segments = Vec::with_capacity(config.edges.len());
        for edge in &config.edges {
            let id = SegmentId(segments.len());
            let segment = Segment::new(
                id,
                edge.length,
                IntersectionId(edge.to),
                edge.to_side,
                config,
            );
            intersections[edge.to].add_entrance(edge.to_side, id)?;
            intersections[edge.from].add_exit(edge.from_side, id)?;
            topology.add_edge(nodes[edge.from], nodes[edge.to], id);
            segments.push(segment);
        }

        for intersection in &mut intersections {
            intersection.finalize()?;
        }

        let components = connected_components(&topology);
        if components > 1 {
            warn!("road graph splits into {components} disconnected components");
        }

        Ok(Self {
            segments,
            intersections,
            topology,
            nodes,
            tick_no: 0,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segments[id.0]
    }

    /// Segments going directly from one intersection to another
    pub fn segments_between(
        &self,
        from: IntersectionId,
        to: IntersectionId,
    ) -> impl Iterator<Item = SegmentId> + '_ {
        self.topology
            .edges_connecting(self.nodes[from.0], self.nodes[to.0])
            .map(|edge| *edge.weight())
    }

    /// Reseed every segment and clear per-episode intersection state.
    pub(crate) fn reset(&mut self, rng: &mut StdRng) {
        for segment in &mut self.segments {
            segment.reset(rng);
        }
        for intersection in &mut self.intersections {
            intersection.reset();
        }
        self.tick_no = 0;
    }

    /// Apply one red-duration selection per intersection, in index order.
    pub fn apply_action(&mut self, action: &[usize]) -> Result<(), ConfigError> {
        if action.len() != self.intersections.len() {
            return Err(ConfigError::ActionLength {
                expected: self.intersections.len(),
                got: action.len(),
            });
        }
        for (intersection, &choice) in self.intersections.iter_mut().zip(action) {
            intersection.apply_action(choice)?;
        }
        Ok(())
    }

    /// Run one tick of the fixed update pipeline.
    ///
    /// Phase order is mandatory: all segments move (and attempt hand-offs)
    /// before any interior turning movement runs, and all deliveries land
    /// before any light counts down.
    pub fn tick(&mut self, rng: &mut StdRng) -> Result<(), InvariantViolation> {
        self.tick_no += 1;
        let tick_no = self.tick_no;

        // segment phase one: automaton motion and hand-off attempts
        for i in 0..self.segments.len() {
            let (dest, to_side) = {
                let segment = &self.segments[i];
                (segment.dest(), segment.to_side())
            };
            let permit = {
                let Self {
                    segments,
                    intersections,
                    ..
                } = self;
                intersections[dest.0].decide_entry(to_side, segments, tick_no, rng)
            };
            if let Some(car) = self.segments[i].advance(permit, rng) {
                if let Some(handoff) =
                    self.intersections[dest.0].pass_car(to_side, car, tick_no)?
                {
                    self.deliver(handoff)?;
                }
            }
        }

        // intersection phase one: cars transiting turn-capable interiors
        {
            let Self {
                segments,
                intersections,
                ..
            } = self;
            for intersection in intersections.iter_mut() {
                intersection.advance_interior(segments, tick_no, rng)?;
            }
        }

        // segment phase two: take delivery of queued cars
        for segment in &mut self.segments {
            segment.receive();
        }

        // intersection phase two: light countdowns
        for intersection in &mut self.intersections {
            intersection.tick_light();
        }

        Ok(())
    }

    fn deliver(&mut self, handoff: Handoff) -> Result<(), InvariantViolation> {
        let segment = &mut self.segments[handoff.dest.0];
        if !segment.offer(handoff.cell, handoff.velocity) {
            return Err(InvariantViolation::DoubleHandoff {
                segment: handoff.dest.0,
            });
        }
        Ok(())
    }
}
