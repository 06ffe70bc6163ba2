//! Directed road segment and its cellular-automaton update
//!
//! A segment owns a fixed run of cells feeding one intersection side. Cars
//! advance under the Nagel-Schreckenberg rule; at most one car per tick can
//! cross the far boundary and is handed to the destination intersection.

use rand::rngs::StdRng;
use rand::Rng;

use super::config::SimConfig;
use super::types::{CrossedCar, EntryPermit, IntersectionId, SegmentId, Side};

/// A directed road stretch of fixed length, feeding one intersection.
#[derive(Debug, Clone)]
pub struct Segment {
    id: SegmentId,
    length: usize,
    dest: IntersectionId,
    to_side: Side,
    max_v: u8,
    car_density: f64,
    prob_slow_down: f64,
    /// Occupancy per cell; at most one car per cell
    cells: Vec<bool>,
    /// One velocity per occupied cell, in left-to-right cell order.
    /// Every mutation must preserve this alignment.
    velocities: Vec<u8>,
    /// Consecutive empty cells from index 0, counted up to `max_v`;
    /// refreshed only during phase two so phase one reads are stable
    free_leading_cells: usize,
    /// Hand-off slot written by at most one upstream entity per tick
    inbox: Option<(usize, u8)>,
}

impl Segment {
    pub(crate) fn new(
        id: SegmentId,
        length: usize,
        dest: IntersectionId,
        to_side: Side,
        config: &SimConfig,
    ) -> Self {
        let mut segment = Self {
            id,
            length,
            dest,
            to_side,
            max_v: config.max_v,
            car_density: config.car_density,
            prob_slow_down: config.prob_slow_down,
            cells: vec![false; length],
            velocities: Vec::new(),
            free_leading_cells: 0,
            inbox: None,
        };
        segment.update_free_leading_cells();
        segment
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn dest(&self) -> IntersectionId {
        self.dest
    }

    pub fn to_side(&self) -> Side {
        self.to_side
    }

    /// Occupancy per cell after the last update
    pub fn occupancy(&self) -> &[bool] {
        &self.cells
    }

    /// Velocities of all cars, in left-to-right cell order
    pub fn velocities(&self) -> &[u8] {
        &self.velocities
    }

    /// Number of cars currently on the segment
    pub fn num_cars(&self) -> usize {
        self.velocities.len()
    }

    /// Cumulative distance covered by cars during the last update
    pub fn total_distance(&self) -> u32 {
        self.velocities.iter().map(|&v| u32::from(v)).sum()
    }

    /// Mean velocity of all cars during the last update; 0 when empty
    pub fn mean_velocity(&self) -> f64 {
        if self.velocities.is_empty() {
            0.0
        } else {
            f64::from(self.total_distance()) / self.velocities.len() as f64
        }
    }

    /// Free cells at the segment start, as read by the upstream intersection
    pub fn free_leading_cells(&self) -> usize {
        self.free_leading_cells
    }

    /// Whether a car sits within `max_v` cells of the far boundary
    pub fn has_car_near_end(&self) -> bool {
        let window = self.length.saturating_sub(self.max_v as usize);
        self.cells[window..].iter().any(|&occupied| occupied)
    }

    /// Reseed occupancy from a Bernoulli draw per cell and zero velocities.
    pub(crate) fn reset(&mut self, rng: &mut StdRng) {
        for cell in &mut self.cells {
            *cell = rng.random_bool(self.car_density);
        }
        let cars = self.cells.iter().filter(|&&occupied| occupied).count();
        self.velocities = vec![0; cars];
        self.inbox = None;
        self.update_free_leading_cells();
    }

    /// Place a single car, keeping the velocity ordering aligned.
    ///
    /// Useful for deterministic scenario setups.
    pub fn place_car(&mut self, cell: usize, velocity: u8) {
        if self.cells[cell] {
            return;
        }
        let insert_at = self.cells[..cell].iter().filter(|&&c| c).count();
        self.cells[cell] = true;
        self.velocities.insert(insert_at, velocity);
        self.update_free_leading_cells();
    }

    /// Phase one: run the automaton, possibly extended by the permit, and
    /// return the car that crossed the boundary, if any.
    pub(crate) fn advance(&mut self, permit: EntryPermit, rng: &mut StdRng) -> Option<CrossedCar> {
        if self.velocities.is_empty() {
            return None;
        }
        let extra_cells = match permit {
            EntryPermit::Open { extra_cells } => extra_cells,
            EntryPermit::Blocked => 0,
        };

        let mut positions: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter_map(|(i, &occupied)| occupied.then_some(i))
            .collect();
        debug_assert_eq!(positions.len(), self.velocities.len());

        nagel_schreckenberg_step(
            &mut positions,
            &mut self.velocities,
            self.length + extra_cells,
            self.max_v,
            self.prob_slow_down,
            rng,
        );

        // Only the last car can lie past the boundary: the rule neither
        // overtakes nor moves a car beyond the gap to its leader.
        let crossed = match positions.last().copied() {
            Some(last) if last >= self.length => {
                positions.pop();
                let velocity = self.velocities.pop().unwrap_or(0);
                Some(CrossedCar {
                    offset: last - self.length,
                    velocity,
                })
            }
            _ => None,
        };

        for cell in &mut self.cells {
            *cell = false;
        }
        for &position in &positions {
            self.cells[position] = true;
        }
        crossed
    }

    /// Offer a hand-off into this segment's inbox.
    ///
    /// Returns false if another hand-off already claimed the slot this tick.
    pub(crate) fn offer(&mut self, cell: usize, velocity: u8) -> bool {
        if self.inbox.is_some() {
            return false;
        }
        self.inbox = Some((cell, velocity));
        true
    }

    pub(crate) fn inbox_free(&self) -> bool {
        self.inbox.is_none()
    }

    /// Phase two: take delivery of a queued car and refresh the leading
    /// free-cell count.
    pub(crate) fn receive(&mut self) {
        if let Some((cell, velocity)) = self.inbox.take() {
            debug_assert!(!self.cells[cell]);
            self.cells[cell] = true;
            // Hand-offs always land ahead of every car already present,
            // so the velocity goes to the front of the sequence.
            self.velocities.insert(0, velocity);
        }
        self.update_free_leading_cells();
    }

    fn update_free_leading_cells(&mut self) {
        let window = (self.max_v as usize).min(self.length);
        self.free_leading_cells = self.cells[..window]
            .iter()
            .take_while(|&&occupied| !occupied)
            .count();
    }
}

/// One Nagel-Schreckenberg update over a working track.
///
/// `positions` must be strictly increasing with `velocities` aligned to it.
/// The phase order accelerate, limit, randomize, move is load-bearing:
/// swapping randomize and limit changes the jam statistics.
pub(crate) fn nagel_schreckenberg_step(
    positions: &mut [usize],
    velocities: &mut [u8],
    track_len: usize,
    max_v: u8,
    prob_slow_down: f64,
    rng: &mut StdRng,
) {
    let n = positions.len();

    // 1. Acceleration
    for velocity in velocities.iter_mut() {
        *velocity = velocity.saturating_add(1).min(max_v);
    }

    // 2. Slowing down to the gap ahead (or to the end of the track)
    for i in 0..n {
        let ahead = if i + 1 < n { positions[i + 1] } else { track_len };
        let gap = ahead - positions[i] - 1;
        if usize::from(velocities[i]) > gap {
            velocities[i] = gap as u8;
        }
    }

    // 3. Randomization, drawn per car in left-to-right order
    for velocity in velocities.iter_mut() {
        if rng.random_bool(prob_slow_down) {
            *velocity = velocity.saturating_sub(1);
        }
    }

    // 4. Car motion
    for i in 0..n {
        positions[i] += usize::from(velocities[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::super::config::EdgeSpec;
    use super::*;
    use rand::SeedableRng;

    fn test_config() -> SimConfig {
        let mut config = SimConfig::new(
            1,
            vec![EdgeSpec {
                length: 10,
                from: 0,
                from_side: Side::Right,
                to: 0,
                to_side: Side::Left,
            }],
        );
        config.car_density = 0.0;
        config.prob_slow_down = 0.0;
        config
    }

    fn segment(length: usize, config: &SimConfig) -> Segment {
        Segment::new(SegmentId(0), length, IntersectionId(0), Side::Left, config)
    }

    #[test]
    fn lone_car_accelerates_one_cell_per_tick() {
        let config = test_config();
        let mut seg = segment(20, &config);
        let mut rng = StdRng::seed_from_u64(7);
        seg.place_car(0, 0);

        let expected = [(1usize, 1u8), (3, 2), (6, 3), (10, 4), (15, 5)];
        for (position, velocity) in expected {
            assert!(seg.advance(EntryPermit::Blocked, &mut rng).is_none());
            assert!(seg.occupancy()[position]);
            assert_eq!(seg.velocities(), &[velocity]);
        }
    }

    #[test]
    fn gap_limits_velocity() {
        let config = test_config();
        let mut seg = segment(10, &config);
        let mut rng = StdRng::seed_from_u64(7);
        seg.place_car(0, 3);
        seg.place_car(2, 0);

        seg.advance(EntryPermit::Blocked, &mut rng);
        // Trailing car accelerates to 4 but only one cell is free ahead.
        assert!(seg.occupancy()[1]);
        assert_eq!(seg.velocities()[0], 1);
    }

    #[test]
    fn a_fast_car_never_overtakes_a_slow_leader() {
        let config = test_config();
        let mut seg = segment(10, &config);
        let mut rng = StdRng::seed_from_u64(7);
        seg.place_car(0, 5);
        seg.place_car(1, 0);

        seg.advance(EntryPermit::Blocked, &mut rng);
        // the leader creeps to cell 2; the follower is pinned behind it
        assert!(seg.occupancy()[0]);
        assert!(seg.occupancy()[2]);
        assert_eq!(seg.velocities(), &[0, 1]);
    }

    #[test]
    fn certain_braking_cancels_acceleration() {
        let mut config = test_config();
        config.prob_slow_down = 1.0;
        let mut seg = segment(10, &config);
        let mut rng = StdRng::seed_from_u64(7);
        seg.place_car(0, 0);

        seg.advance(EntryPermit::Blocked, &mut rng);
        assert!(seg.occupancy()[0]);
        assert_eq!(seg.velocities(), &[0]);
    }

    #[test]
    fn car_crosses_only_with_an_open_permit() {
        let config = test_config();
        let mut seg = segment(10, &config);
        let mut rng = StdRng::seed_from_u64(7);
        seg.place_car(9, 4);

        assert!(seg.advance(EntryPermit::Blocked, &mut rng).is_none());
        assert!(seg.occupancy()[9], "blocked car must hold at the boundary");

        let crossed = seg
            .advance(EntryPermit::Open { extra_cells: 5 }, &mut rng)
            .expect("open boundary lets the car through");
        assert_eq!(crossed.offset, 0);
        assert_eq!(crossed.velocity, 1);
        assert_eq!(seg.num_cars(), 0);
    }

    #[test]
    fn at_most_one_car_crosses_per_tick() {
        let config = test_config();
        let mut seg = segment(10, &config);
        let mut rng = StdRng::seed_from_u64(7);
        for cell in 5..10 {
            seg.place_car(cell, 5);
        }

        let crossed = seg.advance(EntryPermit::Open { extra_cells: 5 }, &mut rng);
        assert!(crossed.is_some());
        assert_eq!(seg.num_cars(), 4);
    }

    #[test]
    fn receive_prepends_velocity_and_updates_free_cells() {
        let config = test_config();
        let mut seg = segment(10, &config);
        seg.place_car(6, 2);
        assert_eq!(seg.free_leading_cells(), 5);

        assert!(seg.offer(1, 4));
        assert!(!seg.offer(0, 1), "inbox admits one hand-off per tick");
        seg.receive();

        assert!(seg.occupancy()[1]);
        assert_eq!(seg.velocities(), &[4, 2]);
        assert_eq!(seg.free_leading_cells(), 1);
    }

    #[test]
    fn reset_zeroes_velocities() {
        let mut config = test_config();
        config.car_density = 0.5;
        let mut seg = segment(50, &config);
        let mut rng = StdRng::seed_from_u64(11);
        seg.reset(&mut rng);

        let cars = seg.occupancy().iter().filter(|&&c| c).count();
        assert_eq!(seg.num_cars(), cars);
        assert!(seg.velocities().iter().all(|&v| v == 0));
    }
}
