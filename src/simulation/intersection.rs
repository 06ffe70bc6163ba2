//! Intersection logic: traffic lights, routing and turn arbitration
//!
//! Two variants share the light machinery. The no-turn variant routes each
//! entrance straight through to the opposite exit. The turn-capable variant
//! adds a 2x2 interior cell grid that serializes conflicting turning
//! movements, with left turns yielding to oncoming straight traffic.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::config::SimConfig;
use super::error::{ConfigError, InvariantViolation};
use super::segment::Segment;
use super::types::{
    CrossedCar, EntryPermit, Handoff, IntersectionId, LightState, MovementKind, SegmentId, Side,
};

/// A car transiting the interior of a turn-capable intersection.
#[derive(Debug, Clone, Copy)]
struct PendingCrossing {
    from: Side,
    kind: MovementKind,
    /// Index into the movement's interior path
    path_pos: usize,
    velocity: u8,
    exit: SegmentId,
    /// Tick the car entered on; it does not move again until the next one
    entered_tick: u64,
}

/// Interior state of a turn-capable intersection.
#[derive(Debug, Clone)]
struct TurnsState {
    /// Occupancy of the 2x2 interior grid, one cell per transiting car
    cells: [[bool; 2]; 2],
    pending: Vec<PendingCrossing>,
    /// Irrevocable movement choice of the front car per entrance side
    choices: [Option<MovementKind>; 4],
    /// Available movements per entrance side, built at finalize time
    routes: [Vec<(MovementKind, SegmentId)>; 4],
    /// Cells tentatively granted this tick, serializing same-tick entries
    reserved: Vec<(usize, usize)>,
    reserved_tick: u64,
}

impl TurnsState {
    fn new() -> Self {
        Self {
            cells: [[false; 2]; 2],
            pending: Vec::new(),
            choices: [None; 4],
            routes: std::array::from_fn(|_| Vec::new()),
            reserved: Vec::new(),
            reserved_tick: 0,
        }
    }

    fn reset(&mut self) {
        self.cells = [[false; 2]; 2];
        self.pending.clear();
        self.choices = [None; 4];
        self.reserved.clear();
        self.reserved_tick = 0;
    }

    fn sync_reservations(&mut self, tick: u64) {
        if self.reserved_tick != tick {
            self.reserved.clear();
            self.reserved_tick = tick;
        }
    }

    fn route_exit(&self, from: Side, kind: MovementKind) -> Option<SegmentId> {
        self.routes[from.index()]
            .iter()
            .find(|&&(k, _)| k == kind)
            .map(|&(_, exit)| exit)
    }

    /// Pick a movement among the available routes: straight 0.5, right
    /// 0.25, left 0.25, renormalized over what exists.
    fn sample_kind(&self, from: Side, rng: &mut StdRng) -> MovementKind {
        let weighted: Vec<(MovementKind, f64)> = self.routes[from.index()]
            .iter()
            .map(|&(kind, _)| {
                let weight = match kind {
                    MovementKind::Straight => 0.5,
                    MovementKind::TurnRight => 0.25,
                    MovementKind::TurnLeft => 0.25,
                };
                (kind, weight)
            })
            .collect();
        weighted
            .choose_weighted(rng, |&(_, weight)| weight)
            .map(|&(kind, _)| kind)
            .unwrap_or(MovementKind::Straight)
    }
}

/// Interior cells crossed by a movement, in travel order.
///
/// Right-hand traffic: rows are indexed from the top, columns from the
/// left, and each entrance enters on its own corner cell. A right turn
/// uses 1 cell, straight 2, a left turn 3 (cutting the diagonal).
fn interior_path(from: Side, kind: MovementKind) -> &'static [(usize, usize)] {
    use MovementKind::*;
    use Side::*;
    match (from, kind) {
        (Left, TurnRight) => &[(1, 0)],
        (Left, Straight) => &[(1, 0), (1, 1)],
        (Left, TurnLeft) => &[(1, 0), (1, 1), (0, 1)],
        (Right, TurnRight) => &[(0, 1)],
        (Right, Straight) => &[(0, 1), (0, 0)],
        (Right, TurnLeft) => &[(0, 1), (0, 0), (1, 0)],
        (Up, TurnRight) => &[(0, 0)],
        (Up, Straight) => &[(0, 0), (1, 0)],
        (Up, TurnLeft) => &[(0, 0), (1, 0), (1, 1)],
        (Down, TurnRight) => &[(1, 1)],
        (Down, Straight) => &[(1, 1), (0, 1)],
        (Down, TurnLeft) => &[(1, 1), (0, 1), (0, 0)],
    }
}

/// Whether a left turn from `from` must yield before entering.
///
/// It yields to an opposing straight or left crossing still inside, and to
/// an opposing car at its stop line that will go straight (or has not yet
/// chosen). Two opposing left-turners do not block each other at entry, so
/// both can commit into the interior.
fn oncoming_blocks_left(
    state: &TurnsState,
    entrances: &[Option<SegmentId>; 4],
    from: Side,
    segments: &[Segment],
) -> bool {
    let opposing = from.opposite();
    if state
        .pending
        .iter()
        .any(|p| p.from == opposing && p.kind == MovementKind::Straight)
    {
        return true;
    }
    if let Some(entrance) = entrances[opposing.index()] {
        if segments[entrance.0].has_car_near_end() {
            match state.choices[opposing.index()] {
                Some(MovementKind::TurnRight) | Some(MovementKind::TurnLeft) => {}
                Some(MovementKind::Straight) | None => return true,
            }
        }
    }
    false
}

/// Whether a left turn from `from` faces an opposing left turn, inside the
/// interior or committed at its stop line.
///
/// In that case both cars may commit, but each is admitted only to its
/// entry cell: their full paths overlap, and entry-cell admission is what
/// lets the pair clear the interior instead of deadlocking.
fn mutual_left_turn(
    state: &TurnsState,
    entrances: &[Option<SegmentId>; 4],
    from: Side,
    segments: &[Segment],
) -> bool {
    let opposing = from.opposite();
    if state
        .pending
        .iter()
        .any(|p| p.from == opposing && p.kind == MovementKind::TurnLeft)
    {
        return true;
    }
    match entrances[opposing.index()] {
        Some(entrance) => {
            segments[entrance.0].has_car_near_end()
                && state.choices[opposing.index()] == Some(MovementKind::TurnLeft)
        }
        None => false,
    }
}

enum IntersectionKind {
    /// Fixed one-to-one routing: every entrance flows to the opposite exit
    NoTurns { dest: [Option<SegmentId>; 4] },
    Turns(TurnsState),
}

/// An intersection node of the road graph.
pub struct Intersection {
    id: IntersectionId,
    entrances: [Option<SegmentId>; 4],
    exits: [Option<SegmentId>; 4],
    light: LightState,
    /// Ticks remaining before GreenNs reverts to GreenEw
    countdown: u32,
    /// Selectable red durations, already converted to tick counts
    red_durations: Vec<u32>,
    max_v: u8,
    prob_slow_down: f64,
    kind: IntersectionKind,
}

impl Intersection {
    pub(crate) fn new(id: IntersectionId, config: &SimConfig) -> Self {
        let kind = if config.turn_capable {
            IntersectionKind::Turns(TurnsState::new())
        } else {
            IntersectionKind::NoTurns { dest: [None; 4] }
        };
        Self {
            id,
            entrances: [None; 4],
            exits: [None; 4],
            light: LightState::GreenEw,
            countdown: 0,
            red_durations: config.red_durations(),
            max_v: config.max_v,
            prob_slow_down: config.prob_slow_down,
            kind,
        }
    }

    pub fn id(&self) -> IntersectionId {
        self.id
    }

    pub fn light(&self) -> LightState {
        self.light
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn entrance(&self, side: Side) -> Option<SegmentId> {
        self.entrances[side.index()]
    }

    pub fn exit(&self, side: Side) -> Option<SegmentId> {
        self.exits[side.index()]
    }

    pub fn is_turn_capable(&self) -> bool {
        matches!(self.kind, IntersectionKind::Turns(_))
    }

    /// Interior occupancy grid, present for turn-capable intersections
    pub fn interior_occupancy(&self) -> Option<[[bool; 2]; 2]> {
        match &self.kind {
            IntersectionKind::Turns(state) => Some(state.cells),
            IntersectionKind::NoTurns { .. } => None,
        }
    }

    pub(crate) fn add_entrance(&mut self, side: Side, segment: SegmentId) -> Result<(), ConfigError> {
        if self.entrances[side.index()].is_some() {
            return Err(ConfigError::OccupiedSide {
                intersection: self.id.0,
                side,
            });
        }
        self.entrances[side.index()] = Some(segment);
        Ok(())
    }

    pub(crate) fn add_exit(&mut self, side: Side, segment: SegmentId) -> Result<(), ConfigError> {
        if self.exits[side.index()].is_some() {
            return Err(ConfigError::OccupiedSide {
                intersection: self.id.0,
                side,
            });
        }
        self.exits[side.index()] = Some(segment);
        Ok(())
    }

    /// Build the routing tables once all sides are wired.
    pub(crate) fn finalize(&mut self) -> Result<(), ConfigError> {
        let id = self.id;
        let entrances = self.entrances;
        let exits = self.exits;
        match &mut self.kind {
            IntersectionKind::NoTurns { dest } => {
                for side in Side::ALL {
                    if entrances[side.index()].is_none() {
                        continue;
                    }
                    let exit = exits[side.opposite().index()].ok_or(ConfigError::MissingExit {
                        intersection: id.0,
                        entrance: side,
                    })?;
                    dest[side.index()] = Some(exit);
                }
            }
            IntersectionKind::Turns(state) => {
                for side in Side::ALL {
                    if entrances[side.index()].is_none() {
                        continue;
                    }
                    let mut routes = Vec::new();
                    for kind in [
                        MovementKind::Straight,
                        MovementKind::TurnRight,
                        MovementKind::TurnLeft,
                    ] {
                        if let Some(exit) = exits[kind.exit_side(side).index()] {
                            routes.push((kind, exit));
                        }
                    }
                    if routes.is_empty() {
                        return Err(ConfigError::MissingExit {
                            intersection: id.0,
                            entrance: side,
                        });
                    }
                    state.routes[side.index()] = routes;
                }
            }
        }
        Ok(())
    }

    /// Select a red duration for this step.
    pub(crate) fn apply_action(&mut self, action: usize) -> Result<(), ConfigError> {
        let Some(&duration) = self.red_durations.get(action) else {
            return Err(ConfigError::ActionOutOfRange {
                intersection: self.id.0,
                action,
                table_len: self.red_durations.len(),
            });
        };
        if duration == 0 {
            self.light = LightState::GreenEw;
            self.countdown = 0;
        } else {
            self.light = LightState::GreenNs;
            self.countdown = duration;
        }
        Ok(())
    }

    /// Count the light down; GreenEw holds until the next external action.
    pub(crate) fn tick_light(&mut self) {
        if self.light == LightState::GreenNs && self.countdown > 0 {
            self.countdown -= 1;
            if self.countdown == 0 {
                self.light = LightState::GreenEw;
            }
        }
    }

    /// Clear per-episode state; wiring and routing stay intact.
    pub(crate) fn reset(&mut self) {
        self.light = LightState::GreenEw;
        self.countdown = 0;
        if let IntersectionKind::Turns(state) = &mut self.kind {
            state.reset();
        }
    }

    /// Decide whether the front car of `from`'s entrance may cross this
    /// tick, and how many virtual cells its segment may append.
    pub(crate) fn decide_entry(
        &mut self,
        from: Side,
        segments: &[Segment],
        tick: u64,
        rng: &mut StdRng,
    ) -> EntryPermit {
        if let IntersectionKind::NoTurns { dest } = &self.kind {
            if !self.light.allows(from.axis()) {
                return EntryPermit::Blocked;
            }
            return match dest[from.index()] {
                Some(exit) => {
                    let free = segments[exit.0].free_leading_cells();
                    if free > 0 {
                        EntryPermit::Open { extra_cells: free }
                    } else {
                        EntryPermit::Blocked
                    }
                }
                None => EntryPermit::Blocked,
            };
        }
        self.decide_turn_entry(from, segments, tick, rng)
    }

    fn decide_turn_entry(
        &mut self,
        from: Side,
        segments: &[Segment],
        tick: u64,
        rng: &mut StdRng,
    ) -> EntryPermit {
        let entrances = self.entrances;
        let light = self.light;
        let IntersectionKind::Turns(state) = &mut self.kind else {
            return EntryPermit::Blocked;
        };
        let Some(entrance) = entrances[from.index()] else {
            return EntryPermit::Blocked;
        };
        // admission is only evaluated once a car is poised to cross
        if !segments[entrance.0].has_car_near_end() {
            return EntryPermit::Blocked;
        }
        // the front car's movement is chosen when it reaches the stop
        // line and is irrevocable until it crosses
        let kind = match state.choices[from.index()] {
            Some(kind) => kind,
            None => {
                let kind = state.sample_kind(from, rng);
                state.choices[from.index()] = Some(kind);
                kind
            }
        };
        if !light.allows(from.axis()) {
            return EntryPermit::Blocked;
        }
        let Some(exit) = state.route_exit(from, kind) else {
            return EntryPermit::Blocked;
        };
        state.sync_reservations(tick);
        let path = interior_path(from, kind);
        let granted: &[(usize, usize)] = if kind == MovementKind::TurnLeft {
            if oncoming_blocks_left(state, &entrances, from, segments) {
                return EntryPermit::Blocked;
            }
            if mutual_left_turn(state, &entrances, from, segments) {
                &path[..1]
            } else {
                path
            }
        } else {
            path
        };
        if granted.iter().any(|&(r, c)| state.cells[r][c]) {
            return EntryPermit::Blocked;
        }
        if granted.iter().any(|cell| state.reserved.contains(cell)) {
            return EntryPermit::Blocked;
        }
        state.reserved.extend_from_slice(granted);
        if granted.len() == path.len() {
            EntryPermit::Open {
                extra_cells: path.len() + segments[exit.0].free_leading_cells(),
            }
        } else {
            EntryPermit::Open {
                extra_cells: granted.len(),
            }
        }
    }

    /// Take delivery of a car that crossed its segment boundary.
    ///
    /// No-turn intersections forward it to the routed destination; the
    /// turn-capable variant records it as a pending crossing, or forwards
    /// it directly if the entry move already cleared the interior.
    pub(crate) fn pass_car(
        &mut self,
        from: Side,
        car: CrossedCar,
        tick: u64,
    ) -> Result<Option<Handoff>, InvariantViolation> {
        let id = self.id;
        match &mut self.kind {
            IntersectionKind::NoTurns { dest } => {
                let Some(exit) = dest[from.index()] else {
                    return Err(InvariantViolation::UnroutedHandoff { intersection: id.0 });
                };
                Ok(Some(Handoff {
                    dest: exit,
                    cell: car.offset,
                    velocity: car.velocity,
                }))
            }
            IntersectionKind::Turns(state) => {
                let Some(kind) = state.choices[from.index()].take() else {
                    return Err(InvariantViolation::UnroutedHandoff { intersection: id.0 });
                };
                let Some(exit) = state.route_exit(from, kind) else {
                    return Err(InvariantViolation::UnroutedHandoff { intersection: id.0 });
                };
                let path = interior_path(from, kind);
                if car.offset >= path.len() {
                    // the entry move carried the car through the whole interior
                    return Ok(Some(Handoff {
                        dest: exit,
                        cell: car.offset - path.len(),
                        velocity: car.velocity,
                    }));
                }
                let (r, c) = path[car.offset];
                if state.cells[r][c] {
                    return Err(InvariantViolation::OccupiedInteriorCell { intersection: id.0 });
                }
                state.cells[r][c] = true;
                state.pending.push(PendingCrossing {
                    from,
                    kind,
                    path_pos: car.offset,
                    velocity: car.velocity,
                    exit,
                    entered_tick: tick,
                });
                Ok(None)
            }
        }
    }

    /// Advance every car transiting the interior by the automaton rule,
    /// delivering those that clear their path into their exit segments.
    pub(crate) fn advance_interior(
        &mut self,
        segments: &mut [Segment],
        tick: u64,
        rng: &mut StdRng,
    ) -> Result<(), InvariantViolation> {
        let id = self.id;
        let max_v = self.max_v;
        let prob_slow_down = self.prob_slow_down;
        let IntersectionKind::Turns(state) = &mut self.kind else {
            return Ok(());
        };

        let mut i = 0;
        while i < state.pending.len() {
            let car = state.pending[i];
            if car.entered_tick == tick {
                // its entry move already spent this tick's motion
                i += 1;
                continue;
            }
            let path = interior_path(car.from, car.kind);

            // gap to the next obstruction along this car's private track
            let mut gap = 0usize;
            let mut clear_to_exit = true;
            for &(r, c) in &path[car.path_pos + 1..] {
                if state.cells[r][c] {
                    clear_to_exit = false;
                    break;
                }
                gap += 1;
            }
            if clear_to_exit && segments[car.exit.0].inbox_free() {
                gap += segments[car.exit.0].free_leading_cells();
            }
            // a left turn holds before crossing the oncoming lane while an
            // opposing straight crossing is still inside; opposing left
            // turns never hold each other, which keeps the interior live
            if car.kind == MovementKind::TurnLeft && car.path_pos == 1 {
                let opposing_straight = state.pending.iter().any(|other| {
                    other.from == car.from.opposite() && other.kind == MovementKind::Straight
                });
                if opposing_straight {
                    gap = 0;
                }
            }

            let mut velocity = car.velocity.saturating_add(1).min(max_v);
            if usize::from(velocity) > gap {
                velocity = gap as u8;
            }
            if rng.random_bool(prob_slow_down) {
                velocity = velocity.saturating_sub(1);
            }

            let new_pos = car.path_pos + usize::from(velocity);
            let (old_r, old_c) = path[car.path_pos];
            if new_pos >= path.len() {
                if !segments[car.exit.0].offer(new_pos - path.len(), velocity) {
                    return Err(InvariantViolation::DoubleHandoff {
                        segment: car.exit.0,
                    });
                }
                state.cells[old_r][old_c] = false;
                state.pending.remove(i);
            } else {
                if new_pos != car.path_pos {
                    let (r, c) = path[new_pos];
                    debug_assert!(!state.cells[r][c]);
                    state.cells[old_r][old_c] = false;
                    state.cells[r][c] = true;
                }
                state.pending[i].path_pos = new_pos;
                state.pending[i].velocity = velocity;
                i += 1;
            }
        }

        let occupied = state.cells.iter().flatten().filter(|&&cell| cell).count();
        if occupied != state.pending.len() {
            return Err(InvariantViolation::InteriorDesync {
                intersection: id.0,
                occupied,
                pending: state.pending.len(),
            });
        }
        Ok(())
    }
}
