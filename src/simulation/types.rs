//! Core types for the traffic simulation
//!
//! Standalone types shared by segments, intersections and the road graph.

/// Index of a segment within the road graph (assigned in edge order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(pub usize);

/// Index of an intersection within the road graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntersectionId(pub usize);

/// Side of an intersection where a segment attaches
///
/// A segment attached to the `Left` side carries eastbound traffic into
/// the intersection, `Up` carries southbound traffic, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Up,
    Down,
    Left,
    Right,
}

/// Flow axis through an intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Side {
    /// All sides, in the fixed order used for side-keyed arrays
    pub const ALL: [Side; 4] = [Side::Up, Side::Down, Side::Left, Side::Right];

    /// Stable index for side-keyed arrays
    pub fn index(self) -> usize {
        match self {
            Side::Up => 0,
            Side::Down => 1,
            Side::Left => 2,
            Side::Right => 3,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Up => Side::Down,
            Side::Down => Side::Up,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Exit side reached by a right turn from this entrance side
    pub fn right_turn_exit(self) -> Side {
        match self {
            Side::Left => Side::Down,
            Side::Down => Side::Right,
            Side::Right => Side::Up,
            Side::Up => Side::Left,
        }
    }

    /// Exit side reached by a left turn from this entrance side
    pub fn left_turn_exit(self) -> Side {
        match self {
            Side::Left => Side::Up,
            Side::Up => Side::Right,
            Side::Right => Side::Down,
            Side::Down => Side::Left,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Side::Up | Side::Down => Axis::NorthSouth,
            Side::Left | Side::Right => Axis::EastWest,
        }
    }
}

/// Traffic-light state of an intersection
///
/// Only one axis flows at a time; there is no separate left-turn phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightState {
    /// Vertical (up/down) entrances flow
    GreenNs,
    /// Horizontal (left/right) entrances flow
    GreenEw,
}

impl LightState {
    /// Whether entrances on the given axis may cross
    pub fn allows(self, axis: Axis) -> bool {
        match self {
            LightState::GreenNs => axis == Axis::NorthSouth,
            LightState::GreenEw => axis == Axis::EastWest,
        }
    }
}

/// Movement a car performs while crossing a turn-capable intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementKind {
    Straight,
    TurnRight,
    TurnLeft,
}

impl MovementKind {
    /// Exit side this movement reaches from the given entrance side
    pub fn exit_side(self, entrance: Side) -> Side {
        match self {
            MovementKind::Straight => entrance.opposite(),
            MovementKind::TurnRight => entrance.right_turn_exit(),
            MovementKind::TurnLeft => entrance.left_turn_exit(),
        }
    }
}

/// Permission granted by an intersection to a segment for the current tick
///
/// `Open` carries the number of virtual trailing cells the segment may
/// append before its automaton step, simulating crossing capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPermit {
    Blocked,
    Open { extra_cells: usize },
}

/// A car that crossed its segment boundary during phase one
///
/// `offset` counts cells past the boundary (0 = first cell beyond it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossedCar {
    pub offset: usize,
    pub velocity: u8,
}

/// A car queued for delivery into a destination segment's inbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handoff {
    pub dest: SegmentId,
    pub cell: usize,
    pub velocity: u8,
}
