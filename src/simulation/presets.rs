//! Road network presets
//!
//! Edge-list builders for the standard wrap-around layouts. Both produce
//! closed networks: every segment leaving the last intersection of a row
//! or column wraps to the first, so cars never leave the system.

use super::config::{EdgeSpec, SimConfig};
use super::types::Side;

/// A row of intersections joined left to right, wrapping around.
///
/// With `two_way` a mirrored right-to-left ring is added, giving every
/// intersection traffic on both horizontal sides.
pub fn line(intersections: usize, two_way: bool, segment_len: usize) -> SimConfig {
    let mut edges = Vec::new();
    for x in 0..intersections {
        edges.push(EdgeSpec {
            length: segment_len,
            from: x,
            from_side: Side::Right,
            to: (x + 1) % intersections,
            to_side: Side::Left,
        });
    }
    if two_way {
        for x in 0..intersections {
            edges.push(EdgeSpec {
                length: segment_len,
                from: (x + 1) % intersections,
                from_side: Side::Left,
                to: x,
                to_side: Side::Right,
            });
        }
    }
    SimConfig::new(intersections, edges)
}

/// A cols-by-rows torus grid with traffic in all four directions.
///
/// Every intersection gets entrances and exits on all four sides, which
/// also makes this the natural layout for turn-capable intersections.
pub fn grid(cols: usize, rows: usize, segment_len: usize) -> SimConfig {
    let count = cols * rows;
    let mut edges = Vec::new();
    for x in 0..count {
        let row = x / cols;
        let east = row * cols + (x + 1) % cols;
        let south = (x + cols) % count;

        // eastbound and westbound rings along the row
        edges.push(EdgeSpec {
            length: segment_len,
            from: x,
            from_side: Side::Right,
            to: east,
            to_side: Side::Left,
        });
        edges.push(EdgeSpec {
            length: segment_len,
            from: east,
            from_side: Side::Left,
            to: x,
            to_side: Side::Right,
        });
        // southbound and northbound rings along the column
        edges.push(EdgeSpec {
            length: segment_len,
            from: x,
            from_side: Side::Down,
            to: south,
            to_side: Side::Up,
        });
        edges.push(EdgeSpec {
            length: segment_len,
            from: south,
            from_side: Side::Up,
            to: x,
            to_side: Side::Down,
        });
    }
    SimConfig::new(count, edges)
}
