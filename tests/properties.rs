//! Invariant properties over randomized seeds and densities

use graph_traffic::simulation::{presets, SimWorld};
use proptest::prelude::*;

fn count_cars(world: &SimWorld) -> usize {
    let snapshot = world.render_snapshot();
    let on_roads: usize = snapshot
        .segments
        .iter()
        .map(|s| s.occupancy.iter().filter(|&&c| c).count())
        .sum();
    let in_interiors: usize = snapshot
        .intersections
        .iter()
        .filter_map(|i| i.interior_occupancy)
        .map(|cells| cells.iter().flatten().filter(|&&c| c).count())
        .sum();
    on_roads + in_interiors
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn automaton_state_stays_well_formed(
        seed in any::<u64>(),
        density in 0.0f64..=1.0,
        slow in 0.0f64..=1.0,
    ) {
        let mut config = presets::line(3, true, 25);
        config.car_density = density;
        config.prob_slow_down = slow;
        let mut world = SimWorld::new_with_seed(config, seed).unwrap();
        let max_v = world.config().max_v;
        let initial = count_cars(&world);

        for step in 0..3u32 {
            let action = [step as usize % 4; 3];
            let outcome = world.step(&action).unwrap();
            prop_assert!(outcome.reward >= 0.0);
            prop_assert!(outcome.info.mean_speed >= 0.0);

            let snapshot = world.render_snapshot();
            let mut total = 0;
            for segment in &snapshot.segments {
                let occupied = segment.occupancy.iter().filter(|&&c| c).count();
                prop_assert_eq!(occupied, segment.velocities.len());
                prop_assert!(segment.velocities.iter().all(|&v| v <= max_v));
                total += occupied;
            }
            prop_assert_eq!(total, initial, "closed ring must conserve cars");
        }
    }

    #[test]
    fn turn_capable_torus_conserves_cars(
        seed in any::<u64>(),
        density in 0.0f64..0.6,
    ) {
        let mut config = presets::grid(2, 2, 15);
        config.turn_capable = true;
        config.car_density = density;
        let mut world = SimWorld::new_with_seed(config, seed).unwrap();
        let initial = count_cars(&world);

        for step in 0..3u32 {
            let action = [step as usize % 4, 0, 3, 1];
            world.step(&action).unwrap();
            prop_assert_eq!(count_cars(&world), initial);
        }
    }

    #[test]
    fn reset_always_yields_standing_traffic(
        seed in any::<u64>(),
        density in 0.0f64..=1.0,
    ) {
        let mut config = presets::line(2, false, 30);
        config.car_density = density;
        let mut world = SimWorld::new_with_seed(config, seed).unwrap();
        let observation = world.reset(Some(seed ^ 0xdead_beef));
        prop_assert!(observation.mean_velocity.iter().all(|&v| v == 0.0));
        prop_assert!(observation.mean_num_cars.iter().all(|&c| c >= 0.0));
    }
}
