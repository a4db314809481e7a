mod common;

use glam::DVec3;
use pf_core::state::SORT_INTERVAL;
use pf_core::{FluidModel, SolverState};

#[test]
fn test_new_state_defaults() {
    let state = SolverState::new(4);
    assert_eq!(state.len(), 4);
    assert!(!state.is_empty());
    assert_eq!(state.fluid_neighbor_counts(), &[1, 1, 1, 1]);
    assert!(state.predicted_positions().iter().all(|p| *p == DVec3::ZERO));
    assert_eq!(state.unknowns().num_blocks(), 4);
}

#[test]
fn test_resort_cadence() {
    let mut state = SolverState::new(1);
    let due: Vec<usize> = (0..3 * SORT_INTERVAL + 1)
        .filter(|_| state.resort_due())
        .collect();
    assert_eq!(due, vec![0, SORT_INTERVAL, 2 * SORT_INTERVAL, 3 * SORT_INTERVAL]);
}

#[test]
fn test_reset_restarts_cadence_and_clears_buffers() {
    let mut state = SolverState::new(2);
    state.set_old_position(0, DVec3::ONE);
    state.set_predicted(1, DVec3::X);
    state.set_fluid_neighbor_count(1, 7);
    state.unknowns_mut().set_block(0, DVec3::Y);
    assert!(state.resort_due());
    assert!(!state.resort_due());

    state.reset();
    assert_eq!(state.old_position(0), DVec3::ZERO);
    assert_eq!(state.predicted(1), DVec3::ZERO);
    assert_eq!(state.fluid_neighbor_count(1), 1);
    assert_eq!(state.unknowns().block(0), DVec3::ZERO);
    assert!(state.resort_due(), "cadence restarts after reset");
}

#[test]
fn test_apply_permutation_moves_every_buffer() {
    let mut state = SolverState::new(3);
    for i in 0..3 {
        let x = DVec3::splat(i as f64);
        state.set_old_position(i, x);
        state.set_predicted(i, 2.0 * x);
        state.set_fluid_neighbor_count(i, i as u32 + 1);
        state.unknowns_mut().set_block(i, 3.0 * x);
    }

    // perm[new] = old
    state.apply_permutation(&[2, 0, 1]);
    assert_eq!(state.old_position(0), DVec3::splat(2.0));
    assert_eq!(state.predicted(1), DVec3::ZERO);
    assert_eq!(state.fluid_neighbor_counts(), &[3, 1, 2]);
    assert_eq!(state.unknowns().block(2), DVec3::splat(3.0));
}

#[test]
fn test_resize_keeps_prefix_and_pads() {
    let mut state = SolverState::new(2);
    state.set_predicted(1, DVec3::X);
    state.resize(4);
    assert_eq!(state.len(), 4);
    assert_eq!(state.predicted(1), DVec3::X);
    assert_eq!(state.predicted(3), DVec3::ZERO);
    assert_eq!(state.fluid_neighbor_count(3), 1);
    assert_eq!(state.unknowns().num_blocks(), 4);

    state.resize(1);
    assert_eq!(state.len(), 1);
    assert_eq!(state.unknowns().as_slice().len(), 3);
}

#[test]
fn test_prepare_solve_counts_fluid_neighbors_only() {
    let params = common::quiet_params();
    let fluid = common::block(DVec3::new(0.0, 0.03, 0.0), 2, 0.04);
    let wall = common::block(DVec3::new(-0.05, 0.0, -0.05), 5, 0.025)
        .into_iter()
        .filter(|p| p.y == 0.0)
        .collect();
    let model = pf_core::SphModel::new(params, fluid, vec![wall]).unwrap();

    let mut state = SolverState::new(model.num_particles());
    state.prepare_solve(&model);
    for i in 0..model.num_particles() {
        let fluid_neighbors = (0..model.num_neighbors(i))
            .filter(|&k| model.neighbor(i, k).is_fluid())
            .count() as u32;
        assert_eq!(state.fluid_neighbor_count(i), 1 + fluid_neighbors);
        assert!(model.num_neighbors(i) as u32 + 1 > state.fluid_neighbor_count(i), "wall seen");
        assert_eq!(state.unknowns().block(i), model.position(i));
    }
}
