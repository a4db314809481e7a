use glam::DVec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::math::BlockVector;
use crate::model::FluidModel;

/// Ticks between two spatial resorts of the particle store.
pub const SORT_INTERVAL: usize = 100;

/// Per-particle solver scratch that persists across ticks.
///
/// - `old_position`: position before prediction, for the finite-difference velocity
/// - `predicted`: momentum target `S` of the implicit solve
/// - `fluid_neighbor_count`: `1 + #fluid neighbours`, always at least 1
/// - `unknowns`: positions being solved for, one 3-block per particle
pub struct SolverState {
    old_position: Vec<DVec3>,
    predicted: Vec<DVec3>,
    fluid_neighbor_count: Vec<u32>,
    unknowns: BlockVector,
    sort_counter: usize,
}

impl SolverState {
    pub fn new(count: usize) -> Self {
        Self {
            old_position: vec![DVec3::ZERO; count],
            predicted: vec![DVec3::ZERO; count],
            fluid_neighbor_count: vec![1; count],
            unknowns: BlockVector::zeros(count),
            sort_counter: 0,
        }
    }

    /// Size the state for `model` and seed the predicted positions and
    /// unknowns with the current particle positions.
    pub fn init<M: FluidModel>(model: &M) -> Self {
        let n = model.num_particles();
        let mut state = Self::new(n);
        for i in 0..n {
            let x = model.position(i);
            state.old_position[i] = x;
            state.predicted[i] = x;
            state.unknowns.set_block(i, x);
        }
        state
    }

    /// Clear every buffer to zero (neighbour counts to 1) and restart the
    /// resort cadence.
    pub fn reset(&mut self) {
        self.old_position.iter_mut().for_each(|x| *x = DVec3::ZERO);
        self.predicted.iter_mut().for_each(|x| *x = DVec3::ZERO);
        self.fluid_neighbor_count.iter_mut().for_each(|c| *c = 1);
        self.unknowns.fill_zero();
        self.sort_counter = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.old_position.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.old_position.is_empty()
    }

    /// Follow a change in particle count. New slots start zeroed.
    pub fn resize(&mut self, count: usize) {
        if count == self.len() {
            return;
        }
        log::debug!("solver state resized {} -> {}", self.len(), count);
        self.old_position.resize(count, DVec3::ZERO);
        self.predicted.resize(count, DVec3::ZERO);
        self.fluid_neighbor_count.resize(count, 1);
        self.unknowns.resize(count);
    }

    #[inline]
    pub fn old_position(&self, i: usize) -> DVec3 {
        self.old_position[i]
    }

    #[inline]
    pub fn set_old_position(&mut self, i: usize, x: DVec3) {
        self.old_position[i] = x;
    }

    #[inline]
    pub fn predicted(&self, i: usize) -> DVec3 {
        self.predicted[i]
    }

    #[inline]
    pub fn set_predicted(&mut self, i: usize, x: DVec3) {
        self.predicted[i] = x;
    }

    #[inline]
    pub fn fluid_neighbor_count(&self, i: usize) -> u32 {
        self.fluid_neighbor_count[i]
    }

    #[inline]
    pub fn set_fluid_neighbor_count(&mut self, i: usize, count: u32) {
        debug_assert!(count >= 1);
        self.fluid_neighbor_count[i] = count;
    }

    pub fn fluid_neighbor_counts(&self) -> &[u32] {
        &self.fluid_neighbor_count
    }

    pub fn predicted_positions(&self) -> &[DVec3] {
        &self.predicted
    }

    pub fn unknowns(&self) -> &BlockVector {
        &self.unknowns
    }

    pub fn unknowns_mut(&mut self) -> &mut BlockVector {
        &mut self.unknowns
    }

    /// Borrow the read-only solve inputs next to the mutable unknowns.
    pub(crate) fn split_for_solve(&mut self) -> (&[DVec3], &[u32], &mut BlockVector) {
        (&self.predicted, &self.fluid_neighbor_count, &mut self.unknowns)
    }

    /// Advance the resort cadence. Returns true on ticks where the particle
    /// store should be resorted (every [`SORT_INTERVAL`] ticks, starting with
    /// the first).
    pub fn resort_due(&mut self) -> bool {
        let due = self.sort_counter % SORT_INTERVAL == 0;
        self.sort_counter = self.sort_counter.wrapping_add(1);
        due
    }

    /// The particle store was reordered with `perm[new] = old`; reorder the
    /// per-particle state the same way.
    pub fn apply_permutation(&mut self, perm: &[usize]) {
        debug_assert_eq!(perm.len(), self.len());
        self.old_position = perm.iter().map(|&i| self.old_position[i]).collect();
        self.predicted = perm.iter().map(|&i| self.predicted[i]).collect();
        self.fluid_neighbor_count = perm.iter().map(|&i| self.fluid_neighbor_count[i]).collect();
        let blocks: Vec<DVec3> = perm.iter().map(|&i| self.unknowns.block(i)).collect();
        self.unknowns = BlockVector::from_blocks(&blocks);
    }

    /// Copy particle positions into the unknowns and recount fluid neighbours.
    pub fn prepare_solve<M: FluidModel>(&mut self, model: &M) {
        par_iter_mut!(self.unknowns.blocks_mut())
            .enumerate()
            .for_each(|(i, x)| *x = model.position(i));

        par_iter_mut!(self.fluid_neighbor_count)
            .enumerate()
            .for_each(|(i, count)| {
                let fluid = (0..model.num_neighbors(i))
                    .filter(|&k| model.neighbor(i, k).is_fluid())
                    .count();
                *count = 1 + fluid as u32;
            });
    }
}
