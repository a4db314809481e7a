use std::sync::atomic::{AtomicU64, Ordering};

use glam::DVec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// View a flat `[x0, y0, z0, x1, ...]` buffer as one 3-vector per particle.
///
/// Panics if the length is not a multiple of three.
#[inline]
pub fn as_blocks(values: &[f64]) -> &[DVec3] {
    bytemuck::cast_slice(values)
}

/// Mutable counterpart of [`as_blocks`].
#[inline]
pub fn as_blocks_mut(values: &mut [f64]) -> &mut [DVec3] {
    bytemuck::cast_slice_mut(values)
}

/// Flat buffer of `3 * n` reals partitioned into `n` 3-blocks.
///
/// Block `i` always holds the coordinates of particle `i`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockVector {
    values: Vec<f64>,
}

impl BlockVector {
    pub fn zeros(blocks: usize) -> Self {
        Self {
            values: vec![0.0; 3 * blocks],
        }
    }

    pub fn from_blocks(blocks: &[DVec3]) -> Self {
        Self {
            values: bytemuck::cast_slice(blocks).to_vec(),
        }
    }

    /// Number of 3-blocks (particles).
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.values.len() / 3
    }

    #[inline]
    pub fn block(&self, i: usize) -> DVec3 {
        self.blocks()[i]
    }

    #[inline]
    pub fn set_block(&mut self, i: usize, v: DVec3) {
        self.blocks_mut()[i] = v;
    }

    #[inline]
    pub fn blocks(&self) -> &[DVec3] {
        as_blocks(&self.values)
    }

    #[inline]
    pub fn blocks_mut(&mut self) -> &mut [DVec3] {
        as_blocks_mut(&mut self.values)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn resize(&mut self, blocks: usize) {
        self.values.resize(3 * blocks, 0.0);
    }

    pub fn fill_zero(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Shared accumulation buffer for concurrent floating-point sums.
///
/// Each slot stores the bit pattern of an `f64`. Additions use a
/// load / add / compare-exchange loop, so any number of threads may add into
/// the same slot without locks. The final value is independent of thread
/// interleaving up to floating-point associativity.
pub struct AtomicAccumulator {
    slots: Vec<AtomicU64>,
}

impl AtomicAccumulator {
    /// Create `len` slots initialised to `0.0`.
    pub fn new(len: usize) -> Self {
        let zero = 0.0_f64.to_bits();
        Self {
            slots: (0..len).map(|_| AtomicU64::new(zero)).collect(),
        }
    }

    /// Accumulator with one 3-slot block per particle.
    pub fn with_blocks(blocks: usize) -> Self {
        Self::new(3 * blocks)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Atomically add `value` into slot `idx`.
    #[inline]
    pub fn add(&self, idx: usize, value: f64) {
        let slot = &self.slots[idx];
        let mut current = slot.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match slot.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Add a 3-vector into block `i` (slots `3i..3i+3`).
    #[inline]
    pub fn add_block(&self, i: usize, v: DVec3) {
        self.add(3 * i, v.x);
        self.add(3 * i + 1, v.y);
        self.add(3 * i + 2, v.z);
    }

    #[inline]
    pub fn get(&self, idx: usize) -> f64 {
        f64::from_bits(self.slots[idx].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn block(&self, i: usize) -> DVec3 {
        DVec3::new(self.get(3 * i), self.get(3 * i + 1), self.get(3 * i + 2))
    }

    /// Consume the accumulator and return the plain sums.
    pub fn into_values(self) -> Vec<f64> {
        self.slots
            .into_iter()
            .map(|slot| f64::from_bits(slot.into_inner()))
            .collect()
    }
}

// ---------- dense vector kernels used by the CG solver ----------

/// Inner product `aᵀb`.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    par_iter!(a).zip(par_iter!(b)).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn squared_norm(a: &[f64]) -> f64 {
    dot(a, a)
}

/// `y += alpha * x`
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    par_iter_mut!(y)
        .zip(par_iter!(x))
        .for_each(|(yi, xi)| *yi += alpha * xi);
}

/// `y = x + beta * y`
pub fn xpby(x: &[f64], beta: f64, y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    par_iter_mut!(y)
        .zip(par_iter!(x))
        .for_each(|(yi, xi)| *yi = xi + beta * *yi);
}

/// `out = a - out`
pub fn sub_from(a: &[f64], out: &mut [f64]) {
    debug_assert_eq!(a.len(), out.len());
    par_iter_mut!(out)
        .zip(par_iter!(a))
        .for_each(|(o, ai)| *o = ai - *o);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_adds_sum_exactly() {
        // Integers well inside f64 precision, so every interleaving gives the same bits.
        let acc = AtomicAccumulator::new(4);
        std::thread::scope(|s| {
            for t in 0..8 {
                let acc = &acc;
                s.spawn(move || {
                    for k in 0..1000 {
                        acc.add(k % 4, (t + 1) as f64);
                    }
                });
            }
        });
        let values = acc.into_values();
        // each thread adds (t+1) to each slot 250 times
        let expected = 250.0 * (1..=8).sum::<i32>() as f64;
        for v in values {
            assert_eq!(v, expected);
        }
    }

    #[test]
    fn test_block_views_alias_flat_buffer() {
        let mut v = BlockVector::zeros(2);
        v.set_block(1, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(v.as_slice(), &[0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
        v.as_mut_slice()[0] = 7.0;
        assert_eq!(v.block(0), DVec3::new(7.0, 0.0, 0.0));
        assert_eq!(v.num_blocks(), 2);
    }

    #[test]
    fn test_vector_kernels() {
        let x = [1.0, 2.0, 3.0];
        let mut y = [1.0, 1.0, 1.0];
        assert_eq!(dot(&x, &y), 6.0);
        axpy(2.0, &x, &mut y);
        assert_eq!(y, [3.0, 5.0, 7.0]);
        xpby(&x, 0.5, &mut y);
        assert_eq!(y, [2.5, 4.5, 6.5]);
        sub_from(&x, &mut y);
        assert_eq!(y, [-1.5, -2.5, -3.5]);
    }
}
