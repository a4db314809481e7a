use glam::DVec3;

/// Spatial hash over a uniform grid of cubic cells.
///
/// Built in O(N) with a counting sort over hash buckets. With the cell edge
/// equal to the support radius, the 27 cells around a point contain every
/// particle inside its support.
pub struct SpatialHashGrid {
    cell_size: f64,
    inv_cell_size: f64,
    /// Bucket sizes; reused as scatter cursors during `build`.
    bucket_len: Vec<u32>,
    /// First slot of each bucket in `sorted`.
    bucket_start: Vec<u32>,
    /// Particle indices grouped by bucket.
    sorted: Vec<u32>,
    /// Bucket of each particle as of the last build.
    bucket_of: Vec<u32>,
    count: usize,
}

impl SpatialHashGrid {
    /// `table_size` hash buckets; `capacity` is only the initial size of the
    /// per-particle buffers.
    pub fn new(cell_size: f64, table_size: usize, capacity: usize) -> Self {
        assert!(table_size > 0, "hash table needs at least one bucket");
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            bucket_len: vec![0; table_size],
            bucket_start: vec![0; table_size],
            sorted: Vec::with_capacity(capacity),
            bucket_of: Vec::with_capacity(capacity),
            count: 0,
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Rebuild from `positions`.
    pub fn build(&mut self, positions: &[DVec3]) {
        self.count = positions.len();
        self.bucket_len.fill(0);

        self.bucket_of.clear();
        for &p in positions {
            let bucket = self.bucket(cell_of(p, self.inv_cell_size));
            self.bucket_len[bucket] += 1;
            self.bucket_of.push(bucket as u32);
        }

        // exclusive prefix sum
        let mut offset = 0;
        for (start, len) in self.bucket_start.iter_mut().zip(self.bucket_len.iter_mut()) {
            *start = offset;
            offset += *len;
            *len = 0;
        }

        self.sorted.clear();
        self.sorted.resize(self.count, 0);
        for (i, &bucket) in self.bucket_of.iter().enumerate() {
            let bucket = bucket as usize;
            let slot = self.bucket_start[bucket] + self.bucket_len[bucket];
            self.sorted[slot as usize] = i as u32;
            self.bucket_len[bucket] += 1;
        }
    }

    /// Particle indices in bucket order, as of the last `build`.
    pub fn sorted_indices(&self) -> &[u32] {
        &self.sorted[..self.count]
    }

    /// Visit every particle in the 3x3x3 cells around `pos` exactly once.
    /// No distance test.
    pub fn query_neighbors<F: FnMut(u32)>(&self, pos: DVec3, mut callback: F) {
        let [cx, cy, cz] = cell_of(pos, self.inv_cell_size);
        // colliding cells share a bucket, visit it once
        let mut seen = [0usize; 27];
        let mut n = 0;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let bucket = self.bucket([cx + dx, cy + dy, cz + dz]);
                    if seen[..n].contains(&bucket) {
                        continue;
                    }
                    seen[n] = bucket;
                    n += 1;

                    let start = self.bucket_start[bucket] as usize;
                    let end = start + self.bucket_len[bucket] as usize;
                    self.sorted[start..end].iter().for_each(|&j| callback(j));
                }
            }
        }
    }

    /// Visit every particle of `positions` strictly closer than `radius` to `pos`.
    ///
    /// `positions` must be the slice the grid was last built from.
    pub fn query_radius<F: FnMut(usize)>(
        &self,
        positions: &[DVec3],
        pos: DVec3,
        radius: f64,
        mut callback: F,
    ) {
        let r2 = radius * radius;
        self.query_neighbors(pos, |j| {
            let j = j as usize;
            if positions[j].distance_squared(pos) < r2 {
                callback(j);
            }
        });
    }

    #[inline]
    fn bucket(&self, [cx, cy, cz]: [i32; 3]) -> usize {
        let h = (cx as u32).wrapping_mul(73856093)
            ^ (cy as u32).wrapping_mul(19349663)
            ^ (cz as u32).wrapping_mul(83492791);
        h as usize % self.bucket_len.len()
    }
}

#[inline]
fn cell_of(p: DVec3, inv_cell_size: f64) -> [i32; 3] {
    (p * inv_cell_size).floor().as_ivec3().to_array()
}
