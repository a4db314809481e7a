use glam::DVec3;

/// Point set id of the fluid. Every other id names a static boundary set.
pub const FLUID_SET: u32 = 0;

/// Reference to a neighbouring particle: `(point_set_id, point_id)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct NeighborRef {
    pub point_set_id: u32,
    pub point_id: u32,
}

impl NeighborRef {
    #[inline]
    pub fn fluid(point_id: usize) -> Self {
        Self {
            point_set_id: FLUID_SET,
            point_id: point_id as u32,
        }
    }

    /// Neighbour in boundary set `boundary_index` (stored as set id `boundary_index + 1`).
    #[inline]
    pub fn boundary(boundary_index: usize, point_id: usize) -> Self {
        Self {
            point_set_id: boundary_index as u32 + 1,
            point_id: point_id as u32,
        }
    }

    #[inline]
    pub fn is_fluid(&self) -> bool {
        self.point_set_id == FLUID_SET
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.point_id as usize
    }
}

/// SoA fluid particle storage
pub struct ParticleSet {
    pub count: usize,
    pub position: Vec<DVec3>,
    pub velocity: Vec<DVec3>,
    pub acceleration: Vec<DVec3>,
    pub mass: Vec<f64>,
    /// Last SPH density estimate (refreshed with the non-pressure forces)
    pub density: Vec<f64>,
}

impl ParticleSet {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            position: vec![DVec3::ZERO; count],
            velocity: vec![DVec3::ZERO; count],
            acceleration: vec![DVec3::ZERO; count],
            mass: vec![1.0; count],
            density: vec![0.0; count],
        }
    }

    /// Build a set at rest from positions, all with the same mass.
    pub fn from_positions(positions: Vec<DVec3>, mass: f64) -> Self {
        let count = positions.len();
        Self {
            position: positions,
            mass: vec![mass; count],
            ..Self::new(count)
        }
    }

    /// Reorder every attribute so that new slot `k` holds old particle `perm[k]`.
    pub fn permute(&mut self, perm: &[usize]) {
        debug_assert_eq!(perm.len(), self.count);
        self.position = perm.iter().map(|&i| self.position[i]).collect();
        self.velocity = perm.iter().map(|&i| self.velocity[i]).collect();
        self.acceleration = perm.iter().map(|&i| self.acceleration[i]).collect();
        self.mass = perm.iter().map(|&i| self.mass[i]).collect();
        self.density = perm.iter().map(|&i| self.density[i]).collect();
    }
}

/// Static boundary particles (never moved by the solver).
pub struct BoundarySet {
    pub position: Vec<DVec3>,
    /// Pseudo-mass ψ of each boundary particle (Akinci 2012)
    pub psi: Vec<f64>,
}

impl BoundarySet {
    pub fn new(position: Vec<DVec3>) -> Self {
        let n = position.len();
        Self {
            position,
            psi: vec![0.0; n],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.position.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }
}
