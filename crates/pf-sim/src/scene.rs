use glam::DVec3;

use crate::config::SceneConfig;

/// Fluid particles on a cubic lattice of spacing `2r`, one particle
/// radius inside `fluid_min`.
pub fn fluid_block(scene: &SceneConfig, particle_radius: f64) -> Vec<DVec3> {
    let spacing = 2.0 * particle_radius;
    let [nx, ny, nz] = scene.fluid_extent;
    let origin = scene.fluid_min + DVec3::splat(particle_radius);
    let mut out = Vec::with_capacity((nx * ny * nz) as usize);
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                out.push(origin + DVec3::new(x as f64, y as f64, z as f64) * spacing);
            }
        }
    }
    out
}

/// Closed box surface sampled every particle radius.
pub fn container_walls(scene: &SceneConfig, particle_radius: f64) -> Vec<DVec3> {
    let min = scene.container_min;
    let size = scene.container_max - min;
    let cells = (size / particle_radius).round().max(DVec3::ONE);
    let (nx, ny, nz) = (cells.x as i64, cells.y as i64, cells.z as i64);
    let step = size / cells;

    let mut out = Vec::new();
    for x in 0..=nx {
        for y in 0..=ny {
            for z in 0..=nz {
                if x == 0 || x == nx || y == 0 || y == ny || z == 0 || z == nz {
                    out.push(min + DVec3::new(x as f64, y as f64, z as f64) * step);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fluid_block_inside_container() {
        let scene = SceneConfig::default();
        let r = 0.025;
        let fluid = fluid_block(&scene, r);
        assert_eq!(fluid.len(), 10 * 15 * 10);
        for p in &fluid {
            assert!(p.cmpgt(scene.container_min).all() && p.cmplt(scene.container_max).all());
        }
    }

    #[test]
    fn test_walls_cover_all_faces() {
        let scene = SceneConfig {
            container_min: DVec3::ZERO,
            container_max: DVec3::splat(1.0),
            ..SceneConfig::default()
        };
        let walls = container_walls(&scene, 0.25);
        // 5³ lattice minus the 3³ interior
        assert_eq!(walls.len(), 125 - 27);
        assert!(walls.iter().any(|p| *p == DVec3::ONE));
    }
}
