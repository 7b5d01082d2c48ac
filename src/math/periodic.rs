use crate::core::structure::Lattice;
use crate::math::{Mat3, Vec3};

/// Number of periodic images searched per neighbour: the full {-1, 0, 1}³ block.
pub const N_IMAGES: usize = 27;

/// Integer translations spanning {-1, 0, 1}³, self image included.
///
/// Ordered with the last component varying fastest.
pub fn supercell_translations() -> [Vec3; N_IMAGES] {
    let mut out = [Vec3::zeros(); N_IMAGES];
    let mut idx = 0;
    for i in -1..=1 {
        for j in -1..=1 {
            for k in -1..=1 {
                out[idx] = Vec3::new(i as f64, j as f64, k as f64);
                idx += 1;
            }
        }
    }
    out
}

/// Cartesian displacement of each of the 27 neighbouring cells.
#[derive(Debug, Clone)]
pub struct ImageOffsets {
    offsets: [Vec3; N_IMAGES],
}

impl ImageOffsets {
    pub fn new(matrix: &Mat3) -> Self {
        Self {
            offsets: supercell_translations().map(|t| matrix * t),
        }
    }

    pub fn for_lattice(lattice: &Lattice) -> Self {
        Self::new(&lattice.matrix)
    }

    /// Minimum-image distance from `origin` to any of the 27 images of `target`.
    ///
    /// Both points must come from fractional coordinates wrapped into `[0, 1)`, as
    /// [`Crystal::cartesian_positions`](crate::core::structure::Crystal::cartesian_positions)
    /// returns them. Exact only while the true nearest image lies within the neighbouring shell, i.e. for
    /// separations below [`Lattice::minimum_image_radius`].
    pub fn minimum_distance(&self, origin: &Vec3, target: &Vec3) -> f64 {
        let direct = target - origin;
        self.offsets
            .iter()
            .map(|offset| (direct + offset).norm())
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::CellParameters;

    #[test]
    fn translations_cover_the_full_block_once() {
        let t = supercell_translations();
        assert_eq!(t.len(), 27);
        assert_eq!(t[0], Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(t[13], Vec3::zeros());
        assert_eq!(t[26], Vec3::new(1.0, 1.0, 1.0));
        for (i, a) in t.iter().enumerate() {
            for b in t.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn wraps_across_the_cell_boundary() {
        let lattice = Lattice::from_cell(&CellParameters::orthorhombic(10.0, 10.0, 10.0)).unwrap();
        let images = ImageOffsets::for_lattice(&lattice);
        let a = lattice.to_cartesian(&Vec3::new(0.05, 0.0, 0.0));
        let b = lattice.to_cartesian(&Vec3::new(0.95, 0.0, 0.0));
        // Direct separation is 9.0, the wrapped one is 1.0.
        assert!((images.minimum_distance(&a, &b) - 1.0).abs() < 1e-9);
        assert!((images.minimum_distance(&b, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn same_site_has_zero_distance() {
        let lattice = Lattice::from_cell(&CellParameters::orthorhombic(4.0, 5.0, 6.0)).unwrap();
        let images = ImageOffsets::for_lattice(&lattice);
        let p = lattice.to_cartesian(&Vec3::new(0.3, 0.6, 0.9));
        assert_eq!(images.minimum_distance(&p, &p), 0.0);
    }

    #[test]
    fn triclinic_wrap_uses_skewed_vectors() {
        let cell = CellParameters::from_degrees(6.0, 6.0, 6.0, 90.0, 90.0, 60.0, None);
        let lattice = Lattice::from_cell(&cell).unwrap();
        let images = ImageOffsets::for_lattice(&lattice);
        let a = lattice.to_cartesian(&Vec3::new(0.0, 0.0, 0.0));
        let b = lattice.to_cartesian(&Vec3::new(0.9, 0.9, 0.0));
        // The (-1, -1, 0) image sits at (-0.1, -0.1, 0): 0.1 * |a + b| with a 60° angle.
        let expected = 0.1 * (6.0f64 * 3.0f64.sqrt());
        assert!((images.minimum_distance(&a, &b) - expected).abs() < 1e-9);
    }
}
