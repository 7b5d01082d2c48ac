use crate::core::error::DescriptorError;
use nalgebra::{Matrix3, Vector3};
use std::collections::BTreeSet;
use std::f64::consts::PI;

// ============================================================================
// CELL PARAMETERS
// ============================================================================

/// Unit-cell geometry as read from a structure source.
///
/// Angles are stored in radians. Use [`CellParameters::from_degrees`] when the
/// source reports degrees (CIF does).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    /// Cell volume reported by the source. Recomputed from lengths and angles when absent.
    pub volume: Option<f64>,
}

impl CellParameters {
    pub fn from_degrees(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
        volume: Option<f64>,
    ) -> Self {
        Self {
            a,
            b,
            c,
            alpha: alpha.to_radians(),
            beta: beta.to_radians(),
            gamma: gamma.to_radians(),
            volume,
        }
    }

    /// Orthogonal cell with edge lengths `a`, `b`, `c`.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        Self::from_degrees(a, b, c, 90.0, 90.0, 90.0, None)
    }

    /// General parallelepiped volume factor `1 - cos²α - cos²β - cos²γ + 2 cosα cosβ cosγ`.
    fn volume_factor(&self) -> f64 {
        let (ca, cb, cg) = (self.alpha.cos(), self.beta.cos(), self.gamma.cos());
        1.0 - ca.powi(2) - cb.powi(2) - cg.powi(2) + 2.0 * ca * cb * cg
    }

    /// Checks lengths, angles and (if supplied) volume, returning the volume to use.
    pub fn validated_volume(&self) -> Result<f64, DescriptorError> {
        for (name, len) in [("a", self.a), ("b", self.b), ("c", self.c)] {
            if !len.is_finite() || len <= 0.0 {
                return Err(DescriptorError::structure(format!(
                    "cell length {} must be positive, got {}",
                    name, len
                )));
            }
        }
        for (name, angle) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            if !angle.is_finite() || angle <= 0.0 || angle >= PI {
                return Err(DescriptorError::structure(format!(
                    "cell angle {} must lie in (0, pi) radians, got {}",
                    name, angle
                )));
            }
        }

        let term = self.volume_factor();
        if term <= 0.0 {
            return Err(DescriptorError::structure(
                "cell angles do not form a valid parallelepiped",
            ));
        }

        match self.volume {
            Some(v) if !v.is_finite() || v <= 0.0 => Err(DescriptorError::structure(format!(
                "cell volume must be positive, got {}",
                v
            ))),
            Some(v) => Ok(v),
            None => Ok(self.a * self.b * self.c * term.sqrt()),
        }
    }
}

// ============================================================================
// LATTICE
// ============================================================================

#[derive(Debug, Clone)]
pub struct Lattice {
    /// Fractional-to-Cartesian transform; columns are the cell vectors.
    pub matrix: Matrix3<f64>,
    pub reciprocal_matrix: Matrix3<f64>,
    pub volume: f64,
}

impl Lattice {
    pub fn new(matrix: Matrix3<f64>) -> Result<Self, DescriptorError> {
        let volume = matrix.determinant();
        if volume <= 1e-6 {
            return Err(DescriptorError::structure(
                "lattice has zero, negative or near-zero volume",
            ));
        }
        let reciprocal_matrix = matrix
            .try_inverse()
            .ok_or_else(|| DescriptorError::structure("lattice is not invertible"))?
            .transpose();
        Ok(Self {
            matrix,
            reciprocal_matrix,
            volume,
        })
    }

    /// Builds the upper-triangular triclinic transform, `a` along x and `b` in the xy plane.
    pub fn from_cell(cell: &CellParameters) -> Result<Self, DescriptorError> {
        let volume = cell.validated_volume()?;
        let (a, b, c) = (cell.a, cell.b, cell.c);
        let (ca, cb) = (cell.alpha.cos(), cell.beta.cos());
        let (cg, sg) = (cell.gamma.cos(), cell.gamma.sin());

        let matrix = Matrix3::new(
            a, b * cg, c * cb,
            0.0, b * sg, c * (ca - cb * cg) / sg,
            0.0, 0.0, volume / (a * b * sg),
        );
        Self::new(matrix)
    }

    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.matrix * frac
    }

    /// Perpendicular distances between opposite cell faces.
    pub fn face_widths(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| 1.0 / self.reciprocal_matrix.column(i).norm())
    }

    /// Largest distance for which the 27-image search is guaranteed to find the true
    /// nearest periodic image: half the smallest face width.
    pub fn minimum_image_radius(&self) -> f64 {
        0.5 * self.face_widths().into_iter().fold(f64::INFINITY, f64::min)
    }
}

// ============================================================================
// ATOMS & CRYSTAL
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: String,
    pub fractional_coords: Vector3<f64>,
}

impl Atom {
    pub fn new(element: impl Into<String>, fractional: [f64; 3]) -> Self {
        Self {
            element: element.into(),
            fractional_coords: Vector3::from(fractional),
        }
    }
}

/// A periodic structure: validated cell geometry plus its ordered atom list.
#[derive(Debug, Clone)]
pub struct Crystal {
    pub cell: CellParameters,
    pub lattice: Lattice,
    pub atoms: Vec<Atom>,
}

impl Crystal {
    pub fn new(cell: CellParameters, atoms: Vec<Atom>) -> Result<Self, DescriptorError> {
        let lattice = Lattice::from_cell(&cell)?;
        Ok(Self {
            cell,
            lattice,
            atoms,
        })
    }

    /// Distinct element symbols, sorted.
    pub fn elements(&self) -> BTreeSet<&str> {
        self.atoms.iter().map(|a| a.element.as_str()).collect()
    }

    /// Cartesian positions with every fractional coordinate first wrapped into `[0, 1)`,
    /// so any two positions differ by less than one cell vector along each axis.
    pub fn cartesian_positions(&self) -> Vec<Vector3<f64>> {
        self.atoms
            .iter()
            .map(|a| {
                let frac = a.fractional_coords;
                self.lattice.to_cartesian(&(frac - frac.map(f64::floor)))
            })
            .collect()
    }
}
