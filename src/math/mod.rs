//! Fixed-size linear algebra used by the descriptor engine.
//!
//! Everything here is 3×3 or length-3; `nalgebra`'s statically sized types
//! cover the matrix-vector product and Euclidean norm the engine relies on.

pub mod periodic;

/// Cartesian or fractional 3-vector.
pub type Vec3 = nalgebra::Vector3<f64>;
/// Cell transform matrix.
pub type Mat3 = nalgebra::Matrix3<f64>;
