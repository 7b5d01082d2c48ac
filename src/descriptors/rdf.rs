use crate::chemistry::properties::PropertyTable;
use crate::core::error::DescriptorError;
use crate::core::structure::Crystal;
use crate::descriptors::bins::{BinGrid, N_BINS};
use crate::descriptors::weights::PairWeights;
use crate::math::periodic::ImageOffsets;
use crate::math::Vec3;
use tracing::{debug, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Decimal places kept in the final descriptor values.
pub const OUTPUT_DECIMALS: i32 = 12;

/// Property names the pretrained CO2 capture models use, in column order.
///
/// Only the names, smoothing and scale follow those models. The values in the
/// bundled [`PropertyTable::builtin`] are generic reference data and are not the
/// models' training inputs; supply the matching table to reproduce their features.
pub const DEFAULT_PROPERTIES: [&str; 3] = ["electronegativity", "vdWaalsVolume", "polarizability"];
pub const DEFAULT_SMOOTHING: f64 = -10.0;
pub const DEFAULT_SCALE: f64 = 0.001;

// ============================================================================
// PARAMETERS
// ============================================================================

/// Engine parameters for one APW-RDF evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RdfParams {
    /// Property names, in output order.
    pub properties: Vec<String>,
    /// Gaussian coefficient in `exp(smoothing * (bin - d)^2)`. Must be negative:
    /// a positive value makes peaks grow instead of decay, and is rejected rather
    /// than sign-corrected.
    pub smoothing: f64,
    /// Output multiplier, applied together with the `1 / n_atoms` normalisation.
    pub scale: f64,
    /// Fail instead of warning when the cell is too small for the 27-image search
    /// to cover the whole bin grid.
    pub strict_minimum_image: bool,
}

impl Default for RdfParams {
    fn default() -> Self {
        Self {
            properties: DEFAULT_PROPERTIES.iter().map(|p| p.to_string()).collect(),
            smoothing: DEFAULT_SMOOTHING,
            scale: DEFAULT_SCALE,
            strict_minimum_image: false,
        }
    }
}

impl RdfParams {
    pub fn new<S: Into<String>>(properties: impl IntoIterator<Item = S>, smoothing: f64, scale: f64) -> Self {
        Self {
            properties: properties.into_iter().map(Into::into).collect(),
            smoothing,
            scale,
            strict_minimum_image: false,
        }
    }

    pub fn with_strict_minimum_image(mut self, strict: bool) -> Self {
        self.strict_minimum_image = strict;
        self
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.properties.is_empty() {
            return Err(DescriptorError::configuration("no properties requested"));
        }
        if !self.smoothing.is_finite() || self.smoothing >= 0.0 {
            return Err(DescriptorError::configuration(format!(
                "smoothing factor must be negative, got {}",
                self.smoothing
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(DescriptorError::configuration(format!(
                "scale factor must be positive, got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// Flattened APW-RDF: one block of [`N_BINS`] values per property, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    properties: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// The bin block of the `index`-th requested property.
    pub fn property_block(&self, index: usize) -> Option<&[f64]> {
        self.values.chunks_exact(N_BINS).nth(index)
    }

    /// Column names `"{property}_{bin centre}"`, aligned with [`Self::values`].
    pub fn labels(&self) -> Vec<String> {
        let grid = BinGrid::shared();
        self.properties
            .iter()
            .flat_map(|p| grid.iter().map(move |bin| format!("{}_{:.6}", p, bin)))
            .collect()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Computes the atomic-property-weighted radial distribution function of `crystal`.
///
/// Every unordered atom pair contributes a Gaussian centred on its minimum-image
/// distance, weighted by the product of the two elements' property values. The
/// accumulated grid is scaled by `params.scale / n_atoms` and rounded to
/// [`OUTPUT_DECIMALS`] places.
///
/// All preconditions (parameters, geometry, property coverage of every element)
/// are checked before the pairwise pass; a failure never yields partial output.
///
/// The 27-image search is exact only for distances below
/// [`Lattice::minimum_image_radius`](crate::core::structure::Lattice::minimum_image_radius).
/// Beyond that a closer image outside the neighbouring shell may exist and the
/// tail of the grid is an approximation.
#[instrument(skip_all, fields(n_atoms = crystal.atoms.len(), n_props = params.properties.len()))]
pub fn compute_rdf(
    crystal: &Crystal,
    table: &PropertyTable,
    params: &RdfParams,
) -> Result<FeatureVector, DescriptorError> {
    params.validate()?;

    let n_atoms = crystal.atoms.len();
    if n_atoms < 2 {
        return Err(DescriptorError::structure(format!(
            "at least 2 atoms are required, got {}",
            n_atoms
        )));
    }
    crystal.cell.validated_volume()?;

    let values = table.resolve(&params.properties)?;
    let weights = PairWeights::build(crystal.elements(), &params.properties, &values)?;

    let grid = BinGrid::shared();
    let radius = crystal.lattice.minimum_image_radius();
    if radius < grid.last() {
        if params.strict_minimum_image {
            return Err(DescriptorError::structure(format!(
                "minimum-image radius {:.3} is below the last bin at {:.3}",
                radius,
                grid.last()
            )));
        }
        warn!(
            "Minimum-image radius {:.3} is below the last bin at {:.3}; long-range bins are approximate.",
            radius,
            grid.last()
        );
    }

    let species = weights.species_indices(&crystal.atoms)?;
    let positions = crystal.cartesian_positions();
    let images = ImageOffsets::for_lattice(&crystal.lattice);

    debug!(
        "Accumulating {} pairs over {} elements.",
        n_atoms * (n_atoms - 1) / 2,
        weights.elements().len()
    );

    let pass = PairPass {
        grid: grid.centers(),
        smoothing: params.smoothing,
        weights: &weights,
        species: &species,
        positions: &positions,
        images: &images,
    };
    let len = weights.n_props() * N_BINS;

    #[cfg(feature = "parallel")]
    let accumulated = (0..n_atoms)
        .into_par_iter()
        .fold(
            || vec![0.0; len],
            |mut acc, i| {
                pass.accumulate_from(i, &mut acc);
                acc
            },
        )
        .reduce(
            || vec![0.0; len],
            |mut left, right| {
                left.iter_mut().zip(&right).for_each(|(l, r)| *l += r);
                left
            },
        );

    #[cfg(not(feature = "parallel"))]
    let accumulated = (0..n_atoms).fold(vec![0.0; len], |mut acc, i| {
        pass.accumulate_from(i, &mut acc);
        acc
    });

    let n = n_atoms as f64;
    let values = accumulated
        .into_iter()
        .map(|v| round_decimals(v * params.scale / n, OUTPUT_DECIMALS))
        .collect();

    Ok(FeatureVector {
        properties: params.properties.clone(),
        values,
    })
}

/// Read-only state shared by every pair of one call.
struct PairPass<'a> {
    grid: &'a [f64],
    smoothing: f64,
    weights: &'a PairWeights,
    species: &'a [usize],
    positions: &'a [Vec3],
    images: &'a ImageOffsets,
}

impl PairPass<'_> {
    /// Adds the contributions of all pairs `(i, j)` with `j > i` into `acc`.
    fn accumulate_from(&self, i: usize, acc: &mut [f64]) {
        let origin = &self.positions[i];
        for j in (i + 1)..self.positions.len() {
            let distance = self.images.minimum_distance(origin, &self.positions[j]);
            let pair = self.weights.pair(self.species[i], self.species[j]);

            for (b, &center) in self.grid.iter().enumerate() {
                let gaussian = (self.smoothing * (center - distance).powi(2)).exp();
                for (p, &w) in pair.iter().enumerate() {
                    acc[p * N_BINS + b] += gaussian * w;
                }
            }
        }
    }
}

/// Round half to even at `decimals` places.
fn round_decimals(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::{Atom, CellParameters};

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    fn table() -> PropertyTable {
        let mut table = PropertyTable::new();
        table
            .insert("en", "Na", 0.93)
            .insert("en", "Cl", 3.16)
            .insert("q", "Na", 1.0)
            .insert("q", "Cl", -1.0);
        table
    }

    fn rock_salt() -> Crystal {
        Crystal::new(
            CellParameters::orthorhombic(5.64, 5.64, 5.64),
            vec![
                Atom::new("Na", [0.0, 0.0, 0.0]),
                Atom::new("Na", [0.5, 0.5, 0.0]),
                Atom::new("Na", [0.5, 0.0, 0.5]),
                Atom::new("Na", [0.0, 0.5, 0.5]),
                Atom::new("Cl", [0.5, 0.0, 0.0]),
                Atom::new("Cl", [0.0, 0.5, 0.0]),
                Atom::new("Cl", [0.0, 0.0, 0.5]),
                Atom::new("Cl", [0.5, 0.5, 0.5]),
            ],
        )
        .unwrap()
    }

    fn params() -> RdfParams {
        RdfParams::new(["en"], -10.0, 1.0)
    }

    #[test]
    fn output_length_is_props_times_bins() {
        let fv = compute_rdf(&rock_salt(), &table(), &RdfParams::new(["en", "q"], -10.0, 1.0)).unwrap();
        assert_eq!(fv.len(), 2 * N_BINS);
        assert_eq!(fv.labels().len(), fv.len());
        assert_eq!(fv.property_block(1).map(<[f64]>::len), Some(N_BINS));
        assert!(fv.property_block(2).is_none());
    }

    #[test]
    fn single_pair_matches_hand_computed_gaussian() {
        let crystal = Crystal::new(
            CellParameters::orthorhombic(20.0, 20.0, 20.0),
            vec![Atom::new("Na", [0.0, 0.0, 0.0]), Atom::new("Cl", [0.15, 0.0, 0.0])],
        )
        .unwrap();
        let fv = compute_rdf(&crystal, &table(), &params()).unwrap();
        let grid = BinGrid::shared();
        let weight = 0.93 * 3.16;
        for (b, &center) in grid.iter().enumerate() {
            let expected = round_decimals((-10.0 * (center - 3.0f64).powi(2)).exp() * weight / 2.0, 12);
            assert!(f64_approx_equal(fv.values()[b], expected), "bin {}", b);
        }
        // Peak sits at the bin closest to 3.0 Å.
        let peak = fv
            .values()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let nearest = grid
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - 3.0).abs().total_cmp(&(b.1 - 3.0).abs()))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, nearest);
    }

    #[test]
    fn uses_wrapped_distance_not_direct_one() {
        // Direct separation 7.0 Å, periodic image at 3.0 Å.
        let crystal = Crystal::new(
            CellParameters::orthorhombic(10.0, 30.0, 30.0),
            vec![Atom::new("Na", [0.1, 0.0, 0.0]), Atom::new("Cl", [0.8, 0.0, 0.0])],
        )
        .unwrap();
        let fv = compute_rdf(&crystal, &table(), &params()).unwrap();
        let grid = BinGrid::shared();
        let weight = 0.93 * 3.16;
        for (b, &center) in grid.iter().enumerate() {
            let wrapped = round_decimals((-10.0 * (center - 3.0f64).powi(2)).exp() * weight / 2.0, 12);
            assert!(f64_approx_equal(fv.values()[b], wrapped), "bin {}", b);
        }
        let near_seven = grid.iter().position(|&c| c > 7.0).unwrap();
        assert_eq!(fv.values()[near_seven], 0.0);
    }

    #[test]
    fn coordinates_outside_the_cell_match_their_in_cell_site() {
        let pair_at = |x: f64| {
            Crystal::new(
                CellParameters::orthorhombic(10.0, 10.0, 10.0),
                vec![Atom::new("Na", [0.0, 0.0, 0.0]), Atom::new("Cl", [x, 0.0, 0.0])],
            )
            .unwrap()
        };
        let in_cell = compute_rdf(&pair_at(0.3), &table(), &params()).unwrap();
        for x in [2.3, -0.7, 1.3] {
            let shifted = compute_rdf(&pair_at(x), &table(), &params()).unwrap();
            for (a, b) in in_cell.values().iter().zip(shifted.values()) {
                assert!(f64_approx_equal(*a, *b), "x = {}", x);
            }
        }

        let grid = BinGrid::shared();
        let peak = in_cell
            .values()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| grid[i])
            .unwrap();
        assert!((peak - 3.0).abs() < 0.1, "peak at {}", peak);
    }

    #[test]
    fn non_negative_for_non_negative_properties() {
        let fv = compute_rdf(&rock_salt(), &table(), &params()).unwrap();
        assert!(fv.values().iter().all(|&v| v >= 0.0));
        assert!(fv.values().iter().any(|&v| v > 0.0));
    }

    #[test]
    fn sign_follows_property_products() {
        // Only Na-Cl pairs: every product of charges is -1.
        let crystal = Crystal::new(
            CellParameters::orthorhombic(20.0, 20.0, 20.0),
            vec![Atom::new("Na", [0.0, 0.0, 0.0]), Atom::new("Cl", [0.12, 0.0, 0.0])],
        )
        .unwrap();
        let fv = compute_rdf(&crystal, &table(), &RdfParams::new(["q"], -10.0, 1.0)).unwrap();
        assert!(fv.values().iter().all(|&v| v <= 0.0));
        assert!(fv.values().iter().any(|&v| v < 0.0));
    }

    #[test]
    fn swapping_atoms_does_not_change_output() {
        let crystal = rock_salt();
        let mut swapped = crystal.clone();
        swapped.atoms.swap(0, 7);
        swapped.atoms.swap(2, 5);

        let props = RdfParams::new(["en", "q"], -10.0, 1.0);
        let a = compute_rdf(&crystal, &table(), &props).unwrap();
        let b = compute_rdf(&swapped, &table(), &props).unwrap();
        for (x, y) in a.values().iter().zip(b.values()) {
            assert!(f64_approx_equal(*x, *y));
        }
    }

    #[test]
    fn output_is_linear_in_scale() {
        let crystal = rock_salt();
        let single = compute_rdf(&crystal, &table(), &RdfParams::new(["en"], -10.0, 0.5)).unwrap();
        let double = compute_rdf(&crystal, &table(), &RdfParams::new(["en"], -10.0, 1.0)).unwrap();
        for (s, d) in single.values().iter().zip(double.values()) {
            assert!((2.0 * s - d).abs() < 1e-11);
        }
    }

    #[test]
    fn duplicated_atoms_follow_count_normalisation() {
        let crystal = rock_salt();
        let mut doubled = crystal.clone();
        doubled.atoms.extend(crystal.atoms.iter().cloned());

        let base = compute_rdf(&crystal, &table(), &params()).unwrap();
        let dup = compute_rdf(&doubled, &table(), &params()).unwrap();

        // Four times the pair sum over twice the atoms; the zero-distance self pairs
        // only touch bins far below 2 Å and vanish.
        for (b, d) in base.values().iter().zip(dup.values()) {
            assert!((2.0 * b - d).abs() < 1e-9);
        }
        assert_ne!(base.values(), dup.values());
    }

    #[test]
    fn rejects_single_atom() {
        let crystal = Crystal::new(
            CellParameters::orthorhombic(10.0, 10.0, 10.0),
            vec![Atom::new("Na", [0.0, 0.0, 0.0])],
        )
        .unwrap();
        let err = compute_rdf(&crystal, &table(), &params()).unwrap_err();
        assert!(matches!(err, DescriptorError::Structure(_)));
    }

    #[test]
    fn rejects_bad_parameters() {
        let crystal = rock_salt();
        for bad in [
            RdfParams::new(Vec::<String>::new(), -10.0, 1.0),
            RdfParams::new(["en"], 0.0, 1.0),
            RdfParams::new(["en"], 2.0, 1.0),
            RdfParams::new(["en"], f64::NAN, 1.0),
            RdfParams::new(["en"], -10.0, 0.0),
            RdfParams::new(["en"], -10.0, -1.0),
            RdfParams::new(["missing"], -10.0, 1.0),
        ] {
            let err = compute_rdf(&crystal, &table(), &bad).unwrap_err();
            assert!(matches!(err, DescriptorError::Configuration(_)), "{:?}", bad);
        }
    }

    #[test]
    fn missing_property_fails_before_pairwise_pass() {
        let mut crystal = rock_salt();
        crystal.atoms.push(Atom::new("Xx", [0.25, 0.25, 0.25]));
        let err = compute_rdf(&crystal, &table(), &params()).unwrap_err();
        assert_eq!(
            err,
            DescriptorError::MissingProperty {
                element: "Xx".to_string(),
                property: "en".to_string(),
            }
        );
    }

    #[test]
    fn strict_mode_rejects_small_cells() {
        let strict = params().with_strict_minimum_image(true);
        let err = compute_rdf(&rock_salt(), &table(), &strict).unwrap_err();
        assert!(matches!(err, DescriptorError::Structure(_)));

        let big = Crystal::new(
            CellParameters::orthorhombic(61.0, 61.0, 61.0),
            vec![Atom::new("Na", [0.0, 0.0, 0.0]), Atom::new("Cl", [0.05, 0.0, 0.0])],
        )
        .unwrap();
        assert!(compute_rdf(&big, &table(), &strict).is_ok());
    }

    #[test]
    fn default_params_match_capture_models() {
        let params = RdfParams::default();
        assert_eq!(params.properties, ["electronegativity", "vdWaalsVolume", "polarizability"]);
        assert_eq!(params.smoothing, -10.0);
        assert_eq!(params.scale, 0.001);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn rounding_keeps_twelve_decimals() {
        assert_eq!(round_decimals(0.1234567890123456, 12), 0.123456789012);
        assert_eq!(round_decimals(1e-13, 12), 0.0);
    }
}
