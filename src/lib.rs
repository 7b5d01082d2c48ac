// ============================================================================
// MODULE DECLARATIONS
// ============================================================================
pub mod chemistry;
pub mod config;
pub mod core;
pub mod descriptors;
pub mod io;
pub mod math;

// ============================================================================
// RE-EXPORTS (Public API)
// ============================================================================
pub use crate::chemistry::properties::{PropertyLoadError, PropertyTable};
pub use crate::config::{ConfigLoadError, DescriptorConfig};
pub use crate::core::error::DescriptorError;
pub use crate::core::structure::{Atom, CellParameters, Crystal, Lattice};
pub use crate::descriptors::bins::{BinGrid, N_BINS};
pub use crate::descriptors::rdf::{compute_rdf, FeatureVector, RdfParams};
pub use crate::descriptors::weights::PairWeights;
pub use crate::io::writer::DescriptorRecord;
pub use crate::io::{parser, writer};

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// HIGH-LEVEL INTERFACE
// ============================================================================

/// Reads one CIF and computes its APW-RDF.
///
/// The record is named after the file stem.
pub fn describe_cif(path: &Path, table: &PropertyTable, params: &RdfParams) -> Result<DescriptorRecord> {
    let crystal = parser::from_cif(path)?;
    let features = compute_rdf(&crystal, table, params)
        .with_context(|| format!("Descriptor computation failed for {:?}", path))?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    info!("Computed {} descriptor values for '{}' ({} atoms).", features.len(), name, crystal.atoms.len());

    Ok(DescriptorRecord { name, features })
}

/// Expands file paths and glob patterns into a sorted, de-duplicated list of files.
///
/// A literal path that does not exist is an error, as is a pattern that matches nothing.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let direct = PathBuf::from(input);
        if direct.is_file() {
            files.push(direct);
            continue;
        }

        let before = files.len();
        for entry in glob::glob(input).with_context(|| format!("Invalid glob pattern: '{}'", input))? {
            let path = entry?;
            if path.is_file() {
                files.push(path);
            }
        }
        if files.len() == before {
            bail!("No input files match '{}'", input);
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}
