use crate::core::structure::{Atom, CellParameters, Crystal};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const CELL_LENGTHS: [&str; 3] = ["_cell_length_a", "_cell_length_b", "_cell_length_c"];
const CELL_ANGLES: [&str; 3] = ["_cell_angle_alpha", "_cell_angle_beta", "_cell_angle_gamma"];
const CELL_VOLUME: &str = "_cell_volume";

/// Parses a float value from a CIF string, safely removing uncertainty parentheses.
/// Example: "1.234(5)" -> 1.234
fn parse_cif_float(s: &str) -> Result<f64> {
    let clean_s = s.split('(').next().unwrap_or(s);
    clean_s.parse::<f64>().with_context(|| format!("Failed to parse '{}' as float", s))
}

fn is_loop_terminator(line: &str) -> bool {
    line.starts_with('_') || line.starts_with("loop_") || line.starts_with("data_")
}

/// Parses a CIF file into a Crystal structure.
pub fn from_cif(path: &Path) -> Result<Crystal> {
    let contents = fs::read_to_string(path).with_context(|| format!("Could not read CIF file: {:?}", path))?;
    from_cif_str(&contents).with_context(|| format!("Invalid CIF file: {:?}", path))
}

/// Parses CIF text, reading only the first data block.
///
/// Extracts the six cell parameters (angles in degrees), the optional
/// `_cell_volume`, and the `_atom_site_type_symbol` / `_atom_site_fract_{x,y,z}`
/// loop columns. Everything else is ignored.
pub fn from_cif_str(contents: &str) -> Result<Crystal> {
    let lines: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    let mut cell_params: HashMap<&str, f64> = HashMap::new();
    let mut atoms = Vec::new();
    let mut seen_block = false;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if line.starts_with("data_") {
            if seen_block {
                debug!("Ignoring additional data block '{}'.", line);
                break;
            }
            seen_block = true;
        } else if line.starts_with("_cell_") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                // "?" and "." are CIF placeholders for unknown values.
                if let Ok(value) = parse_cif_float(parts[1]) {
                    cell_params.insert(parts[0], value);
                }
            }
        } else if line.starts_with("loop_") {
            i += 1;

            let mut headers = Vec::new();
            while i < lines.len() && lines[i].starts_with('_') {
                headers.push(lines[i].split_whitespace().next().unwrap_or(lines[i]));
                i += 1;
            }

            if headers.contains(&"_atom_site_fract_x") {
                let column = |name: &str| {
                    headers
                        .iter()
                        .position(|&h| h == name)
                        .with_context(|| format!("CIF missing '{}'", name))
                };
                let symbol_idx = column("_atom_site_type_symbol")?;
                let x_idx = column("_atom_site_fract_x")?;
                let y_idx = column("_atom_site_fract_y")?;
                let z_idx = column("_atom_site_fract_z")?;
                let max_idx = symbol_idx.max(x_idx).max(y_idx).max(z_idx);

                while i < lines.len() && !is_loop_terminator(lines[i]) {
                    let fields: Vec<&str> = lines[i].split_whitespace().collect();
                    if fields.len() > max_idx {
                        let x = parse_cif_float(fields[x_idx])?;
                        let y = parse_cif_float(fields[y_idx])?;
                        let z = parse_cif_float(fields[z_idx])?;
                        atoms.push(Atom::new(fields[symbol_idx], [x, y, z]));
                    } else {
                        warn!("Skipping short atom-site row: '{}'", lines[i]);
                    }
                    i += 1;
                }
                // Step back one, as the outer loop increments i
                i -= 1;
            } else {
                // Not an atom loop: skip its rows.
                while i < lines.len() && !is_loop_terminator(lines[i]) {
                    i += 1;
                }
                i -= 1;
            }
        }
        i += 1;
    }

    let get_param = |key: &str| -> Result<f64> {
        cell_params.get(key).copied().ok_or_else(|| anyhow!("CIF missing tag: {}", key))
    };

    let [a, b, c] = [get_param(CELL_LENGTHS[0])?, get_param(CELL_LENGTHS[1])?, get_param(CELL_LENGTHS[2])?];
    let [alpha, beta, gamma] = [get_param(CELL_ANGLES[0])?, get_param(CELL_ANGLES[1])?, get_param(CELL_ANGLES[2])?];
    let volume = cell_params.get(CELL_VOLUME).copied();

    if atoms.is_empty() {
        bail!("No atoms found in CIF file.");
    }

    let cell = CellParameters::from_degrees(a, b, c, alpha, beta, gamma, volume);
    debug!(
        "Parsed cell ({:.4}, {:.4}, {:.4} | {:.2}, {:.2}, {:.2}) with {} atoms; volume {}.",
        a,
        b,
        c,
        alpha,
        beta,
        gamma,
        atoms.len(),
        if volume.is_some() { "from file" } else { "computed" }
    );
    Ok(Crystal::new(cell, atoms)?)
}
