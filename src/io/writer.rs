use crate::descriptors::rdf::FeatureVector;
use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::Path;

/// Descriptor of one named structure, ready to be written as a CSV row.
#[derive(Debug, Clone)]
pub struct DescriptorRecord {
    pub name: String,
    pub features: FeatureVector,
}

/// Writes one row per record, with a `name` column followed by the feature labels.
///
/// All records must share the same property list.
pub fn write_csv<W: Write>(out: W, records: &[DescriptorRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    if let Some(first) = records.first() {
        let mut header = vec!["name".to_string()];
        header.extend(first.features.labels());
        writer.write_record(&header)?;

        for record in records {
            if record.features.properties() != first.features.properties() {
                bail!(
                    "Record '{}' uses properties {:?}, expected {:?}",
                    record.name,
                    record.features.properties(),
                    first.features.properties()
                );
            }
            let row = std::iter::once(record.name.clone())
                .chain(record.features.values().iter().map(f64::to_string));
            writer.write_record(row)?;
        }
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn to_csv(path: &Path, records: &[DescriptorRecord]) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("Could not create output file: {:?}", path))?;
    write_csv(file, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::properties::PropertyTable;
    use crate::core::structure::{Atom, CellParameters, Crystal};
    use crate::descriptors::bins::N_BINS;
    use crate::descriptors::rdf::{compute_rdf, RdfParams};

    fn record(name: &str, props: &[&str]) -> DescriptorRecord {
        let crystal = Crystal::new(
            CellParameters::orthorhombic(12.0, 12.0, 12.0),
            vec![Atom::new("C", [0.0, 0.0, 0.0]), Atom::new("O", [0.1, 0.0, 0.0])],
        )
        .unwrap();
        let features = compute_rdf(
            &crystal,
            PropertyTable::builtin(),
            &RdfParams::new(props.iter().copied(), -10.0, 0.001),
        )
        .unwrap();
        DescriptorRecord {
            name: name.to_string(),
            features,
        }
    }

    #[test]
    fn writes_header_and_one_row_per_record() {
        let records = vec![record("a", &["electronegativity"]), record("b", &["electronegativity"])];
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &records).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("name,electronegativity_2.000000,"));
        assert_eq!(lines[1].split(',').count(), N_BINS + 1);
        assert!(lines[2].starts_with("b,"));
    }

    #[test]
    fn rejects_mixed_property_lists() {
        let records = vec![record("a", &["electronegativity"]), record("b", &["polarizability"])];
        let mut buffer = Vec::new();
        assert!(write_csv(&mut buffer, &records).is_err());
    }

    #[test]
    fn empty_input_writes_nothing() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &[]).unwrap();
        assert!(buffer.is_empty());
    }
}
