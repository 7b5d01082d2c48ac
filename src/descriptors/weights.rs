use crate::chemistry::properties::ElementValues;
use crate::core::error::DescriptorError;
use crate::core::structure::Atom;
use std::collections::BTreeSet;

/// Products of per-element property values for every element pair of a structure.
///
/// Elements are indexed by their position in sorted order, and the table stores
/// the full symmetric matrix with the property axis innermost, so the weights of
/// one pair are a contiguous slice.
#[derive(Debug, Clone, PartialEq)]
pub struct PairWeights {
    elements: Vec<String>,
    n_props: usize,
    weights: Vec<f64>,
}

impl PairWeights {
    /// Fails with [`DescriptorError::MissingProperty`] on the first element (in sorted
    /// order) that lacks any requested property, and with
    /// [`DescriptorError::Configuration`] when `property_names` and `values` differ in length.
    pub fn build<'a>(
        elements: impl IntoIterator<Item = &'a str>,
        property_names: &[String],
        values: &[&ElementValues],
    ) -> Result<Self, DescriptorError> {
        if property_names.len() != values.len() {
            return Err(DescriptorError::configuration(format!(
                "{} property names but {} value tables",
                property_names.len(),
                values.len()
            )));
        }
        let elements: Vec<String> = elements
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let n_props = values.len();

        // Per-element vectors first, so a missing value is reported before any product is formed.
        let mut per_element = Vec::with_capacity(elements.len());
        for element in &elements {
            let row = property_names
                .iter()
                .zip(values)
                .map(|(name, table)| {
                    table.get(element).copied().ok_or_else(|| DescriptorError::MissingProperty {
                        element: element.clone(),
                        property: name.clone(),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            per_element.push(row);
        }

        let n = elements.len();
        let mut weights = vec![0.0; n * n * n_props];
        for i in 0..n {
            for j in i..n {
                for p in 0..n_props {
                    let w = per_element[i][p] * per_element[j][p];
                    weights[(i * n + j) * n_props + p] = w;
                    weights[(j * n + i) * n_props + p] = w;
                }
            }
        }

        Ok(Self {
            elements,
            n_props,
            weights,
        })
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn n_props(&self) -> usize {
        self.n_props
    }

    pub fn element_index(&self, element: &str) -> Option<usize> {
        self.elements
            .binary_search_by(|probe| probe.as_str().cmp(element))
            .ok()
    }

    /// Index of every atom's element, in atom order.
    pub fn species_indices(&self, atoms: &[Atom]) -> Result<Vec<usize>, DescriptorError> {
        atoms
            .iter()
            .map(|a| {
                self.element_index(&a.element).ok_or_else(|| {
                    DescriptorError::structure(format!("element {} has no pair weights", a.element))
                })
            })
            .collect()
    }

    /// All property weights of the pair `(a, b)`, in request order.
    pub fn pair(&self, a: usize, b: usize) -> &[f64] {
        let start = (a * self.elements.len() + b) * self.n_props;
        &self.weights[start..start + self.n_props]
    }

    pub fn weight(&self, property: usize, a: &str, b: &str) -> Option<f64> {
        let (ia, ib) = (self.element_index(a)?, self.element_index(b)?);
        self.pair(ia, ib).get(property).copied()
    }
}
