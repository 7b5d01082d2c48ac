use crate::core::error::DescriptorError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

/// Values of one property, keyed by element symbol.
pub type ElementValues = HashMap<String, f64>;

const BUILTIN_TABLE: &str = include_str!("../../data/atomic_properties.toml");

static BUILTIN: LazyLock<PropertyTable> = LazyLock::new(|| {
    PropertyTable::from_toml_str(BUILTIN_TABLE).expect("bundled atomic property table is valid TOML")
});

#[derive(Debug, Error)]
pub enum PropertyLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Per-element scalar properties, e.g. `electronegativity -> { "C": 2.55, ... }`.
///
/// On disk this is a TOML document with one table per property:
///
/// ```toml
/// [electronegativity]
/// C = 2.55
/// O = 3.44
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PropertyTable {
    properties: BTreeMap<String, ElementValues>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table compiled into the crate (electronegativity, vdWaalsVolume, polarizability).
    ///
    /// Generic reference values; descriptors computed with it are not comparable to
    /// features built from a different source table.
    pub fn builtin() -> &'static PropertyTable {
        &BUILTIN
    }

    pub fn load(path: &Path) -> Result<Self, PropertyLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| PropertyLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| PropertyLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, PropertyLoadError> {
        toml::from_str(content).map_err(|e| PropertyLoadError::Toml {
            path: "<inline>".to_string(),
            source: e,
        })
    }

    pub fn insert(&mut self, property: &str, element: &str, value: f64) -> &mut Self {
        self.properties
            .entry(property.to_string())
            .or_default()
            .insert(element.to_string(), value);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn property(&self, name: &str) -> Option<&ElementValues> {
        self.properties.get(name)
    }

    pub fn get(&self, property: &str, element: &str) -> Option<f64> {
        self.properties.get(property)?.get(element).copied()
    }

    /// Looks up every requested property, in request order.
    ///
    /// A name missing from the whole table is a configuration problem, distinct
    /// from an element missing a value.
    pub fn resolve<'a>(&'a self, requested: &[String]) -> Result<Vec<&'a ElementValues>, DescriptorError> {
        requested
            .iter()
            .map(|name| {
                self.property(name).ok_or_else(|| {
                    DescriptorError::configuration(format!(
                        "unknown property '{}' (available: {})",
                        name,
                        self.names().collect::<Vec<_>>().join(", ")
                    ))
                })
            })
            .collect()
    }
}
