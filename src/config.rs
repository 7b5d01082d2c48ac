use crate::chemistry::properties::{PropertyLoadError, PropertyTable};
use crate::descriptors::rdf::{RdfParams, DEFAULT_PROPERTIES, DEFAULT_SCALE, DEFAULT_SMOOTHING};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
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
    #[error(transparent)]
    Properties(#[from] PropertyLoadError),
}

/// Descriptor settings as read from a TOML file.
///
/// Every field is optional. Missing property names, smoothing and scale fall back
/// to the settings of the pretrained CO2 capture models; a missing
/// `property_table` selects the bundled generic table, whose values are not the
/// models' training inputs.
///
/// ```toml
/// properties = ["electronegativity", "polarizability"]
/// smoothing = -10.0
/// scale = 0.001
/// strict_minimum_image = false
/// property_table = "my_properties.toml"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DescriptorConfig {
    pub properties: Vec<String>,
    pub smoothing: f64,
    pub scale: f64,
    pub strict_minimum_image: bool,
    /// External property table. The bundled table is used when unset.
    pub property_table: Option<PathBuf>,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            properties: DEFAULT_PROPERTIES.iter().map(|p| p.to_string()).collect(),
            smoothing: DEFAULT_SMOOTHING,
            scale: DEFAULT_SCALE,
            strict_minimum_image: false,
            property_table: None,
        }
    }
}

impl DescriptorConfig {
    /// Relative `property_table` paths are resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        if let (Some(table), Some(dir)) = (config.property_table.as_mut(), path.parent()) {
            if table.is_relative() {
                *table = dir.join(&*table);
            }
        }
        Ok(config)
    }

    pub fn to_params(&self) -> RdfParams {
        RdfParams::new(self.properties.iter().cloned(), self.smoothing, self.scale)
            .with_strict_minimum_image(self.strict_minimum_image)
    }

    /// Loads the configured property table, or clones the bundled one.
    pub fn load_property_table(&self) -> Result<PropertyTable, ConfigLoadError> {
        match &self.property_table {
            Some(path) => Ok(PropertyTable::load(path)?),
            None => Ok(PropertyTable::builtin().clone()),
        }
    }
}
