use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::ConfigError;

/// Options of the dataset reader.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml; any
/// field missing from a file takes its default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Persist a companion document next to the data
    pub create_companion: bool,
    /// Regenerate companion documents which already exist
    pub overwrite_companion: bool,
    /// When opening a raw file, also describe the Deskewed and GPUDecon directories
    pub include_processed: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            create_companion: true,
            overwrite_companion: false,
            include_processed: true,
        }
    }
}

impl ReaderConfig {
    /// Read the configuration in a YAML file
    /// Returns a ReaderConfig if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        std::fs::write(config_path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Only reads, nothing is written next to the data
    pub fn read_only() -> Self {
        Self {
            create_companion: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert!(config.create_companion);
        assert!(!config.overwrite_companion);
        assert!(config.include_processed);
        assert!(!ReaderConfig::read_only().create_companion);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reader.yml");
        std::fs::write(&path, "overwrite_companion: true\n").unwrap();
        let config = ReaderConfig::read_config_file(&path).unwrap();
        assert!(config.overwrite_companion);
        assert!(config.create_companion);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reader.yml");
        let config = ReaderConfig {
            include_processed: false,
            ..Default::default()
        };
        config.write_config_file(&path).unwrap();
        assert_eq!(ReaderConfig::read_config_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        match ReaderConfig::read_config_file(Path::new("/definitely/not/here.yml")) {
            Err(ConfigError::BadFilePath(_)) => (),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
