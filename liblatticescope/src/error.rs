use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilenameError {
    #[error("File name {0} does not match the LatticeScope naming grammar")]
    FormatMismatch(String),
    #[error("File name {name} has a malformed {field} field: {token:?}")]
    MalformedField {
        name: String,
        field: &'static str,
        token: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("Found invalid detector keyword: {0}")]
    InvalidKeyword(String),
}

#[derive(Debug, Error)]
pub enum FileSetError {
    #[error("File {0:?} is not part of a LatticeScope experiment")]
    FormatMismatch(PathBuf),
    #[error("Could not find settings file {0:?} for LatticeScope experiment")]
    MissingCompanion(PathBuf),
    #[error("FileSet failed to scan {path:?} due to IO error: {source}")]
    IOError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not read settings file {path:?}: {source}")]
    IOError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TiffSourceError {
    #[error("TiffSource failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("TiffSource failed to decode TIFF structure: {0}")]
    DecodingError(#[from] tiff::TiffError),
}

#[derive(Debug, Error)]
pub enum CompanionError {
    #[error("Companion document declares {declared} channels but the experiment has {expected}")]
    ChannelCountMismatch { declared: u32, expected: u32 },
    #[error("Companion document declares {declared} timepoints but the experiment has {expected}")]
    TimepointCountMismatch { declared: u32, expected: u32 },
    #[error("Companion document references {0} which is not part of the experiment file set")]
    UnknownPlaneFile(String),
    #[error("Companion document failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Companion document failed to convert to yaml: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset failed due to FileSet error: {0}")]
    FileSetError(#[from] FileSetError),
    #[error("Dataset failed due to Settings error: {0}")]
    SettingsError(#[from] SettingsError),
    #[error("Dataset failed due to TiffSource error: {0}")]
    TiffError(#[from] TiffSourceError),
    #[error("Dataset failed due to Companion error: {0}")]
    CompanionError(#[from] CompanionError),
}

/// Problems which do not stop a dataset from opening. They are collected on the
/// dataset and logged as they occur.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    #[error("Skipped file: {0}")]
    SkippedFile(#[from] FilenameError),
    #[error("Skipped file {file} which belongs to experiment {found}, not {expected}")]
    ForeignExperiment {
        file: String,
        found: String,
        expected: String,
    },
    #[error("Channel {channel} stack {stack} is claimed by both {replaced} and {file}; keeping {file}")]
    DuplicatePlane {
        channel: u32,
        stack: u32,
        replaced: String,
        file: String,
    },
    #[error("No {kind} descriptor is known for {key}; only an identifier is set")]
    AmbiguousLookup { kind: &'static str, key: String },
    #[error("Settings value for {key:?} could not be interpreted ({value:?}): {reason}")]
    BadSettingsValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("File {file} has {bits} bits per sample; pixels are still described as uint16")]
    UnexpectedBitDepth { file: String, bits: u8 },
}
