use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::constants::{SETTINGS_FILE_SUFFIX, SETTINGS_MARKER, TIFF_EXTENSION};
use super::error::FileSetError;
use super::filename::{experiment_name, ProcessingStage};

/// Where an experiment lives and what it is called.
///
/// Computed once from the file used to open the dataset; every file of the experiment
/// starts with the experiment name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentIdentity {
    pub root_directory: PathBuf,
    pub experiment_name: String,
}

impl ExperimentIdentity {
    /// Derive the identity from any file of the experiment without touching the file
    /// system. Raw files sit in the experiment root; deskewed and deconvolved files sit
    /// one directory further down.
    pub fn from_path(path: &Path) -> Result<(Self, ProcessingStage), FileSetError> {
        let mismatch = || FileSetError::FormatMismatch(path.to_path_buf());
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(mismatch)?;
        let stage = ProcessingStage::classify(file_name).ok_or_else(mismatch)?;
        let name = experiment_name(file_name).ok_or_else(mismatch)?;

        let absolute = std::path::absolute(path).map_err(|source| FileSetError::IOError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut root = absolute.parent().ok_or_else(mismatch)?;
        if !stage.is_raw() {
            root = root.parent().ok_or_else(mismatch)?;
        }

        Ok((
            Self {
                root_directory: root.to_path_buf(),
                experiment_name: name.to_string(),
            },
            stage,
        ))
    }

    /// `<root>/<experimentName>_Settings.txt`
    pub fn settings_file(&self) -> PathBuf {
        self.root_directory
            .join(format!("{}{}", self.experiment_name, SETTINGS_FILE_SUFFIX))
    }
}

/// The files belonging to one experiment, as seen from the directory of the opened file
#[derive(Debug, Clone)]
pub struct FileSet {
    pub identity: ExperimentIdentity,
    pub stage: ProcessingStage,
    pub directory: PathBuf,
    settings_file: PathBuf,
    pixel_files: Vec<PathBuf>,
    total_size_bytes: u64,
}

impl FileSet {
    /// Resolve the experiment of the given file and enumerate its siblings.
    ///
    /// Fails with `MissingCompanion` if the settings file does not exist.
    pub fn resolve(path: &Path) -> Result<Self, FileSetError> {
        let (identity, stage) = ExperimentIdentity::from_path(path)?;
        let settings_file = identity.settings_file();
        if !settings_file.exists() {
            return Err(FileSetError::MissingCompanion(settings_file));
        }

        let directory = if stage.is_raw() {
            identity.root_directory.clone()
        } else {
            std::path::absolute(path)
                .ok()
                .and_then(|p| p.parent().map(Path::to_path_buf))
                .ok_or_else(|| FileSetError::FormatMismatch(path.to_path_buf()))?
        };

        Self::for_directory(identity, stage, &directory, settings_file)
    }

    /// Enumerate the pixel files of an already identified experiment in one directory
    pub fn for_directory(
        identity: ExperimentIdentity,
        stage: ProcessingStage,
        directory: &Path,
        settings_file: PathBuf,
    ) -> Result<Self, FileSetError> {
        let (pixel_files, total_size_bytes) =
            Self::get_file_stack(directory, &identity.experiment_name)?;
        spdlog::info!(
            "Found {} files of experiment {} in {} with total size {}",
            pixel_files.len(),
            identity.experiment_name,
            directory.to_string_lossy(),
            human_bytes::human_bytes(total_size_bytes as f64)
        );
        Ok(Self {
            identity,
            stage,
            directory: directory.to_path_buf(),
            settings_file,
            pixel_files,
            total_size_bytes,
        })
    }

    /// Get all of the tif files in a directory which carry the experiment name
    fn get_file_stack(
        parent_path: &Path,
        experiment_name: &str,
    ) -> Result<(Vec<PathBuf>, u64), FileSetError> {
        let io_error = |source| FileSetError::IOError {
            path: parent_path.to_path_buf(),
            source,
        };
        let mut file_list: Vec<PathBuf> = Vec::new();
        let mut total_size: u64 = 0;
        for item in parent_path.read_dir().map_err(io_error)? {
            let item_path = item.map_err(io_error)?.path();
            let Some(name) = item_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.contains(experiment_name)
                && name.ends_with(TIFF_EXTENSION)
                && !name.contains(SETTINGS_MARKER)
                && item_path.is_file()
            {
                total_size += item_path.metadata().map_err(io_error)?.len();
                file_list.push(item_path);
            }
        }
        file_list.sort(); // Stack numbers are zero padded, so the standard order is acquisition order
        Ok((file_list, total_size))
    }

    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }

    /// Only the files which hold pixel data
    pub fn pixel_files(&self) -> &[PathBuf] {
        &self.pixel_files
    }

    /// Every file which makes up the experiment in this directory, settings file included
    pub fn related_files(&self) -> Vec<PathBuf> {
        let mut files = self.pixel_files.clone();
        files.push(self.settings_file.clone());
        files
    }

    /// Base names of the pixel files
    pub fn pixel_file_names(&self) -> BTreeSet<&str> {
        self.pixel_files
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .collect()
    }

    pub fn contains_file_name(&self, file_name: &str) -> bool {
        self.pixel_files
            .iter()
            .any(|path| path.file_name().is_some_and(|name| name == file_name))
    }

    pub fn get_total_data_size(&self) -> u64 {
        self.total_size_bytes
    }
}
