use std::path::{Path, PathBuf};

use super::companion::{companion_path, CompanionDocument};
use super::config::ReaderConfig;
use super::constants::{DECON_DIR, DESKEWED_DIR};
use super::dimension_map::DimensionMap;
use super::error::{DatasetError, FileSetError, Warning};
use super::file_set::FileSet;
use super::filename::{ParsedFilename, ProcessingStage};
use super::instrument::InstrumentMetadata;
use super::metadata_store::{MemoryStore, MetadataStore};
use super::settings::SettingsFile;
use super::tiff_source::{CoreDimensions, TiffFile, TiffSource};

/// A LatticeScope experiment opened from one of its files
#[derive(Debug, Clone)]
pub struct LatticeDataset {
    pub file_set: FileSet,
    /// The file the dataset was opened from, or the first sibling which parses if the
    /// opened file's name is malformed
    pub representative: ParsedFilename,
    pub dimensions: DimensionMap,
    pub settings: SettingsFile,
    pub instrument: InstrumentMetadata,
    pub core: CoreDimensions,
    pub document: CompanionDocument,
    /// Companion documents written while opening
    pub companion_paths: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

impl LatticeDataset {
    /// Open the experiment which contains `path`, keeping the metadata in a [`MemoryStore`]
    pub fn open(path: &Path, config: &ReaderConfig) -> Result<(Self, MemoryStore), DatasetError> {
        let mut store = MemoryStore::new();
        let dataset = Self::open_with_store(path, config, &mut store)?;
        Ok((dataset, store))
    }

    /// Open the experiment which contains `path` and push its metadata into `store`.
    ///
    /// resolve files -> parse names -> build the dimension map -> read settings ->
    /// resolve the instrument -> synthesize the companion document. If the config asks
    /// for it, the companion document is then written next to the data.
    pub fn open_with_store<S: MetadataStore + ?Sized>(
        path: &Path,
        config: &ReaderConfig,
        store: &mut S,
    ) -> Result<Self, DatasetError> {
        spdlog::info!("Opening LatticeScope dataset from {}", path.to_string_lossy());
        let file_set = FileSet::resolve(path)?;
        let (representative, representative_path) = pick_representative(path, &file_set)?;

        let mut warnings: Vec<Warning> = Vec::new();
        let dimensions = DimensionMap::build(
            file_set.pixel_files(),
            &file_set.identity,
            &representative.variant,
            &mut warnings,
        );
        spdlog::info!(
            "Experiment {} has {} channels, {} timepoints and {} planes",
            file_set.identity.experiment_name,
            dimensions.channel_count(),
            dimensions.stack_count(),
            dimensions.plane_count()
        );

        let settings = SettingsFile::read(file_set.settings_file(), &mut warnings)?;
        let mut instrument = InstrumentMetadata::resolve(
            Some(representative.detector),
            Some(representative.excitation_wavelength_nm),
            &mut warnings,
        );
        instrument.merge_settings(&settings.values);

        let tiff = TiffFile::open(&representative_path)?;
        let core = tiff.core_dimensions();
        if let Some(warning) = core.bit_depth_warning(&representative.canonical_name()) {
            spdlog::warn!("{warning}");
            warnings.push(warning);
        }
        let document = CompanionDocument::synthesize(
            &dimensions,
            &instrument,
            &core,
            &image_name(&file_set, &representative.variant),
            &mut warnings,
        )
        .with_acquisition_tags(&tiff.acquisition_tags())
        .with_original_metadata(settings.original_metadata());
        document.verify(&dimensions, &file_set)?;
        document.populate(store);

        let mut dataset = Self {
            file_set,
            representative,
            dimensions,
            settings,
            instrument,
            core,
            document,
            companion_paths: Vec::new(),
            warnings,
        };
        if config.create_companion {
            dataset.write_companions(config)?;
        }
        if !dataset.warnings.is_empty() {
            spdlog::warn!(
                "Opened dataset with {} warnings; see the log for details",
                dataset.warnings.len()
            );
        }
        Ok(dataset)
    }

    /// Write the companion document of the opened variant and, for a raw file, those of
    /// the processed directories
    fn write_companions(&mut self, config: &ReaderConfig) -> Result<(), DatasetError> {
        let target = companion_path(
            &self.file_set.directory,
            &self.file_set.identity.experiment_name,
            &self.representative.variant,
        );
        if write_document(&self.document, &target, config.overwrite_companion)? {
            self.companion_paths.push(target);
        }

        if !(config.include_processed && self.file_set.stage.is_raw()) {
            return Ok(());
        }
        for (dir_name, stage) in [
            (DESKEWED_DIR, ProcessingStage::Deskewed),
            (DECON_DIR, ProcessingStage::Decon),
        ] {
            let directory = self.file_set.identity.root_directory.join(dir_name);
            if directory.is_dir() {
                self.write_processed_companions(&directory, stage, config)?;
            }
        }
        Ok(())
    }

    /// One companion document per variant found in a processed directory
    fn write_processed_companions(
        &mut self,
        directory: &Path,
        stage: ProcessingStage,
        config: &ReaderConfig,
    ) -> Result<(), DatasetError> {
        let file_set = FileSet::for_directory(
            self.file_set.identity.clone(),
            stage,
            directory,
            self.file_set.settings_file().to_path_buf(),
        )?;
        let variants = DimensionMap::build_variants(
            file_set.pixel_files(),
            &file_set.identity,
            &mut self.warnings,
        );

        for (variant, dimensions) in variants.iter() {
            let Some((_, _, first_plane)) = dimensions.planes().next() else {
                continue;
            };
            if ProcessingStage::classify(first_plane) != Some(stage) {
                continue;
            }
            let target = companion_path(directory, &file_set.identity.experiment_name, variant);
            if target.exists() && !config.overwrite_companion {
                spdlog::info!(
                    "Companion document {} already exists, leaving it untouched",
                    target.to_string_lossy()
                );
                continue;
            }

            let tiff = TiffFile::open(&directory.join(first_plane))?;
            let core = tiff.core_dimensions();
            if let Some(warning) = core.bit_depth_warning(first_plane) {
                spdlog::warn!("{warning}");
                self.warnings.push(warning);
            }
            let document = CompanionDocument::synthesize(
                dimensions,
                &self.instrument,
                &core,
                &image_name(&file_set, variant),
                &mut self.warnings,
            )
            .with_acquisition_tags(&tiff.acquisition_tags())
            .with_original_metadata(self.settings.original_metadata());
            document.verify(dimensions, &file_set)?;
            document.write(&target)?;
            self.companion_paths.push(target);
        }
        Ok(())
    }

    /// Files which looked like part of the experiment but could not be placed
    pub fn skipped_file_count(&self) -> usize {
        self.dimensions.skipped_files()
    }

    /// Every file which makes up the opened variant, settings file included
    pub fn used_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .dimensions
            .planes()
            .map(|(_, _, name)| self.file_set.directory.join(name))
            .collect();
        files.push(self.file_set.settings_file().to_path_buf());
        files
    }
}

/// The opened file describes the experiment unless its name is malformed, in which case
/// the first sibling of the same stage which parses stands in for it
fn pick_representative(
    path: &Path,
    file_set: &FileSet,
) -> Result<(ParsedFilename, PathBuf), DatasetError> {
    let parse = |path: &Path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(ParsedFilename::parse)
    };
    match parse(path) {
        Some(Ok(parsed)) => return Ok((parsed, path.to_path_buf())),
        Some(Err(e)) => spdlog::warn!("{e}; describing the experiment from a sibling file"),
        None => (),
    }
    file_set
        .pixel_files()
        .iter()
        .find_map(|sibling| match parse(sibling.as_path()) {
            Some(Ok(parsed))
                if parsed.stage == file_set.stage
                    && parsed.experiment_name == file_set.identity.experiment_name =>
            {
                Some((parsed, sibling.clone()))
            }
            _ => None,
        })
        .ok_or_else(|| FileSetError::FormatMismatch(path.to_path_buf()).into())
}

fn image_name(file_set: &FileSet, variant: &str) -> String {
    format!("{}{}", file_set.identity.experiment_name, variant)
}

/// Returns false if the document already existed and was left alone
fn write_document(
    document: &CompanionDocument,
    path: &Path,
    overwrite: bool,
) -> Result<bool, DatasetError> {
    if path.exists() && !overwrite {
        spdlog::info!(
            "Companion document {} already exists, leaving it untouched",
            path.to_string_lossy()
        );
        return Ok(false);
    }
    document.write(path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filename::Detector;
    use crate::tiff_source::tests::{write_stack, write_tagged_stack, StackTags};
    use std::fs::File;

    const IMAGEJ: &str = "ImageJ=1.52p\nimages=3\nslices=3\n";

    fn write_tif(dir: &Path, name: &str) {
        let file = File::create(dir.join(name)).unwrap();
        write_stack(file, 8, 6, 3, Some(IMAGEJ));
    }

    fn raw_experiment(dir: &Path) {
        for name in [
            "Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif",
            "Exp_ch0_stack0001_405nm_100msec_100msecAbs.tif",
            "Exp_ch1_stack0000_488nm_0msec_0msecAbs.tif",
        ] {
            write_tif(dir, name);
        }
        std::fs::write(
            dir.join("Exp_Settings.txt"),
            "***** ***** ***** General ***** ***** *****\nMagnification : 25\nDate : 3/4/2021 9:08:07 AM\n",
        )
        .unwrap();
    }

    #[test]
    fn test_open_raw() {
        let dir = tempfile::tempdir().unwrap();
        raw_experiment(dir.path());
        let (dataset, store) = LatticeDataset::open(
            &dir.path().join("Exp_ch0_stack0001_405nm_100msec_100msecAbs.tif"),
            &ReaderConfig::default(),
        )
        .unwrap();

        assert!(dataset.warnings.is_empty());
        assert_eq!(dataset.dimensions.channel_count(), 2);
        assert_eq!(dataset.dimensions.stack_count(), 2);
        assert_eq!(dataset.document.image.pixels.tiff_data.len(), 3);
        assert_eq!(dataset.skipped_file_count(), 0);
        assert_eq!(dataset.used_files().len(), 4);

        assert_eq!(store.size, Some((8, 6, 3, 2, 2)));
        assert_eq!(store.objective_settings_magnification, Some(25.0));
        assert_eq!(store.image_name.as_deref(), Some("Exp"));
        assert!(store.acquisition_date.is_some());
        assert_eq!(store.original_metadata["[General]::Magnification "], " 25");

        let companion = dir.path().join("Exp.companion.yml");
        assert_eq!(dataset.companion_paths, vec![companion.clone()]);
        assert_eq!(CompanionDocument::read(&companion).unwrap(), dataset.document);
    }

    #[test]
    fn test_open_from_malformed_name() {
        let dir = tempfile::tempdir().unwrap();
        write_tif(dir.path(), "Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif");
        write_tif(dir.path(), "Exp_chX_stack0001_405nm_0msec_0msecAbs.tif");
        std::fs::write(dir.path().join("Exp_Settings.txt"), "Magnification : 25\n").unwrap();

        let (dataset, store) = LatticeDataset::open(
            &dir.path().join("Exp_chX_stack0001_405nm_0msec_0msecAbs.tif"),
            &ReaderConfig::read_only(),
        )
        .unwrap();
        assert_eq!(dataset.representative.channel, 0);
        assert_eq!(dataset.representative.detector, Detector::CamA);
        assert_eq!(dataset.skipped_file_count(), 1);
        assert_eq!(
            dataset
                .warnings
                .iter()
                .filter(|w| matches!(w, Warning::SkippedFile(_)))
                .count(),
            1
        );
        assert_eq!(store.size, Some((8, 6, 3, 1, 1)));
    }

    #[test]
    fn test_no_parsable_file() {
        let dir = tempfile::tempdir().unwrap();
        write_tif(dir.path(), "Exp_chX_stack0001_405nm_0msec_0msecAbs.tif");
        std::fs::write(dir.path().join("Exp_Settings.txt"), "Magnification : 25\n").unwrap();
        match LatticeDataset::open(
            &dir.path().join("Exp_chX_stack0001_405nm_0msec_0msecAbs.tif"),
            &ReaderConfig::read_only(),
        ) {
            Err(DatasetError::FileSetError(FileSetError::FormatMismatch(_))) => (),
            other => panic!("unexpected result {:?}", other.map(|(d, _)| d.warnings)),
        }
    }

    #[test]
    fn test_acquisition_tags_reach_the_store() {
        let dir = tempfile::tempdir().unwrap();
        raw_experiment(dir.path());
        let name = "Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif";
        let tags = StackTags {
            comment: Some(IMAGEJ),
            artist: Some("Jane Doe"),
            host_computer: Some("jane@lab.org"),
            exposure: Some((1, 100)),
        };
        write_tagged_stack(File::create(dir.path().join(name)).unwrap(), 8, 6, 3, &tags);

        let (dataset, store) =
            LatticeDataset::open(&dir.path().join(name), &ReaderConfig::read_only()).unwrap();
        let experimenter = dataset.document.experimenter.as_ref().unwrap();
        assert_eq!(experimenter.first_name.as_deref(), Some("Jane"));
        assert_eq!(experimenter.last_name.as_deref(), Some("Doe"));
        assert_eq!(experimenter.email.as_deref(), Some("jane@lab.org"));
        assert_eq!(store.experimenter.as_ref().unwrap().id, "Experimenter:0");
        // 3 Z x 2 C x 2 T
        assert_eq!(store.plane_exposure_times_s.len(), 12);
        assert_eq!(store.plane_exposure_times_s[&11], 0.01);
    }

    #[test]
    fn test_read_only_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        raw_experiment(dir.path());
        let (dataset, _) = LatticeDataset::open(
            &dir.path().join("Exp_ch1_stack0000_488nm_0msec_0msecAbs.tif"),
            &ReaderConfig::read_only(),
        )
        .unwrap();
        assert!(dataset.companion_paths.is_empty());
        assert!(!dir.path().join("Exp.companion.yml").exists());
    }

    #[test]
    fn test_existing_companion_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        raw_experiment(dir.path());
        let companion = dir.path().join("Exp.companion.yml");
        std::fs::write(&companion, "hand edited").unwrap();
        let path = dir.path().join("Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif");

        let (dataset, _) = LatticeDataset::open(&path, &ReaderConfig::default()).unwrap();
        assert!(dataset.companion_paths.is_empty());
        assert_eq!(std::fs::read_to_string(&companion).unwrap(), "hand edited");

        let config = ReaderConfig {
            overwrite_companion: true,
            ..Default::default()
        };
        let (dataset, _) = LatticeDataset::open(&path, &config).unwrap();
        assert_eq!(dataset.companion_paths, vec![companion.clone()]);
        assert!(CompanionDocument::read(&companion).is_ok());
    }

    #[test]
    fn test_missing_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let name = "Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif";
        write_tif(dir.path(), name);
        match LatticeDataset::open(&dir.path().join(name), &ReaderConfig::default()) {
            Err(DatasetError::FileSetError(FileSetError::MissingCompanion(_))) => (),
            other => panic!("unexpected result {:?}", other.map(|(d, _)| d.companion_paths)),
        }
    }

    #[test]
    fn test_processed_directories() {
        let dir = tempfile::tempdir().unwrap();
        raw_experiment(dir.path());
        let deskewed = dir.path().join("Deskewed");
        let decon = dir.path().join("GPUDecon");
        std::fs::create_dir(&deskewed).unwrap();
        std::fs::create_dir(&decon).unwrap();
        write_tif(&deskewed, "Exp_ch0_stack0000_405nm_0msec_0msecAbs_deskewed.tif");
        write_tif(&deskewed, "Exp_ch0_stack0001_405nm_100msec_100msecAbs_deskewed.tif");
        write_tif(&decon, "Exp_ch0_stack0000_405nm_0msec_0msecAbs_decon.tif");
        write_tif(&decon, "Exp_ch0_stack0000_405nm_0msec_0msecAbs_decon_MIP.tif");

        let (dataset, _) = LatticeDataset::open(
            &dir.path().join("Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif"),
            &ReaderConfig::default(),
        )
        .unwrap();
        assert_eq!(dataset.companion_paths.len(), 4);

        let doc = CompanionDocument::read(&deskewed.join("Exp_deskewed.companion.yml")).unwrap();
        assert_eq!(doc.image.name, "Exp_deskewed");
        assert_eq!(doc.image.pixels.size_t, 2);
        assert_eq!(doc.image.pixels.size_c, 1);
        assert!(decon.join("Exp_decon.companion.yml").exists());
        assert!(decon.join("Exp_decon_MIP.companion.yml").exists());
    }

    #[test]
    fn test_processed_directory_scanned_once() {
        let dir = tempfile::tempdir().unwrap();
        raw_experiment(dir.path());
        let decon = dir.path().join("GPUDecon");
        std::fs::create_dir(&decon).unwrap();
        write_tif(&decon, "Exp_ch0_stack0000_405nm_0msec_0msecAbs_decon.tif");
        write_tif(&decon, "Exp_ch0_stack0000_405nm_0msec_0msecAbs_decon_MIP.tif");
        write_tif(&decon, "Exp_chX_stack0000_405nm_0msec_0msecAbs_decon.tif");

        let (dataset, _) = LatticeDataset::open(
            &dir.path().join("Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif"),
            &ReaderConfig::default(),
        )
        .unwrap();
        assert_eq!(dataset.companion_paths.len(), 3);
        assert_eq!(
            dataset
                .warnings
                .iter()
                .filter(|w| matches!(w, Warning::SkippedFile(_)))
                .count(),
            1
        );
    }

    #[test]
    fn test_open_processed_file() {
        let dir = tempfile::tempdir().unwrap();
        raw_experiment(dir.path());
        let deskewed = dir.path().join("Deskewed");
        std::fs::create_dir(&deskewed).unwrap();
        let name = "Exp_ch0_stack0000_405nm_0msec_0msecAbs_deskewed.tif";
        write_tif(&deskewed, name);

        let (dataset, store) =
            LatticeDataset::open(&deskewed.join(name), &ReaderConfig::default()).unwrap();
        assert_eq!(store.size, Some((8, 6, 3, 1, 1)));
        assert_eq!(
            dataset.companion_paths,
            vec![deskewed.join("Exp_deskewed.companion.yml")]
        );
        assert!(!dir.path().join("Exp.companion.yml").exists());
    }
}
