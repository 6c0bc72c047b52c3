// The dimension map is the sparse channel x timepoint layout of an experiment:
// channel -> stack -> file name
// Channel and stack counts are always max index + 1. Missing stacks are gaps in the
// acquisition, not errors, so the inner maps stay sparse.
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::error::{FilenameError, Warning};
use super::file_set::ExperimentIdentity;
use super::filename::{Detector, ParsedFilename};

/// What the first file of a channel says about its light path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSource {
    pub excitation_wavelength_nm: f64,
    pub detector: Detector,
}

#[derive(Debug, Clone, Default)]
pub struct DimensionMap {
    map: BTreeMap<u32, BTreeMap<u32, String>>,
    sources: BTreeMap<u32, ChannelSource>,
    has_cam_b: bool,
    skipped_files: usize,
    duplicate_planes: usize,
}

impl DimensionMap {
    /// Fold the pixel files of one variant (see `ParsedFilename::variant`) into a map.
    ///
    /// Files which fail to parse, or which belong to another experiment, are skipped and
    /// reported; a (channel, stack) pair seen twice keeps the later file and is reported.
    pub fn build(
        files: &[PathBuf],
        identity: &ExperimentIdentity,
        variant: &str,
        warnings: &mut Vec<Warning>,
    ) -> Self {
        let mut dm = DimensionMap::default();
        for (file_name, parsed) in parse_files(files) {
            match parsed {
                Ok(parsed) if parsed.variant == variant => {
                    dm.add(parsed, file_name, identity, warnings)
                }
                Ok(_) => (),
                Err(e) => dm.skip(Warning::SkippedFile(e), warnings),
            }
        }
        dm
    }

    /// One map per variant found in `files`, parsing every file once.
    ///
    /// An unparsable file is reported a single time and counted as skipped by every map,
    /// since no variant can claim it.
    pub fn build_variants(
        files: &[PathBuf],
        identity: &ExperimentIdentity,
        warnings: &mut Vec<Warning>,
    ) -> BTreeMap<String, Self> {
        let mut maps: BTreeMap<String, Self> = BTreeMap::new();
        let mut unparsable = DimensionMap::default();
        for (file_name, parsed) in parse_files(files) {
            match parsed {
                Ok(parsed) => maps.entry(parsed.variant.clone()).or_default().add(
                    parsed,
                    file_name,
                    identity,
                    warnings,
                ),
                Err(e) => unparsable.skip(Warning::SkippedFile(e), warnings),
            }
        }
        for dm in maps.values_mut() {
            dm.skipped_files += unparsable.skipped_files;
        }
        maps
    }

    fn add(
        &mut self,
        parsed: ParsedFilename,
        file_name: &str,
        identity: &ExperimentIdentity,
        warnings: &mut Vec<Warning>,
    ) {
        if parsed.experiment_name != identity.experiment_name {
            self.skip(
                Warning::ForeignExperiment {
                    file: file_name.to_string(),
                    found: parsed.experiment_name,
                    expected: identity.experiment_name.clone(),
                },
                warnings,
            );
        } else {
            self.insert(&parsed, file_name, warnings);
        }
    }

    fn skip(&mut self, warning: Warning, warnings: &mut Vec<Warning>) {
        spdlog::warn!("{warning}");
        warnings.push(warning);
        self.skipped_files += 1;
    }

    fn insert(&mut self, parsed: &ParsedFilename, file_name: &str, warnings: &mut Vec<Warning>) {
        self.has_cam_b |= parsed.detector == Detector::CamB;
        self.sources.entry(parsed.channel).or_insert(ChannelSource {
            excitation_wavelength_nm: parsed.excitation_wavelength_nm,
            detector: parsed.detector,
        });
        let stacks = self.map.entry(parsed.channel).or_default();
        if let Some(replaced) = stacks.insert(parsed.stack, file_name.to_string()) {
            let warning = Warning::DuplicatePlane {
                channel: parsed.channel,
                stack: parsed.stack,
                replaced,
                file: file_name.to_string(),
            };
            spdlog::warn!("{warning}");
            warnings.push(warning);
            self.duplicate_planes += 1;
        }
    }

    // Parse indices are bounded by MAX_INDEX, so the counts below cannot overflow

    /// Max channel index + 1, or 1 for an empty map
    pub fn channel_count(&self) -> u32 {
        self.map.keys().next_back().map_or(1, |max| max + 1)
    }

    /// Max stack index + 1 over all channels, or 1 for an empty map
    pub fn stack_count(&self) -> u32 {
        self.map
            .values()
            .filter_map(|stacks| stacks.keys().next_back())
            .max()
            .map_or(1, |max| max + 1)
    }

    /// 2 if any file was recorded by the second camera
    pub fn detector_count(&self) -> u32 {
        if self.has_cam_b {
            2
        } else {
            1
        }
    }

    pub fn get(&self, channel: u32, stack: u32) -> Option<&str> {
        self.map.get(&channel)?.get(&stack).map(String::as_str)
    }

    /// The stacks of one channel in ascending order
    pub fn channel(&self, channel: u32) -> Option<&BTreeMap<u32, String>> {
        self.map.get(&channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = u32> + '_ {
        self.map.keys().copied()
    }

    pub fn channel_source(&self, channel: u32) -> Option<&ChannelSource> {
        self.sources.get(&channel)
    }

    /// Every (channel, stack, file name) entry, channel major
    pub fn planes(&self) -> impl Iterator<Item = (u32, u32, &str)> + '_ {
        self.map.iter().flat_map(|(channel, stacks)| {
            stacks
                .iter()
                .map(move |(stack, name)| (*channel, *stack, name.as_str()))
        })
    }

    pub fn plane_count(&self) -> usize {
        self.map.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn skipped_files(&self) -> usize {
        self.skipped_files
    }

    pub fn duplicate_planes(&self) -> usize {
        self.duplicate_planes
    }
}

fn parse_files(
    files: &[PathBuf],
) -> impl Iterator<Item = (&str, Result<ParsedFilename, FilenameError>)> + '_ {
    files
        .iter()
        .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
        .map(|file_name| (file_name, ParsedFilename::parse(file_name)))
}

//Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ExperimentIdentity {
        ExperimentIdentity {
            root_directory: PathBuf::from("/data"),
            experiment_name: String::from("Exp"),
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|name| PathBuf::from("/data").join(name)).collect()
    }

    #[test]
    fn test_counts() {
        let files = paths(&[
            "Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif",
            "Exp_ch0_stack0001_405nm_100msec_100msecAbs.tif",
            "Exp_ch1_stack0000_488nm_0msec_0msecAbs.tif",
        ]);
        let mut warnings = Vec::new();
        let dm = DimensionMap::build(&files, &identity(), "", &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(dm.channel_count(), 2);
        assert_eq!(dm.stack_count(), 2);
        assert_eq!(dm.detector_count(), 1);
        assert_eq!(dm.plane_count(), 3);
        assert_eq!(
            dm.get(0, 1),
            Some("Exp_ch0_stack0001_405nm_100msec_100msecAbs.tif")
        );
        assert_eq!(dm.channel_source(1).unwrap().excitation_wavelength_nm, 488.0);
    }

    #[test]
    fn test_channel_gap() {
        let files = paths(&[
            "Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif",
            "Exp_CamB_ch2_stack0004_560nm_0msec_0msecAbs.tif",
        ]);
        let mut warnings = Vec::new();
        let dm = DimensionMap::build(&files, &identity(), "", &mut warnings);
        assert_eq!(dm.channel_count(), 3);
        assert_eq!(dm.stack_count(), 5);
        assert_eq!(dm.detector_count(), 2);
        assert!(dm.channel(1).is_none());
        assert_eq!(dm.channels().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_empty_map() {
        let mut warnings = Vec::new();
        let dm = DimensionMap::build(&[], &identity(), "", &mut warnings);
        assert!(dm.is_empty());
        assert_eq!(dm.channel_count(), 1);
        assert_eq!(dm.stack_count(), 1);
        assert_eq!(dm.detector_count(), 1);
    }

    #[test]
    fn test_skipped_and_duplicates() {
        let files = paths(&[
            "Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif",
            "Exp_chX_stack0000_405nm_0msec_0msecAbs.tif",
            "Exp_CamA_ch0_stack0000_405nm_0msec_5msecAbs.tif",
            "Expanded_ch0_stack0000_405nm_0msec_0msecAbs.tif",
        ]);
        let mut warnings = Vec::new();
        let dm = DimensionMap::build(&files, &identity(), "", &mut warnings);
        assert_eq!(dm.skipped_files(), 2);
        assert_eq!(dm.duplicate_planes(), 1);
        assert_eq!(warnings.len(), 3);
        assert_eq!(
            dm.get(0, 0),
            Some("Exp_CamA_ch0_stack0000_405nm_0msec_5msecAbs.tif")
        );
    }

    #[test]
    fn test_variants_are_separate() {
        let files = paths(&[
            "Exp_ch0_stack0000_405nm_0msec_0msecAbs_deskewed.tif",
            "Exp_ch0_stack0001_405nm_0msec_0msecAbs_deskewed.tif",
            "Exp_ch0_stack0000_405nm_0msec_0msecAbs_decon.tif",
        ]);
        let mut warnings = Vec::new();
        let dm = DimensionMap::build(&files, &identity(), "_deskewed", &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(dm.plane_count(), 2);
        assert_eq!(
            dm.planes().map(|(c, s, _)| (c, s)).collect::<Vec<_>>(),
            vec![(0, 0), (0, 1)]
        );
    }

    #[test]
    fn test_largest_index() {
        let files = paths(&[
            "Exp_ch0_stack4294967295_405nm_0msec_0msecAbs.tif",
            "Exp_ch0_stack0000_405nm_0msec_0msecAbs.tif",
        ]);
        let mut warnings = Vec::new();
        let dm = DimensionMap::build(&files, &identity(), "", &mut warnings);
        assert_eq!(dm.skipped_files(), 1);
        assert_eq!(dm.stack_count(), 1);

        let files = paths(&["Exp_ch4294967294_stack4294967294_405nm_0msec_0msecAbs.tif"]);
        let dm = DimensionMap::build(&files, &identity(), "", &mut warnings);
        assert_eq!(dm.stack_count(), u32::MAX);
        assert_eq!(dm.channel_count(), u32::MAX);
    }

    #[test]
    fn test_build_variants() {
        let files = paths(&[
            "Exp_ch0_stack0000_405nm_0msec_0msecAbs_decon.tif",
            "Exp_ch0_stack0001_405nm_0msec_0msecAbs_decon.tif",
            "Exp_ch0_stack0000_405nm_0msec_0msecAbs_decon_MIP.tif",
            "Exp_chX_stack0000_405nm_0msec_0msecAbs_decon.tif",
            "Other_ch0_stack0000_405nm_0msec_0msecAbs_decon.tif",
        ]);
        let mut warnings = Vec::new();
        let maps = DimensionMap::build_variants(&files, &identity(), &mut warnings);
        assert_eq!(
            maps.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["_decon", "_decon_MIP"]
        );
        // chX once, Other once
        assert_eq!(warnings.len(), 2);
        assert_eq!(maps["_decon"].plane_count(), 2);
        assert_eq!(maps["_decon"].skipped_files(), 2);
        assert_eq!(maps["_decon_MIP"].plane_count(), 1);
        assert_eq!(maps["_decon_MIP"].skipped_files(), 1);
    }
}
