use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use super::constants::*;
use super::dimension_map::DimensionMap;
use super::error::{CompanionError, Warning};
use super::file_set::FileSet;
use super::filename::Detector;
use super::hardware::{create_lsid, wavelength_key};
use super::instrument::{
    DetectorDescriptor, InstrumentMetadata, LaserDescriptor, ObjectiveDescriptor,
};
use super::metadata_store::MetadataStore;
use super::tiff_source::{AcquisitionTags, CoreDimensions};

// Structure
// version
// experimenter - id, first_name, last_name, email
// instrument - id
// |---- objectives, light_sources, detectors
// image - id, name, acquisition_date, description, instrument_ref
// |---- objective_settings - id, calibrated_magnification
// |---- pixels - id, sizes, physical sizes, dimension_order, pixel_type, exposure_time_s
// |    |---- channels - id, name, excitation_wavelength_nm, light_source_settings, detector_settings
// |    |---- tiff_data - first_c, first_t, first_z, plane_count, file_name
// original_metadata

/// One logical multi-dimensional image covering every tif of an experiment variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionDocument {
    pub version: String,
    #[serde(default)]
    pub experimenter: Option<Experimenter>,
    pub instrument: InstrumentSection,
    pub image: ImageSection,
    #[serde(default)]
    pub original_metadata: BTreeMap<String, String>,
}

/// The person named in the Artist tag of the tifs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experimenter {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Experimenter {
    /// "First Last" splits at the first space; a single word is the last name. The
    /// acquisition software stores the email address in the HostComputer tag.
    pub fn from_tags(artist: Option<&str>, host_computer: Option<&str>) -> Option<Self> {
        let artist = artist.map(str::trim).filter(|artist| !artist.is_empty());
        let email = host_computer
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string);
        if artist.is_none() && email.is_none() {
            return None;
        }
        let (first_name, last_name) = match artist {
            Some(artist) => match artist.split_once(' ') {
                Some((first, last)) => (Some(first.to_string()), Some(last.to_string())),
                None => (None, Some(artist.to_string())),
            },
            None => (None, None),
        };
        Some(Self {
            id: String::from(EXPERIMENTER_ID),
            first_name,
            last_name,
            email,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSection {
    pub id: String,
    pub objectives: Vec<ObjectiveDescriptor>,
    pub light_sources: Vec<LaserDescriptor>,
    pub detectors: Vec<DetectorDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSection {
    pub id: String,
    pub name: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub acquisition_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub description: Option<String>,
    pub instrument_ref: String,
    pub objective_settings: ObjectiveSettings,
    pub pixels: Pixels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSettings {
    pub id: String,
    #[serde(default)]
    pub calibrated_magnification: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pixels {
    pub id: String,
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    pub size_c: u32,
    pub size_t: u32,
    pub physical_size_x_um: f64,
    pub physical_size_y_um: f64,
    /// The instrument does not report a reliable Z step
    pub physical_size_z_um: Option<f64>,
    pub dimension_order: String,
    pub pixel_type: String,
    /// Exposure of every plane in seconds
    #[serde(default)]
    pub exposure_time_s: Option<f64>,
    pub channels: Vec<ChannelRecord>,
    pub tiff_data: Vec<TiffDataRecord>,
}

impl Pixels {
    /// Z x C x T, or None if that does not fit in memory addressing
    pub fn plane_count(&self) -> Option<usize> {
        (self.size_z as usize)
            .checked_mul(self.size_c as usize)?
            .checked_mul(self.size_t as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub excitation_wavelength_nm: Option<f64>,
    #[serde(default)]
    pub light_source_settings: Option<LightSourceSettings>,
    #[serde(default)]
    pub detector_settings: Option<DetectorSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSourceSettings {
    pub id: String,
    #[serde(default)]
    pub attenuation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiffDataRecord {
    pub first_c: u32,
    pub first_t: u32,
    pub first_z: u32,
    pub plane_count: u32,
    pub file_name: String,
}

/// `<dir>/<experimentName><variant>.companion.yml`
pub fn companion_path(directory: &Path, experiment_name: &str, variant: &str) -> PathBuf {
    directory.join(format!("{experiment_name}{variant}{COMPANION_EXTENSION}"))
}

impl CompanionDocument {
    /// Combine the dimension map and the instrument description into one image.
    ///
    /// Channels sharing an excitation wavelength share a light source, and channels
    /// recorded by the same camera share a detector.
    pub fn synthesize(
        map: &DimensionMap,
        instrument: &InstrumentMetadata,
        core: &CoreDimensions,
        image_name: &str,
        warnings: &mut Vec<Warning>,
    ) -> Self {
        let mut light_sources: Vec<LaserDescriptor> = Vec::new();
        let mut detectors: Vec<DetectorDescriptor> = Vec::new();
        let mut laser_ids: FxHashMap<String, String> = FxHashMap::default();
        let mut detector_ids: FxHashMap<Detector, String> = FxHashMap::default();
        let mut channels: Vec<ChannelRecord> = Vec::new();

        for channel in map.channels() {
            let mut record = ChannelRecord {
                id: create_lsid("Channel", &[0, channel as usize]),
                name: format!("ch{channel}"),
                excitation_wavelength_nm: None,
                light_source_settings: None,
                detector_settings: None,
            };
            if let Some(source) = map.channel_source(channel) {
                let wavelength = source.excitation_wavelength_nm;
                let laser_id = laser_ids
                    .entry(wavelength_key(wavelength))
                    .or_insert_with(|| {
                        let laser = LaserDescriptor::lookup(wavelength, channel as usize);
                        // The opened file's own wavelength was already reported by the resolver
                        if !laser.is_known()
                            && instrument.excitation_wavelength_nm != Some(wavelength)
                        {
                            let warning = Warning::AmbiguousLookup {
                                kind: "laser",
                                key: format!("{} nm", wavelength_key(wavelength)),
                            };
                            spdlog::warn!("{warning}");
                            warnings.push(warning);
                        }
                        let id = laser.id.clone();
                        light_sources.push(laser);
                        id
                    })
                    .clone();
                let detector_id = detector_ids
                    .entry(source.detector)
                    .or_insert_with(|| {
                        let detector = DetectorDescriptor::lookup(
                            Some(source.detector.as_str()),
                            channel as usize,
                        );
                        let id = detector.id.clone();
                        detectors.push(detector);
                        id
                    })
                    .clone();

                record.excitation_wavelength_nm = Some(wavelength);
                record.light_source_settings = Some(LightSourceSettings {
                    id: laser_id,
                    attenuation: instrument.attenuation_for(wavelength),
                });
                record.detector_settings = Some(DetectorSettings { id: detector_id });
            }
            channels.push(record);
        }

        let tiff_data: Vec<TiffDataRecord> = map
            .planes()
            .map(|(channel, stack, file_name)| TiffDataRecord {
                first_c: channel,
                first_t: stack,
                first_z: 0,
                plane_count: core.size_z,
                file_name: file_name.to_string(),
            })
            .collect();

        let objectives = instrument.objectives.clone();
        // The image is always taken through the primary objective
        let objective_settings = ObjectiveSettings {
            id: create_lsid("Objective", &[0, 0]),
            calibrated_magnification: objectives
                .first()
                .and_then(|objective| objective.calibrated_magnification),
        };

        Self {
            version: format!("{}:{}", env!("CARGO_PKG_NAME"), COMPANION_FORMAT_VERSION),
            experimenter: None,
            instrument: InstrumentSection {
                id: instrument.id.clone(),
                objectives,
                light_sources,
                detectors,
            },
            image: ImageSection {
                id: create_lsid("Image", &[0]),
                name: image_name.to_string(),
                acquisition_date: instrument.acquisition_date,
                description: instrument.image_description.clone(),
                instrument_ref: instrument.id.clone(),
                objective_settings,
                pixels: Pixels {
                    id: create_lsid("Pixels", &[0]),
                    size_x: core.size_x,
                    size_y: core.size_y,
                    size_z: core.size_z,
                    size_c: map.channel_count(),
                    size_t: map.stack_count(),
                    physical_size_x_um: PIXEL_SIZE_XY_UM,
                    physical_size_y_um: PIXEL_SIZE_XY_UM,
                    physical_size_z_um: None,
                    dimension_order: String::from(DIMENSION_ORDER),
                    pixel_type: String::from(PIXEL_TYPE),
                    exposure_time_s: None,
                    channels,
                    tiff_data,
                },
            },
            original_metadata: BTreeMap::new(),
        }
    }

    /// Attach the opaque settings table
    pub fn with_original_metadata<'a, I>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (String, &'a str)>,
    {
        self.original_metadata
            .extend(table.into_iter().map(|(key, value)| (key, value.to_string())));
        self
    }

    /// Attach the experimenter and exposure time read from the tags of a tif
    pub fn with_acquisition_tags(mut self, tags: &AcquisitionTags) -> Self {
        self.experimenter =
            Experimenter::from_tags(tags.artist.as_deref(), tags.host_computer.as_deref());
        self.image.pixels.exposure_time_s = tags.exposure_time_s;
        self
    }

    /// Check that the declared sizes match the map and every plane names a file of the
    /// file set
    pub fn verify(&self, map: &DimensionMap, file_set: &FileSet) -> Result<(), CompanionError> {
        let pixels = &self.image.pixels;
        if pixels.size_c != map.channel_count() {
            return Err(CompanionError::ChannelCountMismatch {
                declared: pixels.size_c,
                expected: map.channel_count(),
            });
        }
        if pixels.size_t != map.stack_count() {
            return Err(CompanionError::TimepointCountMismatch {
                declared: pixels.size_t,
                expected: map.stack_count(),
            });
        }
        if let Some(unknown) = pixels
            .tiff_data
            .iter()
            .find(|record| !file_set.contains_file_name(&record.file_name))
        {
            return Err(CompanionError::UnknownPlaneFile(unknown.file_name.clone()));
        }
        Ok(())
    }

    /// Persist the document as YAML
    pub fn write(&self, path: &Path) -> Result<(), CompanionError> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(serde_yaml::to_string(self)?.as_bytes())?;
        spdlog::info!("Wrote companion document {}", path.to_string_lossy());
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, CompanionError> {
        let yaml_str = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Push the document into a metadata store
    pub fn populate<S: MetadataStore + ?Sized>(&self, store: &mut S) {
        if let Some(experimenter) = &self.experimenter {
            store.set_experimenter(
                &experimenter.id,
                experimenter.first_name.as_deref(),
                experimenter.last_name.as_deref(),
                experimenter.email.as_deref(),
            );
        }

        let instrument = &self.instrument;
        store.set_instrument_id(&instrument.id);
        for (idx, objective) in instrument.objectives.iter().enumerate() {
            store.set_objective(objective, idx);
        }
        for (idx, laser) in instrument.light_sources.iter().enumerate() {
            store.set_laser(laser, idx);
        }
        for (idx, detector) in instrument.detectors.iter().enumerate() {
            store.set_detector(detector, idx);
        }

        let image = &self.image;
        store.set_image_id(&image.id);
        store.set_image_name(&image.name);
        store.set_image_instrument_ref(&image.instrument_ref);
        if let Some(description) = &image.description {
            store.set_image_description(description);
        }
        if let Some(date) = image.acquisition_date {
            store.set_image_acquisition_date(date);
        }
        store.set_objective_settings(
            &image.objective_settings.id,
            image.objective_settings.calibrated_magnification,
        );

        let pixels = &image.pixels;
        store.set_pixels_size(
            pixels.size_x,
            pixels.size_y,
            pixels.size_z,
            pixels.size_c,
            pixels.size_t,
        );
        store.set_pixels_physical_size(
            Some(pixels.physical_size_x_um),
            Some(pixels.physical_size_y_um),
            pixels.physical_size_z_um,
        );
        store.set_pixels_dimension_order(&pixels.dimension_order);
        store.set_pixels_type(&pixels.pixel_type);
        if let Some(exposure) = pixels.exposure_time_s {
            match pixels.plane_count() {
                Some(plane_count) => {
                    for plane in 0..plane_count {
                        store.set_plane_exposure_time(exposure, plane);
                    }
                }
                None => spdlog::warn!("Too many planes to set an exposure time on each"),
            }
        }

        for record in pixels.channels.iter() {
            // ch<N>
            let Some(channel) = record
                .name
                .strip_prefix(CHANNEL_PREFIX)
                .and_then(|idx| idx.parse::<u32>().ok())
            else {
                continue;
            };
            store.set_channel_id(&record.id, channel);
            store.set_channel_name(&record.name, channel);
            if let Some(wavelength) = record.excitation_wavelength_nm {
                store.set_channel_excitation_wavelength(wavelength, channel);
            }
            if let Some(settings) = &record.light_source_settings {
                store.set_channel_light_source_settings(&settings.id, settings.attenuation, channel);
            }
            if let Some(settings) = &record.detector_settings {
                store.set_channel_detector_settings(&settings.id, channel);
            }
        }
        for record in pixels.tiff_data.iter() {
            store.set_tiff_data(
                record.first_c,
                record.first_t,
                record.plane_count,
                &record.file_name,
            );
        }

        for (key, value) in self.original_metadata.iter() {
            store.put_original_metadata(key, value);
        }
    }
}
