//! The metadata store is the sink the reader pushes its results into. Hosts provide
//! their own implementation; [`MemoryStore`] keeps everything in memory.
use std::collections::BTreeMap;
use time::OffsetDateTime;

use super::instrument::{DetectorDescriptor, LaserDescriptor, ObjectiveDescriptor};

pub trait MetadataStore {
    fn set_experimenter(
        &mut self,
        id: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: Option<&str>,
    );

    fn set_instrument_id(&mut self, id: &str);
    fn set_detector(&mut self, detector: &DetectorDescriptor, index: usize);
    fn set_laser(&mut self, laser: &LaserDescriptor, index: usize);
    fn set_objective(&mut self, objective: &ObjectiveDescriptor, index: usize);

    fn set_image_id(&mut self, id: &str);
    fn set_image_name(&mut self, name: &str);
    fn set_image_instrument_ref(&mut self, instrument_id: &str);
    fn set_image_description(&mut self, description: &str);
    fn set_image_acquisition_date(&mut self, date: OffsetDateTime);
    fn set_objective_settings(&mut self, objective_id: &str, calibrated_magnification: Option<f64>);

    fn set_pixels_size(&mut self, size_x: u32, size_y: u32, size_z: u32, size_c: u32, size_t: u32);
    fn set_pixels_physical_size(&mut self, x_um: Option<f64>, y_um: Option<f64>, z_um: Option<f64>);
    fn set_pixels_dimension_order(&mut self, order: &str);
    fn set_pixels_type(&mut self, pixel_type: &str);

    fn set_channel_id(&mut self, id: &str, channel: u32);
    fn set_channel_name(&mut self, name: &str, channel: u32);
    fn set_channel_excitation_wavelength(&mut self, wavelength_nm: f64, channel: u32);
    fn set_channel_light_source_settings(
        &mut self,
        light_source_id: &str,
        attenuation: Option<f64>,
        channel: u32,
    );
    fn set_channel_detector_settings(&mut self, detector_id: &str, channel: u32);

    fn set_tiff_data(&mut self, first_c: u32, first_t: u32, plane_count: u32, file_name: &str);
    fn set_plane_exposure_time(&mut self, seconds: f64, plane: usize);

    /// Opaque key/value pairs which have no typed home
    fn put_original_metadata(&mut self, key: &str, value: &str);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredExperimenter {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredChannel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub excitation_wavelength_nm: Option<f64>,
    pub light_source_id: Option<String>,
    pub attenuation: Option<f64>,
    pub detector_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredTiffData {
    pub first_c: u32,
    pub first_t: u32,
    pub plane_count: u32,
    pub file_name: String,
}

/// A metadata store which simply keeps what it is given
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    pub experimenter: Option<StoredExperimenter>,
    pub instrument_id: Option<String>,
    pub detectors: BTreeMap<usize, DetectorDescriptor>,
    pub lasers: BTreeMap<usize, LaserDescriptor>,
    pub objectives: BTreeMap<usize, ObjectiveDescriptor>,
    pub image_id: Option<String>,
    pub image_name: Option<String>,
    pub image_instrument_ref: Option<String>,
    pub image_description: Option<String>,
    pub acquisition_date: Option<OffsetDateTime>,
    pub objective_settings_id: Option<String>,
    pub objective_settings_magnification: Option<f64>,
    /// (x, y, z, c, t)
    pub size: Option<(u32, u32, u32, u32, u32)>,
    pub physical_size_um: (Option<f64>, Option<f64>, Option<f64>),
    pub dimension_order: Option<String>,
    pub pixel_type: Option<String>,
    pub channels: BTreeMap<u32, StoredChannel>,
    pub tiff_data: Vec<StoredTiffData>,
    /// Exposure in seconds, by plane index
    pub plane_exposure_times_s: BTreeMap<usize, f64>,
    pub original_metadata: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn channel(&mut self, channel: u32) -> &mut StoredChannel {
        self.channels.entry(channel).or_default()
    }
}

impl MetadataStore for MemoryStore {
    fn set_experimenter(
        &mut self,
        id: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: Option<&str>,
    ) {
        self.experimenter = Some(StoredExperimenter {
            id: id.to_string(),
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            email: email.map(str::to_string),
        });
    }

    fn set_instrument_id(&mut self, id: &str) {
        self.instrument_id = Some(id.to_string());
    }

    fn set_detector(&mut self, detector: &DetectorDescriptor, index: usize) {
        self.detectors.insert(index, detector.clone());
    }

    fn set_laser(&mut self, laser: &LaserDescriptor, index: usize) {
        self.lasers.insert(index, laser.clone());
    }

    fn set_objective(&mut self, objective: &ObjectiveDescriptor, index: usize) {
        self.objectives.insert(index, objective.clone());
    }

    fn set_image_id(&mut self, id: &str) {
        self.image_id = Some(id.to_string());
    }

    fn set_image_name(&mut self, name: &str) {
        self.image_name = Some(name.to_string());
    }

    fn set_image_instrument_ref(&mut self, instrument_id: &str) {
        self.image_instrument_ref = Some(instrument_id.to_string());
    }

    fn set_image_description(&mut self, description: &str) {
        self.image_description = Some(description.to_string());
    }

    fn set_image_acquisition_date(&mut self, date: OffsetDateTime) {
        self.acquisition_date = Some(date);
    }

    fn set_objective_settings(&mut self, objective_id: &str, calibrated_magnification: Option<f64>) {
        self.objective_settings_id = Some(objective_id.to_string());
        self.objective_settings_magnification = calibrated_magnification;
    }

    fn set_pixels_size(&mut self, size_x: u32, size_y: u32, size_z: u32, size_c: u32, size_t: u32) {
        self.size = Some((size_x, size_y, size_z, size_c, size_t));
    }

    fn set_pixels_physical_size(&mut self, x_um: Option<f64>, y_um: Option<f64>, z_um: Option<f64>) {
        self.physical_size_um = (x_um, y_um, z_um);
    }

    fn set_pixels_dimension_order(&mut self, order: &str) {
        self.dimension_order = Some(order.to_string());
    }

    fn set_pixels_type(&mut self, pixel_type: &str) {
        self.pixel_type = Some(pixel_type.to_string());
    }

    fn set_channel_id(&mut self, id: &str, channel: u32) {
        self.channel(channel).id = Some(id.to_string());
    }

    fn set_channel_name(&mut self, name: &str, channel: u32) {
        self.channel(channel).name = Some(name.to_string());
    }

    fn set_channel_excitation_wavelength(&mut self, wavelength_nm: f64, channel: u32) {
        self.channel(channel).excitation_wavelength_nm = Some(wavelength_nm);
    }

    fn set_channel_light_source_settings(
        &mut self,
        light_source_id: &str,
        attenuation: Option<f64>,
        channel: u32,
    ) {
        let stored = self.channel(channel);
        stored.light_source_id = Some(light_source_id.to_string());
        stored.attenuation = attenuation;
    }

    fn set_channel_detector_settings(&mut self, detector_id: &str, channel: u32) {
        self.channel(channel).detector_id = Some(detector_id.to_string());
    }

    fn set_tiff_data(&mut self, first_c: u32, first_t: u32, plane_count: u32, file_name: &str) {
        self.tiff_data.push(StoredTiffData {
            first_c,
            first_t,
            plane_count,
            file_name: file_name.to_string(),
        });
    }

    fn set_plane_exposure_time(&mut self, seconds: f64, plane: usize) {
        self.plane_exposure_times_s.insert(plane, seconds);
    }

    fn put_original_metadata(&mut self, key: &str, value: &str) {
        self.original_metadata
            .insert(key.to_string(), value.to_string());
    }
}
