use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::error::Warning;
use super::filename::Detector;
use super::hardware::{
    create_lsid, detector_spec, laser_spec, wavelength_key, Correction, DetectorType, Immersion,
    LaserType, ObjectiveSpec, OBJECTIVES,
};
use super::settings::{LaserLine, SettingsValues};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector_type: Option<DetectorType>,
}

impl DetectorDescriptor {
    /// Look up a camera by keyword. Anything but `CamA`/`CamB` (including no keyword)
    /// gives a descriptor with only its identifier set.
    pub fn lookup(keyword: Option<&str>, index: usize) -> Self {
        let id = create_lsid("Detector", &[0, index]);
        match keyword.and_then(detector_spec) {
            Some(spec) => Self {
                id,
                model: Some(spec.model.to_string()),
                manufacturer: Some(spec.manufacturer.to_string()),
                detector_type: Some(spec.detector_type),
            },
            None => Self {
                id,
                model: None,
                manufacturer: None,
                detector_type: None,
            },
        }
    }

    pub fn is_known(&self) -> bool {
        self.model.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub laser_type: Option<LaserType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wavelength_nm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_mw: Option<f64>,
}

impl LaserDescriptor {
    /// Look up a laser by exact excitation wavelength. Unknown wavelengths give a
    /// descriptor with only its identifier set.
    pub fn lookup(wavelength_nm: f64, index: usize) -> Self {
        let id = create_lsid("LightSource", &[0, index]);
        match laser_spec(wavelength_nm) {
            Some(spec) => Self {
                id,
                model: Some(spec.model.to_string()),
                manufacturer: Some(spec.manufacturer.to_string()),
                laser_type: Some(spec.laser_type),
                wavelength_nm: Some(spec.wavelength_nm),
                power_mw: Some(spec.power_mw),
            },
            None => Self {
                id,
                model: None,
                manufacturer: None,
                laser_type: None,
                wavelength_nm: None,
                power_mw: None,
            },
        }
    }

    pub fn is_known(&self) -> bool {
        self.model.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveDescriptor {
    pub id: String,
    pub model: String,
    pub manufacturer: String,
    pub lens_na: f64,
    pub immersion: Immersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<Correction>,
    pub working_distance_mm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibrated_magnification: Option<f64>,
}

impl ObjectiveDescriptor {
    fn from_spec(spec: &ObjectiveSpec, index: usize) -> Self {
        Self {
            id: create_lsid("Objective", &[index, 0]),
            model: spec.model.to_string(),
            manufacturer: spec.manufacturer.to_string(),
            lens_na: spec.lens_na,
            immersion: spec.immersion,
            correction: spec.correction,
            working_distance_mm: spec.working_distance_mm,
            calibrated_magnification: spec.calibrated_magnification,
        }
    }

    /// Both objectives of the instrument, primary first
    pub fn instrument_pair() -> Vec<Self> {
        OBJECTIVES
            .iter()
            .enumerate()
            .map(|(idx, spec)| Self::from_spec(spec, idx))
            .collect()
    }
}

/// Everything known about the light path of the opened image
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentMetadata {
    pub id: String,
    pub detector: DetectorDescriptor,
    pub laser: Option<LaserDescriptor>,
    pub objectives: Vec<ObjectiveDescriptor>,
    pub excitation_wavelength_nm: Option<f64>,
    pub magnification: Option<f64>,
    pub acquisition_date: Option<OffsetDateTime>,
    pub image_description: Option<String>,
    pub channel_attenuation: Option<f64>,
    /// Attenuation of every laser line reported by the settings file
    pub laser_lines: Vec<LaserLine>,
}

impl InstrumentMetadata {
    /// Build the filename derived part from the catalogs. Lookups which miss are
    /// reported as warnings; they never fail.
    pub fn resolve(
        detector: Option<Detector>,
        wavelength_nm: Option<f64>,
        warnings: &mut Vec<Warning>,
    ) -> Self {
        let detector = DetectorDescriptor::lookup(detector.map(|d| d.as_str()), 0);
        if !detector.is_known() {
            warn_lookup("detector", String::from("no camera"), warnings);
        }
        let laser = wavelength_nm.map(|wavelength| {
            let laser = LaserDescriptor::lookup(wavelength, 0);
            if !laser.is_known() {
                warn_lookup("laser", format!("{} nm", wavelength_key(wavelength)), warnings);
            }
            laser
        });
        Self {
            id: create_lsid("Instrument", &[0]),
            detector,
            laser,
            objectives: ObjectiveDescriptor::instrument_pair(),
            excitation_wavelength_nm: wavelength_nm,
            magnification: None,
            acquisition_date: None,
            image_description: None,
            channel_attenuation: None,
            laser_lines: Vec::new(),
        }
    }

    /// Overwrite with what the settings file reported. Wavelength and detector stay as
    /// the file name says.
    pub fn merge_settings(&mut self, values: &SettingsValues) {
        if let Some(magnification) = values.magnification {
            self.magnification = Some(magnification);
            if let Some(primary) = self.objectives.first_mut() {
                primary.calibrated_magnification = Some(magnification);
            }
        }
        if let Some(date) = values.acquisition_date {
            self.acquisition_date = Some(date);
        }
        if let Some(description) = &values.image_description {
            self.image_description = Some(description.clone());
        }
        if let Some(attenuation) = self
            .excitation_wavelength_nm
            .and_then(|wavelength| values.attenuation_for(wavelength))
        {
            self.channel_attenuation = Some(attenuation);
        }
        self.laser_lines = values.laser_lines.clone();
    }

    /// Attenuation of the laser line at the given wavelength, if the settings file had one
    pub fn attenuation_for(&self, wavelength_nm: f64) -> Option<f64> {
        self.laser_lines
            .iter()
            .find(|line| line.wavelength_nm == wavelength_nm)
            .map(|line| line.attenuation)
    }
}

fn warn_lookup(kind: &'static str, key: String, warnings: &mut Vec<Warning>) {
    let warning = Warning::AmbiguousLookup { kind, key };
    spdlog::warn!("{warning}");
    warnings.push(warning);
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_known_laser() {
        let laser = LaserDescriptor::lookup(488.0, 0);
        assert_eq!(laser.id, "LightSource:0:0");
        assert_eq!(laser.manufacturer.as_deref(), Some("MPB Communications"));
        assert_eq!(laser.model.as_deref(), Some("2RU-VFL-P-300-488-B1R"));
        assert_eq!(laser.wavelength_nm, Some(488.0));
    }

    #[test]
    fn test_unknown_laser_is_identifier_only() {
        let laser = LaserDescriptor::lookup(999.0, 2);
        assert_eq!(laser.id, "LightSource:0:2");
        assert_eq!(laser.manufacturer, None);
        assert_eq!(laser.model, None);
        assert_eq!(laser.laser_type, None);
        assert_eq!(laser.power_mw, None);
    }

    #[test]
    fn test_unknown_detector_is_identifier_only() {
        let detector = DetectorDescriptor::lookup(Some("CamC"), 1);
        assert_eq!(detector.id, "Detector:0:1");
        assert!(!detector.is_known());
        assert!(!DetectorDescriptor::lookup(None, 0).is_known());
    }

    #[test]
    fn test_resolve_warns_on_unknown_wavelength() {
        let mut warnings = Vec::new();
        let meta = InstrumentMetadata::resolve(Some(Detector::CamB), Some(999.0), &mut warnings);
        assert_eq!(meta.detector.model.as_deref(), Some("ORCAFlash 4.0 V3"));
        assert!(!meta.laser.as_ref().unwrap().is_known());
        assert_eq!(
            warnings,
            vec![Warning::AmbiguousLookup {
                kind: "laser",
                key: String::from("999.0 nm")
            }]
        );
        assert_eq!(meta.objectives.len(), 2);
        assert_eq!(meta.objectives[0].id, "Objective:0:0");
        assert_eq!(meta.objectives[1].id, "Objective:1:0");
    }

    #[test]
    fn test_merge_settings() {
        let mut warnings = Vec::new();
        let mut meta = InstrumentMetadata::resolve(Some(Detector::CamA), Some(488.0), &mut warnings);
        let values = SettingsValues {
            image_description: Some(String::from("moving")),
            magnification: Some(25.0),
            acquisition_date: Some(datetime!(2020-01-02 15:04:05 UTC)),
            laser_lines: vec![
                LaserLine {
                    wavelength_nm: 560.0,
                    attenuation: 0.5,
                },
                LaserLine {
                    wavelength_nm: 488.0,
                    attenuation: 0.1,
                },
            ],
        };
        meta.merge_settings(&values);
        assert!(warnings.is_empty());
        assert_eq!(meta.magnification, Some(25.0));
        assert_eq!(meta.objectives[0].calibrated_magnification, Some(25.0));
        assert_eq!(meta.objectives[1].calibrated_magnification, Some(28.6));
        assert_eq!(meta.channel_attenuation, Some(0.1));
        assert_eq!(meta.attenuation_for(560.0), Some(0.5));
        assert_eq!(meta.image_description.as_deref(), Some("moving"));
        assert_eq!(meta.excitation_wavelength_nm, Some(488.0));
    }

    #[test]
    fn test_merge_keeps_defaults_without_settings() {
        let mut warnings = Vec::new();
        let mut meta = InstrumentMetadata::resolve(Some(Detector::CamA), Some(405.0), &mut warnings);
        meta.merge_settings(&SettingsValues::default());
        assert_eq!(meta.magnification, None);
        assert_eq!(meta.objectives[0].calibrated_magnification, None);
        assert_eq!(meta.acquisition_date, None);
    }
}
