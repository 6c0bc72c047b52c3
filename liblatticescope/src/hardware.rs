// Fixed hardware of the LatticeScope. None of this is read from the data; the lasers,
// cameras and objectives are constants of the instrument.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaserType {
    Semiconductor,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorType {
    #[serde(rename = "CMOS")]
    Cmos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Immersion {
    WaterDipping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Correction {
    PlanApo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaserSpec {
    pub model: &'static str,
    pub manufacturer: &'static str,
    pub laser_type: LaserType,
    pub wavelength_nm: f64,
    pub power_mw: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSpec {
    pub model: &'static str,
    pub manufacturer: &'static str,
    pub detector_type: DetectorType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveSpec {
    pub model: &'static str,
    pub manufacturer: &'static str,
    pub lens_na: f64,
    pub immersion: Immersion,
    pub correction: Option<Correction>,
    pub working_distance_mm: f64,
    pub calibrated_magnification: Option<f64>,
}

// Keyed by the wavelength as written by `format!("{:?}", f64)`.
// 445 nm maps onto the 405 nm laser; that is what the instrument has always reported.
const LASER_CATALOG: [(&str, LaserSpec); 7] = [
    (
        "405.0",
        LaserSpec {
            model: "LBX-405-300-CSB-PP",
            manufacturer: "Oxxius",
            laser_type: LaserType::Semiconductor,
            wavelength_nm: 405.0,
            power_mw: 300.0,
        },
    ),
    (
        "445.0",
        LaserSpec {
            model: "LBX-405-300-CSB-PP",
            manufacturer: "Oxxius",
            laser_type: LaserType::Semiconductor,
            wavelength_nm: 405.0,
            power_mw: 300.0,
        },
    ),
    (
        "488.0",
        LaserSpec {
            model: "2RU-VFL-P-300-488-B1R",
            manufacturer: "MPB Communications",
            laser_type: LaserType::Other,
            wavelength_nm: 488.0,
            power_mw: 300.0,
        },
    ),
    (
        "532.0",
        LaserSpec {
            model: "2RU-VFL-P-500-532-B1R",
            manufacturer: "MPB Communications",
            laser_type: LaserType::Other,
            wavelength_nm: 532.0,
            power_mw: 500.0,
        },
    ),
    (
        "560.0",
        LaserSpec {
            model: "2RU-VFL-P-2000-560-B1R",
            manufacturer: "MPB Communications",
            laser_type: LaserType::Other,
            wavelength_nm: 560.0,
            power_mw: 2000.0,
        },
    ),
    (
        "589.0",
        LaserSpec {
            model: "2RU-VFL-P-500-589-B1R",
            manufacturer: "MPB Communications",
            laser_type: LaserType::Other,
            wavelength_nm: 589.0,
            power_mw: 500.0,
        },
    ),
    (
        "642.0",
        LaserSpec {
            model: "2RU-VFL-P-2000-642-B1R",
            manufacturer: "MPB Communications",
            laser_type: LaserType::Other,
            wavelength_nm: 642.0,
            power_mw: 2000.0,
        },
    ),
];

const DETECTOR_CATALOG: [(&str, DetectorSpec); 2] = [
    (
        "CamA",
        DetectorSpec {
            model: "ORCAFlash 4.0 V2",
            manufacturer: "Hamamatsu",
            detector_type: DetectorType::Cmos,
        },
    ),
    (
        "CamB",
        DetectorSpec {
            model: "ORCAFlash 4.0 V3",
            manufacturer: "Hamamatsu",
            detector_type: DetectorType::Cmos,
        },
    ),
];

/// Primary water dipping objective, then the long working distance secondary objective
pub const OBJECTIVES: [ObjectiveSpec; 2] = [
    ObjectiveSpec {
        model: "CFI-75 Apo 25x W MP",
        manufacturer: "Nikon",
        lens_na: 1.1,
        immersion: Immersion::WaterDipping,
        correction: Some(Correction::PlanApo),
        working_distance_mm: 2.0,
        calibrated_magnification: None,
    },
    ObjectiveSpec {
        model: "54-10-7@488-910",
        manufacturer: "Special Optics",
        lens_na: 0.66,
        immersion: Immersion::WaterDipping,
        correction: None,
        working_distance_mm: 3.74,
        calibrated_magnification: Some(28.6),
    },
];

/// The catalog key of a wavelength
pub fn wavelength_key(wavelength_nm: f64) -> String {
    format!("{wavelength_nm:?}")
}

/// Find the laser for an excitation wavelength. Only exact matches count
pub fn laser_spec(wavelength_nm: f64) -> Option<&'static LaserSpec> {
    let key = wavelength_key(wavelength_nm);
    LASER_CATALOG
        .iter()
        .find(|(catalog_key, _)| *catalog_key == key)
        .map(|(_, spec)| spec)
}

/// Find the camera for a detector keyword (`CamA` or `CamB`)
pub fn detector_spec(keyword: &str) -> Option<&'static DetectorSpec> {
    DETECTOR_CATALOG
        .iter()
        .find(|(catalog_key, _)| *catalog_key == keyword)
        .map(|(_, spec)| spec)
}

/// Generate an LSID of the form `Kind:i:j`
pub fn create_lsid(kind: &str, indices: &[usize]) -> String {
    indices
        .iter()
        .fold(String::from(kind), |lsid, idx| format!("{lsid}:{idx}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_laser_catalog() {
        let laser = laser_spec(488.0).unwrap();
        assert_eq!(laser.manufacturer, "MPB Communications");
        assert_eq!(laser.model, "2RU-VFL-P-300-488-B1R");
        assert!(laser_spec(999.0).is_none());
        assert!(laser_spec(488.5).is_none());
    }

    #[test]
    fn test_445_reports_405_laser() {
        assert_eq!(laser_spec(445.0), laser_spec(405.0));
    }

    #[test]
    fn test_detector_catalog() {
        assert_eq!(detector_spec("CamA").unwrap().model, "ORCAFlash 4.0 V2");
        assert_eq!(detector_spec("CamB").unwrap().model, "ORCAFlash 4.0 V3");
        assert!(detector_spec("camb").is_none());
    }

    #[test]
    fn test_lsid() {
        assert_eq!(create_lsid("Instrument", &[0]), "Instrument:0");
        assert_eq!(create_lsid("Detector", &[0, 3]), "Detector:0:3");
    }
}
