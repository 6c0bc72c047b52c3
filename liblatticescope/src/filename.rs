//! Decoding of LatticeScope file names.
//!
//! The acquisition software encodes the experiment layout in every file name:
//!
//! ```text
//! <experimentName>[_CamA|_CamB]_ch<N>_stack<NNNN>_<wavelength>nm_<relMs>msec_<absMs>msecAbs[_deskewed|_decon].tif
//! ```
//!
//! Fields are positional relative to the channel token, not to the start of the name,
//! because the camera token is optional and the experiment name may itself contain
//! underscores.
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::constants::*;
use super::error::{DetectorError, FilenameError};

lazy_static! {
    static ref RAW_PATTERN: Regex =
        Regex::new(r"^.*_ch.*_stack.*_.*nm_.*msec_.*msecAbs\.tif$").unwrap();
    static ref DESKEWED_PATTERN: Regex =
        Regex::new(r"^.*_ch.*_stack.*_.*nm_.*msec_.*msecAbs_.*deskewed.*\.tif$").unwrap();
    static ref DECON_PATTERN: Regex =
        Regex::new(r"^.*_ch.*_stack.*_.*nm_.*msec_.*msecAbs_.*decon.*\.tif$").unwrap();
}

/// The two cameras of the instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Detector {
    CamA,
    CamB,
}

impl Detector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CamA => "CamA",
            Self::CamB => "CamB",
        }
    }
}

impl FromStr for Detector {
    type Err = DetectorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "CamA" {
            Ok(Self::CamA)
        } else if s == "CamB" {
            Ok(Self::CamB)
        } else {
            Err(DetectorError::InvalidKeyword(s.to_string()))
        }
    }
}

impl Display for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Processing variant of an acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProcessingStage {
    #[default]
    Raw,
    Deskewed,
    Decon,
}

impl ProcessingStage {
    /// Match a file name against the three accepted shapes.
    ///
    /// Returns None if the name is not a LatticeScope file name at all. A name carrying
    /// both processing tags is reported as Decon, as deconvolution runs after deskewing.
    pub fn classify(file_name: &str) -> Option<Self> {
        if RAW_PATTERN.is_match(file_name) {
            Some(Self::Raw)
        } else if DECON_PATTERN.is_match(file_name) {
            Some(Self::Decon)
        } else if DESKEWED_PATTERN.is_match(file_name) {
            Some(Self::Deskewed)
        } else {
            None
        }
    }

    pub fn is_raw(&self) -> bool {
        *self == Self::Raw
    }
}

/// Get the experiment name from a base file name (never a full path).
///
/// The name ends at the first camera token, or at the first channel token if no camera
/// is named.
pub fn experiment_name(file_name: &str) -> Option<&str> {
    if let Some(idx) = file_name.find(CAMERA_MARKER) {
        Some(&file_name[..idx])
    } else {
        file_name.find(CHANNEL_MARKER).map(|idx| &file_name[..idx])
    }
}

/// All of the information a single file name carries
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFilename {
    pub experiment_name: String,
    pub detector: Detector,
    pub channel: u32,
    pub stack: u32,
    pub excitation_wavelength_nm: f64,
    pub relative_time_ms: u64,
    pub absolute_time_ms: Option<u64>,
    pub stage: ProcessingStage,
    /// Everything between `msecAbs` and `.tif`, e.g. `_deskewed`. Empty for raw files
    pub variant: String,
}

impl ParsedFilename {
    /// Parse a base file name.
    ///
    /// A name which does not have one of the three accepted shapes gives
    /// `FilenameError::FormatMismatch`; a name with the right shape but a non-numeric
    /// positional field gives `FilenameError::MalformedField`.
    pub fn parse(file_name: &str) -> Result<Self, FilenameError> {
        let mismatch = || FilenameError::FormatMismatch(file_name.to_string());
        let stage = ProcessingStage::classify(file_name).ok_or_else(mismatch)?;
        let experiment = experiment_name(file_name).ok_or_else(mismatch)?;
        let stem = file_name
            .strip_suffix(TIFF_EXTENSION)
            .ok_or_else(mismatch)?;

        let tokens: Vec<&str> = stem.split('_').collect();
        let mut detector: Option<Detector> = None;
        let mut marker: Option<usize> = None;
        for (idx, token) in tokens.iter().enumerate() {
            // The channel token is always directly followed by the stack token
            if token.starts_with(CHANNEL_PREFIX)
                && tokens
                    .get(idx + 1)
                    .is_some_and(|next| next.starts_with(STACK_PREFIX))
            {
                marker = Some(idx);
                break;
            }
            if let Ok(det) = Detector::from_str(token) {
                detector = Some(det);
            }
        }
        let marker = marker.ok_or_else(mismatch)?;

        let field = |offset: usize| tokens.get(marker + offset).copied().ok_or_else(mismatch);
        let malformed = |field: &'static str, token: &str| FilenameError::MalformedField {
            name: file_name.to_string(),
            field,
            token: token.to_string(),
        };

        let channel_token = field(0)?;
        let channel = channel_token[CHANNEL_PREFIX.len()..]
            .parse::<u32>()
            .ok()
            .filter(|index| *index <= MAX_INDEX)
            .ok_or_else(|| malformed("channel", channel_token))?;

        let stack_token = field(1)?;
        let stack = stack_token[STACK_PREFIX.len()..]
            .parse::<u32>()
            .ok()
            .filter(|index| *index <= MAX_INDEX)
            .ok_or_else(|| malformed("stack", stack_token))?;

        let wavelength_token = field(2)?;
        let excitation_wavelength_nm = wavelength_token
            .strip_suffix(WAVELENGTH_SUFFIX)
            .and_then(|value| value.parse::<f64>().ok())
            .ok_or_else(|| malformed("excitation wavelength", wavelength_token))?;

        let relative_token = field(3)?;
        let relative_time_ms = relative_token
            .strip_suffix(RELATIVE_TIME_SUFFIX)
            .and_then(|value| value.parse::<u64>().ok())
            .ok_or_else(|| malformed("relative time", relative_token))?;

        // The absolute timestamp is left empty by older acquisition software
        let absolute_token = field(4)?;
        let absolute_time_ms = match absolute_token.strip_suffix(ABSOLUTE_TIME_SUFFIX) {
            Some("") => None,
            Some(value) => Some(
                value
                    .parse::<u64>()
                    .map_err(|_| malformed("absolute time", absolute_token))?,
            ),
            None => return Err(malformed("absolute time", absolute_token)),
        };

        let variant = tokens[(marker + 5).min(tokens.len())..]
            .iter()
            .map(|token| format!("_{token}"))
            .collect::<String>();

        Ok(Self {
            experiment_name: experiment.to_string(),
            detector: detector.unwrap_or(Detector::CamA),
            channel,
            stack,
            excitation_wavelength_nm,
            relative_time_ms,
            absolute_time_ms,
            stage,
            variant,
        })
    }

    /// Render the fields back into the acquisition software's naming scheme. The camera
    /// token is always written.
    pub fn canonical_name(&self) -> String {
        format!(
            "{}_{}_ch{}_stack{:04}_{}nm_{}msec_{}msecAbs{}{}",
            self.experiment_name,
            self.detector,
            self.channel,
            self.stack,
            self.excitation_wavelength_nm,
            self.relative_time_ms,
            self.absolute_time_ms
                .map(|abs| abs.to_string())
                .unwrap_or_default(),
            self.variant,
            TIFF_EXTENSION
        )
    }
}

impl FromStr for ParsedFilename {
    type Err = FilenameError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
