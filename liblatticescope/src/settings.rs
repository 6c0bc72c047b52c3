//! Parsing of the `<experimentName>_Settings.txt` file written next to the images.
//!
//! The file is a loose mix of `key: value` lines, `key=value` lines, section banners of
//! the form `***** ***** ***** <label> ***** ***** *****` and bracketed `[<label>]`
//! lines. Banners and brackets set a context which applies to every following data line
//! until it is replaced. That context lives in a [`SettingsCursor`] owned by a single
//! parse call, so two parses never share state.
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use super::error::{SettingsError, Warning};

lazy_static! {
    static ref BANNER_PATTERN: Regex =
        Regex::new(r"^[*]{5}\s+[*]{5}\s+[*]{5}.*[*]{5}\s+[*]{5}\s+[*]{5}.*$").unwrap();
    static ref BANNER_SEPARATOR: Regex = Regex::new(r"[*]{5}\s+[*]{5}\s+[*]{5}").unwrap();
}

// Keys are matched exactly as written by the acquisition software, trailing space included
const DESCRIPTION_KEY: &str = "Z motion ";
const MAGNIFICATION_KEY: &str = "Magnification ";
const DATE_KEY: &str = "Date ";
const LASER_LINE_KEY: &str = "Excitation Filter, Laser, Power (%), Exp(ms)";

/// One data line of the settings file, with the section context it appeared in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsEntry {
    pub tag_class: Option<String>,
    pub parent_tag: Option<String>,
    pub key: String,
    pub raw_value: String,
}

impl SettingsEntry {
    /// Key under which the entry is stored in the original metadata table:
    /// `[<tagClass>]::<parentTag>::<key>`, leaving out absent parts
    pub fn qualified_key(&self) -> String {
        let mut qualified = String::new();
        if let Some(class) = &self.tag_class {
            qualified.push_str(&format!("[{class}]::"));
        }
        if let Some(parent) = &self.parent_tag {
            qualified.push_str(&format!("{parent}::"));
        }
        qualified.push_str(&self.key);
        qualified
    }
}

/// Sticky section context of a single parse
#[derive(Debug, Clone, Default)]
pub struct SettingsCursor {
    tag_class: Option<String>,
    parent_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SettingsLine<'a> {
    Data { key: &'a str, value: &'a str },
    Banner(String),
    Section(&'a str),
    Ignored,
}

impl<'a> SettingsLine<'a> {
    fn classify(line: &'a str) -> Self {
        if let Some((key, value)) = line.split_once(':') {
            Self::Data { key, value }
        } else if let Some((key, value)) = line.split_once('=') {
            Self::Data { key, value }
        } else if line.is_empty() {
            Self::Ignored
        } else if BANNER_PATTERN.is_match(line) {
            match BANNER_SEPARATOR
                .split(line)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .last()
            {
                Some(label) => Self::Banner(label.to_string()),
                None => Self::Ignored,
            }
        } else {
            match (line.find('['), line.rfind(']')) {
                (Some(start), Some(stop)) if start < stop => Self::Section(&line[start..=stop]),
                _ => Self::Ignored,
            }
        }
    }
}

impl SettingsCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance over one line. Returns an entry for data lines; banner and bracket lines
    /// only update the cursor.
    pub fn advance(&mut self, line: &str) -> Option<SettingsEntry> {
        match SettingsLine::classify(line) {
            SettingsLine::Data { key, value } => Some(SettingsEntry {
                tag_class: self.tag_class.clone(),
                parent_tag: self.parent_tag.clone(),
                key: key.to_string(),
                raw_value: value.to_string(),
            }),
            SettingsLine::Banner(label) => {
                self.tag_class = Some(label);
                None
            }
            SettingsLine::Section(tag) => {
                self.parent_tag = Some(tag.to_string());
                None
            }
            SettingsLine::Ignored => {
                if !line.is_empty() {
                    spdlog::debug!("Ignoring unrecognized settings line {line:?}");
                }
                None
            }
        }
    }
}

/// Parse a sequence of lines in a single forward pass
pub fn parse_settings<'a, I>(lines: I) -> Vec<SettingsEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut cursor = SettingsCursor::new();
    lines
        .into_iter()
        .filter_map(|line| cursor.advance(line))
        .collect()
}

/// Attenuation reported for one laser line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserLine {
    pub wavelength_nm: f64,
    pub attenuation: f64,
}

/// Values picked out of the settings entries by the keyed side-effect table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsValues {
    pub image_description: Option<String>,
    pub magnification: Option<f64>,
    pub acquisition_date: Option<OffsetDateTime>,
    pub laser_lines: Vec<LaserLine>,
}

impl SettingsValues {
    /// Dispatch every entry through the side-effect table. Values which cannot be
    /// interpreted are reported as warnings and otherwise skipped.
    pub fn collect(entries: &[SettingsEntry], warnings: &mut Vec<Warning>) -> Self {
        let mut values = Self::default();
        for entry in entries {
            if let Err(warning) = values.apply(entry) {
                spdlog::warn!("{warning}");
                warnings.push(warning);
            }
        }
        values
    }

    fn apply(&mut self, entry: &SettingsEntry) -> Result<(), Warning> {
        let bad_value = |reason: &str| Warning::BadSettingsValue {
            key: entry.key.clone(),
            value: entry.raw_value.clone(),
            reason: reason.to_string(),
        };
        match entry.key.as_str() {
            DESCRIPTION_KEY => self.image_description = Some(entry.raw_value.trim().to_string()),
            MAGNIFICATION_KEY => {
                let magnification = entry
                    .raw_value
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| bad_value(&e.to_string()))?;
                self.magnification = Some(magnification);
            }
            DATE_KEY => self.acquisition_date = Some(parse_date(&entry.raw_value).map_err(|e| bad_value(&e))?),
            _ => (),
        }

        if entry.key.contains(LASER_LINE_KEY) {
            // Tab separated: filter, laser, power, exposure
            let fields: Vec<&str> = entry.raw_value.split('\t').collect();
            if fields.len() < 4 {
                return Err(bad_value("expected at least four tab separated fields"));
            }
            let Ok(wavelength_nm) = fields[2].trim().parse::<f64>() else {
                // Unused laser slots are reported as N/A
                return Ok(());
            };
            let attenuation = fields[3]
                .trim()
                .parse::<f64>()
                .map_err(|e| bad_value(&e.to_string()))?;
            if !(0.0..=1.0).contains(&attenuation) {
                return Err(bad_value("attenuation must be a fraction between 0 and 1"));
            }
            self.laser_lines.push(LaserLine {
                wavelength_nm,
                attenuation,
            });
        }
        Ok(())
    }

    /// Attenuation of the laser line matching the given excitation wavelength
    pub fn attenuation_for(&self, wavelength_nm: f64) -> Option<f64> {
        self.laser_lines
            .iter()
            .find(|line| line.wavelength_nm == wavelength_nm)
            .map(|line| line.attenuation)
    }
}

/// Dates are written as `MM/dd/yyyy hh:mm:ss a` and are taken as UTC
fn parse_date(value: &str) -> Result<OffsetDateTime, String> {
    let format = format_description!(
        "[month padding:none]/[day padding:none]/[year] [hour repr:12 padding:none]:[minute]:[second] [period case_sensitive:false]"
    );
    PrimitiveDateTime::parse(value.trim(), format)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| e.to_string())
}

/// A fully scanned settings file
#[derive(Debug, Clone)]
pub struct SettingsFile {
    pub path: PathBuf,
    pub entries: Vec<SettingsEntry>,
    pub values: SettingsValues,
}

impl SettingsFile {
    /// Read and parse a settings file. Any IO failure aborts the scan.
    pub fn read(path: &Path, warnings: &mut Vec<Warning>) -> Result<Self, SettingsError> {
        let bytes = std::fs::read(path).map_err(|source| SettingsError::IOError {
            path: path.to_path_buf(),
            source,
        })?;
        // The acquisition PC does not write UTF-8 consistently
        let contents = String::from_utf8_lossy(&bytes);
        let entries = parse_settings(contents.lines());
        let values = SettingsValues::collect(&entries, warnings);
        spdlog::info!(
            "Read {} settings entries from {}",
            entries.len(),
            path.to_string_lossy()
        );
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            values,
        })
    }

    /// The opaque key/value table of every data line
    pub fn original_metadata(&self) -> impl Iterator<Item = (String, &str)> {
        self.entries
            .iter()
            .map(|entry| (entry.qualified_key(), entry.raw_value.as_str()))
    }
}
