use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tiff::decoder::Decoder;
use tiff::tags::Tag;
use tiff::ColorType;

use super::constants::{EXPECTED_BITS_PER_SAMPLE, IMAGEJ_COMMENT_PREFIX};
use super::error::{TiffSourceError, Warning};

// The tiff crate has no names for the EXIF directory and its entries
const EXIF_IFD_TAG: u16 = 34665;
const EXPOSURE_TIME_TAG: u16 = 33434;
const RATIONAL_TYPE: u16 = 5;

/// Size of one LatticeScope tif. Every page of a file is one Z plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreDimensions {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    pub bits_per_sample: u8,
}

impl CoreDimensions {
    /// Pixels are always described as uint16; anything else is reported
    pub fn bit_depth_warning(&self, file: &str) -> Option<Warning> {
        if self.bits_per_sample == EXPECTED_BITS_PER_SAMPLE {
            None
        } else {
            Some(Warning::UnexpectedBitDepth {
                file: file.to_string(),
                bits: self.bits_per_sample,
            })
        }
    }
}

/// Who acquired the data and how long each plane was exposed, as recorded in the tags of
/// the first page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquisitionTags {
    pub artist: Option<String>,
    pub host_computer: Option<String>,
    pub exposure_time_s: Option<f64>,
}

/// The parts of a TIFF file the reader needs. Pixel data is never requested.
pub trait TiffSource {
    /// Free-text comment (the ImageDescription tag) of the first page
    fn comment(&self) -> Option<&str>;
    fn page_count(&self) -> u32;
    /// Width and height of the first page
    fn dimensions(&self) -> (u32, u32);
    fn bits_per_sample(&self) -> u8;
    fn artist(&self) -> Option<&str>;
    fn host_computer(&self) -> Option<&str>;
    /// ExposureTime of the EXIF directory, in seconds
    fn exposure_time_s(&self) -> Option<f64>;

    fn core_dimensions(&self) -> CoreDimensions {
        let (size_x, size_y) = self.dimensions();
        CoreDimensions {
            size_x,
            size_y,
            size_z: self.page_count(),
            bits_per_sample: self.bits_per_sample(),
        }
    }

    fn acquisition_tags(&self) -> AcquisitionTags {
        AcquisitionTags {
            artist: self.artist().map(str::to_string),
            host_computer: self.host_computer().map(str::to_string),
            exposure_time_s: self.exposure_time_s(),
        }
    }

    /// LatticeScope tifs always carry an ImageJ comment
    fn has_imagej_comment(&self) -> bool {
        self.comment()
            .is_some_and(|comment| comment.trim().starts_with(IMAGEJ_COMMENT_PREFIX))
    }
}

/// Header level view of a TIFF file, built on the tiff crate's decoder. Only IFDs are
/// walked; no strips or tiles are decoded.
#[derive(Debug, Clone)]
pub struct TiffFile {
    comment: Option<String>,
    artist: Option<String>,
    host_computer: Option<String>,
    exposure_time_s: Option<f64>,
    page_count: u32,
    dimensions: (u32, u32),
    bits_per_sample: u8,
}

impl TiffFile {
    pub fn open(path: &Path) -> Result<Self, TiffSourceError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self, TiffSourceError> {
        let mut header = [0u8; 4];
        reader.read_exact(&mut header)?;
        reader.seek(SeekFrom::Start(0))?;
        // BigTIFF directories use 8 byte offsets, only classic ones are walked by hand
        let classic = matches!(header, [b'I', b'I', 42, 0] | [b'M', b'M', 0, 42]);

        let mut decoder = Decoder::new(reader)?;
        let dimensions = decoder.dimensions()?;
        let bits_per_sample = match decoder.colortype()? {
            ColorType::Gray(bits)
            | ColorType::GrayA(bits)
            | ColorType::RGB(bits)
            | ColorType::RGBA(bits) => bits,
            _ => 0,
        };
        let comment = find_text(&mut decoder, Tag::ImageDescription)?;
        let artist = find_text(&mut decoder, Tag::Artist)?;
        let host_computer = find_text(&mut decoder, Tag::HostComputer)?;
        let exif_offset = decoder.find_tag_unsigned::<u64>(Tag::Unknown(EXIF_IFD_TAG))?;

        let mut page_count: u32 = 1;
        while decoder.more_images() {
            decoder.next_image()?;
            page_count += 1;
        }

        let exposure_time_s = match exif_offset {
            Some(offset) if classic => match read_exposure_time(&mut decoder, offset) {
                Ok(exposure) => exposure,
                Err(e) => {
                    spdlog::debug!("Could not read the EXIF directory: {e}");
                    None
                }
            },
            _ => None,
        };

        Ok(Self {
            comment,
            artist,
            host_computer,
            exposure_time_s,
            page_count,
            dimensions,
            bits_per_sample,
        })
    }
}

fn find_text<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: Tag,
) -> Result<Option<String>, TiffSourceError> {
    Ok(match decoder.find_tag(tag)? {
        Some(value) => Some(value.into_string()?),
        None => None,
    })
}

/// Scan the entries of the EXIF directory for the ExposureTime rational
fn read_exposure_time<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    exif_offset: u64,
) -> std::io::Result<Option<f64>> {
    decoder.goto_offset_u64(exif_offset)?;
    let entry_count = decoder.read_short()?;
    for _ in 0..entry_count {
        let tag = decoder.read_short()?;
        let field_type = decoder.read_short()?;
        let _count = decoder.read_long()?;
        let value_offset = decoder.read_long()?;
        if tag == EXPOSURE_TIME_TAG && field_type == RATIONAL_TYPE {
            decoder.goto_offset(value_offset)?;
            let numerator = decoder.read_long()?;
            let denominator = decoder.read_long()?;
            return Ok((denominator != 0).then(|| numerator as f64 / denominator as f64));
        }
    }
    Ok(None)
}

impl TiffSource for TiffFile {
    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn bits_per_sample(&self) -> u8 {
        self.bits_per_sample
    }

    fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    fn host_computer(&self) -> Option<&str> {
        self.host_computer.as_deref()
    }

    fn exposure_time_s(&self) -> Option<f64> {
        self.exposure_time_s
    }
}
