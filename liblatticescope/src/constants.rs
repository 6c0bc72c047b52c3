// Naming conventions of the LatticeScope acquisition software
pub const SETTINGS_FILE_SUFFIX: &str = "_Settings.txt";
pub const SETTINGS_MARKER: &str = "Settings";
pub const TIFF_EXTENSION: &str = ".tif";
pub const CAMERA_MARKER: &str = "_Cam";
pub const CHANNEL_MARKER: &str = "_ch";
pub const STACK_PREFIX: &str = "stack";
pub const CHANNEL_PREFIX: &str = "ch";
pub const WAVELENGTH_SUFFIX: &str = "nm";
pub const RELATIVE_TIME_SUFFIX: &str = "msec";
pub const ABSOLUTE_TIME_SUFFIX: &str = "msecAbs";
/// Largest channel or stack index accepted in a file name. Counts are index + 1
pub const MAX_INDEX: u32 = u32::MAX - 1;

// Processed data is written into these subdirectories of the experiment root
pub const DESKEWED_DIR: &str = "Deskewed";
pub const DECON_DIR: &str = "GPUDecon";

pub const COMPANION_EXTENSION: &str = ".companion.yml";
/// This is the version of the companion document format
pub const COMPANION_FORMAT_VERSION: &str = "1.0";
pub const EXPERIMENTER_ID: &str = "Experimenter:0";

/// Lateral pixel size of both cameras in micrometers
pub const PIXEL_SIZE_XY_UM: f64 = 103.5 / 1000.0;
pub const DIMENSION_ORDER: &str = "XYZCT";
pub const PIXEL_TYPE: &str = "uint16";
pub const EXPECTED_BITS_PER_SAMPLE: u8 = 16;

/// Every LatticeScope tif is written by ImageJ
pub const IMAGEJ_COMMENT_PREFIX: &str = "ImageJ=";
