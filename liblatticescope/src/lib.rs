//! # liblatticescope
//!
//! liblatticescope reads the datasets written by the LatticeScope lattice light-sheet
//! microscope. An acquisition is not one file: it is a directory of single-stack TIFF
//! files whose names encode the experiment, camera, channel, timepoint, excitation
//! wavelength and timestamps, plus one `<experimentName>_Settings.txt` file describing
//! the acquisition. Given any one of those files, liblatticescope finds the rest of the
//! experiment, lays the files out on a channel x timepoint grid, attaches the instrument
//! hardware, and describes the whole acquisition as a single multi-dimensional image.
//!
//! ## Usage
//!
//! ```no_run
//! use liblatticescope::config::ReaderConfig;
//! use liblatticescope::dataset::LatticeDataset;
//! use std::path::Path;
//!
//! let path = Path::new("/data/Exp_CamA_ch0_stack0000_488nm_0msec_0msecAbs.tif");
//! let (dataset, _store) = LatticeDataset::open(path, &ReaderConfig::default()).unwrap();
//! println!("{} channels", dataset.dimensions.channel_count());
//! ```
//!
//! A host with its own metadata model implements
//! [`MetadataStore`](metadata_store::MetadataStore) and calls
//! [`LatticeDataset::open_with_store`](dataset::LatticeDataset::open_with_store).
//! [`detect`] has the two cheap checks a host can use to decide whether a file belongs
//! to this format at all.
//!
//! ## File layout
//!
//! ```text
//! <root>/
//! |---- <experimentName>_Settings.txt
//! |---- <experimentName>[_CamA|_CamB]_ch<N>_stack<NNNN>_<wavelength>nm_<relMs>msec_<absMs>msecAbs.tif
//! |---- Deskewed/
//! |    |---- ..._deskewed.tif
//! |---- GPUDecon/
//! |    |---- ..._decon.tif
//! ```
//!
//! Pages inside one tif are Z planes; the stack index is the timepoint. The settings file
//! always lives in the root, also for the processed directories.
//!
//! ## Configuration
//!
//! [`ReaderConfig`](config::ReaderConfig) can be loaded from YAML. Missing fields take
//! their default:
//!
//! ```yml
//! create_companion: true
//! overwrite_companion: false
//! include_processed: true
//! ```
//!
//! ## Logging
//!
//! The library logs through spdlog-rs and never installs a sink; that is up to the
//! application. Problems which do not stop a dataset from opening (unparsable sibling
//! files, unknown lasers, bad settings values) are logged at warn level and also kept in
//! `LatticeDataset::warnings`.
//!
//! ## Companion Document Format
//!
//! When `create_companion` is set, the synthesized description is written as YAML to
//! `<experimentName><variant>.companion.yml` in the directory of the described files. An
//! existing document is left alone unless `overwrite_companion` is set.
//!
//! ```text
//! version
//! experimenter - id, first_name, last_name, email
//! instrument - id
//! |---- objectives, light_sources, detectors
//! image - id, name, acquisition_date, description, instrument_ref
//! |---- objective_settings - id, calibrated_magnification
//! |---- pixels - id, size_x/y/z/c/t, physical_size_x/y/z_um, dimension_order, pixel_type,
//! |    |         exposure_time_s
//! |    |---- channels - id, name, excitation_wavelength_nm, light_source_settings, detector_settings
//! |    |---- tiff_data - first_c, first_t, first_z, plane_count, file_name
//! original_metadata
//! ```
pub mod companion;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod detect;
pub mod dimension_map;
pub mod error;
pub mod file_set;
pub mod filename;
pub mod hardware;
pub mod instrument;
pub mod metadata_store;
pub mod settings;
pub mod tiff_source;
