// Cheap checks a host can run before opening a dataset. Neither reads pixel data.
use std::io::{Read, Seek};
use std::path::Path;

use super::file_set::ExperimentIdentity;
use super::tiff_source::{TiffFile, TiffSource};

/// Does this path follow the LatticeScope naming grammar, with the experiment's settings
/// file next to it? The only IO is the existence check of the settings file.
pub fn is_this_type_name(path: &Path) -> bool {
    match ExperimentIdentity::from_path(path) {
        Ok((identity, _)) => identity.settings_file().exists(),
        Err(_) => false,
    }
}

/// Is this byte stream a TIFF whose comment starts with the ImageJ marker?
pub fn is_this_type_stream<R: Read + Seek>(reader: R) -> bool {
    match TiffFile::from_reader(reader) {
        Ok(tiff) => tiff.has_imagej_comment(),
        Err(e) => {
            spdlog::debug!("Stream is not a LatticeScope tif: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff_source::tests::write_stack;
    use std::fs::File;
    use std::io::Cursor;

    #[test]
    fn test_name_needs_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let name = "Exp_CamA_ch0_stack0000_488nm_0msec_0msecAbs.tif";
        File::create(dir.path().join(name)).unwrap();
        assert!(!is_this_type_name(&dir.path().join(name)));

        File::create(dir.path().join("Exp_Settings.txt")).unwrap();
        assert!(is_this_type_name(&dir.path().join(name)));
        assert!(!is_this_type_name(&dir.path().join("Exp_Settings.txt")));
        assert!(!is_this_type_name(&dir.path().join("Exp_ch0.tif")));
    }

    #[test]
    fn test_processed_name_looks_in_root() {
        let dir = tempfile::tempdir().unwrap();
        let decon = dir.path().join("GPUDecon");
        std::fs::create_dir(&decon).unwrap();
        File::create(dir.path().join("Exp_Settings.txt")).unwrap();
        assert!(is_this_type_name(
            &decon.join("Exp_ch0_stack0000_488nm_0msec_0msecAbs_decon.tif")
        ));
    }

    #[test]
    fn test_stream() {
        let mut buffer = Cursor::new(Vec::new());
        write_stack(&mut buffer, 4, 4, 2, Some("ImageJ=1.52p\n"));
        buffer.set_position(0);
        assert!(is_this_type_stream(buffer));

        let mut buffer = Cursor::new(Vec::new());
        write_stack(&mut buffer, 4, 4, 1, Some("OME"));
        buffer.set_position(0);
        assert!(!is_this_type_stream(buffer));

        assert!(!is_this_type_stream(Cursor::new(b"ImageJ=".to_vec())));
    }
}
