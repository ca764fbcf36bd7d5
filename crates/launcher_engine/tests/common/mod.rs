#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Once;

use zip::write::SimpleFileOptions;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(launcher_logging::initialize_for_tests);
}

/// Writes a zip with the given `(name, contents, unix mode)` file entries.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8], u32)]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, contents, mode) in entries {
        let options = SimpleFileOptions::default().unix_permissions(*mode);
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents).unwrap();
    }
    zip.finish().unwrap();
}

pub fn zip_bytes(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let temp = tempfile::NamedTempFile::new().unwrap();
    write_zip(temp.path(), entries);
    std::fs::read(temp.path()).unwrap()
}
