//! `Zone.Identifier` alternate data stream store (Windows).
//!
//! The stream is addressed as `<file>:Zone.Identifier` and can be queried and
//! deleted through the ordinary file APIs.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::windows::fs::MetadataExt;
use std::path::{Path, PathBuf};

use super::MarkerStore;

const ZONE_STREAM: &str = ":Zone.Identifier";
const FILE_ATTRIBUTE_NORMAL: u32 = 0x80;

/// A [`MarkerStore`] over the `Zone.Identifier` alternate data stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZoneIdentifierStore;

fn stream_path(path: &Path) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(ZONE_STREAM);
    PathBuf::from(raw)
}

impl MarkerStore for ZoneIdentifierStore {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(stream_path(path)) {
            // A stream that reports only FILE_ATTRIBUTE_NORMAL carries no zone data.
            Ok(meta) => Ok(meta.file_attributes() & FILE_ATTRIBUTE_NORMAL == 0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(stream_path(path)) {
            Ok(()) => Ok(()),
            // ERROR_FILE_NOT_FOUND covers both "no stream" and "no file"; only
            // the former is success.
            Err(e) if e.kind() == io::ErrorKind::NotFound && path.exists() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &'static str {
        "zone-identifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stream_path_appends_zone_identifier() {
        let p = stream_path(Path::new(r"C:\Users\me\Downloads\setup.exe"));
        assert_eq!(p, PathBuf::from(r"C:\Users\me\Downloads\setup.exe:Zone.Identifier"));
    }

    #[test]
    fn test_zone_stream_roundtrip() -> io::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("setup.exe");
        fs::write(&path, b"MZ")?;

        let store = ZoneIdentifierStore;
        assert!(!store.exists(&path)?);

        if let Err(e) = fs::write(stream_path(&path), b"[ZoneTransfer]\r\nZoneId=3\r\n") {
            eprintln!("skipping ADS test (filesystem without streams): {e}");
            return Ok(());
        }
        assert!(store.exists(&path)?);
        store.remove(&path)?;
        assert!(!store.exists(&path)?);
        store.remove(&path)?;
        Ok(())
    }
}
