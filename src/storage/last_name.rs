//! Remembers the filename last chosen at the save/restore prompt.
//!
//! Stored as one newline-terminated line at the root of the save volume and
//! rewritten after every successful selection.

use std::io::{Read, Write};

use log::{debug, warn};

use super::volume::OpenMode;
use super::{Storage, StorageError};

/// Volume path of the record.
pub const RECORD_PATH: &str = "/last_save.txt";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LastFilename {
    name: Option<String>,
}

impl LastFilename {
    /// Reads the record from a mounted volume. A missing, unreadable or blank
    /// record yields no remembered name.
    pub fn load(storage: &mut Storage) -> Self {
        let Some(volume) = storage.volume_mut() else {
            return Self::default();
        };
        let mut contents = String::new();
        let read = volume
            .open(RECORD_PATH, OpenMode::Read)
            .and_then(|mut file| file.read_to_string(&mut contents));
        if let Err(e) = read {
            debug!("No last-used filename record: {}", e);
            return Self::default();
        }
        let name = contents.trim_end().to_string();
        if name.is_empty() {
            return Self::default();
        }
        debug!("Last-used filename: {}", name);
        Self { name: Some(name) }
    }

    pub fn get(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Records `name` in memory and on the volume.
    pub fn remember(&mut self, storage: &mut Storage, name: &str) -> Result<(), StorageError> {
        self.name = Some(name.to_string());
        let volume = storage.volume_mut().ok_or(StorageError::NotAvailable)?;
        let mut file = volume.open(RECORD_PATH, OpenMode::Write)?;
        file.write_all(format!("{name}\n").as_bytes())?;
        if let Err(e) = file.sync() {
            warn!("Failed to sync last-used filename record: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DEFAULT_SAVE_PREFIX;
    use crate::storage::volume::HostVolume;
    use std::sync::Arc;

    fn mounted(root: &std::path::Path) -> Storage {
        let mut storage = Storage::new(
            Arc::from(&b"story"[..]),
            DEFAULT_SAVE_PREFIX,
            Box::new(HostVolume::new(root)),
        )
        .unwrap();
        storage.mount().unwrap();
        storage
    }

    #[test]
    fn test_missing_record_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = mounted(dir.path());
        assert_eq!(LastFilename::load(&mut storage).get(), None);
    }

    #[test]
    fn test_remember_persists_single_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = mounted(dir.path());
        let mut last = LastFilename::default();
        last.remember(&mut storage, "zork.sav").unwrap();

        let raw = std::fs::read_to_string(dir.path().join("last_save.txt")).unwrap();
        assert_eq!(raw, "zork.sav\n");
        assert_eq!(LastFilename::load(&mut storage).get(), Some("zork.sav"));
    }

    #[test]
    fn test_trailing_whitespace_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("last_save.txt"), "slot2.sav  \r\n").unwrap();
        let mut storage = mounted(dir.path());
        assert_eq!(LastFilename::load(&mut storage).get(), Some("slot2.sav"));
    }

    #[test]
    fn test_remember_without_volume_keeps_name_in_memory() {
        let mut storage = Storage::new(
            Arc::from(&b"story"[..]),
            DEFAULT_SAVE_PREFIX,
            Box::new(HostVolume::new("unmounted")),
        )
        .unwrap();
        let mut last = LastFilename::default();
        assert!(matches!(
            last.remember(&mut storage, "a.sav"),
            Err(StorageError::NotAvailable)
        ));
        assert_eq!(last.get(), Some("a.sav"));
    }
}
