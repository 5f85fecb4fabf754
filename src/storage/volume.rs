//! # Save Volume
//!
//! The writable filesystem that save/restore files live on. On the board
//! this is a FAT card behind a block driver; on a host it is a directory.
//! The storage layer only talks to the [`Volume`] trait, so either can sit
//! underneath it.
//!
//! Paths handed to a volume are volume-absolute (`/saves/game.sav`).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use log::{debug, info};

/// How a volume file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing file for reading.
    Read,
    /// Create the file, truncating any previous contents.
    Write,
    /// Open or create, positioned at the end.
    Append,
}

/// An open file on a save volume.
pub trait VolumeFile: Read + Write + Seek + Send {
    /// Commits buffered writes to the medium.
    fn sync(&mut self) -> io::Result<()>;

    fn len(&self) -> io::Result<u64>;

    fn modified(&self) -> io::Result<SystemTime>;
}

impl VolumeFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn modified(&self) -> io::Result<SystemTime> {
        self.metadata()?.modified()
    }
}

/// A mountable filesystem.
pub trait Volume: Send {
    fn mount(&mut self) -> io::Result<()>;

    fn unmount(&mut self);

    fn open(&mut self, path: &str, mode: OpenMode) -> io::Result<Box<dyn VolumeFile>>;

    fn make_dir(&mut self, path: &str) -> io::Result<()>;

    fn is_dir(&self, path: &str) -> bool;
}

/// A volume backed by a directory on the host filesystem.
pub struct HostVolume {
    root: PathBuf,
}

impl HostVolume {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a volume-absolute path onto the host directory, refusing
    /// anything that would climb out of the root.
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path escapes volume: {path}"),
                    ));
                }
            }
        }
        Ok(resolved)
    }
}

impl Volume for HostVolume {
    fn mount(&mut self) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        info!("Mounted host volume at {}", self.root.display());
        Ok(())
    }

    fn unmount(&mut self) {
        info!("Unmounted host volume at {}", self.root.display());
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> io::Result<Box<dyn VolumeFile>> {
        let full = self.resolve(path)?;
        debug!("Opening {} ({:?})", full.display(), mode);
        let file = match mode {
            OpenMode::Read => OpenOptions::new().read(true).open(&full)?,
            OpenMode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&full)?,
            OpenMode::Append => OpenOptions::new()
                .read(true)
                .append(true)
                .create(true)
                .open(&full)?,
        };
        Ok(Box::new(file))
    }

    fn make_dir(&mut self, path: &str) -> io::Result<()> {
        fs::create_dir(self.resolve(path)?)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_dir()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut volume = HostVolume::new(dir.path());
        volume.mount().unwrap();

        let mut file = volume.open("/game.sav", OpenMode::Write).unwrap();
        file.write_all(b"state").unwrap();
        file.sync().unwrap();
        drop(file);

        let mut file = volume.open("/game.sav", OpenMode::Read).unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "state");
    }

    #[test]
    fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut volume = HostVolume::new(dir.path());
        assert!(volume.open("/nope.sav", OpenMode::Read).is_err());
    }

    #[test]
    fn test_append_keeps_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut volume = HostVolume::new(dir.path());
        volume.open("/log.txt", OpenMode::Write).unwrap().write_all(b"one\n").unwrap();
        volume.open("/log.txt", OpenMode::Append).unwrap().write_all(b"two\n").unwrap();
        let contents = fs::read_to_string(dir.path().join("log.txt")).unwrap();
        assert_eq!(contents, "one\ntwo\n");
    }

    #[test]
    fn test_parent_components_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut volume = HostVolume::new(dir.path().join("card"));
        let err = volume.open("/../escape.txt", OpenMode::Write).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_make_dir_and_is_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut volume = HostVolume::new(dir.path());
        assert!(!volume.is_dir("/saves"));
        volume.make_dir("/saves").unwrap();
        assert!(volume.is_dir("/saves"));
        assert!(volume.make_dir("/saves").is_err());
    }
}
