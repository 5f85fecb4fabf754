//! # Storage Abstraction
//!
//! Presents one logical filesystem to the interpreter:
//!
//! ```text
//!   open("@embedded")  ──►  MemoryCursor over the story image (read-only)
//!   open(anything else) ──►  <save dir>/<name> on the mounted Volume
//! ```
//!
//! The filename is the only dispatch key. While the volume is unmounted
//! every operation except opening the story image fails with
//! [`StorageError::NotAvailable`].
//!
//! Storage is confined to the interpreter's execution context; nothing here
//! is shared across threads.

pub mod last_name;
pub mod memory;
pub mod volume;

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use memory::MemoryCursor;
use volume::{OpenMode, Volume, VolumeFile};

/// Reserved filename denoting the embedded story image.
pub const STORY_SENTINEL: &str = "@embedded";

/// Save directory used when none is configured.
pub const DEFAULT_SAVE_PREFIX: &str = "/saves/";

// ============================================================================
// Types
// ============================================================================

/// What the interpreter intends to keep in a file. Recorded on the handle,
/// not used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Data,
    Save,
    Transcript,
    InputRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    Read,
    Write,
    Append,
}

impl FileAccess {
    fn open_mode(self) -> OpenMode {
        match self {
            FileAccess::Read => OpenMode::Read,
            FileAccess::Write => OpenMode::Write,
            FileAccess::Append => OpenMode::Append,
        }
    }
}

/// Reference point for [`FileSystem::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

enum Backing {
    Memory(MemoryCursor),
    Volume(Box<dyn VolumeFile>),
}

/// An open file. Consumed by [`FileSystem::close`], so a handle cannot be
/// closed twice.
pub struct FileHandle {
    name: String,
    file_type: FileType,
    access: FileAccess,
    backing: Backing,
}

impl FileHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn access(&self) -> FileAccess {
        self.access
    }

    /// True for the read-only story image.
    pub fn is_embedded(&self) -> bool {
        matches!(self.backing, Backing::Memory(_))
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("file_type", &self.file_type)
            .field("access", &self.access)
            .field("embedded", &self.is_embedded())
            .finish()
    }
}

/// Directory iteration is not offered by this storage layer, so no
/// directory handle can ever exist.
#[derive(Debug)]
pub enum DirHandle {}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum StorageError {
    /// Story image was empty at construction. Fatal.
    EmptyStory,
    /// Save storage is not mounted.
    NotAvailable,
    /// Write or write-access open against the story image.
    ReadOnly,
    /// Seek target outside the file.
    InvalidSeek,
    /// The medium accepted fewer bytes than requested.
    ShortWrite { written: usize, requested: usize },
    /// Operation not offered in this deployment.
    Unsupported(&'static str),
    Io(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::EmptyStory => write!(f, "story image is empty"),
            StorageError::NotAvailable => write!(f, "save storage not available"),
            StorageError::ReadOnly => write!(f, "embedded story is read-only"),
            StorageError::InvalidSeek => write!(f, "seek out of range"),
            StorageError::ShortWrite { written, requested } => {
                write!(f, "short write: {written} of {requested} bytes")
            }
            StorageError::Unsupported(op) => write!(f, "{op} is not supported"),
            StorageError::Io(e) => write!(f, "storage I/O error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(e)
    }
}

// ============================================================================
// Filesystem Interface
// ============================================================================

/// The file operations the interpreter engine calls.
pub trait FileSystem {
    fn open(
        &mut self,
        name: &str,
        file_type: FileType,
        access: FileAccess,
    ) -> Result<FileHandle, StorageError>;

    fn close(&mut self, file: FileHandle) -> Result<(), StorageError>;

    /// Reads up to `buf.len()` bytes; `Ok(0)` at end of file.
    fn read(&mut self, file: &mut FileHandle, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Next byte, or `None` at end of file or on error.
    fn read_char(&mut self, file: &mut FileHandle) -> Option<u8>;

    fn write(&mut self, file: &mut FileHandle, bytes: &[u8]) -> Result<(), StorageError>;

    fn write_char(&mut self, file: &mut FileHandle, byte: u8) -> Result<(), StorageError> {
        self.write(file, &[byte])
    }

    fn write_str(&mut self, file: &mut FileHandle, text: &str) -> Result<(), StorageError> {
        self.write(file, text.as_bytes())
    }

    /// Writes code points as UTF-8. Invalid code points become `?`.
    fn write_ucs(&mut self, file: &mut FileHandle, text: &[u32]) -> Result<(), StorageError> {
        let encoded: String = text
            .iter()
            .map(|&c| char::from_u32(c).unwrap_or('?'))
            .collect();
        self.write_str(file, &encoded)
    }

    fn write_fmt(
        &mut self,
        file: &mut FileHandle,
        args: fmt::Arguments<'_>,
    ) -> Result<(), StorageError> {
        self.write_str(file, &fmt::format(args))
    }

    /// Formatted reads. Save files are binary, so never offered.
    fn scan(&mut self, _file: &mut FileHandle) -> Result<(), StorageError> {
        Err(StorageError::Unsupported("formatted read"))
    }

    fn tell(&mut self, file: &mut FileHandle) -> Result<u64, StorageError>;

    /// Returns the new absolute position.
    fn seek(&mut self, file: &mut FileHandle, offset: i64, whence: Whence)
    -> Result<u64, StorageError>;

    /// Steps back one byte so a peeked character can be read again.
    fn unread_char(&mut self, file: &mut FileHandle) -> Result<(), StorageError>;

    fn flush(&mut self, file: &mut FileHandle) -> Result<(), StorageError>;

    fn last_modified(&mut self, file: &FileHandle) -> Option<DateTime<Utc>>;

    fn cwd(&self) -> String {
        "/".to_string()
    }

    fn change_dir(&mut self, _path: &str) -> Result<(), StorageError> {
        Err(StorageError::Unsupported("change directory"))
    }

    fn open_dir(&mut self, _path: &str) -> Result<DirHandle, StorageError> {
        Err(StorageError::Unsupported("directory listing"))
    }

    fn read_dir(&mut self, dir: &mut DirHandle) -> Result<Option<String>, StorageError> {
        match *dir {}
    }

    fn close_dir(&mut self, dir: DirHandle) -> Result<(), StorageError> {
        match dir {}
    }

    fn make_dir(&mut self, path: &str) -> Result<(), StorageError>;

    fn is_directory(&self, path: &str) -> bool;
}

// ============================================================================
// Hybrid Storage
// ============================================================================

/// Routes file operations between the embedded story image and the save
/// volume.
pub struct Storage {
    story: Arc<[u8]>,
    save_dir: String,
    volume: Box<dyn Volume>,
    mounted: bool,
}

impl Storage {
    /// Fails with [`StorageError::EmptyStory`] when there is no story to run.
    pub fn new(
        story: Arc<[u8]>,
        save_prefix: &str,
        volume: Box<dyn Volume>,
    ) -> Result<Self, StorageError> {
        if story.is_empty() {
            return Err(StorageError::EmptyStory);
        }
        let save_dir = save_prefix.trim_end_matches('/').to_string();
        info!(
            "Storage ready: {} byte story image, saves under '{}/'",
            story.len(),
            save_dir
        );
        Ok(Self {
            story,
            save_dir,
            volume,
            mounted: false,
        })
    }

    pub fn story_len(&self) -> usize {
        self.story.len()
    }

    /// Mounts the save volume and makes sure the save directory exists.
    /// Mounting twice is a no-op.
    pub fn mount(&mut self) -> Result<(), StorageError> {
        if self.mounted {
            return Ok(());
        }
        self.volume.mount()?;
        if !self.save_dir.is_empty() && !self.volume.is_dir(&self.save_dir) {
            if let Err(e) = self.volume.make_dir(&self.save_dir) {
                warn!("Could not create save directory {}: {}", self.save_dir, e);
            }
        }
        self.mounted = true;
        Ok(())
    }

    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.volume.unmount();
        self.mounted = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// The volume, or `None` while unmounted.
    pub(crate) fn volume_mut(&mut self) -> Option<&mut dyn Volume> {
        if self.mounted {
            Some(self.volume.as_mut())
        } else {
            None
        }
    }

    fn save_path(&self, name: &str) -> String {
        format!("{}/{}", self.save_dir, name.trim_start_matches('/'))
    }

    fn mounted_file<'a>(
        &self,
        file: &'a mut FileHandle,
    ) -> Result<&'a mut Box<dyn VolumeFile>, StorageError> {
        match &mut file.backing {
            Backing::Volume(inner) if self.mounted => Ok(inner),
            Backing::Volume(_) => Err(StorageError::NotAvailable),
            Backing::Memory(_) => Err(StorageError::ReadOnly),
        }
    }
}

impl FileSystem for Storage {
    fn open(
        &mut self,
        name: &str,
        file_type: FileType,
        access: FileAccess,
    ) -> Result<FileHandle, StorageError> {
        // Any access mode opens the story; writes through the handle fail
        if name == STORY_SENTINEL {
            debug!("Opening embedded story ({} bytes)", self.story.len());
            return Ok(FileHandle {
                name: name.to_string(),
                file_type,
                access,
                backing: Backing::Memory(MemoryCursor::new(self.story.clone())),
            });
        }

        if !self.mounted {
            return Err(StorageError::NotAvailable);
        }

        let path = self.save_path(name);
        let inner = self.volume.open(&path, access.open_mode()).map_err(|e| {
            warn!("Failed to open {}: {}", path, e);
            StorageError::Io(e)
        })?;
        debug!("Opened {} for {:?}", path, access);
        Ok(FileHandle {
            name: name.to_string(),
            file_type,
            access,
            backing: Backing::Volume(inner),
        })
    }

    fn close(&mut self, file: FileHandle) -> Result<(), StorageError> {
        match file.backing {
            Backing::Memory(_) => Ok(()),
            Backing::Volume(mut inner) => {
                if file.access != FileAccess::Read {
                    inner.flush()?;
                }
                Ok(())
            }
        }
    }

    fn read(&mut self, file: &mut FileHandle, buf: &mut [u8]) -> Result<usize, StorageError> {
        if let Backing::Memory(cursor) = &mut file.backing {
            return Ok(cursor.read(buf));
        }
        Ok(self.mounted_file(file)?.read(buf)?)
    }

    fn read_char(&mut self, file: &mut FileHandle) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.read(file, &mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn write(&mut self, file: &mut FileHandle, bytes: &[u8]) -> Result<(), StorageError> {
        let inner = self.mounted_file(file)?;
        let written = inner.write(bytes)?;
        if written < bytes.len() {
            return Err(StorageError::ShortWrite {
                written,
                requested: bytes.len(),
            });
        }
        Ok(())
    }

    fn tell(&mut self, file: &mut FileHandle) -> Result<u64, StorageError> {
        if let Backing::Memory(cursor) = &file.backing {
            return Ok(cursor.position() as u64);
        }
        Ok(self.mounted_file(file)?.stream_position()?)
    }

    fn seek(
        &mut self,
        file: &mut FileHandle,
        offset: i64,
        whence: Whence,
    ) -> Result<u64, StorageError> {
        if let Backing::Memory(cursor) = &mut file.backing {
            return cursor
                .seek(offset, whence)
                .map(|pos| pos as u64)
                .ok_or(StorageError::InvalidSeek);
        }
        let inner = self.mounted_file(file)?;
        let target = match whence {
            Whence::Start => {
                SeekFrom::Start(u64::try_from(offset).map_err(|_| StorageError::InvalidSeek)?)
            }
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        Ok(inner.seek(target)?)
    }

    fn unread_char(&mut self, file: &mut FileHandle) -> Result<(), StorageError> {
        if let Backing::Memory(cursor) = &mut file.backing {
            return if cursor.unread() {
                Ok(())
            } else {
                Err(StorageError::InvalidSeek)
            };
        }
        let inner = self.mounted_file(file)?;
        if inner.stream_position()? == 0 {
            return Err(StorageError::InvalidSeek);
        }
        inner.seek(SeekFrom::Current(-1))?;
        Ok(())
    }

    fn flush(&mut self, file: &mut FileHandle) -> Result<(), StorageError> {
        if file.is_embedded() {
            return Ok(());
        }
        Ok(self.mounted_file(file)?.sync()?)
    }

    fn last_modified(&mut self, file: &FileHandle) -> Option<DateTime<Utc>> {
        match &file.backing {
            Backing::Volume(inner) if self.mounted => inner.modified().ok().map(DateTime::from),
            _ => None,
        }
    }

    fn make_dir(&mut self, path: &str) -> Result<(), StorageError> {
        if !self.mounted {
            return Err(StorageError::NotAvailable);
        }
        let full = self.save_path(path);
        Ok(self.volume.make_dir(&full)?)
    }

    fn is_directory(&self, path: &str) -> bool {
        self.mounted && self.volume.is_dir(&self.save_path(path))
    }
}
