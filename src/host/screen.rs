//! `InterpreterHost` backed by the synchronization bridge and hybrid
//! storage. Lives entirely on the interpreter context.

use std::sync::Arc;

use log::{debug, info, warn};

use super::{INTERFACE_NAME, InterpreterHost, PromptError};
use crate::bridge::{Bridge, Input, StatusLine, StatusMode};
use crate::storage::last_name::LastFilename;
use crate::storage::{FileAccess, FileHandle, FileSystem, FileType, Storage};

/// Used when the player gives no name and nothing better is known.
pub const DEFAULT_FILENAME: &str = "story.sav";

/// Longest filename accepted at the prompt.
const MAX_FILENAME_LEN: usize = 64;

pub struct BridgeHost {
    bridge: Arc<dyn Bridge>,
    storage: Storage,
    last_name: LastFilename,
    cursor_row: u16,
    cursor_column: u16,
    mount_storage: bool,
}

impl BridgeHost {
    pub fn new(bridge: Arc<dyn Bridge>, storage: Storage) -> Self {
        Self {
            bridge,
            storage,
            last_name: LastFilename::default(),
            cursor_row: 1,
            cursor_column: 1,
            mount_storage: true,
        }
    }

    /// With storage disabled the volume is never mounted and every save or
    /// restore reports that storage is unavailable.
    pub fn with_storage_enabled(mut self, enabled: bool) -> Self {
        self.mount_storage = enabled;
        self
    }

    /// Mounts save storage and loads the last-used filename. Must run on
    /// the interpreter context, which owns the volume from here on. A failed
    /// mount leaves the session running without saves.
    pub fn prepare(&mut self) {
        if !self.mount_storage {
            info!("Save storage disabled");
            return;
        }
        match self.storage.mount() {
            Ok(()) => {
                info!("Save storage mounted");
                self.last_name = LastFilename::load(&mut self.storage);
            }
            Err(e) => warn!("Save storage unavailable: {}", e),
        }
    }

    pub fn bridge(&self) -> &Arc<dyn Bridge> {
        &self.bridge
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn last_filename(&self) -> Option<&str> {
        self.last_name.get()
    }

    /// Releases the save volume. Called once the engine has returned.
    pub fn finish(&mut self) {
        self.storage.unmount();
    }

    fn default_filename<'a>(&'a self, suggestion: &'a str) -> &'a str {
        match self.last_name.get() {
            Some(last) => last,
            None if !suggestion.trim().is_empty() => suggestion.trim(),
            None => DEFAULT_FILENAME,
        }
    }
}

impl InterpreterHost for BridgeHost {
    fn reset(&mut self) {
        debug!("Interface reset");
        self.bridge.reset();
        self.cursor_row = 1;
        self.cursor_column = 1;
    }

    fn close(&mut self, error: Option<&str>) {
        if let Some(message) = error {
            warn!("Interpreter closing with error: {}", message);
            self.bridge.push_str(message);
        }
        self.bridge.mark_exited();
    }

    fn output(&mut self, text: &str) {
        self.bridge.push_str(text);
    }

    fn read_line(&mut self, max_len: usize) -> Input<String> {
        self.bridge.read_line(max_len)
    }

    fn read_char(&mut self) -> Input<char> {
        self.bridge.read_char()
    }

    fn show_status(&mut self, room: &str, mode: StatusMode, p1: i16, p2: i16) {
        self.bridge.set_status(StatusLine::format(room, mode, p1, p2));
    }

    fn set_cursor(&mut self, row: u16, column: u16, _window: i16) {
        self.cursor_row = row;
        self.cursor_column = column;
    }

    fn cursor_row(&self) -> u16 {
        self.cursor_row
    }

    fn cursor_column(&self) -> u16 {
        self.cursor_column
    }

    fn output_interface_info(&mut self) {
        self.bridge.push_str(&format!(
            "{} {}\n",
            INTERFACE_NAME,
            env!("CARGO_PKG_VERSION")
        ));
    }

    fn prompt_for_filename(
        &mut self,
        suggestion: &str,
        file_type: FileType,
        access: FileAccess,
    ) -> Result<FileHandle, PromptError> {
        if !self.storage.is_mounted() {
            self.bridge.push_str("\n[Save storage not available]\n");
            return Err(PromptError::NotAvailable);
        }

        let fallback = self.default_filename(suggestion).to_string();
        self.bridge
            .push_str(&format!("\nEnter filename [{}]: ", fallback));

        let answer = match self.bridge.read_line(MAX_FILENAME_LEN) {
            Input::Data(line) => line,
            Input::Interrupted => return Err(PromptError::Interrupted),
        };
        let name = match answer.trim() {
            "" => fallback,
            typed => typed.to_string(),
        };

        debug!("Opening {:?} file '{}' for {:?}", file_type, name, access);
        match self.storage.open(&name, file_type, access) {
            Ok(handle) => {
                if let Err(e) = self.last_name.remember(&mut self.storage, &name) {
                    warn!("Could not record last filename: {}", e);
                }
                Ok(handle)
            }
            Err(e) => {
                self.bridge
                    .push_str(&format!("\n[Could not open {}: {}]\n", name, e));
                Err(PromptError::Open(e))
            }
        }
    }

    fn files(&mut self) -> &mut dyn FileSystem {
        &mut self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeConfig, OverflowPolicy, ThreadBridge};
    use crate::storage::volume::HostVolume;
    use crate::storage::{DEFAULT_SAVE_PREFIX, STORY_SENTINEL, StorageError};
    use std::io::Write;
    use std::thread;
    use std::time::Duration;

    fn bridge() -> Arc<dyn Bridge> {
        Arc::new(
            ThreadBridge::new(BridgeConfig {
                output_capacity: 1024,
                overflow: OverflowPolicy::EvictOldest,
            })
            .unwrap(),
        )
    }

    fn host(root: &std::path::Path, bridge: Arc<dyn Bridge>) -> BridgeHost {
        let storage = Storage::new(
            Arc::from(&b"0123456789"[..]),
            DEFAULT_SAVE_PREFIX,
            Box::new(HostVolume::new(root)),
        )
        .unwrap();
        BridgeHost::new(bridge, storage)
    }

    fn drain(bridge: &Arc<dyn Bridge>) -> String {
        let mut out = Vec::new();
        bridge.read_output(&mut out, usize::MAX);
        out.into_iter().collect()
    }

    /// Answers the next line request from another thread.
    fn answer_line(bridge: &Arc<dyn Bridge>, line: &'static str) -> thread::JoinHandle<()> {
        let bridge = bridge.clone();
        thread::spawn(move || {
            for _ in 0..400 {
                if bridge.submit_line(line) {
                    return;
                }
                thread::sleep(Duration::from_millis(5));
            }
            panic!("no line request arrived");
        })
    }

    #[test]
    fn test_prompt_without_storage_fails_without_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge();
        let mut host = host(dir.path(), bridge.clone()).with_storage_enabled(false);
        host.prepare();

        let result = host.prompt_for_filename("", FileType::Save, FileAccess::Write);
        assert!(matches!(result, Err(PromptError::NotAvailable)));
        assert!(drain(&bridge).contains("Save storage not available"));
        assert!(!bridge.waiting_for_line());
    }

    #[test]
    fn test_prompt_opens_typed_name_and_remembers_it() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge();
        let mut host = host(dir.path(), bridge.clone());
        host.prepare();

        let responder = answer_line(&bridge, "slot1.sav");
        let mut file = host
            .prompt_for_filename("", FileType::Save, FileAccess::Write)
            .unwrap();
        responder.join().unwrap();
        host.files().write(&mut file, b"quetzal").unwrap();
        host.files().close(file).unwrap();

        assert!(drain(&bridge).contains("Enter filename [story.sav]: "));
        assert_eq!(host.last_filename(), Some("slot1.sav"));
        assert_eq!(
            std::fs::read(dir.path().join("saves/slot1.sav")).unwrap(),
            b"quetzal"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("last_save.txt")).unwrap(),
            "slot1.sav\n"
        );
    }

    #[test]
    fn test_empty_answer_falls_back_to_last_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("last_save.txt"), "old.sav\n").unwrap();
        std::fs::create_dir_all(dir.path().join("saves")).unwrap();
        std::fs::File::create(dir.path().join("saves/old.sav"))
            .unwrap()
            .write_all(b"data")
            .unwrap();

        let bridge = bridge();
        let mut host = host(dir.path(), bridge.clone());
        host.prepare();
        assert_eq!(host.last_filename(), Some("old.sav"));

        let responder = answer_line(&bridge, "   ");
        let file = host
            .prompt_for_filename("suggested.sav", FileType::Save, FileAccess::Read)
            .unwrap();
        responder.join().unwrap();
        assert_eq!(file.name(), "old.sav");
        assert!(drain(&bridge).contains("[old.sav]"));
    }

    #[test]
    fn test_failed_open_reports_and_keeps_last_name() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge();
        let mut host = host(dir.path(), bridge.clone());
        host.prepare();

        let responder = answer_line(&bridge, "missing.sav");
        let result = host.prompt_for_filename("", FileType::Save, FileAccess::Read);
        responder.join().unwrap();

        assert!(matches!(result, Err(PromptError::Open(StorageError::Io(_)))));
        assert!(drain(&bridge).contains("Could not open missing.sav"));
        assert_eq!(host.last_filename(), None);
    }

    #[test]
    fn test_prompt_interrupted_by_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge();
        let mut host = host(dir.path(), bridge.clone());
        host.prepare();
        bridge.shutdown();

        let result = host.prompt_for_filename("", FileType::Save, FileAccess::Write);
        assert!(matches!(result, Err(PromptError::Interrupted)));
    }

    #[test]
    fn test_reset_clears_output_status_and_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge();
        let mut host = host(dir.path(), bridge.clone());

        host.output("text");
        host.show_status("Cellar", StatusMode::Score, 5, 10);
        host.set_cursor(4, 12, 0);
        assert_eq!((host.cursor_row(), host.cursor_column()), (4, 12));

        host.reset();
        assert_eq!(bridge.output_available(), 0);
        assert_eq!(bridge.status_line(), None);
        assert_eq!((host.cursor_row(), host.cursor_column()), (1, 1));
    }

    #[test]
    fn test_close_flushes_error_and_marks_exited() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge();
        let mut host = host(dir.path(), bridge.clone());
        assert!(bridge.mark_running());

        host.close(Some("Fatal: bad opcode"));
        assert_eq!(drain(&bridge), "Fatal: bad opcode");
        assert!(bridge.has_exited());
    }

    #[test]
    fn test_story_sentinel_readable_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = host(dir.path(), bridge()).with_storage_enabled(false);
        host.prepare();

        let mut story = host
            .files()
            .open(STORY_SENTINEL, FileType::Data, FileAccess::Read)
            .unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(host.files().read(&mut story, &mut buf).unwrap(), 10);
        assert_eq!(host.files().read(&mut story, &mut buf).unwrap(), 0);
        assert!(matches!(
            host.files()
                .open("save.dat", FileType::Save, FileAccess::Read),
            Err(StorageError::NotAvailable)
        ));
    }
}
