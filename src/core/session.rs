//! # Session Lifecycle
//!
//! A session owns one bridge and one interpreter context. Construction
//! loads the story and builds every synchronization object up front, so
//! any failure happens before the interpreter starts. `start` hands the
//! host to the interpreter context, and `shutdown` (also run on drop)
//! releases a blocked input wait and joins it.
//!
//! ```text
//!   new() ──► start(engine) ──► interpreter context:
//!                                 prepare (mount, last name)
//!                                 engine.run(host)
//!                                 close → Exited
//!   shutdown() ──► bridge.shutdown() ──► join
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::sync::Arc;
use std::thread;

use log::{error, info, warn};

use crate::Backend;
use crate::bridge::{self, Bridge, BridgeConfig, BridgeError};
use crate::core::config::{ResolvedConfig, StorySource};
use crate::engine::Engine;
use crate::engine::demo::DEMO_STORY;
use crate::host::{BridgeHost, InterpreterHost};
use crate::rtos::{INTERPRETER_STACK_BYTES, INTERPRETER_TASK_PRIORITY, Task};
use crate::storage::volume::HostVolume;
use crate::storage::{Storage, StorageError};

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum SessionError {
    /// The story file could not be read.
    Story(io::Error),
    Storage(StorageError),
    Bridge(BridgeError),
    AlreadyStarted,
    /// The interpreter context could not be created.
    Spawn(io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Story(e) => write!(f, "could not read story: {e}"),
            SessionError::Storage(e) => write!(f, "storage setup failed: {e}"),
            SessionError::Bridge(e) => write!(f, "bridge setup failed: {e}"),
            SessionError::AlreadyStarted => write!(f, "session already started"),
            SessionError::Spawn(e) => write!(f, "could not start interpreter: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> Self {
        SessionError::Storage(e)
    }
}

impl From<BridgeError> for SessionError {
    fn from(e: BridgeError) -> Self {
        SessionError::Bridge(e)
    }
}

/// Reads the whole story image into memory.
pub fn load_story(source: &StorySource) -> Result<Arc<[u8]>, SessionError> {
    match source {
        StorySource::Demo => Ok(Arc::from(DEMO_STORY.as_bytes())),
        StorySource::Path(path) => {
            let image = fs::read(path).map_err(SessionError::Story)?;
            info!("Read story {} ({} bytes)", path.display(), image.len());
            Ok(Arc::from(image))
        }
    }
}

// ============================================================================
// Session
// ============================================================================

enum Worker {
    Thread(thread::JoinHandle<()>),
    Task(Task),
}

pub struct Session {
    backend: Backend,
    bridge: Arc<dyn Bridge>,
    host: Option<BridgeHost>,
    worker: Option<Worker>,
}

impl Session {
    pub fn new(
        backend: Backend,
        bridge_config: BridgeConfig,
        storage: Storage,
        mount_storage: bool,
    ) -> Result<Self, SessionError> {
        let bridge = bridge::create(backend, bridge_config)?;
        let host = BridgeHost::new(bridge.clone(), storage).with_storage_enabled(mount_storage);
        Ok(Self {
            backend,
            bridge,
            host: Some(host),
            worker: None,
        })
    }

    /// Loads the story and builds storage and bridge from resolved settings.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, SessionError> {
        let story = load_story(&config.story)?;
        let storage = Storage::new(
            story,
            &config.save_prefix,
            Box::new(HostVolume::new(&config.storage_root)),
        )?;
        Self::new(config.backend, config.bridge, storage, config.mount_storage)
    }

    pub fn bridge(&self) -> Arc<dyn Bridge> {
        self.bridge.clone()
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Runs `engine` on a new interpreter context.
    pub fn start(&mut self, engine: Box<dyn Engine>) -> Result<(), SessionError> {
        let host = self.host.take().ok_or(SessionError::AlreadyStarted)?;
        if !self.bridge.mark_running() {
            return Err(SessionError::AlreadyStarted);
        }
        info!("Starting {:?} session with engine '{}'", self.backend, engine.name());

        let body = move || run_interpreter(host, engine);
        let worker = match self.backend {
            Backend::Threaded => thread::Builder::new()
                .name("interpreter".to_string())
                .stack_size(INTERPRETER_STACK_BYTES)
                .spawn(body)
                .map(Worker::Thread),
            Backend::Rtos => Task::spawn(
                "interpreter",
                INTERPRETER_TASK_PRIORITY,
                INTERPRETER_STACK_BYTES,
                body,
            )
            .map(Worker::Task),
        };
        match worker {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                self.bridge.mark_exited();
                Err(SessionError::Spawn(e))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.worker {
            Some(Worker::Thread(handle)) => handle.is_finished(),
            Some(Worker::Task(task)) => task.is_finished(),
            None => self.bridge.has_exited(),
        }
    }

    /// Unblocks any pending input wait and waits for the interpreter to
    /// unwind. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.bridge.shutdown();
        match self.worker.take() {
            Some(Worker::Thread(handle)) => {
                if handle.join().is_err() {
                    warn!("Interpreter thread panicked");
                }
            }
            Some(Worker::Task(task)) => task.join(),
            None => return,
        }
        info!("Session shut down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Body of the interpreter context.
fn run_interpreter(mut host: BridgeHost, mut engine: Box<dyn Engine>) {
    host.prepare();
    match engine.run(&mut host) {
        Ok(()) => host.close(None),
        Err(e) => {
            error!("Engine '{}' failed: {}", engine.name(), e);
            host.close(Some(&format!("\n[{}]\n", e)));
        }
    }
    host.finish();
    info!("Interpreter exited");
}
