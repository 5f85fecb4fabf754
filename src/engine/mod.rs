//! # Interpreter Engines
//!
//! An engine is the external interpreter's run entry point: it loads the
//! story through the host's file callbacks, then runs to completion on the
//! interpreter context, calling back into the host for all I/O. It returns
//! when the story ends, when it fails, or when an input wait reports
//! [`Input::Interrupted`](crate::bridge::Input::Interrupted).

pub mod demo;

use std::fmt;

use crate::host::InterpreterHost;
use crate::storage::StorageError;

pub use demo::DemoEngine;

#[derive(Debug)]
pub enum EngineError {
    /// The story could not be loaded.
    Story(StorageError),
    /// The story image is not something this engine can run.
    Unrecognised(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Story(e) => write!(f, "could not load story: {}", e),
            EngineError::Unrecognised(reason) => write!(f, "unrecognised story: {}", reason),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Story(e) => Some(e),
            EngineError::Unrecognised(_) => None,
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        EngineError::Story(e)
    }
}

/// Runs a story against an [`InterpreterHost`].
pub trait Engine: Send {
    fn name(&self) -> &str {
        "engine"
    }

    fn run(&mut self, host: &mut dyn InterpreterHost) -> Result<(), EngineError>;
}

impl<F> Engine for F
where
    F: FnMut(&mut dyn InterpreterHost) -> Result<(), EngineError> + Send,
{
    fn run(&mut self, host: &mut dyn InterpreterHost) -> Result<(), EngineError> {
        self(host)
    }
}
