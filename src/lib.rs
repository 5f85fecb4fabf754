//! Storyhost library exports for testing

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod bridge;
pub mod core;
pub mod engine;
pub mod facade;
pub mod host;
pub mod rtos;
pub mod storage;
pub mod tui;

#[cfg(test)]
pub mod test_support;

/// Which synchronization substrate connects the interpreter and the UI.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Native threads, mutex and condition variable.
    #[default]
    Threaded,
    /// RTOS tasks, message queue and binary semaphore.
    Rtos,
}

/// Target display the façade is tuned for.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    #[default]
    Desktop,
    Rt1050,
    Rt1170,
    Rt1170Scaled,
}
