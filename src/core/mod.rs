//! # Core Application Logic
//!
//! Wires a session together. It knows nothing about any specific UI
//! technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • Config (settings)    │
//!                    │  • Profile (display)    │
//!                    │  • Session (lifecycle)  │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │   Bridge   │      │   Host +   │      │   Façade   │
//!     │ (threads / │      │  Storage   │      │  (UI side) │
//!     │   RTOS)    │      │ (interp.)  │      │            │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`]: settings file, environment and CLI resolution
//! - [`profile`]: per-target scrollback limits and echo convention
//! - [`session`]: starts the interpreter context and tears it down

pub mod config;
pub mod profile;
pub mod session;
