// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit the event with its fields attached.
//!
//! # Organization
//!
//! * `config` - configuration loading and validation
//! * `iteration` - iteration lifecycle and derived artifacts
//! * `job` - simulation submission, polling and retrieval
//! * `processing` - per-trace measurement pipeline
//!
//! # Usage Pattern
//!
//! ```rust
//! use fwi_orchestrator::observability::messages::StructuredLog;
//! use fwi_orchestrator::observability::messages::iteration::IterationCreated;
//!
//! let msg = IterationCreated {
//!     iteration: "it0000",
//!     event_count: 3,
//!     pair_count: 42,
//! };
//!
//! msg.log();
//! tracing::info!("{}", msg);
//! ```

use tracing::Span;

pub mod config;
pub mod iteration;
pub mod job;
pub mod processing;

/// A message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// A span carrying the message fields.
    fn span(&self, name: &str) -> Span;
}
