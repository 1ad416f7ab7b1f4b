// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Message types follow a struct-based pattern with a `Display` implementation
//! for the human-readable line and [`messages::StructuredLog`] for the fields, so
//! log text lives in one place per subsystem.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::config` - configuration loading and validation
//! * `messages::iteration` - iteration lifecycle, weights, windows and artifacts
//! * `messages::job` - simulation submission, polling and retrieval
//! * `messages::processing` - per-trace preprocessing and measurement
//!
//! # Usage
//!
//! ```rust
//! use fwi_orchestrator::observability::messages::processing::UnitFailed;
//! use fwi_orchestrator::model::ChannelKey;
//!
//! let key = ChannelKey::new(&"E1".into(), &"XX.A".into(), &"BHZ".into());
//! let msg = UnitFailed {
//!     key: &key,
//!     error: "synthetic starts 12 s after the observation",
//! };
//!
//! tracing::error!("{}", msg);
//! ```

pub mod messages;
