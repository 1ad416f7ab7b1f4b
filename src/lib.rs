// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // kernels, stores, compute services
pub mod config;     // config + runtime builder
pub mod engine;     // bounded measurement executor
pub mod errors;     // error handling
pub mod iteration;  // iteration manager
pub mod jobs;       // simulation job tracking
pub mod model;      // domain data model
pub mod observability;
pub mod processing; // preprocessing, windows, misfit, weights
pub mod signal;     // numeric helpers
pub mod traits;     // seams: kernels, stores, compute
