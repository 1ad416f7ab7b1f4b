// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod measurement;

pub use measurement::{MeasurementContext, MeasurementExecutor, UnitOutcome, UnitResult, WorkUnit};
