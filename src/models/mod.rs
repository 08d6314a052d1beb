// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod pushup;
pub mod run;
pub mod stats;

pub use pushup::{Pushup, PushupRecord};
pub use run::{ElapsedTime, Run, RunRecord, Split, SplitRecord};
pub use stats::{ActivityStats, RunReport, StatsPeriod};
