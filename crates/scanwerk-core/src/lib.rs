// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk: Core types, error definitions, and configuration shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod sink;
pub mod types;

pub use config::{DetectorConfig, EnhanceConfig, ScanConfig};
pub use error::{Result, ScanwerkError};
pub use sink::{DocumentSink, FinishedDocument};
pub use types::*;
