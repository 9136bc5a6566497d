// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk Store: reference persistence for finished scans. Metadata lives
// in SQLite; processed and original images are stored as files named by
// their SHA-256 digest and verified on every read.

pub mod archive;
pub mod integrity;

pub use archive::{DocumentArchive, StoredDocument};
pub use integrity::{hash_bytes, verify_hash};
