// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content addressing: SHA-256 digests name archived payloads and catch
// on-disk corruption when they are read back.

use scanwerk_core::error::{Result, ScanwerkError};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`; also the payload's file name.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Check `data` against a digest produced by [`hash_bytes`].
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<()> {
    let actual = hash_bytes(data);
    if actual.eq_ignore_ascii_case(expected_hex) {
        Ok(())
    } else {
        Err(ScanwerkError::IntegrityMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}

/// True if `name` looks like a digest from [`hash_bytes`]. Guards payload
/// paths built from database contents.
pub fn is_digest(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| b.is_ascii_hexdigit())
}
