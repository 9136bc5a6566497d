// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the presentation layer.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The `retriable` flag drives the retry affordance shown next to failed
// queue items.

use crate::error::ScanwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something hiccuped; trying again is likely to work.
    Transient,
    /// The user must change something (move a corner, pick another file).
    ActionRequired,
    /// Cannot be fixed by retrying: unreadable file, bad configuration.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether a retry button should be offered.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `ScanwerkError` into a `HumanError` suitable for display.
pub fn humanize_error(err: &ScanwerkError) -> HumanError {
    match err {
        // -- Image errors --
        ScanwerkError::Decode(_) => HumanError {
            message: "We couldn't open this image.".into(),
            suggestion: "The file may be damaged or in an unusual format. Try saving it as a JPEG or PNG, then retry.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::Image(_) => HumanError {
            message: "There was a problem preparing this image.".into(),
            suggestion: "Try again. If this keeps happening, try a smaller photo.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::DegenerateGeometry(_) => HumanError {
            message: "Those corners don't outline a page.".into(),
            suggestion: "Drag the corners apart so they form a four-sided shape around the document.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::CornersOutOfBounds { .. } => HumanError {
            message: "A corner is outside the photo.".into(),
            suggestion: "Move every corner back inside the picture.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::Pipeline(_) => HumanError {
            message: "Something went wrong while processing this scan.".into(),
            suggestion: "Tap Retry to process it again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Queue errors --
        ScanwerkError::ItemNotFound(_) => HumanError {
            message: "That scan is no longer in the list.".into(),
            suggestion: "It may have been removed or saved already.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanwerkError::InvalidState { status, .. } => HumanError {
            message: "This scan isn't ready for that yet.".into(),
            suggestion: format!("Wait for processing to finish and try again. (Current state: {status})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::NotRectified(_) => HumanError {
            message: "This scan hasn't been straightened yet.".into(),
            suggestion: "Wait for processing to finish, or adjust the corners first.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Configuration --
        ScanwerkError::UnknownMode(mode) => HumanError {
            message: "That enhancement style doesn't exist.".into(),
            suggestion: format!("Choose original, enhanced, grayscale, or bw. (Got: {mode})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanwerkError::InvalidConfig(detail) => HumanError {
            message: "The scanner settings are invalid.".into(),
            suggestion: format!("Fix the settings file and start again. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Storage --
        ScanwerkError::Database(_) => HumanError {
            message: "Your saved documents couldn't be updated.".into(),
            suggestion: "Try again. Your scan is still in the list.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::IntegrityMismatch { .. } => HumanError {
            message: "A saved file has been changed since it was stored.".into(),
            suggestion: "The stored copy doesn't match the original. Scan the document again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "The app doesn't have permission to use that file.".into(),
                suggestion: "Check the file permissions, or choose a different folder.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        ScanwerkError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemId, ItemStatus};

    #[test]
    fn decode_failure_offers_retry() {
        let human = humanize_error(&ScanwerkError::Decode("truncated PNG".into()));
        assert!(human.retriable);
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn pipeline_failure_is_transient() {
        let human = humanize_error(&ScanwerkError::Pipeline("worker panicked".into()));
        assert!(human.retriable);
        assert_eq!(human.severity, Severity::Transient);
    }

    #[test]
    fn degenerate_corners_need_user_action() {
        let human = humanize_error(&ScanwerkError::DegenerateGeometry("zero area".into()));
        assert!(!human.retriable);
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn invalid_state_mentions_status() {
        let err = ScanwerkError::InvalidState {
            id: ItemId::new(),
            status: ItemStatus::Processing,
            action: "edit corners of",
        };
        let human = humanize_error(&err);
        assert!(human.suggestion.contains("processing"));
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = ScanwerkError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }
}
