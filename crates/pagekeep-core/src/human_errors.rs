// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the dismissible alert shown at the UI
// boundary. Every surfaced error resolves to one plain-English message plus
// a suggestion; no structured codes leak past this point.

use crate::error::PagekeepError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Storage hiccup or interrupted background work; trying again may help.
    Transient,
    /// The user has to pick something else (another file, more pages).
    ActionRequired,
    /// Retrying will not change the outcome.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (alert title).
    pub message: String,
    /// What the user should try (alert body).
    pub suggestion: String,
    /// Whether offering a "Try again" button makes sense.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    /// Single-line text for a dismissible alert.
    pub fn alert_text(&self) -> String {
        format!("{} {}", self.message, self.suggestion)
    }

    fn new(message: &str, suggestion: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable: severity == Severity::Transient,
            severity,
        }
    }
}

/// Convert a `PagekeepError` into the message shown to the user.
pub fn humanize_error(err: &PagekeepError) -> HumanError {
    use Severity::*;

    match err {
        PagekeepError::EmptyInput => HumanError::new(
            "There are no pages to save.",
            "Scan or choose at least one page, then try again.",
            ActionRequired,
        ),

        PagekeepError::UnreadablePdf(_) => HumanError::new(
            "This PDF can't be opened.",
            "The file may be damaged or was removed. Try importing it again.",
            ActionRequired,
        ),

        PagekeepError::PdfError(_) => HumanError::new(
            "The PDF couldn't be created.",
            "Try again. If this keeps happening, remove any unusual pages from the scan.",
            Transient,
        ),

        PagekeepError::ImageError(_) => HumanError::new(
            "There's a problem with this page image.",
            "The image may be damaged or in an unusual format. Try scanning the page again.",
            Permanent,
        ),

        PagekeepError::OcrError(_) => HumanError::new(
            "Text recognition didn't work on this page.",
            "Try scanning the page again with better lighting, keeping the text in focus.",
            Transient,
        ),

        PagekeepError::CollectionNotFound(_) => HumanError::new(
            "This scan no longer exists.",
            "It may have been deleted. Refresh the list and try again.",
            Permanent,
        ),

        PagekeepError::DocumentNotFound(_) => HumanError::new(
            "This document no longer exists.",
            "It may have been deleted. Refresh the library and try again.",
            Permanent,
        ),

        PagekeepError::FolderNotFound(_) => HumanError::new(
            "This folder no longer exists.",
            "It may have been deleted. Refresh the library and try again.",
            Permanent,
        ),

        PagekeepError::PageOutOfRange { .. } => HumanError::new(
            "That page isn't part of this scan anymore.",
            "Close the editor and open the scan again.",
            Permanent,
        ),

        PagekeepError::CatalogCorrupt(_) => HumanError::new(
            "Your library index is damaged.",
            "Your PDFs are still on the device. Recreate your folders to organise them again.",
            Permanent,
        ),

        PagekeepError::Database(_) => HumanError::new(
            "The app's data storage had a problem.",
            "Try closing and reopening the app. Your scans should still be there.",
            Transient,
        ),

        PagekeepError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::new(
                "The file couldn't be found.",
                "It may have been moved or deleted. Try choosing the file again.",
                ActionRequired,
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::new(
                "The app doesn't have permission to use that file.",
                "Check the file permissions, or copy the file somewhere else first.",
                ActionRequired,
            ),
            _ => HumanError::new(
                "There was a problem reading or writing a file.",
                "Try again. If this keeps happening, your device's storage may be full.",
                Transient,
            ),
        },

        PagekeepError::Serialization(_) => HumanError::new(
            "The app had an internal data problem.",
            "Try again. If this keeps happening, please report it.",
            Transient,
        ),

        PagekeepError::Bridge(detail) => HumanError::new(
            "The camera or photo picker didn't work.",
            format!("Try again, or restart the app. ({detail})"),
            Transient,
        ),

        PagekeepError::PlatformUnavailable => HumanError::new(
            "This feature isn't available on your device.",
            "Some features require a camera or a photo library.",
            Permanent,
        ),

        PagekeepError::Cancelled(_) => HumanError::new(
            "The operation was interrupted.",
            "Try again.",
            Transient,
        ),
    }
}
