// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition contract. Recognition itself is an opaque capability:
// one image plus a language hint in, text plus confidence out. Retries are
// the implementation's business, not the caller's.

use std::time::Duration;

use image::DynamicImage;
use pagekeep_core::error::PagekeepError;
use serde::{Deserialize, Serialize};

#[cfg(feature = "ocr")]
pub mod engine;

#[cfg(feature = "ocr")]
pub use engine::OcrEngine;

/// Requested recognition language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LanguageHint {
    /// Let the recognizer decide.
    #[default]
    Automatic,
    /// BCP 47 tag such as `en` or `de-CH`.
    Tag(String),
}

impl LanguageHint {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Primary language subtag, lowercased (`de` for `de-CH`).
    pub fn primary(&self) -> Option<String> {
        match self {
            Self::Automatic => None,
            Self::Tag(tag) => tag
                .split(['-', '_'])
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_ascii_lowercase),
        }
    }
}

/// Outcome of recognising one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recognition {
    pub text: String,
    /// 0-100.
    pub confidence: f32,
    pub elapsed: Duration,
    /// Language the recognizer actually used.
    pub language: String,
}

/// Anything that can turn a page image into text.
pub trait TextRecognizer: Send + Sync {
    fn recognize(
        &self,
        image: &DynamicImage,
        language: &LanguageHint,
    ) -> Result<Recognition, PagekeepError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_subtag() {
        assert_eq!(LanguageHint::tag("de-CH").primary().as_deref(), Some("de"));
        assert_eq!(LanguageHint::tag("EN").primary().as_deref(), Some("en"));
        assert_eq!(LanguageHint::Automatic.primary(), None);
    }
}
