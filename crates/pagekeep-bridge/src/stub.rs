// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for hosts without a camera or photo library.

use pagekeep_core::PageImage;
use pagekeep_core::error::{PagekeepError, Result};

use crate::traits::PlatformBridge;

/// Bridge whose capabilities all report `PlatformUnavailable`.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn scan_document(&self) -> Result<Option<Vec<PageImage>>> {
        tracing::warn!("scan_document called on stub bridge");
        Err(PagekeepError::PlatformUnavailable)
    }

    fn pick_photos(&self) -> Result<Option<Vec<PageImage>>> {
        tracing::warn!("pick_photos called on stub bridge");
        Err(PagekeepError::PlatformUnavailable)
    }
}
