// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagekeep-bridge — where page images come from.
//
// Capture and photo import are platform capabilities. This crate defines
// the contract the rest of Pagekeep relies on, a stub for hosts with no
// camera, and a file-backed source used by the command line.

pub mod files;
pub mod stub;
pub mod traits;

pub use files::FileImageSource;
pub use traits::{PageImageSource, PlatformBridge};

/// The bridge for the current host.
pub fn platform_bridge() -> Box<dyn traits::PlatformBridge> {
    Box::new(stub::StubBridge)
}
