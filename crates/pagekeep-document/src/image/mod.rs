// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page touch-up: quarter-turn rotation, crop, brightness,
// contrast, and the scan filter presets.

pub mod filter;
pub mod processor;

pub use filter::PageFilter;
pub use processor::ImageProcessor;
