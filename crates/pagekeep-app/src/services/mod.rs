// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: the coordinator that owns the catalogs and hands slow work
// to blocking worker tasks.

pub mod app_services;
pub mod data_dir;
