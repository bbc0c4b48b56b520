// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Domain types shared across the scan engine.

mod engine;
mod finding;
mod job;
mod severity;

pub use engine::EngineKind;
pub use finding::{Protocol, RawFinding, VulnStatus, Vulnerability};
pub use job::{Phase, ScanJob, ScanStatistics};
pub use severity::Severity;
