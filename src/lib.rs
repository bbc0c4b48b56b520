// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Coordinates security scans against a target host.
//!
//! Given a target and a set of engines, scand runs each engine as an
//! external process, normalizes the heterogeneous tool outputs into a
//! unified vulnerability record, assigns severity, records the job lifecycle
//! through a persistence port and aggregates statistics. One engine failing
//! never prevents the others from contributing results.

pub mod config;
pub mod engine;
pub mod models;
pub mod scan;
pub mod storage;
pub mod target;
