// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Invocation of external scanner executables.

use std::{process::Stdio, time::Duration};

use tokio::process::Command;

use super::Error;

/// Spawns `program` with `args`, captures stdout and enforces `timeout`.
///
/// Stdout is returned even when the tool exits non-zero, as long as it
/// produced output; several scanners emit usable results before failing.
/// On timeout the child is terminated, `kill_on_drop` reaps it when the
/// wait future is dropped.
pub async fn capture(program: &str, args: &[&str], timeout: Duration) -> Result<String, Error> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::ProcessStart(format!("{program}: {e}")))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(Error::ProcessStart(format!("{program}: {e}"))),
        Err(_) => return Err(Error::Timeout(timeout)),
    };

    let stdout =
        String::from_utf8(output.stdout).map_err(|e| Error::UnparsableOutput(e.to_string()))?;
    if !output.status.success() && stdout.trim().is_empty() {
        return Err(Error::NonZeroExit(output.status.code()));
    }
    Ok(stdout)
}
