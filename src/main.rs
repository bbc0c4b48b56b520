// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::{path::PathBuf, process::ExitCode, str::FromStr};

use clap::Parser;

use scand::{
    config::Config,
    models::EngineKind,
    scan::{Error, ScanRequest, ScanService},
    storage::inmemory,
};

#[derive(Parser, Debug)]
#[command(name = "scand", about = "Runs security scan engines against a target")]
struct Args {
    /// Path to a scand.toml
    #[arg(long, env = "SCAND_CONFIG")]
    config: Option<PathBuf>,
    /// Host, IP or CIDR range to scan
    #[arg(long)]
    target: String,
    /// Engines to run: port_scan, fast_port_scan, web_scan
    #[arg(long, value_delimiter = ',', required = true)]
    engines: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::metadata::LevelFilter::INFO.into())
        .with_env_var("SCAND_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref());

    let mut engines = Vec::with_capacity(args.engines.len());
    for name in &args.engines {
        match EngineKind::from_str(name) {
            Ok(kind) => engines.push(kind),
            Err(()) => {
                eprintln!("unknown engine: {name}");
                return ExitCode::from(2);
            }
        }
    }

    let service = ScanService::from_config(inmemory::Storage::default(), &config);
    let request = ScanRequest {
        target: args.target,
        engines,
    };
    match service.start_scan(request).await {
        Ok(job) => {
            let statistics = job.statistics();
            let report = serde_json::json!({
                "job": job,
                "statistics": statistics,
            });
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("unable to serialize report: {e}");
                    return ExitCode::from(1);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e @ Error::InvalidRequest(_)) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(1)
        }
    }
}
