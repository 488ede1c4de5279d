//! Process-argument parsing for the five-flag contract in §6:
//! `--name`, `--factory-file`, `--idle-ttl`, `--serializer`, `--scope`,
//! plus an early `--version`/`--help` sniff before any config/lock
//! acquisition. Manual parsing, no `clap`: this is a process contract
//! between the client coordinator and the daemon, not user-facing CLI UX.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::DaemonArgs;

pub const VERSION_STRING: &str = concat!("loopback-singleton-daemon ", env!("CARGO_PKG_VERSION"));

pub enum ArgsOutcome {
    Run(DaemonArgs),
    PrintVersion,
    PrintHelp,
}

pub fn parse(raw: &[String]) -> Result<ArgsOutcome, String> {
    if let Some(first) = raw.first() {
        match first.as_str() {
            "--version" | "-V" => return Ok(ArgsOutcome::PrintVersion),
            "--help" | "-h" => return Ok(ArgsOutcome::PrintHelp),
            _ => {}
        }
    }

    let mut name = None;
    let mut factory_file = None;
    let mut idle_ttl = None;
    let mut codec_name = "json".to_string();
    let mut scope = "user".to_string();

    let mut iter = raw.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| format!("missing value for {flag}"))?;
        match flag.as_str() {
            "--name" => name = Some(value.clone()),
            "--factory-file" => factory_file = Some(PathBuf::from(value)),
            "--idle-ttl" => {
                let seconds: f64 = value
                    .parse()
                    .map_err(|_| format!("--idle-ttl must be a number of seconds, got {value}"))?;
                idle_ttl = Some(Duration::from_secs_f64(seconds.max(0.0)));
            }
            "--serializer" => codec_name = value.clone(),
            "--scope" => scope = value.clone(),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }

    Ok(ArgsOutcome::Run(DaemonArgs {
        name: name.ok_or("--name is required")?,
        factory_file: factory_file.ok_or("--factory-file is required")?,
        idle_ttl: idle_ttl.ok_or("--idle-ttl is required")?,
        codec_name,
        scope,
    }))
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
