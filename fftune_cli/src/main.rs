#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `fftune` command line: simulated tuning runs, offline re-fits and config checks.

mod cli;
mod console;
mod error_fmt;
mod tune;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use fftune_config::Config;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{EXIT_ABORTED, EXIT_FIT_FAILED, exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    match real_main(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            std::process::exit(exit_code_for_error(&e));
        }
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };
    let text = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    fftune_config::load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))
}

fn init_tracing(json: bool, level: &str, logging: &fftune_config::Logging) -> eyre::Result<()> {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file must name a file, got {file}"))?;
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn real_main(cli: Cli) -> eyre::Result<i32> {
    let _ = color_eyre::install();

    let cfg = load_config(cli.config.as_deref())?;
    cfg.validate()?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    init_tracing(cli.json, &level, &cfg.logging)?;

    match cli.cmd {
        Commands::Run {
            max_power,
            distance,
            no_intercept,
            skip_accel,
            interactive,
            realtime,
            tick_hz,
            log_dir,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = shutdown.clone();
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                    tracing::warn!(error = %e, "failed to install Ctrl-C handler");
                }
            }
            let opts = tune::RunOptions {
                max_power,
                distance,
                no_intercept,
                skip_accel,
                interactive,
                realtime,
                tick_hz,
                log_dir,
                json: cli.json,
            };
            let report = tune::run_tune(&cfg, &opts, shutdown)?;
            if cli.json {
                println!("{}", tune::report_json(&report));
            } else {
                print_lines(&report.summary_lines());
                for log in &report.logs {
                    println!("log: {log}");
                }
            }
            if report.aborted {
                return Ok(EXIT_ABORTED);
            }
            if report.fit_error().is_some() {
                return Ok(EXIT_FIT_FAILED);
            }
            Ok(0)
        }
        Commands::Fit {
            ramp,
            accel,
            no_intercept,
        } => {
            let fit_intercept = cfg.test.fit_intercept && !no_intercept;
            let fit = tune::fit_offline(&ramp, accel.as_deref(), fit_intercept)?;
            if cli.json {
                println!("{}", tune::offline_json(&fit));
            } else {
                print_lines(&tune::offline_lines(&fit));
            }
            Ok(0)
        }
        Commands::Schedule {
            max_power,
            distance,
        } => {
            let config = tune::test_config(&cfg, max_power, distance, false)?;
            let schedule = fftune_core::RampSchedule::new(&config, cfg.drive.max_velocity())?;
            if cli.json {
                println!("{}", tune::schedule_json(&schedule));
            } else {
                print_lines(&tune::schedule_lines(&schedule));
            }
            Ok(0)
        }
        Commands::SelfCheck => {
            let v_max = cfg.drive.max_velocity();
            let config = tune::test_config(&cfg, None, None, false)?;
            fftune_core::RampSchedule::new(&config, v_max)?;
            tracing::info!(v_max, "self-check ok");
            if cli.json {
                println!("{}", serde_json::json!({ "status": "ok", "v_max": v_max }));
            } else {
                println!("OK");
            }
            Ok(0)
        }
    }
}
