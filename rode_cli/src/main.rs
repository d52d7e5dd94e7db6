//! Binary entry: error reporting, tracing setup, config loading, dispatch.

mod cli;
mod error_fmt;
mod run;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use eyre::WrapErr;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Cli::parse();
    let _ = JSON_MODE.set(args.json);

    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporting: {e}");
    }

    match try_main(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", error_fmt::format_error_json(&err));
            } else {
                eprintln!("{}", error_fmt::humanize(&err));
            }
            let code = error_fmt::exit_code_for_error(&err).clamp(1, 255) as u8;
            ExitCode::from(code)
        }
    }
}

fn try_main(args: &Cli) -> eyre::Result<()> {
    let text = fs::read_to_string(&args.config)
        .wrap_err_with(|| format!("reading config {}", args.config.display()))?;
    let cfg = rode_config::load_toml(&text).wrap_err("parsing config TOML")?;
    cfg.validate().wrap_err("invalid configuration")?;

    init_tracing(args, &cfg.logging)?;

    match &args.cmd {
        Commands::Run {
            ticks,
            sim_deploy,
            sim_retrieve,
            summary,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("installing Ctrl-C handler")?;

            let s = run::run_tracker(&cfg, *ticks, *sim_deploy, *sim_retrieve, shutdown)?;
            if *summary {
                if args.json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "deployed_m": s.deployed_m,
                            "capacity_m": s.capacity_m,
                            "count": s.count,
                        })
                    );
                } else {
                    println!(
                        "deployed {:.2} m out of {:.0} m (count {})",
                        s.deployed_m, s.capacity_m, s.count
                    );
                }
            }
            Ok(())
        }
        Commands::Reset => run::reset_slot(&cfg),
        Commands::SelfCheck => run::self_check(&cfg),
    }
}

/// Console logs go to stderr so stdout stays clean for summaries; a
/// configured log file gets JSON lines through the non-blocking appender.
fn init_tracing(args: &Cli, logging: &rode_config::Logging) -> eyre::Result<()> {
    let level = logging.level.as_deref().unwrap_or(&args.log_level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err("invalid log level")?;

    if let Some(path) = logging.file.as_deref() {
        let (dir, name) = split_log_path(path);
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(writer)
            .init();
    } else if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn split_log_path(path: &str) -> (&Path, &str) {
    let p = Path::new(path);
    let dir = match p.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let name = p
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("rode.log");
    (dir, name)
}
