mod cli;
mod error_fmt;
mod simulate;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use blinds_config::Config;
use blinds_core::DeviceProfile;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error hooks: {e}");
    }

    if let Err(err) = real_main(cli) {
        let code = exit_code_for_error(&err);
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(code);
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = match &cli.config {
        Some(path) => blinds_config::load_file(path)?,
        None => Config::default(),
    };
    cfg.validate().wrap_err("invalid configuration")?;
    init_tracing(&cli, &cfg)?;

    let shutdown = simulate::install_shutdown();
    match cli.cmd {
        Commands::Simulate {
            target,
            from,
            max_run_ms,
            print_runtime,
        } => {
            let report =
                simulate::run_simulate(&cfg, target, from, max_run_ms, cli.json, &shutdown)?;
            if print_runtime && !cli.json {
                println!("runtime: {} ms", report.elapsed_ms);
            }
        }
        Commands::Press {
            token,
            from,
            stop_after_ms,
            max_run_ms,
        } => {
            simulate::run_press(
                &cfg,
                &token,
                from,
                stop_after_ms,
                max_run_ms,
                cli.json,
                &shutdown,
            )?;
        }
        Commands::Profile => print_profile(&DeviceProfile::from(&cfg.device), cli.json),
        Commands::SelfCheck => {
            let (position, mode) = simulate::self_check(&cfg)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "ok": true, "position": position, "mode": mode })
                );
            } else {
                println!("ok: position {position} ({mode})");
            }
        }
    }
    Ok(())
}

fn print_profile(p: &DeviceProfile, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "name": p.name,
                "duration_s": p.travel.duration_s(),
                "tightening_s": p.travel.tightening_s(),
                "min_position": p.travel.min_position(),
                "tokens": { "open": p.tokens.open, "close": p.tokens.close, "stop": p.tokens.stop },
                "dps": {
                    "action": p.dps.action,
                    "percent_control": p.dps.percent_control,
                    "percent_state": p.dps.percent_state,
                },
            })
        );
        return;
    }
    println!("name: {}", p.name.as_deref().unwrap_or("-"));
    println!("duration_s: {}", p.travel.duration_s());
    println!("tightening_s: {}", p.travel.tightening_s());
    println!("min_position: {}", p.travel.min_position());
    println!(
        "tokens: open={} close={} stop={}",
        p.tokens.open, p.tokens.close, p.tokens.stop
    );
    println!(
        "dps: action={} percent_control={} percent_state={}",
        p.dps.action, p.dps.percent_control, p.dps.percent_state
    );
}

/// Console layer on stderr (pretty or JSON) plus an optional JSON file layer
/// from `[logging]`. `RUST_LOG` wins over `--log-level`, which wins over the
/// config.
fn init_tracing(cli: &Cli, cfg: &Config) -> Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let (pretty, json) = if cli.json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        (Some(layer), None)
    };

    let file = match cfg.logging.file.as_deref() {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {path:?}"))?;
            let appender = match cfg.logging.rotation.as_deref().map(str::to_ascii_lowercase) {
                Some(r) if r == "daily" => tracing_appender::rolling::daily(dir, name),
                Some(r) if r == "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(file)
        .try_init()
        .wrap_err("initialize logging")?;
    Ok(())
}
