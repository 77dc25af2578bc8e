//! Human-readable error descriptions and structured JSON error formatting.

use blinds_core::error::{BlindsError, BuildError};

use crate::cli::LAST_MAX_RUN_MS;

/// Stable name of a typed error for JSON output.
fn reason_name(e: &BlindsError) -> &'static str {
    match e {
        BlindsError::Device(_) => "Device",
        BlindsError::Offline(_) => "Offline",
        BlindsError::Timeout => "Timeout",
        BlindsError::FeedClosed => "FeedClosed",
        BlindsError::RunTimeout(_) => "RunTimeout",
        BlindsError::Interrupted => "Interrupted",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDevice => {
                "What happened: No device was provided to the session.\nLikely causes: The simulator failed to start or was not passed to the builder.\nHow to fix: Ensure the device is created and passed via with_device(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BlindsError>() {
        return match be {
            BlindsError::RunTimeout(ms) => format!(
                "What happened: The move did not settle within {ms} ms.\nLikely causes: time_to_open longer than the run limit, or feedback never arrived.\nHow to fix: Increase runner.max_run_ms (or pass --max-run-ms) or check [device].time_to_open."
            ),
            BlindsError::Interrupted => {
                "What happened: The run was interrupted.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Start a new run.".to_string()
            }
            BlindsError::FeedClosed => {
                "What happened: The device stopped reporting changes mid-move.\nLikely causes: The simulator exited or the connection dropped.\nHow to fix: Re-run with --log-level=debug to see the last updates.".to_string()
            }
            BlindsError::Offline(_) | BlindsError::Timeout => format!(
                "What happened: {be}.\nLikely causes: The device is not reachable.\nHow to fix: Check power and network, then retry."
            ),
            BlindsError::Device(_) => format!(
                "What happened: {be}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err
        .chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") || lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: {msg}\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("invalid value") || lower.contains("unknown data-point") {
        return format!(
            "What happened: The device rejected a command ({msg}).\nLikely causes: Token or data-point not matching the [device] table.\nHow to fix: Run `blinds profile` and compare with the device."
        );
    }

    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes for the failures scripts care about; everything else is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<BlindsError>() {
        Some(BlindsError::Interrupted) => 2,
        Some(BlindsError::FeedClosed) => 3,
        Some(BlindsError::RunTimeout(_)) => 4,
        Some(BlindsError::Offline(_) | BlindsError::Timeout | BlindsError::Device(_)) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    if let Some(be) = err.downcast_ref::<BlindsError>() {
        let reason = reason_name(be);
        return match be {
            BlindsError::RunTimeout(ms) => json!({
                "reason": reason,
                "details": { "max_run_ms": LAST_MAX_RUN_MS.get().copied().unwrap_or(*ms) },
                "message": msg,
            }),
            _ => json!({ "reason": reason, "message": msg }),
        }
        .to_string();
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return json!({ "reason": "Build", "message": msg }).to_string();
    }
    json!({ "reason": "Error", "message": msg }).to_string()
}
