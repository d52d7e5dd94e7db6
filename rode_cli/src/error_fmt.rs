//! Human-readable error descriptions and structured JSON error formatting.

use rode_core::error::{BuildError, TrackerError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingInput => {
                "What happened: No encoder input was provided to the tracker.\nLikely causes: GPIO init failed or the input was not wired into the builder.\nHow to fix: Check [pins] encoder_a/encoder_b in the config; ensure the input is passed via with_input(...).".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No count store was provided to the tracker.\nLikely causes: The persistence file could not be set up or was not wired into the builder.\nHow to fix: Check [persistence] file in the config; ensure the store is passed via with_store(...).".to_string()
            }
            BuildError::MissingSink => {
                "What happened: No length sink was provided to the tracker.\nLikely causes: The telemetry output was not wired into the builder.\nHow to fix: Ensure the sink is passed via with_sink(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See README for a sample."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TrackerError>() {
        return match te {
            TrackerError::Input(m) => format!(
                "What happened: The encoder phase lines could not be read ({m}).\nLikely causes: Wrong encoder_a/encoder_b pins, wiring, or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; verify the encoder wiring."
            ),
            TrackerError::Storage(m) => format!(
                "What happened: The persistent count slot could not be accessed ({m}).\nLikely causes: Missing or unwritable persistence file, or a truncated slot.\nHow to fix: Check [persistence] file and address; ensure the directory is writable."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("reading config") {
        return "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing file.\nHow to fix: Pass --config with the path to your TOML file.".to_string();
    }

    if lower.contains("parsing config") || lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Missing [pins] (encoder_a, encoder_b), or out-of-range values.\nHow to fix: Edit the TOML config and try again. Original: {err:#}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map typed errors to stable exit codes; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    if let Some(te) = err.downcast_ref::<TrackerError>() {
        return match te {
            TrackerError::Input(_) => 3,
            TrackerError::Storage(_) => 4,
            _ => 1,
        };
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    if let Some(te) = err.downcast_ref::<TrackerError>() {
        return match te {
            TrackerError::Hardware(_) => "Hardware",
            TrackerError::Input(_) => "Input",
            TrackerError::Storage(_) => "Storage",
            TrackerError::State(_) => "State",
        };
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
