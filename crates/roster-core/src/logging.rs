use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Install the global tracing subscriber.
///
/// Logs go to stderr so stdout stays free for command output. `json`
/// switches to one JSON object per event.
pub fn init(service_name: &str, json: bool) -> Result<()> {
    // Default: info for our crates. Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,roster=info,roster_core=info,roster_json_store=info,{service_name}=info"
        ))
    });

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.with_ansi(true).try_init()
    };

    installed.map_err(|e| Error::Logging(e.to_string()))
}
