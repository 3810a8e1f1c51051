use crate::settings::LoggingSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "reelname.log";

/// Filter directive used when `RUST_LOG` is unset
fn default_directive(settings: &LoggingSettings, verbose: bool) -> String {
    let level = if verbose { "debug" } else { settings.level.as_str() };
    format!("reelname={}", level.to_ascii_lowercase())
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process so buffered file output gets flushed.
pub fn init(settings: &LoggingSettings, verbose: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(settings, verbose)))?;

    let stderr_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, json_layer, guard) = match &settings.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            if settings.json {
                let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
                (None, Some(layer), Some(guard))
            } else {
                let layer = fmt::layer().with_ansi(false).with_writer(writer);
                (Some(layer), None, Some(guard))
            }
        }
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .with(json_layer)
        .try_init()?;

    Ok(guard)
}
