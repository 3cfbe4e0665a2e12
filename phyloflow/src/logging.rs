//! Logging setup for the phyloflow binary.
//!
//! Events go to stderr and, once a run directory exists, to
//! `<run_dir>/phyloflow.log` through a non-blocking writer. `RUST_LOG`
//! overrides the verbosity chosen on the command line.

use phyloflow_shared::errors::{PhyloflowError, PhyloflowResult};
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Keeps the file writer alive. Dropping it flushes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Filter directive for a `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed or the log file cannot be
/// created.
pub fn init_logging(log_file: Option<&Path>, verbosity: u8) -> PhyloflowResult<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("phyloflow={}", level_for(verbosity))));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    let (file_layer, file_guard) = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path.file_name().ok_or_else(|| {
                PhyloflowError::InvalidArgument(format!("log file {} has no name", path.display()))
            })?;
            std::fs::create_dir_all(dir).map_err(|e| {
                PhyloflowError::Storage(format!("cannot create {}: {}", dir.display(), e))
            })?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| PhyloflowError::Internal(format!("cannot install logger: {}", e)))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0), "info");
        assert_eq!(level_for(1), "debug");
        assert_eq!(level_for(5), "trace");
    }
}
