use std::io::ErrorKind;
use tokio::fs::create_dir_all;
use tracing::level_filters;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_appender::non_blocking::WorkerGuard;

/// Log to stdout and to a daily rolling `server.log` in `log_folder`. The guard must be kept
/// alive for as long as the file should be written to.
pub async fn configure_logging(
    log_folder: &str,
) -> anyhow::Result<WorkerGuard> {
    let stdout_log = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_thread_names(true);

    match create_dir_all(log_folder).await {
        Ok(_) => {}
        Err(err) => match err.kind() {
            ErrorKind::PermissionDenied => {
                anyhow::bail!("permission denied creating log folder {log_folder}, is the service running as root?");
            }
            ErrorKind::AlreadyExists => {}
            _ => anyhow::bail!("could not create log folder {log_folder}: {err:#}"),
        },
    }

    let file_appender = tracing_appender::rolling::daily(log_folder, "server.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    #[cfg(debug_assertions)]
    let log_level = level_filters::LevelFilter::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = level_filters::LevelFilter::INFO;

    let file_log = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(log_level);

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(log_level)
                .and_then(file_log),
        )
        .init();
    Ok(guard)
}
