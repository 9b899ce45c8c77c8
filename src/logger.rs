use crate::parse::LogConfig;
use anyhow::Context;
use std::str::FromStr;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_appender::non_blocking::WorkerGuard;



/*
    @@@
    @init_tracing();
    . Creates a daily-rotating log file (<log.dir>/<log.file>) and wraps it in a non-blocking writer.
    . Configures a tracing subscriber at the configured level (with targets, no ANSI) writing to that writer.
    . Keeps the appender alive by returning the guard; child output stays on the console, not in this file.
*/
pub fn init_tracing(cfg: &LogConfig) -> anyhow::Result<WorkerGuard> {
    let level = tracing::Level::from_str(&cfg.level)
        .map_err(|_| anyhow::anyhow!("unknown log level `{}`", cfg.level))?;
    std::fs::create_dir_all(&cfg.dir)
        .with_context(|| format!("failed to create log dir `{}`", cfg.dir.display()))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cfg.dir, &cfg.file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = SubscriberBuilder::default()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_writer(non_blocking)
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set global subscriber")?;
    Ok(guard)
}
