//! Threshold-Crossed Fault Monitor
//!
//! Wires settings into a fault source, a notifier, and the poll loop, and
//! runs the loop until shutdown.

use anyhow::Context;
use fault_notify::{LogNotifier, NotificationDispatcher, Notifier, SmtpNotifier};
use fault_poller::Poller;
use fault_source::ReplayFaultSource;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

mod settings;

pub use settings::{
    LoggingSettings, MetricsSettings, NotifyKind, NotifySettings, PollSettings, Settings,
    SettingsError, SourceKind, SourceSettings,
};

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), SetGlobalDefaultError> {
    let level: Level = settings.level.parse().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

/// Build the configured notifier
pub fn build_notifier(settings: &Settings) -> anyhow::Result<Box<dyn Notifier>> {
    match settings.notify.kind {
        NotifyKind::Smtp => {
            let config = settings
                .smtp_config()
                .context("SMTP notification selected but not configured")?;
            Ok(Box::new(SmtpNotifier::new(&config)?))
        }
        NotifyKind::Log => {
            info!("Notifications will be logged, not delivered");
            Ok(Box::new(LogNotifier))
        }
    }
}

/// Run the monitor until `shutdown` is cancelled
pub async fn run(settings: Settings, shutdown: CancellationToken) -> anyhow::Result<()> {
    if let Some(addr) = settings.metrics.listen {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .with_context(|| format!("failed to start metrics exporter on {}", addr))?;
        info!("Metrics exporter listening on {}", addr);
    }

    let dispatcher = NotificationDispatcher::new(build_notifier(&settings)?, settings.message_format());
    let config = settings.poller_config();

    match settings.source.kind {
        SourceKind::Replay => {
            let source = ReplayFaultSource::new(&settings.source.path);
            Poller::new(source, dispatcher, config).run(shutdown).await?;
        }
    }

    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_log_notifier_by_default() {
        assert!(build_notifier(&Settings::default()).is_ok());
    }

    #[test]
    fn test_smtp_without_config_fails() {
        let mut settings = Settings::default();
        settings.notify.kind = NotifyKind::Smtp;
        assert!(build_notifier(&settings).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_replay_until_shutdown() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[{"attributes": {"id": "1", "severity": "major", "dn": "sys/a", "cause": "threshold-crossed"}}]"#,
        )
        .unwrap();

        let mut settings = Settings::default();
        settings.source.path = file.path().to_path_buf();

        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();
        let (outcome, _) = tokio::join!(run(settings, shutdown), async move {
            tokio::time::sleep(Duration::from_secs(65)).await;
            stop.cancel();
        });
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_run_fails_on_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.source.path = dir.path().to_path_buf();

        let err = run(settings, CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("Fatal fault source error"));
    }
}
