mod bootstrap;
mod report;

use std::sync::Arc;

use anyhow::{Context, Result};
use panel_client::HttpBackend;
use panel_core::settings::Settings;
use panel_runtime::Session;

#[tokio::main]
async fn main() -> Result<()> {
    let (settings, persist_problem) = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;
    if let Some(e) = persist_problem {
        tracing::warn!(error = %e, "could not update last-used parameters");
    }

    tracing::info!("Scraper panel v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        base_url = %settings.base_url,
        command = %settings.command,
        "settings loaded"
    );

    let backend = HttpBackend::new(&settings.base_url)
        .with_context(|| format!("cannot build client for {}", settings.base_url))?;
    let timings = settings.timings();
    let session = Session::new(Arc::new(backend), timings);
    session.set_filter(settings.record_filter());

    let view = session.initialize().await;
    tracing::info!(%view, "session ready");

    // Failures are reported through toasts, which the summary loop logs.
    let outcome = match settings.command.as_str() {
        "start" => session.start_job().await,
        "stop" => session.stop_job().await,
        "export" => session.export(settings.export_request()).await.map(|_| ()),
        _ => Ok(()),
    };
    if let Err(e) = outcome {
        tracing::warn!(error = %e, command = %settings.command, "command did not succeed");
    }
    for message in session.notifier().messages() {
        tracing::info!("{message}");
    }

    let mut ticker = tokio::time::interval(timings.status_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tracing::info!("{}", report::summary_line(&session.snapshot()));
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "could not listen for Ctrl+C");
                }
                tracing::info!("Ctrl+C received; shutting down");
                break;
            }
        }
    }

    session.shutdown();
    Ok(())
}
