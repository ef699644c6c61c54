use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pdf_inbox_relay::config::RelayConfig;
use pdf_inbox_relay::error::{Error, Result};
use pdf_inbox_relay::http::HttpInvoker;
use pdf_inbox_relay::mail::{GraphMailClient, MailProvider};
use pdf_inbox_relay::pipeline::{DocumentSink, Pipeline, RunSettings, WeclappUploader};
use pdf_inbox_relay::trigger::{Runner, TriggerOutcome, TriggerSource, spawn_scheduler, trigger_routes};

/// Upper bound on waiting for an active run at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();

    let config = RelayConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  See .env.example for the required variables.");
        std::process::exit(1);
    });

    init_tracing(config.log_dir.as_deref());

    let run_once = std::env::args().skip(1).any(|arg| arg == "--once");

    eprintln!("📬 PDF Inbox Relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Mailbox: {}", config.graph.mailbox);
    eprintln!("   Source folder: {}", config.folders.source);
    eprintln!("   Archive folder: {}", config.folders.archive_candidates.join(" | "));
    eprintln!("   Upload: {}", config.weclapp.upload_url());

    let runner = Arc::new(build_runner(&config)?);

    if run_once {
        eprintln!("   Mode: single run\n");
        return match runner.trigger(TriggerSource::Schedule).await {
            TriggerOutcome::Failed(failure) => Err(Error::Run(failure).into()),
            _ => Ok(()),
        };
    }

    eprintln!("   Schedule: {}", config.schedule.describe());

    if let Some(addr) = config.http_bind {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(Error::Io)?;
        eprintln!("   Trigger API: http://{addr}/api/run");
        let app = trigger_routes(Arc::clone(&runner));
        tokio::spawn(async move {
            tracing::info!(%addr, "Trigger server started");
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Trigger server stopped: {e}");
            }
        });
    } else {
        eprintln!("   Trigger API: disabled (set RELAY_HTTP_BIND to enable)");
    }
    eprintln!();

    let (scheduler, shutdown) = spawn_scheduler(Arc::clone(&runner), config.schedule.clone());

    tokio::signal::ctrl_c().await.map_err(Error::Io)?;
    tracing::info!("Shutdown requested");
    shutdown.notify_one();

    // An active run (scheduled or HTTP-triggered) is finished, not dropped.
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        if let Err(e) = scheduler.await {
            tracing::error!("Scheduler task failed: {e}");
        }
        while runner.is_running() {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "Run still active at shutdown deadline, exiting anyway"
        );
    }

    Ok(())
}

/// Wire the Graph client and weclapp uploader into a guarded runner.
fn build_runner(config: &RelayConfig) -> Result<Runner> {
    let client = reqwest::Client::new();
    let invoker = HttpInvoker::new(client, config.http.retry);

    let mail: Arc<dyn MailProvider> = Arc::new(GraphMailClient::new(
        config.graph.clone(),
        invoker.clone(),
        config.http.request_timeout,
    ));
    let sink: Arc<dyn DocumentSink> = Arc::new(WeclappUploader::new(
        &config.weclapp,
        invoker,
        config.http.upload_timeout,
    )?);

    Ok(Runner::new(Pipeline::new(mail, sink, RunSettings::from(config))))
}

/// stderr logging, plus a daily-rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "pdf-inbox-relay.log");
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
        }
    }
}
