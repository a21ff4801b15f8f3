use clap::Parser;
use clients::aurora::{AuroraClient, AuroraConfig};
use clients::quickbase::{QuickbaseClient, QuickbaseConfig};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;
use webhook::{Dispatcher, Processor, WebhookService};

mod config;

use config::Config;

#[derive(Parser)]
#[command(about = "Relay design completion events into the tracking table")]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, default_value = "heliosync.yaml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(path = %cli.config.display(), error = %err, "failed to load config");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the runtime starts so its background
    // transport thread is not a runtime child.
    let _sentry_guard = config.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    if let Some(metrics_config) = &config.metrics {
        match install_statsd_recorder(metrics_config) {
            Ok(()) => tracing::info!(
                host = %metrics_config.statsd_host,
                port = metrics_config.statsd_port,
                "statsd recorder installed"
            ),
            Err(err) => {
                tracing::error!(error = %err, "failed to install statsd recorder");
                return ExitCode::FAILURE;
            }
        }
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to build runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "service exited with error");
            ExitCode::FAILURE
        }
    }
}

fn install_statsd_recorder(metrics_config: &config::MetricsConfig) -> Result<(), String> {
    let recorder = StatsdBuilder::from(&metrics_config.statsd_host, metrics_config.statsd_port)
        .build(Some("heliosync"))
        .map_err(|err| err.to_string())?;
    metrics::set_global_recorder(recorder).map_err(|err| err.to_string())?;
    Ok(())
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let source = AuroraClient::new(AuroraConfig {
        base_url: config.aurora.base_url,
        tenant_id: config.aurora.tenant_id,
        api_key: config.aurora.api_key,
    });

    let sink = QuickbaseClient::new(QuickbaseConfig {
        api_url: config.quickbase.api_url,
        realm: config.quickbase.realm,
        user_token: config.quickbase.user_token,
        table_id: config.quickbase.table_id,
        merge_field_id: config.quickbase.merge_field_id,
    });

    let processor = Processor::new(
        source,
        sink,
        Duration::from_millis(config.processing.pacing_ms),
    );
    let service = WebhookService::new(processor, Dispatcher::new(config.processing.max_inflight));

    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        "starting webhook listener"
    );
    webhook::run(&config.listener.host, config.listener.port, service).await?;
    Ok(())
}
