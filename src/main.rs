use clap::Parser;
use miette::{IntoDiagnostic, Result};
use paysentinel::application::orchestrator::Orchestrator;
use paysentinel::config::{GeneratorConfig, MonitorConfig, OrchestratorConfig};
use paysentinel::domain::injection::FaultInjection;
use paysentinel::infrastructure::in_memory::InMemoryToolkit;
use paysentinel::interfaces::console::update_writer::UpdateWriter;
use std::io;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about = "Payment stream anomaly monitor", long_about = None)]
struct Cli {
    /// Target transactions per second
    #[arg(long, env = "PAYSENTINEL_TPS", default_value_t = 5.0)]
    tps: f64,

    /// Samples kept per issuer window
    #[arg(long, env = "PAYSENTINEL_WINDOW_SIZE", default_value_t = 50)]
    window_size: usize,

    /// z-score above which the newest latency counts as a spike
    #[arg(long, default_value_t = 2.0)]
    z_threshold: f64,

    /// Success rate below which an issuer is flagged
    #[arg(long, default_value_t = 0.8)]
    success_threshold: f64,

    /// Seed for a reproducible stream
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many transactions (runs until Ctrl-C otherwise)
    #[arg(long)]
    max_transactions: Option<u64>,

    /// Issuer to inject failures into at startup
    #[arg(long)]
    inject: Option<String>,

    /// Failure probability of the startup injection
    #[arg(long, default_value_t = 0.9, requires = "inject")]
    failure_rate: f64,

    /// Error code set on injected failures
    #[arg(long, default_value = "500", requires = "inject")]
    error_code: String,

    /// Latency of injected failures, in milliseconds
    #[arg(long, default_value_t = 1500, requires = "inject")]
    latency_ms: u64,
}

impl Cli {
    fn to_config(&self) -> MonitorConfig {
        let mut config = MonitorConfig {
            generator: GeneratorConfig {
                tps: self.tps,
                seed: self.seed,
                ..GeneratorConfig::default()
            },
            orchestrator: OrchestratorConfig {
                max_transactions: self.max_transactions,
                ..OrchestratorConfig::default()
            },
            ..MonitorConfig::default()
        };
        config.detector.window_size = self.window_size;
        config.detector.z_threshold = self.z_threshold;
        config.detector.success_threshold = self.success_threshold;
        config
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paysentinel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let toolkit = Arc::new(InMemoryToolkit::new());
    let orchestrator = Orchestrator::new(cli.to_config(), toolkit, None).into_diagnostic()?;

    if let Some(issuer) = cli.inject.clone() {
        let injection = FaultInjection::new(
            "cli",
            Some(issuer),
            cli.error_code.clone(),
            cli.failure_rate,
            cli.latency_ms,
        )
        .into_diagnostic()?;
        // The handle is dropped right away so the broadcast channel closes with the loop.
        orchestrator
            .handle()
            .inject_failure(injection)
            .await
            .into_diagnostic()?;
    }

    let output = tokio::spawn(UpdateWriter::new(io::stdout()).drain(orchestrator.subscribe()));

    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            stop.stop();
        }
    });

    let summary = orchestrator.run().await;

    match output.await.into_diagnostic()? {
        Ok(written) => info!(written, "Output closed"),
        Err(e) => warn!(error = %e, "Output failed"),
    }

    eprintln!(
        "processed={} alerts={} actions={} rollbacks={}",
        summary.processed, summary.alerts, summary.actions, summary.rollbacks
    );
    Ok(())
}
