use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::build_runtime;
use domain::TagEvent;
use infrastructure::RuntimeConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override the target hardware model
    #[arg(long)]
    model: Option<String>,

    /// Enable fast logging regardless of configuration
    #[arg(long)]
    fast_logging: bool,

    /// Seconds between status reports
    #[arg(long, default_value_t = 30)]
    status_interval_secs: u64,
}

async fn run() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tag_runtime=debug,application=debug,audit=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("IFA SCADA Tag Runtime starting");
    info!("Process ID: {}", std::process::id());

    let args = Args::parse();

    // Run from the workspace root during development
    let dev_base = "crates/tag-runtime";
    let config_dir = if args.config_dir == "config" && std::path::Path::new(dev_base).exists() {
        format!("{}/config", dev_base)
    } else {
        args.config_dir.clone()
    };
    info!(config_dir = %config_dir, "Loading configuration...");

    let mut config = RuntimeConfig::load(&config_dir)
        .with_context(|| format!("Failed to load configuration from {}", config_dir))?;
    if let Some(model) = args.model {
        config.target.model = model;
    }
    if args.fast_logging {
        config.features.fast_logging = true;
    }

    let runtime = build_runtime(&config).context("Failed to build runtime")?;
    let global = runtime.controller.clone();

    for tag in global.tags() {
        let name = tag.name().to_string();
        tag.subscribe(move |event| match event {
            TagEvent::ValueChanged { index, value } => {
                debug!(tag = %name, index, value = %value.value, quality = value.quality.as_str(), "Value changed")
            }
            TagEvent::QualityChanged { quality } => {
                info!(tag = %name, quality = quality.as_str(), "Quality changed")
            }
            TagEvent::AccessDenied { operation } => {
                warn!(tag = %name, operation = %operation, "Access denied")
            }
            _ => {}
        });
    }

    global.run();
    global.start_triggers();
    global.start_polling();
    info!(
        tags = global.tag_count(),
        loops = global.active_loop_count(),
        "Runtime running"
    );

    // Tags without a poll group follow the controllers' own poll
    let devices = runtime.devices.clone();
    let poll_interval = Duration::from_millis(config.poll_limits.min_interval_ms.max(1));
    let poll_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        loop {
            interval.tick().await;
            for device in &devices {
                device.poll();
            }
        }
    });

    let counter = runtime.counter.clone();
    let audit = runtime.audit.clone();
    let status_global = global.clone();
    let status_interval = Duration::from_secs(args.status_interval_secs.max(1));
    let status_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(status_interval);
        loop {
            interval.tick().await;
            info!(
                tags = status_global.tag_count(),
                connected = counter.count(),
                audit_entries = audit.entry_count(),
                loops = status_global.active_loop_count(),
                "Runtime status"
            );
        }
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
    }

    poll_handle.abort();
    status_handle.abort();
    global.shutdown().await;

    info!("Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {:?}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("\nCRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
