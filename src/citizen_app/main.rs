/**
 * GeoInfo Outbox Entry Point
 *
 * Command line front-end over the device queue: queue reports, inspect
 * them, and push them to the backend.
 */

#[cfg(feature = "cli")]
mod cli {
    use clap::{Parser, Subcommand};
    use geoinfo::citizen_app::offline::AttachmentSource;
    use geoinfo::citizen_app::storage::FileStore;
    use geoinfo::citizen_app::sync::{ConnectivityMonitor, NetworkStatus};
    use geoinfo::citizen_app::{Config, DeviceIdentity, HttpSubmitter, OfflineManager};
    use geoinfo::shared::IncidentPayload;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[derive(Debug, Parser)]
    #[command(name = "geoinfo-outbox", version, about = "Offline queue of citizen incident reports")]
    pub struct Cli {
        /// TOML configuration file
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Debug, Subcommand)]
    enum Command {
        /// Queue an incident report
        Enqueue {
            /// Incident as JSON, using the backend field names
            #[arg(long)]
            data: String,
            /// Photo to attach
            #[arg(long)]
            photo: Option<PathBuf>,
        },
        /// List queued reports, oldest first
        List,
        /// Send queued reports to the backend
        Sync {
            /// Treat the device as offline
            #[arg(long)]
            offline: bool,
        },
        /// Drop every queued report
        Clear,
        /// Show or change the device identity
        Device {
            #[arg(long, conflicts_with = "forget")]
            register: bool,
            #[arg(long)]
            forget: bool,
        },
        /// Summarise the queue
        Status,
    }

    pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
        let config = Config::load(cli.config.as_deref())?;
        tracing::debug!("Using data directory {}", config.data_dir().display());

        let storage = Arc::new(FileStore::open(config.data_dir())?);
        let identity = DeviceIdentity::new(storage.clone());

        let status = match &cli.command {
            Command::Sync { offline: true } => NetworkStatus::Offline,
            _ => NetworkStatus::Online,
        };
        let submitter = Arc::new(HttpSubmitter::new(&config)?);
        let manager = OfflineManager::new(
            &config,
            storage,
            ConnectivityMonitor::new(status),
            submitter,
        );

        match cli.command {
            Command::Enqueue { data, photo } => {
                let mut value: serde_json::Value = serde_json::from_str(&data)?;
                if let Some(fields) = value.as_object_mut() {
                    if !fields.contains_key("deviceId") {
                        fields.insert("deviceId".to_string(), identity.register()?.into());
                    }
                }
                let payload: IncidentPayload = serde_json::from_value(value)?;
                payload.validate()?;

                let enqueued = manager
                    .add_to_queue(payload, photo.map(AttachmentSource::File))
                    .await;
                if let Some(error) = &enqueued.attachment_error {
                    eprintln!("warning: photo not kept: {}", error);
                }
                println!("{}", enqueued.item.id);
            }
            Command::List => {
                for item in manager.queued_items().await {
                    println!(
                        "{}  {}  attempts={}  photo={}  {}",
                        item.id,
                        item.enqueued_at.format("%Y-%m-%d %H:%M:%S"),
                        item.attempts,
                        if item.attachment.is_some() { "yes" } else { "no" },
                        item.payload.title,
                    );
                    if let Some(error) = &item.last_error {
                        println!("    last error: {}", error);
                    }
                }
            }
            Command::Sync { .. } => {
                let report = manager.sync_queue().await;
                match report.idle {
                    Some(reason) => println!("nothing sent ({:?})", reason),
                    None => println!(
                        "synced={} failed={} skipped={}",
                        report.synced, report.failed, report.skipped
                    ),
                }
                for failure in &report.errors {
                    println!("    {}: {}", failure.id, failure.error);
                }
                if let Some(summary) = report.error_summary() {
                    return Err(summary.into());
                }
            }
            Command::Clear => {
                let dropped = manager.queue_length();
                manager.clear_queue().await;
                println!("dropped {} report(s)", dropped);
            }
            Command::Device { register, forget } => {
                if forget {
                    identity.forget()?;
                    println!("device identity removed");
                } else if register {
                    println!("{}", identity.register()?);
                } else {
                    match identity.load()? {
                        Some(id) => println!("{}", id),
                        None => println!("no device identity registered"),
                    }
                }
            }
            Command::Status => {
                let stats = manager.stats().await;
                println!("{}", serde_json::to_string_pretty(&stats)?);
                if let Some(line) = manager.status_line().await {
                    println!("{}", line);
                }
            }
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use clap::Parser;

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "geoinfo=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    cli::run(cli::Cli::parse()).await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("geoinfo-outbox requires the 'cli' feature to be enabled.");
    eprintln!("Run with: cargo run --bin geoinfo-outbox --features cli");
    std::process::exit(1);
}
