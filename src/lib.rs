//! GeoInfo Citizen Outbox - Main Library
//!
//! Offline-first delivery of citizen incident reports. A report written
//! without connectivity is kept on the device, survives restarts, and is
//! sent automatically once the network comes back.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared with the backend contract
//!   - Incident payload and its form validation
//!   - Transport configuration
//!   - Error types
//!
//! - **`citizen_app`** - Device side
//!   - Durable FIFO queue of pending reports with photos
//!   - Connectivity monitor and sync orchestrator
//!   - HTTP submitter and anonymous device identity
//!
//! # Feature Flags
//!
//! - **`cli`** (default) - `geoinfo-outbox` binary
//!   - Pulls in `clap`, `dotenv` and `tracing-subscriber`
//!   - The library itself only emits `tracing` events
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use geoinfo::citizen_app::storage::FileStore;
//! use geoinfo::citizen_app::sync::{ConnectivityMonitor, NetworkStatus};
//! use geoinfo::citizen_app::{Config, HttpSubmitter, OfflineManager};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let storage = Arc::new(FileStore::open(config.data_dir())?);
//! let submitter = Arc::new(HttpSubmitter::new(&config)?);
//! let monitor = ConnectivityMonitor::new(NetworkStatus::Online);
//!
//! let mut manager = OfflineManager::new(&config, storage, monitor, submitter);
//! manager.start()?;
//! # Ok(())
//! # }
//! ```

pub mod citizen_app;
pub mod shared;
