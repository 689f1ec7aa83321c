//! Citizen Client Module
//!
//! Client-side half of incident reporting: a device keeps the reports it
//! could not send and delivers them once connectivity returns.
//!
//! # Architecture
//!
//! - **`config`** - Configuration (API URL, token, settle delay, data dir)
//! - **`storage`** - Synchronous key-value persistence
//! - **`device_id`** - Anonymous reporter identity
//! - **`offline`** - Durable incident queue and the `OfflineManager` facade
//! - **`sync`** - Connectivity monitor and sync orchestrator
//! - **`api`** - HTTP submitter for the backend
//! - **`main`** - `geoinfo-outbox` command line (binary)
//!
//! # Module Structure
//!
//! ```text
//! citizen_app/
//! ├── mod.rs        - Module exports and documentation
//! ├── main.rs       - CLI entry point
//! ├── config.rs     - Configuration layering
//! ├── api.rs        - HTTP submitter
//! ├── device_id.rs  - Device identity
//! ├── storage/      - Key-value stores
//! ├── offline/      - Queue, attachments, retry policy
//! └── sync/         - Orchestrator, monitor, scheduler
//! ```

pub mod api;
pub mod config;
pub mod device_id;
pub mod offline;
pub mod storage;
pub mod sync;

pub use api::HttpSubmitter;
pub use config::Config;
pub use device_id::DeviceIdentity;
pub use offline::{OfflineManager, QueueStats, Submission};
