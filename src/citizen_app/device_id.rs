//! Anonymous citizen identity.
//!
//! A citizen reports incidents without an account: the device registers a
//! random identifier once and every report carries it as `deviceId`.

use crate::citizen_app::storage::{KeyValueStore, StorageError};
use std::sync::Arc;
use uuid::Uuid;

/// Storage key of the device identifier
pub const DEVICE_ID_KEY: &str = "citizen_device_id";

#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    storage: Arc<dyn KeyValueStore>,
}

impl DeviceIdentity {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// The registered identifier, if any
    pub fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .storage
            .get(DEVICE_ID_KEY)?
            .filter(|id| !id.trim().is_empty()))
    }

    /// Return the registered identifier, creating one on first use
    pub fn register(&self) -> Result<String, StorageError> {
        if let Some(id) = self.load()? {
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        self.storage.set(DEVICE_ID_KEY, &id)?;
        tracing::info!("Registered device {}", id);
        Ok(id)
    }

    pub fn forget(&self) -> Result<(), StorageError> {
        self.storage.remove(DEVICE_ID_KEY)
    }
}
