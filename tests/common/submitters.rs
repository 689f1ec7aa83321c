//! Scriptable submitters
//!
//! `RecordingSubmitter` records every delivery, fails on chosen titles and
//! can hold submissions behind a gate to observe overlapping passes.

use async_trait::async_trait;
use geoinfo::citizen_app::offline::Attachment;
use geoinfo::citizen_app::sync::{SubmitError, Submitter};
use geoinfo::shared::IncidentPayload;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// One accepted submission
#[derive(Debug, Clone)]
pub struct Delivery {
    pub title: String,
    pub photo: Option<Attachment>,
}

#[derive(Debug, Default)]
pub struct RecordingSubmitter {
    delivered: Mutex<Vec<Delivery>>,
    failing: Mutex<HashSet<String>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSubmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every submission waits for a permit on the returned semaphore
    pub fn gated() -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let submitter = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (Arc::new(submitter), gate)
    }

    pub fn fail_on(&self, title: &str) {
        self.failing.lock().unwrap().insert(title.to_string());
    }

    pub fn recover(&self, title: &str) {
        self.failing.lock().unwrap().remove(title);
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.deliveries().into_iter().map(|d| d.title).collect()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Submitter for RecordingSubmitter {
    async fn submit(
        &self,
        payload: &IncidentPayload,
        photo: Option<Attachment>,
    ) -> Result<(), SubmitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(&payload.title) {
            return Err(SubmitError::Server {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        self.delivered.lock().unwrap().push(Delivery {
            title: payload.title.clone(),
            photo,
        });
        Ok(())
    }
}
