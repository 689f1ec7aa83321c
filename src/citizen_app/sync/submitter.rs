//! # Submission Seam
//!
//! The orchestrator never talks to the backend itself; it hands each queued
//! report to a `Submitter`. The HTTP implementation lives in
//! `citizen_app::api`; tests and embedders can pass a closure through
//! `submit_fn`.

use crate::citizen_app::offline::Attachment;
use crate::shared::IncidentPayload;
use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;

/// Why a submission did not go through
///
/// Every variant is treated as retryable by the orchestrator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The request never got a response
    #[error("Network error: {0}")]
    Network(String),

    /// The backend refused the report (4xx)
    #[error("Rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend failed (5xx)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Neither success nor an error class: 1xx, or a 3xx the client did
    /// not follow
    #[error("Unexpected response from server ({status}): {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// Anything else (request could not be built, attachment unreadable…)
    #[error("{0}")]
    Other(String),
}

impl SubmitError {
    /// Classify a non-success HTTP status
    ///
    /// 4xx is a rejection, 5xx and above a server failure; anything else
    /// outside 2xx is reported as unexpected. All of them stay retryable.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400..=499 => SubmitError::Rejected { status, message },
            500.. => SubmitError::Server { status, message },
            _ => SubmitError::UnexpectedStatus { status, message },
        }
    }
}

/// Delivers one incident report to the backend
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        payload: &IncidentPayload,
        attachment: Option<Attachment>,
    ) -> Result<(), SubmitError>;
}

/// Submitter backed by a closure
pub struct FnSubmitter<F> {
    f: F,
}

/// Wrap an async closure as a `Submitter`
///
/// ```rust
/// use geoinfo::citizen_app::sync::{submit_fn, SubmitError};
///
/// let submitter = submit_fn(|payload, _photo| async move {
///     if payload.title.is_empty() {
///         Err(SubmitError::Other("empty title".to_string()))
///     } else {
///         Ok(())
///     }
/// });
/// # let _ = submitter;
/// ```
pub fn submit_fn<F, Fut>(f: F) -> FnSubmitter<F>
where
    F: Fn(IncidentPayload, Option<Attachment>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SubmitError>> + Send + 'static,
{
    FnSubmitter { f }
}

#[async_trait]
impl<F, Fut> Submitter for FnSubmitter<F>
where
    F: Fn(IncidentPayload, Option<Attachment>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SubmitError>> + Send + 'static,
{
    async fn submit(
        &self,
        payload: &IncidentPayload,
        attachment: Option<Attachment>,
    ) -> Result<(), SubmitError> {
        (self.f)(payload.clone(), attachment).await
    }
}
