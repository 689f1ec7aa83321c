//! Integration tests across queue, orchestrator and HTTP transport

pub mod queue_test;
pub mod sync_test;
