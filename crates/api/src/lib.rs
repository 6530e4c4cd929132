//! HTTP API: webhook intake, durable-queue dispatch, billing-cycle reads.

pub mod app;
pub mod context;
pub mod middleware;
