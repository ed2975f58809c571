//! # thermotwin-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the **JSON API** under `/api/v1`:
//!   - `GET  /target-state/{device_id}`  — desired state, defaults materialized
//!   - `POST /target-state/{device_id}`  — partial update, pushed to the device
//!   - `GET  /current-state/{device_id}` — last accepted device report
//! - Serve `/health` and, when a renderer is configured, `/metrics`
//! - Map application errors into `{"error", "statusCode"}` bodies, masking
//!   internal detail on 5xx
//! - Report every answered request to the telemetry port
//!
//! ## Dependency rule
//! Depends on `thermotwin-app` (for port traits and services) and `thermotwin-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
