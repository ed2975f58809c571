//! # thermotwin-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `TargetStateRepository` / `CurrentStateRepository` — fetch & upsert primitives
//!   - `MessagePublisher` / `MessageSubscriber` — the device channel
//!   - `TwinTelemetry` — observability hooks
//! - Define **driving/inbound use-cases**:
//!   - `StateStore` — defaults, partial upserts, per-device linearizability
//!   - `Reconciler` — staleness policy for device reports
//!   - `ingest` — the event ingestion pipeline fed by the subscriber port
//!   - `TwinService` — HTTP-triggered reads and target-state updates
//! - Provide **in-process infrastructure** (in-memory channel and repository)
//!   that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `thermotwin-domain` only (plus `tokio` for sync primitives and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod channel;
pub mod ingest;
pub mod memory;
pub mod ports;
pub mod reconciler;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
