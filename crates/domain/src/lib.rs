//! # thermotwin-domain
//!
//! Pure domain model for the thermotwin device-twin service.
//!
//! ## Responsibilities
//! - Foundational types: device identity, error conventions, timestamps
//! - Define the **target state** (user-desired configuration, partially writable)
//! - Define the **current state** (device-reported condition, written only by reports)
//! - Contain the **validation rules** shared by the HTTP and ingestion paths
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod current_state;
pub mod target_state;
pub mod validation;
