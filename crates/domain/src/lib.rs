//! Domain layer for the care scheduling and EVV compliance backend.
//!
//! This crate contains:
//! - Domain models (Service Pattern, Visit, EVV Record, Geofence, ...)
//! - Injected collaborator ports (visit/client/caregiver/address providers, aggregator adapter)
//! - Business logic services (pattern expansion, lifecycle, verification, submission)
//! - Domain error types

pub mod error;
pub mod models;
pub mod ports;
pub mod services;

pub use error::{DomainError, DomainResult};
