//! Affordability and amenity-proximity classification for postal-code regions.
//!
//! The [`affordability`] module holds the pure decision logic and the
//! [`affordability::ClassificationSession`] that orchestrates it. Datasets arrive
//! through [`dataset`]; everything a binary needs to boot (configuration, telemetry,
//! the top-level error) lives alongside.

pub mod affordability;
pub mod config;
pub mod dataset;
pub mod error;
pub mod telemetry;
