//! maintrag Core - Domain models, dataset loading, and configuration
//!
//! This crate contains the work-order data model, the structured query types
//! shared by every pipeline stage, and the layered configuration.

pub mod config;
pub mod dataset;
pub mod error;
pub mod models;

pub use dataset::{Catalog, Dataset};
pub use error::{MaintragError, Result};
