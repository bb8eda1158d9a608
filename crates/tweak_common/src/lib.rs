//! Tweakwise Common - shared types for the tweak reconciliation engine.
//!
//! Holds the declarative tweak catalog, the reconciled data model, the
//! optimization score and configuration.

pub mod catalog;
pub mod config;
pub mod error;
pub mod score;
pub mod types;

pub use catalog::Catalog;
pub use config::Config;
pub use error::{CatalogError, ConfigError, Failure, FailureKind, MutationError, ProbeError};
pub use score::{category_scores, compute_score, CategoryScore};
pub use types::*;
