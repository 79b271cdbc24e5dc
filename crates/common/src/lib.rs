//! CiteForge Common Library
//!
//! Shared code for the citation-network builder:
//! - Paper record model
//! - Bibliographic service client (Semantic Scholar) with pacing and retry
//! - Error types and handling
//! - Configuration management
//! - Metrics helpers

pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod scholar;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::PaperRecord;
pub use scholar::{ScholarApi, SemanticScholarClient, StaticScholar};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of author names kept per paper
pub const MAX_AUTHORS: usize = 3;
