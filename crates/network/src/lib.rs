//! CiteForge citation network builder
//!
//! - Citation graph with deduplicated nodes and edges
//! - Bounded breadth-first traversal against the bibliographic service
//! - Deterministic export, offline reload and in-network ranking
//! - Human-readable network summary

pub mod citation;
pub mod report;

pub use citation::{CitationGraph, ExportedGraph, NetworkBuild, NetworkBuilder, StopReason};
pub use report::NetworkSummary;
