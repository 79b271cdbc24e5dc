//! Citation network construction
//!
//! Builds a bounded citation graph around one paper by breadth-first
//! expansion against the bibliographic service, and exports it.

mod export;
mod graph;
mod traversal;

pub use export::{
    ExportMetadata, ExportedEdge, ExportedGraph, ExportedNode, LABEL_MAX_CHARS, RELATIONSHIP_CITES,
};
pub use graph::{CitationEdge, CitationGraph, InvariantViolation};
pub use traversal::{NetworkBuild, NetworkBuilder, StopReason, TraversalStats};
