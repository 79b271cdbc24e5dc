//! Knowledge-graph export and offline reload
//!
//! The exported document is the persisted file format: a `metadata` block,
//! a `nodes` list and an `edges` list, all in graph insertion order.

use super::CitationGraph;
use chrono::{DateTime, SecondsFormat, Utc};
use citeforge_common::errors::Result;
use citeforge_common::{PaperRecord, MAX_AUTHORS};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Relationship label carried by every exported edge
pub const RELATIONSHIP_CITES: &str = "cites";

/// Maximum characters of the title used as a node label
pub const LABEL_MAX_CHARS: usize = 100;

/// Exported citation network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedGraph {
    #[serde(default)]
    pub metadata: ExportMetadata,
    #[serde(default)]
    pub nodes: Vec<ExportedNode>,
    #[serde(default)]
    pub edges: Vec<ExportedEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportMetadata {
    /// RFC 3339 generation timestamp
    pub generated_at: String,
    pub total_papers: usize,
    pub total_citations: usize,
    pub center_paper: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default, deserialize_with = "authors_list")]
    pub authors: Vec<String>,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub citation_count: u64,
    #[serde(default)]
    pub reference_count: u64,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub pmid: String,
    #[serde(default)]
    pub is_center: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedEdge {
    pub source: String,
    pub target: String,
    #[serde(default = "default_relationship")]
    pub relationship: String,
}

fn default_relationship() -> String {
    RELATIONSHIP_CITES.to_string()
}

/// Accept authors either as a list or as one comma-joined string
fn authors_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Authors {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Option::<Authors>::deserialize(deserializer)? {
        Some(Authors::List(names)) => names,
        Some(Authors::Joined(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != "Unknown")
            .map(String::from)
            .collect(),
        None => Vec::new(),
    })
}

impl ExportedNode {
    fn from_paper(paper: &PaperRecord, center: Option<&str>) -> Self {
        Self {
            id: paper.id.clone(),
            label: paper.short_title(LABEL_MAX_CHARS),
            title: paper.title.clone(),
            year: paper.year,
            authors: paper.authors.clone(),
            venue: paper.venue.clone(),
            citation_count: paper.citation_count,
            reference_count: paper.reference_count,
            doi: paper.doi.clone(),
            pmid: paper.pmid.clone(),
            is_center: center == Some(paper.id.as_str()),
        }
    }

    fn to_paper(&self) -> PaperRecord {
        PaperRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            year: self.year,
            authors: self.authors.iter().take(MAX_AUTHORS).cloned().collect(),
            venue: self.venue.clone(),
            citation_count: self.citation_count,
            reference_count: self.reference_count,
            doi: self.doi.clone(),
            pmid: self.pmid.clone(),
        }
    }
}

impl ExportedGraph {
    /// Center paper id: the metadata entry, else the node flagged as center
    pub fn center_id(&self) -> Option<&str> {
        self.metadata
            .center_paper
            .as_deref()
            .or_else(|| self.nodes.iter().find(|n| n.is_center).map(|n| n.id.as_str()))
    }

    /// Pretty-printed JSON document
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the document to `path`
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?)?;
        info!(
            path = %path.display(),
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "Exported knowledge graph"
        );
        Ok(())
    }

    /// Read a document previously written by [`ExportedGraph::write_to`]
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl CitationGraph {
    /// Export with the current time as generation timestamp
    pub fn export(&self, center: Option<&str>) -> ExportedGraph {
        self.export_at(center, Utc::now())
    }

    /// Export with a fixed generation timestamp. Identical graph state and
    /// timestamp give identical documents.
    pub fn export_at(&self, center: Option<&str>, generated_at: DateTime<Utc>) -> ExportedGraph {
        let nodes = self
            .papers()
            .map(|paper| ExportedNode::from_paper(paper, center))
            .collect();

        let edges = self
            .edges()
            .iter()
            .map(|edge| ExportedEdge {
                source: edge.citing.clone(),
                target: edge.cited.clone(),
                relationship: RELATIONSHIP_CITES.to_string(),
            })
            .collect();

        ExportedGraph {
            metadata: ExportMetadata {
                generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                total_papers: self.node_count(),
                total_citations: self.edge_count(),
                center_paper: center.map(String::from),
            },
            nodes,
            edges,
        }
    }

    /// Rebuild a graph from an exported document through the regular
    /// insertion operations. Edges with another relationship are skipped.
    pub fn from_export(exported: &ExportedGraph) -> Self {
        let mut graph = CitationGraph::new();

        for node in &exported.nodes {
            graph.add_paper(node.to_paper());
        }
        for edge in &exported.edges {
            if edge.relationship != RELATIONSHIP_CITES {
                debug!(relationship = %edge.relationship, "Skipping non-citation edge");
                continue;
            }
            graph.add_citation(&edge.source, &edge.target);
        }

        graph
    }
}
