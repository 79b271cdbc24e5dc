//! Citation graph representation
//!
//! In-memory directed graph of papers keyed by canonical id. Nodes and
//! edges keep insertion order so ranking ties and exports are stable.

use citeforge_common::PaperRecord;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Edge in the citation graph: `citing` cites `cited`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CitationEdge {
    /// Citing paper ID
    pub citing: String,

    /// Cited paper ID
    pub cited: String,
}

/// Broken adjacency bookkeeping found by [`CitationGraph::check_invariants`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("edge {citing} -> {cited} missing from references")]
    MissingReference { citing: String, cited: String },

    #[error("edge {citing} -> {cited} missing from cited-by")]
    MissingCitedBy { citing: String, cited: String },

    #[error("adjacency holds {adjacency} entries for {edges} edges")]
    ExtraAdjacency { adjacency: usize, edges: usize },

    #[error("edge list holds {list} entries but edge set holds {set}")]
    DuplicateEdge { list: usize, set: usize },
}

/// In-memory citation graph
#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    /// Papers in insertion order
    papers: Vec<PaperRecord>,

    /// paper_id -> position in `papers`
    index: HashMap<String, usize>,

    /// Edges in insertion order
    edges: Vec<CitationEdge>,

    /// Edge membership
    edge_set: HashSet<CitationEdge>,

    /// paper_id -> papers it cites
    references: HashMap<String, HashSet<String>>,

    /// paper_id -> papers citing it
    cited_by: HashMap<String, HashSet<String>>,
}

impl CitationGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a paper unless its id is already present.
    ///
    /// Returns the paper's id, or `None` if the record has no id. An
    /// existing record is never replaced.
    pub fn add_paper(&mut self, paper: PaperRecord) -> Option<String> {
        if paper.id.is_empty() {
            return None;
        }
        if self.index.contains_key(&paper.id) {
            return Some(paper.id);
        }

        let id = paper.id.clone();
        self.index.insert(id.clone(), self.papers.len());
        self.papers.push(paper);
        Some(id)
    }

    /// Record that `citing` cites `cited`.
    ///
    /// Returns `true` if a new edge was inserted. Empty ids, self-citations
    /// and duplicates are ignored.
    pub fn add_citation(&mut self, citing: &str, cited: &str) -> bool {
        if citing.is_empty() || cited.is_empty() || citing == cited {
            return false;
        }

        let edge = CitationEdge {
            citing: citing.to_string(),
            cited: cited.to_string(),
        };
        if !self.edge_set.insert(edge.clone()) {
            return false;
        }

        self.references
            .entry(edge.citing.clone())
            .or_default()
            .insert(edge.cited.clone());
        self.cited_by
            .entry(edge.cited.clone())
            .or_default()
            .insert(edge.citing.clone());
        self.edges.push(edge);
        true
    }

    /// Whether a paper with this id is present
    pub fn contains(&self, paper_id: &str) -> bool {
        self.index.contains_key(paper_id)
    }

    /// Get a paper by id
    pub fn paper(&self, paper_id: &str) -> Option<&PaperRecord> {
        self.index.get(paper_id).map(|&i| &self.papers[i])
    }

    /// Papers in insertion order
    pub fn papers(&self) -> impl Iterator<Item = &PaperRecord> {
        self.papers.iter()
    }

    /// Edges in insertion order
    pub fn edges(&self) -> &[CitationEdge] {
        &self.edges
    }

    /// Whether the edge `citing -> cited` exists
    pub fn has_citation(&self, citing: &str, cited: &str) -> bool {
        self.references
            .get(citing)
            .is_some_and(|refs| refs.contains(cited))
    }

    /// Get papers cited by this paper
    pub fn references_of(&self, paper_id: &str) -> impl Iterator<Item = &str> {
        self.references
            .get(paper_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Get papers citing this paper
    pub fn cited_by(&self, paper_id: &str) -> impl Iterator<Item = &str> {
        self.cited_by
            .get(paper_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// In-network citation count (incoming edges)
    pub fn citation_count(&self, paper_id: &str) -> usize {
        self.cited_by.get(paper_id).map_or(0, HashSet::len)
    }

    /// In-network reference count (outgoing edges)
    pub fn reference_count(&self, paper_id: &str) -> usize {
        self.references.get(paper_id).map_or(0, HashSet::len)
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.papers.len()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Papers reachable from `paper_id` within `depth` hops, following
    /// citations in either direction. The start paper is excluded.
    pub fn related_papers(&self, paper_id: &str, depth: usize) -> HashSet<String> {
        let mut related = HashSet::new();
        let mut seen: HashSet<&str> = HashSet::from([paper_id]);
        let mut frontier: Vec<&str> = vec![paper_id];

        for _ in 0..depth {
            let mut next = Vec::new();
            for &current in &frontier {
                for neighbor in self.references_of(current).chain(self.cited_by(current)) {
                    if seen.insert(neighbor) {
                        related.insert(neighbor.to_string());
                        next.push(neighbor);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        related
    }

    /// Top `n` papers by in-network citation count, most cited first.
    /// Ties keep insertion order.
    pub fn top_cited_in_network(&self, n: usize) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self
            .papers
            .iter()
            .map(|p| (p.id.clone(), self.citation_count(&p.id)))
            .collect();

        // Stable sort keeps insertion order among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// Verify that `references` and `cited_by` are exact inverses over the
    /// edge set.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.edges.len() != self.edge_set.len() {
            return Err(InvariantViolation::DuplicateEdge {
                list: self.edges.len(),
                set: self.edge_set.len(),
            });
        }

        for edge in &self.edges {
            if !self.has_citation(&edge.citing, &edge.cited) {
                return Err(InvariantViolation::MissingReference {
                    citing: edge.citing.clone(),
                    cited: edge.cited.clone(),
                });
            }
            let cited_by = self.cited_by.get(&edge.cited);
            if !cited_by.is_some_and(|set| set.contains(&edge.citing)) {
                return Err(InvariantViolation::MissingCitedBy {
                    citing: edge.citing.clone(),
                    cited: edge.cited.clone(),
                });
            }
        }

        // Every edge is present in both maps, so equal totals rule out extras
        for adjacency in [&self.references, &self.cited_by] {
            let total: usize = adjacency.values().map(HashSet::len).sum();
            if total != self.edges.len() {
                return Err(InvariantViolation::ExtraAdjacency {
                    adjacency: total,
                    edges: self.edges.len(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paper(id: &str) -> PaperRecord {
        PaperRecord::new(id, format!("Title {}", id))
    }

    #[test]
    fn test_graph_construction() {
        let mut graph = CitationGraph::new();

        for id in ["A", "B", "C"] {
            graph.add_paper(paper(id));
        }

        // A cites B, B cites C
        assert!(graph.add_citation("A", "B"));
        assert!(graph.add_citation("B", "C"));

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.references_of("A").collect::<Vec<_>>(), vec!["B"]);
        assert_eq!(graph.cited_by("B").collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(graph.references_of("B").collect::<Vec<_>>(), vec!["C"]);
        assert!(graph.check_invariants().is_ok());
    }

    #[test]
    fn test_idempotent_insert() {
        let mut graph = CitationGraph::new();

        let first = graph.add_paper(paper("A"));
        let second = graph.add_paper(PaperRecord::new("A", "A different title"));

        assert_eq!(first.as_deref(), Some("A"));
        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.paper("A").unwrap().title, "Title A");
    }

    #[test]
    fn test_paper_without_id_is_rejected() {
        let mut graph = CitationGraph::new();
        assert_eq!(graph.add_paper(PaperRecord::new("", "orphan")), None);
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_self_edge_rejection() {
        let mut graph = CitationGraph::new();
        graph.add_paper(paper("X"));

        assert!(!graph.add_citation("X", "X"));
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.citation_count("X"), 0);
    }

    #[test]
    fn test_empty_endpoint_rejection() {
        let mut graph = CitationGraph::new();
        assert!(!graph.add_citation("", "B"));
        assert!(!graph.add_citation("A", ""));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_duplicate_edge_is_noop() {
        let mut graph = CitationGraph::new();
        assert!(graph.add_citation("A", "B"));
        assert!(!graph.add_citation("A", "B"));

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.citation_count("B"), 1);
        // The reverse direction is a different edge
        assert!(graph.add_citation("B", "A"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_citation_counts() {
        let mut graph = CitationGraph::new();

        // Both A and C cite B
        graph.add_citation("A", "B");
        graph.add_citation("C", "B");

        assert_eq!(graph.citation_count("B"), 2);
        assert_eq!(graph.reference_count("A"), 1);
        assert_eq!(graph.reference_count("B"), 0);
    }

    #[test]
    fn test_related_papers_by_hops() {
        let mut graph = CitationGraph::new();
        // A <- B -> C -> D, E -> A
        graph.add_citation("B", "A");
        graph.add_citation("B", "C");
        graph.add_citation("C", "D");
        graph.add_citation("E", "A");

        let one_hop = graph.related_papers("A", 1);
        assert_eq!(one_hop, HashSet::from(["B".to_string(), "E".to_string()]));

        let two_hops = graph.related_papers("A", 2);
        assert_eq!(
            two_hops,
            HashSet::from(["B".to_string(), "E".to_string(), "C".to_string()])
        );

        let all = graph.related_papers("A", 10);
        assert_eq!(all.len(), 4);
        assert!(!all.contains("A"));
        assert!(graph.related_papers("A", 0).is_empty());
    }

    #[test]
    fn test_ranking_determinism() {
        let mut graph = CitationGraph::new();
        for id in ["A", "C", "B", "X1", "X2", "X3"] {
            graph.add_paper(paper(id));
        }
        // A cited by 3, C cited by 3, B cited by 1
        for citing in ["X1", "X2", "X3"] {
            graph.add_citation(citing, "C");
            graph.add_citation(citing, "A");
        }
        graph.add_citation("X1", "B");

        let top = graph.top_cited_in_network(2);
        assert_eq!(top, vec![("A".to_string(), 3), ("C".to_string(), 3)]);

        let top = graph.top_cited_in_network(3);
        assert_eq!(top[2], ("B".to_string(), 1));
    }

    #[test]
    fn test_ranking_ignores_service_counts() {
        let mut graph = CitationGraph::new();
        let mut famous = paper("F");
        famous.citation_count = 100_000;
        graph.add_paper(famous);
        graph.add_paper(paper("L"));
        graph.add_paper(paper("Z"));
        graph.add_citation("Z", "L");

        assert_eq!(graph.top_cited_in_network(1)[0].0, "L");
    }

    fn id_strategy() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), "[a-e]".prop_map(String::from)]
    }

    proptest! {
        #[test]
        fn prop_adjacency_stays_symmetric(
            pairs in proptest::collection::vec((id_strategy(), id_strategy()), 0..60)
        ) {
            let mut graph = CitationGraph::new();
            let mut expected = HashSet::new();

            for (citing, cited) in &pairs {
                graph.add_citation(citing, cited);
                if !citing.is_empty() && !cited.is_empty() && citing != cited {
                    expected.insert((citing.clone(), cited.clone()));
                }
            }

            prop_assert!(graph.check_invariants().is_ok());
            prop_assert_eq!(graph.edge_count(), expected.len());
            for (citing, cited) in &expected {
                prop_assert!(graph.references_of(citing).any(|id| id == cited));
                prop_assert!(graph.cited_by(cited).any(|id| id == citing));
            }
        }
    }
}
