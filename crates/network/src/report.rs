//! Network summary for terminal output

use crate::citation::CitationGraph;
use citeforge_common::PaperRecord;
use serde::Serialize;
use std::fmt;

/// Center paper details within the summary
#[derive(Debug, Clone, Serialize)]
pub struct CenterSummary {
    pub paper: PaperRecord,
    /// Papers in the network citing the center
    pub cited_by_in_network: usize,
    /// Papers in the network the center cites
    pub cites_in_network: usize,
}

/// One entry of the most-cited list
#[derive(Debug, Clone, Serialize)]
pub struct RankedPaper {
    pub paper: PaperRecord,
    pub in_network_citations: usize,
}

/// Snapshot of a citation network for display
#[derive(Debug, Clone, Serialize)]
pub struct NetworkSummary {
    pub total_papers: usize,
    pub total_citations: usize,
    pub center: Option<CenterSummary>,
    pub top_cited: Vec<RankedPaper>,
}

impl NetworkSummary {
    /// Summarize `graph`, listing the `top_n` most cited papers
    pub fn from_graph(graph: &CitationGraph, center: Option<&str>, top_n: usize) -> Self {
        let center = center.and_then(|id| graph.paper(id)).map(|paper| CenterSummary {
            cited_by_in_network: graph.citation_count(&paper.id),
            cites_in_network: graph.reference_count(&paper.id),
            paper: paper.clone(),
        });

        let top_cited = graph
            .top_cited_in_network(top_n)
            .into_iter()
            .filter_map(|(id, count)| {
                graph.paper(&id).map(|paper| RankedPaper {
                    paper: paper.clone(),
                    in_network_citations: count,
                })
            })
            .collect();

        Self {
            total_papers: graph.node_count(),
            total_citations: graph.edge_count(),
            center,
            top_cited,
        }
    }
}

fn authors_or_unknown(paper: &PaperRecord) -> String {
    if paper.authors.is_empty() {
        "Unknown".to_string()
    } else {
        paper.authors.join(", ")
    }
}

impl fmt::Display for NetworkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);
        writeln!(f, "{}", rule)?;
        writeln!(f, "CITATION NETWORK SUMMARY")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Total papers in network: {}", self.total_papers)?;
        writeln!(f, "Total citation relationships: {}", self.total_citations)?;

        if let Some(center) = &self.center {
            let paper = &center.paper;
            writeln!(f)?;
            writeln!(f, "Center paper: {}", paper.title)?;
            writeln!(f, "   Year: {}", paper.year)?;
            writeln!(f, "   Authors: {}", authors_or_unknown(paper))?;
            writeln!(f, "   Citations: {}", paper.citation_count)?;
            writeln!(f, "   References: {}", paper.reference_count)?;
            writeln!(f)?;
            writeln!(f, "Network connections:")?;
            writeln!(f, "   - Directly cited by: {} papers", center.cited_by_in_network)?;
            writeln!(f, "   - Directly cites: {} papers", center.cites_in_network)?;
        }

        writeln!(f)?;
        writeln!(f, "Most cited papers in network:")?;
        for (rank, entry) in self.top_cited.iter().enumerate() {
            let paper = &entry.paper;
            writeln!(f, "   {}. [{}] {}", rank + 1, paper.year, paper.short_title(60))?;
            writeln!(
                f,
                "      Citations in network: {} | Total: {}",
                entry.in_network_citations, paper.citation_count
            )?;
        }
        Ok(())
    }
}
