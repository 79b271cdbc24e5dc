//! Breadth-first network expansion
//!
//! Resolves a start paper, then expands citing and referenced papers layer
//! by layer under a depth limit, a per-call fan-out and a global node cap.

use super::CitationGraph;
use citeforge_common::config::TraversalConfig;
use citeforge_common::errors::{AppError, Result};
use citeforge_common::{metrics, PaperRecord, ScholarApi};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use validator::Validate;

/// Why the traversal loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The queue drained; the depth limit bounded expansion
    Exhausted,
    /// The node cap was reached
    NodeCap,
    /// The cancellation signal fired
    Cancelled,
    /// The configured time budget ran out
    DeadlineExceeded,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Exhausted => "depth limit reached, frontier exhausted",
            StopReason::NodeCap => "node cap reached",
            StopReason::Cancelled => "cancelled",
            StopReason::DeadlineExceeded => "time budget exceeded",
        };
        f.write_str(text)
    }
}

/// Counters collected during one build
#[derive(Debug, Clone, Serialize)]
pub struct TraversalStats {
    pub nodes: usize,
    pub edges: usize,
    /// Queue entries whose neighbours were fetched
    pub expanded: usize,
    /// Queue entries left unexpanded because they sit at the depth limit
    pub leaves_at_depth_limit: usize,
    /// Listing calls that failed and counted as empty
    pub failed_fetches: usize,
    /// Returned records without an id
    pub dropped_records: usize,
    /// New papers turned away because the node cap was full
    pub skipped_at_cap: usize,
    pub stop_reason: StopReason,
}

impl Default for TraversalStats {
    fn default() -> Self {
        Self {
            nodes: 0,
            edges: 0,
            expanded: 0,
            leaves_at_depth_limit: 0,
            failed_fetches: 0,
            dropped_records: 0,
            skipped_at_cap: 0,
            stop_reason: StopReason::Exhausted,
        }
    }
}

/// Result of a successful build
#[derive(Debug)]
pub struct NetworkBuild {
    pub graph: CitationGraph,
    /// Id of the resolved start paper
    pub center_id: String,
    pub stats: TraversalStats,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    /// Results cite the expanded paper
    Citing,
    /// Results are cited by the expanded paper
    Referenced,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Citing => f.write_str("citing"),
            Direction::Referenced => f.write_str("referenced"),
        }
    }
}

/// Mutable state of one traversal
struct Frontier {
    queue: VecDeque<(String, usize)>,
    visited: HashSet<String>,
}

/// Builds a citation network around one paper.
///
/// Node cap rule: a paper not already in the graph is never inserted once
/// the graph holds `node_cap` nodes. The rest of the current result list
/// still contributes edges between papers already present, then traversal
/// stops without further fetches.
pub struct NetworkBuilder {
    scholar: Arc<dyn ScholarApi>,
    config: TraversalConfig,
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl NetworkBuilder {
    /// Create a builder; fails if the bounds are invalid
    pub fn new(scholar: Arc<dyn ScholarApi>, config: TraversalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scholar,
            config,
            cancel: None,
            deadline: None,
        })
    }

    /// Stop between nodes once the channel holds `true`
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Stop between nodes once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Resolve `query` and expand the network around it.
    ///
    /// Only a failed resolution is an error; every later failure shrinks the
    /// result instead.
    pub async fn build(&self, query: &str) -> Result<NetworkBuild> {
        info!(
            query = %query,
            max_depth = self.config.max_depth,
            max_per_level = self.config.max_per_level,
            node_cap = self.config.node_cap,
            "Building citation network"
        );

        let deadline = self
            .deadline
            .or_else(|| self.config.max_duration().map(|budget| Instant::now() + budget));

        let center = match self.scholar.resolve(query).await {
            Ok(Some(paper)) => paper,
            Ok(None) => {
                error!(query = %query, "Could not resolve center paper");
                return Err(AppError::PaperNotFound {
                    query: query.to_string(),
                });
            }
            Err(e) => {
                error!(query = %query, error = %e, "Center paper lookup failed");
                return Err(e);
            }
        };

        let mut graph = CitationGraph::new();
        let center_title = center.short_title(80);
        let center_id = graph.add_paper(center).ok_or_else(|| AppError::PaperNotFound {
            query: query.to_string(),
        })?;
        info!(center_id = %center_id, title = %center_title, "Resolved center paper");

        let mut frontier = Frontier {
            queue: VecDeque::from([(center_id.clone(), 0)]),
            visited: HashSet::from([center_id.clone()]),
        };
        let mut stats = TraversalStats::default();

        let stop_reason = loop {
            if self.is_cancelled() {
                break StopReason::Cancelled;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break StopReason::DeadlineExceeded;
            }

            let Some((paper_id, depth)) = frontier.queue.pop_front() else {
                break StopReason::Exhausted;
            };

            if depth >= self.config.max_depth {
                stats.leaves_at_depth_limit += 1;
                continue;
            }
            if self.at_cap(&graph) {
                break StopReason::NodeCap;
            }

            stats.expanded += 1;
            debug!(
                paper_id = %paper_id,
                depth = depth + 1,
                max_depth = self.config.max_depth,
                "Expanding paper"
            );

            let citing = self.fetch(Direction::Citing, &paper_id, &mut stats).await;
            self.absorb(
                &mut graph,
                &mut frontier,
                &mut stats,
                &paper_id,
                depth,
                Direction::Citing,
                citing,
            );
            if self.at_cap(&graph) {
                break StopReason::NodeCap;
            }

            let referenced = self.fetch(Direction::Referenced, &paper_id, &mut stats).await;
            self.absorb(
                &mut graph,
                &mut frontier,
                &mut stats,
                &paper_id,
                depth,
                Direction::Referenced,
                referenced,
            );
            if self.at_cap(&graph) {
                break StopReason::NodeCap;
            }
        };

        stats.nodes = graph.node_count();
        stats.edges = graph.edge_count();
        stats.stop_reason = stop_reason;
        metrics::record_network(stats.nodes, stats.edges);

        info!(
            nodes = stats.nodes,
            edges = stats.edges,
            expanded = stats.expanded,
            failed_fetches = stats.failed_fetches,
            stop_reason = %stop_reason,
            "Citation network built"
        );

        Ok(NetworkBuild {
            graph,
            center_id,
            stats,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn at_cap(&self, graph: &CitationGraph) -> bool {
        graph.node_count() >= self.config.node_cap
    }

    /// One listing call; a failure counts as zero results
    async fn fetch(
        &self,
        direction: Direction,
        paper_id: &str,
        stats: &mut TraversalStats,
    ) -> Vec<PaperRecord> {
        let limit = self.config.max_per_level;
        let result = match direction {
            Direction::Citing => self.scholar.citing_papers(paper_id, limit).await,
            Direction::Referenced => self.scholar.cited_papers(paper_id, limit).await,
        };

        match result {
            Ok(papers) => {
                debug!(
                    paper_id = %paper_id,
                    direction = %direction,
                    count = papers.len(),
                    "Fetched papers"
                );
                papers
            }
            Err(e) => {
                warn!(
                    paper_id = %paper_id,
                    direction = %direction,
                    error = %e,
                    "Fetch failed, continuing with zero results"
                );
                stats.failed_fetches += 1;
                Vec::new()
            }
        }
    }

    /// Insert fetched papers and their edges relative to `paper_id`
    #[allow(clippy::too_many_arguments)]
    fn absorb(
        &self,
        graph: &mut CitationGraph,
        frontier: &mut Frontier,
        stats: &mut TraversalStats,
        paper_id: &str,
        depth: usize,
        direction: Direction,
        papers: Vec<PaperRecord>,
    ) {
        for paper in papers {
            if paper.id.is_empty() {
                stats.dropped_records += 1;
                continue;
            }

            let id = paper.id.clone();
            if !graph.contains(&id) {
                if self.at_cap(graph) {
                    stats.skipped_at_cap += 1;
                    continue;
                }
                graph.add_paper(paper);
            }

            match direction {
                // The result cites the expanded paper
                Direction::Citing => graph.add_citation(&id, paper_id),
                // The expanded paper cites the result
                Direction::Referenced => graph.add_citation(paper_id, &id),
            };

            if frontier.visited.insert(id.clone()) {
                frontier.queue.push_back((id, depth + 1));
            }
        }
    }
}
