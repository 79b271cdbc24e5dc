//! In-memory citation service

use super::{PaperQuery, ScholarApi};
use crate::errors::{AppError, Result};
use crate::models::PaperRecord;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed citation service backed by in-memory tables.
///
/// Listings name papers by id; an id without a registered record is served
/// as a bare record carrying only that id, and an empty id is served as a
/// record without one.
#[derive(Debug, Default)]
pub struct StaticScholar {
    papers: Vec<PaperRecord>,
    citing: HashMap<String, Vec<String>>,
    cited: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    listing_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
}

impl StaticScholar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a full paper record
    pub fn with_paper(mut self, paper: PaperRecord) -> Self {
        self.papers.push(paper);
        self
    }

    /// Set the papers citing `id` (a citing result P means P cites `id`)
    pub fn with_citing<I, S>(mut self, id: &str, citing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.citing
            .insert(id.to_string(), citing.into_iter().map(Into::into).collect());
        self
    }

    /// Set the papers `id` cites
    pub fn with_references<I, S>(mut self, id: &str, cited: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cited
            .insert(id.to_string(), cited.into_iter().map(Into::into).collect());
        self
    }

    /// Make both listing calls for `id` fail with an upstream error
    pub fn with_failure(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    /// Number of citing/cited listing calls served so far
    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    /// Number of resolve calls served so far
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn record(&self, id: &str) -> PaperRecord {
        self.papers
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .unwrap_or_else(|| PaperRecord::new(id, ""))
    }

    fn listing(
        &self,
        table: &HashMap<String, Vec<String>>,
        paper_id: &str,
        limit: usize,
        endpoint: &str,
    ) -> Result<Vec<PaperRecord>> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(paper_id) {
            return Err(AppError::Upstream {
                status: 500,
                endpoint: format!("/paper/{}/{}", paper_id, endpoint),
            });
        }

        Ok(table
            .get(paper_id)
            .map(|ids| ids.iter().take(limit).map(|id| self.record(id)).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ScholarApi for StaticScholar {
    async fn resolve(&self, query: &str) -> Result<Option<PaperRecord>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);

        let found = match PaperQuery::classify(query) {
            PaperQuery::Doi(doi) => self.papers.iter().find(|p| p.doi.eq_ignore_ascii_case(&doi)),
            PaperQuery::Pmid(pmid) => self.papers.iter().find(|p| p.pmid == pmid),
            PaperQuery::Native(id) => self.papers.iter().find(|p| p.id == id),
        };
        Ok(found.cloned())
    }

    async fn search(&self, title: &str, limit: usize) -> Result<Vec<PaperRecord>> {
        let needle = title.to_lowercase();
        Ok(self
            .papers
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn citing_papers(&self, paper_id: &str, limit: usize) -> Result<Vec<PaperRecord>> {
        self.listing(&self.citing, paper_id, limit, "citations")
    }

    async fn cited_papers(&self, paper_id: &str, limit: usize) -> Result<Vec<PaperRecord>> {
        self.listing(&self.cited, paper_id, limit, "references")
    }
}
