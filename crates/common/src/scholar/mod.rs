//! Bibliographic service abstraction
//!
//! Provides a unified interface over the citation service:
//! - Semantic Scholar Graph API (HTTP, paced and retried)
//! - Static in-memory service (tests, offline experiments)

mod client;
mod pacer;
mod stub;

pub use client::SemanticScholarClient;
pub use pacer::RequestPacer;
pub use stub::StaticScholar;

use crate::errors::Result;
use crate::models::PaperRecord;
use async_trait::async_trait;
use regex_lite::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Trait for citation service access
#[async_trait]
pub trait ScholarApi: Send + Sync {
    /// Look up one paper by DOI, PMID or service-native id.
    /// An unknown paper is `Ok(None)`, not an error.
    async fn resolve(&self, query: &str) -> Result<Option<PaperRecord>>;

    /// Keyword search over titles, in service ranking order
    async fn search(&self, title: &str, limit: usize) -> Result<Vec<PaperRecord>>;

    /// Papers that cite `paper_id`
    async fn citing_papers(&self, paper_id: &str, limit: usize) -> Result<Vec<PaperRecord>>;

    /// Papers cited by `paper_id`
    async fn cited_papers(&self, paper_id: &str, limit: usize) -> Result<Vec<PaperRecord>>;
}

/// Shape of a lookup query.
///
/// Classification looks at the string's shape only: a DOI starts with
/// `10.<registrant>/`, a PMID is all digits and longer than five characters,
/// everything else is passed through as a native id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperQuery {
    Doi(String),
    Pmid(String),
    Native(String),
}

fn doi_pattern() -> &'static Regex {
    static DOI: OnceLock<Regex> = OnceLock::new();
    DOI.get_or_init(|| Regex::new(r"^10\.\d+/\S+$").expect("valid DOI pattern"))
}

impl PaperQuery {
    /// Classify a raw query string
    pub fn classify(raw: &str) -> Self {
        let query = raw.trim();

        if doi_pattern().is_match(query) {
            PaperQuery::Doi(query.to_string())
        } else if query.len() > 5 && query.bytes().all(|b| b.is_ascii_digit()) {
            PaperQuery::Pmid(query.to_string())
        } else {
            PaperQuery::Native(query.to_string())
        }
    }

    /// Identifier as the service expects it in the paper path
    pub fn lookup_id(&self) -> String {
        match self {
            PaperQuery::Doi(doi) => format!("DOI:{}", doi),
            PaperQuery::Pmid(pmid) => format!("PMID:{}", pmid),
            PaperQuery::Native(id) => id.clone(),
        }
    }
}

impl fmt::Display for PaperQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lookup_id())
    }
}
