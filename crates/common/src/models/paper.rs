//! Paper record and its service wire format

use crate::MAX_AUTHORS;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One publication, keyed by the service's canonical identifier.
///
/// Records are never mutated after they enter a graph. Absent service fields
/// map to empty strings and zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Canonical service identifier
    pub id: String,

    /// Title, empty when the service omits it
    pub title: String,

    /// Publication year, 0 when unknown
    pub year: i32,

    /// First authors' display names (at most three)
    pub authors: Vec<String>,

    pub venue: String,

    /// Global citation count reported by the service
    pub citation_count: u64,

    /// Global reference count reported by the service
    pub reference_count: u64,

    pub doi: String,

    pub pmid: String,
}

impl PaperRecord {
    /// Create a record with only an id and a title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the publication year
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    /// Set the author list, keeping only the first three names
    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = authors.into_iter().take(MAX_AUTHORS).map(Into::into).collect();
        self
    }

    /// Convert a service record. Returns `None` when the record has no id.
    pub fn from_api(paper: ApiPaper) -> Option<Self> {
        let id = paper.paper_id.filter(|id| !id.trim().is_empty())?;
        let external_ids = paper.external_ids.unwrap_or_default();

        let authors = paper
            .authors
            .unwrap_or_default()
            .into_iter()
            .take(MAX_AUTHORS)
            .map(|author| author.name.unwrap_or_default())
            .collect();

        Some(Self {
            id,
            title: paper.title.unwrap_or_default(),
            year: paper.year.unwrap_or(0),
            authors,
            venue: paper.venue.unwrap_or_default(),
            citation_count: paper.citation_count.unwrap_or(0),
            reference_count: paper.reference_count.unwrap_or(0),
            doi: external_ids.doi.unwrap_or_default(),
            pmid: external_ids.pubmed.unwrap_or_default(),
        })
    }

    /// Title shortened to `max_chars` characters, with a trailing ellipsis
    pub fn short_title(&self, max_chars: usize) -> String {
        if self.title.chars().count() > max_chars {
            let head: String = self.title.chars().take(max_chars).collect();
            format!("{}...", head)
        } else {
            self.title.clone()
        }
    }
}

/// Paper as returned by the Semantic Scholar Graph API.
///
/// Every field is optional; the service routinely returns `null` or omits
/// keys for sparse records. A field of an unexpected type reads as absent
/// instead of rejecting the whole record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPaper {
    #[serde(default, deserialize_with = "lenient")]
    pub paper_id: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub year: Option<i32>,

    #[serde(default, deserialize_with = "author_list")]
    pub authors: Option<Vec<ApiAuthor>>,

    #[serde(default, deserialize_with = "lenient")]
    pub venue: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub citation_count: Option<u64>,

    #[serde(default, deserialize_with = "lenient")]
    pub reference_count: Option<u64>,

    #[serde(default, deserialize_with = "lenient")]
    pub external_ids: Option<ApiExternalIds>,
}

/// Author reference inside a paper record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAuthor {
    #[serde(default, deserialize_with = "lenient")]
    pub author_id: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// External identifiers (only the ones the graph keeps)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiExternalIds {
    #[serde(rename = "DOI", default, deserialize_with = "lenient")]
    pub doi: Option<String>,

    #[serde(rename = "PubMed", default, deserialize_with = "lenient")]
    pub pubmed: Option<String>,
}

/// Read any JSON value, keeping it only if it has the expected type
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Authors as objects (`{"name": ...}`) or as plain name strings
fn author_list<'de, D>(deserializer: D) -> Result<Option<Vec<ApiAuthor>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };

    let authors = entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(name) => Some(ApiAuthor {
                author_id: None,
                name: Some(name),
            }),
            Value::Object(_) => ApiAuthor::deserialize(entry).ok(),
            _ => None,
        })
        .collect();
    Ok(Some(authors))
}
