//! Semantic Scholar Graph API client

use super::{PaperQuery, RequestPacer, ScholarApi};
use crate::config::ScholarConfig;
use crate::errors::{AppError, Result};
use crate::metrics::{self, RequestMetrics};
use crate::models::{ApiPaper, PaperRecord};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use validator::Validate;

/// Fields requested for every paper record
const PAPER_FIELDS: &str =
    "paperId,title,year,authors,venue,citationCount,referenceCount,externalIds";

/// HTTP client for the Semantic Scholar Graph API.
///
/// Every request goes through the instance's [`RequestPacer`]. A 429 is
/// retried exactly once after the configured backoff. Failures that remain
/// are logged and reported as empty results by the [`ScholarApi`] methods.
pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    pacer: RequestPacer,
    rate_limit_backoff: Duration,
}

impl SemanticScholarClient {
    /// Create a client from configuration
    pub fn new(config: &ScholarConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("citeforge/{}", crate::VERSION))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            pacer: RequestPacer::new(config.min_interval()),
            rate_limit_backoff: config.rate_limit_backoff(),
        })
    }

    /// Send one paced GET request
    async fn send(
        &self,
        endpoint: &'static str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        self.pacer.wait().await;

        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url).query(params);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let metrics = RequestMetrics::start(endpoint);
        match request.send().await {
            Ok(response) => {
                debug!(path = %path, status = response.status().as_u16(), "API response");
                metrics.finish(response.status().as_u16());
                Ok(response)
            }
            Err(e) => {
                metrics.finish(0);
                Err(e.into())
            }
        }
    }

    /// GET a JSON document. `Ok(None)` for 404 and for an empty body.
    async fn get_json(
        &self,
        endpoint: &'static str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<Value>> {
        let mut response = self.send(endpoint, path, params).await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!(
                path = %path,
                backoff_ms = self.rate_limit_backoff.as_millis() as u64,
                "Rate limit reached, retrying once"
            );
            metrics::record_retry(endpoint);
            tokio::time::sleep(self.rate_limit_backoff).await;

            response = self.send(endpoint, path, params).await?;
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                return Err(AppError::RateLimited {
                    endpoint: path.to_string(),
                    attempts: 2,
                });
            }
        }

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::Upstream {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Fetch a `{"data": [...]}` listing and unwrap each entry.
    /// `entry_key` selects the nested paper object (`citingPaper`, `citedPaper`).
    async fn fetch_list(
        &self,
        endpoint: &'static str,
        path: &str,
        params: &[(&str, String)],
        entry_key: Option<&str>,
        limit: usize,
    ) -> Vec<PaperRecord> {
        match self.get_json(endpoint, path, params).await {
            Ok(Some(body)) => parse_listing(&body, entry_key, limit),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(
                    path = %path,
                    error = %e,
                    rate_limited = e.is_rate_limited(),
                    "Listing request failed, treating as empty"
                );
                Vec::new()
            }
        }
    }

    fn list_params(limit: usize) -> [(&'static str, String); 2] {
        [("limit", limit.to_string()), ("fields", PAPER_FIELDS.to_string())]
    }
}

/// Extract paper records from a listing body. Entries that are not objects
/// or carry no id are skipped; mistyped fields fall back to defaults.
fn parse_listing(body: &Value, entry_key: Option<&str>, limit: usize) -> Vec<PaperRecord> {
    let Some(entries) = body.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry_key {
            Some(key) => entry.get(key),
            None => Some(entry),
        })
        .filter_map(|paper| serde_json::from_value::<ApiPaper>(paper.clone()).ok())
        .filter_map(PaperRecord::from_api)
        .take(limit)
        .collect()
}

#[async_trait]
impl ScholarApi for SemanticScholarClient {
    async fn resolve(&self, query: &str) -> Result<Option<PaperRecord>> {
        let query = PaperQuery::classify(query);
        let path = format!("/paper/{}", query.lookup_id());
        let params = [("fields", PAPER_FIELDS.to_string())];

        match self.get_json("paper", &path, &params).await {
            Ok(Some(body)) => {
                let paper = serde_json::from_value::<ApiPaper>(body)
                    .ok()
                    .and_then(PaperRecord::from_api);
                if paper.is_none() {
                    warn!(query = %query, "Lookup returned a record without an id");
                }
                Ok(paper)
            }
            Ok(None) => {
                info!(query = %query, "Paper not found");
                Ok(None)
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Lookup failed");
                Ok(None)
            }
        }
    }

    async fn search(&self, title: &str, limit: usize) -> Result<Vec<PaperRecord>> {
        let params = [
            ("query", title.to_string()),
            ("limit", limit.to_string()),
            ("fields", PAPER_FIELDS.to_string()),
        ];
        Ok(self.fetch_list("search", "/paper/search", &params, None, limit).await)
    }

    async fn citing_papers(&self, paper_id: &str, limit: usize) -> Result<Vec<PaperRecord>> {
        let path = format!("/paper/{}/citations", paper_id);
        let params = Self::list_params(limit);
        Ok(self
            .fetch_list("citations", &path, &params, Some("citingPaper"), limit)
            .await)
    }

    async fn cited_papers(&self, paper_id: &str, limit: usize) -> Result<Vec<PaperRecord>> {
        let path = format!("/paper/{}/references", paper_id);
        let params = Self::list_params(limit);
        Ok(self
            .fetch_list("references", &path, &params, Some("citedPaper"), limit)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SemanticScholarClient {
        let config = ScholarConfig {
            base_url: server.uri(),
            api_key: None,
            min_interval_ms: 0,
            rate_limit_backoff_ms: 10,
            timeout_secs: 5,
        };
        SemanticScholarClient::new(&config).unwrap()
    }

    fn citing_body(ids: &[&str]) -> Value {
        let data: Vec<Value> = ids
            .iter()
            .map(|id| json!({"citingPaper": {"paperId": id, "title": format!("Paper {}", id)}}))
            .collect();
        json!({ "offset": 0, "data": data })
    }

    #[tokio::test]
    async fn test_resolve_by_doi() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/DOI:10.1038/nature14236"))
            .and(query_param("fields", PAPER_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paperId": "s2-center",
                "title": "Human-level control through deep reinforcement learning",
                "year": 2015,
                "externalIds": {"DOI": "10.1038/nature14236", "PubMed": "25719670"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let paper = client_for(&server)
            .resolve("10.1038/nature14236")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(paper.id, "s2-center");
        assert_eq!(paper.pmid, "25719670");
    }

    #[tokio::test]
    async fn test_resolve_by_pmid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/PMID:27669175"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"paperId": "s2-pm"})))
            .expect(1)
            .mount(&server)
            .await;

        let paper = client_for(&server).resolve("27669175").await.unwrap();
        assert_eq!(paper.map(|p| p.id), Some("s2-pm".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "Paper not found"})),
            )
            .mount(&server)
            .await;

        let result = client_for(&server).resolve("missing").await;
        assert!(tokio_test::assert_ok!(result).is_none());
    }

    #[tokio::test]
    async fn test_citations_unwrap_citing_paper() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/citations"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(citing_body(&["P2", "P3"])))
            .mount(&server)
            .await;

        let papers = client_for(&server).citing_papers("P1", 10).await.unwrap();
        let ids: Vec<_> = papers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P2", "P3"]);
    }

    #[tokio::test]
    async fn test_references_unwrap_cited_paper() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/references"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"citedPaper": {"paperId": "R1", "authors": [
                        {"name": "A"}, {"name": "B"}, {"name": "C"}, {"name": "D"}, {"name": "E"}
                    ]}},
                    {"citedPaper": {"paperId": null, "title": "Unresolved reference"}},
                    {"citedPaper": {"paperId": "R2", "year": "2020"}},
                    null,
                    {"citedPaper": {"paperId": "R4", "authors": ["Plain String Author"]}},
                    {"citedPaper": {"paperId": "R3"}}
                ]
            })))
            .mount(&server)
            .await;

        let papers = client_for(&server).cited_papers("P1", 10).await.unwrap();
        let ids: Vec<_> = papers.iter().map(|p| p.id.as_str()).collect();

        assert_eq!(ids, vec!["R1", "R2", "R4", "R3"]);
        assert_eq!(papers[0].authors, vec!["A", "B", "C"]);
        assert_eq!(papers[1].year, 0);
        assert_eq!(papers[2].authors, vec!["Plain String Author"]);
    }

    #[tokio::test]
    async fn test_listing_is_capped_at_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/citations"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(citing_body(&["A", "B", "C", "D"])),
            )
            .mount(&server)
            .await;

        let papers = client_for(&server).citing_papers("P1", 2).await.unwrap();
        assert_eq!(papers.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/citations"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/references"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.citing_papers("P1", 10).await.unwrap().is_empty());
        assert!(client.cited_papers("P1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/citations"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let papers = client_for(&server).citing_papers("P1", 10).await.unwrap();
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/citations"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/citations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(citing_body(&["P2"])))
            .expect(1)
            .mount(&server)
            .await;

        let papers = client_for(&server).citing_papers("P1", 10).await.unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].id, "P2");
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_retries_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/references"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let papers = client_for(&server).cited_papers("P1", 10).await.unwrap();
        assert!(papers.is_empty());
        // Expectation of exactly two calls is verified when the server drops
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_error_from_get_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_json("paper", "/paper/P1", &[]).await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"paperId": "P1"})))
            .expect(1)
            .mount(&server)
            .await;

        let config = ScholarConfig {
            base_url: format!("{}/", server.uri()),
            api_key: Some("secret".into()),
            min_interval_ms: 0,
            rate_limit_backoff_ms: 10,
            timeout_secs: 5,
        };
        let client = SemanticScholarClient::new(&config).unwrap();
        assert!(client.resolve("P1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_search_reads_top_level_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/search"))
            .and(query_param("query", "protein structure"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 2,
                "data": [{"paperId": "S1", "title": "First"}, {"paperId": "S2", "title": "Second"}]
            })))
            .mount(&server)
            .await;

        let papers = client_for(&server).search("protein structure", 5).await.unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "First");
    }

    #[tokio::test]
    async fn test_every_operation_is_paced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"paperId": "P1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/citations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(citing_body(&["P2"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/references"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let config = ScholarConfig {
            base_url: server.uri(),
            api_key: None,
            min_interval_ms: 150,
            rate_limit_backoff_ms: 1000,
            timeout_secs: 5,
        };
        let client = SemanticScholarClient::new(&config).unwrap();
        let start = std::time::Instant::now();

        assert!(client.resolve("P1").await.unwrap().is_some());
        assert_eq!(client.citing_papers("P1", 10).await.unwrap().len(), 1);
        assert!(client.cited_papers("P1", 10).await.unwrap().is_empty());

        // First request goes out immediately, the next two wait one interval each
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_rate_limit_retry_waits_for_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/citations"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paper/P1/citations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(citing_body(&["P2"])))
            .mount(&server)
            .await;

        let config = ScholarConfig {
            base_url: server.uri(),
            api_key: None,
            min_interval_ms: 0,
            rate_limit_backoff_ms: 250,
            timeout_secs: 5,
        };
        let client = SemanticScholarClient::new(&config).unwrap();
        let start = std::time::Instant::now();

        let papers = client.citing_papers("P1", 10).await.unwrap();

        assert_eq!(papers.len(), 1);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn test_backoff_must_exceed_spacing() {
        let config = ScholarConfig {
            base_url: "http://localhost".into(),
            api_key: None,
            min_interval_ms: 500,
            rate_limit_backoff_ms: 500,
            timeout_secs: 5,
        };
        let result = SemanticScholarClient::new(&config);
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}
