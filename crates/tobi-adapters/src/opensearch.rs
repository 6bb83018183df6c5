//! OpenSearch-compatible alert store

use crate::{AdapterConfig, AdapterError, AdapterResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tobi_core::adapter::AlertStore;
use tobi_core::bundle::EvidenceDoc;
use tobi_core::error::TriageError;
use tobi_core::model::Alert;

/// Alert-index client. Stored documents carry the raw alert plus the
/// engine-written `vector` and `analysis` fields.
pub struct OpenSearchStore {
    config: AdapterConfig,
    client: Client,
    index: String,
}

impl OpenSearchStore {
    pub fn new(config: AdapterConfig, index: &str) -> Self {
        Self {
            client: Client::new(),
            config,
            index: index.to_string(),
        }
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> AdapterResult<Value> {
        let url = format!("{}{}", self.config.endpoint, path);
        let mut request = self.client.request(method, &url).json(&body);

        for (key, value) in self.config.auth_headers() {
            request = request.header(&key, &value);
        }

        let response = request
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::Api {
                status,
                message: text,
            });
        }

        Ok(response.json().await?)
    }

    async fn search(&self, body: Value) -> AdapterResult<Vec<SearchHit>> {
        let path = format!("/{}/_search", self.index);
        let raw = self.send(reqwest::Method::POST, &path, body).await?;
        let parsed: SearchResponse = serde_json::from_value(raw)?;
        Ok(parsed.hits.hits)
    }
}

fn store_error(err: AdapterError) -> TriageError {
    if err.is_transient() {
        TriageError::Transient(err.to_string())
    } else {
        TriageError::Store(err.to_string())
    }
}

fn to_evidence(hit: SearchHit) -> EvidenceDoc {
    EvidenceDoc::new(hit.id, hit.score, hit.source)
}

#[async_trait]
impl AlertStore for OpenSearchStore {
    async fn search_vector_similar(
        &self,
        vector: &[f32],
        k: usize,
        analyzed_only: bool,
    ) -> Result<Vec<EvidenceDoc>, TriageError> {
        let knn = json!({
            "knn": {
                "vector": {
                    "vector": vector,
                    "k": k
                }
            }
        });
        let query = if analyzed_only {
            json!({
                "bool": {
                    "must": [knn],
                    "filter": [{"exists": {"field": "analysis"}}]
                }
            })
        } else {
            knn
        };

        let hits = self
            .search(json!({"size": k, "query": query}))
            .await
            .map_err(store_error)?;
        Ok(hits.into_iter().map(to_evidence).collect())
    }

    async fn search_keyword_time_range(
        &self,
        keywords: &[String],
        host: Option<&str>,
        window_minutes: i64,
        center: DateTime<Utc>,
    ) -> Result<Vec<EvidenceDoc>, TriageError> {
        let window = Duration::minutes(window_minutes);
        let mut must = vec![json!({
            "match": {
                "rule.description": {
                    "query": keywords.join(" "),
                    "operator": "or"
                }
            }
        })];
        if let Some(host) = host {
            must.push(json!({"term": {"agent.id": host}}));
        }

        let body = json!({
            "size": 50,
            "query": {
                "bool": {
                    "must": must,
                    "filter": [{
                        "range": {
                            "timestamp": {
                                "gte": (center - window).to_rfc3339(),
                                "lte": (center + window).to_rfc3339()
                            }
                        }
                    }]
                }
            },
            "sort": [{"timestamp": {"order": "desc"}}]
        });

        let hits = self.search(body).await.map_err(store_error)?;
        Ok(hits.into_iter().map(to_evidence).collect())
    }

    async fn query_unanalyzed(&self, limit: usize) -> Result<Vec<Alert>, TriageError> {
        let body = json!({
            "size": limit,
            "query": {
                "bool": {
                    "must_not": [{"exists": {"field": "analysis"}}]
                }
            },
            "sort": [{"timestamp": {"order": "asc"}}]
        });

        let hits = self.search(body).await.map_err(store_error)?;
        let mut alerts = Vec::with_capacity(hits.len());
        for hit in hits {
            match serde_json::from_value::<Alert>(hit.source) {
                Ok(mut alert) => {
                    alert.id = hit.id;
                    alert.index = hit.index.unwrap_or_else(|| self.index.clone());
                    alerts.push(alert);
                }
                Err(e) => {
                    tracing::warn!(doc_id = %hit.id, error = %e, "skipping malformed alert document");
                }
            }
        }
        Ok(alerts)
    }

    async fn update_document(
        &self,
        index: &str,
        id: &str,
        patch: Value,
    ) -> Result<(), TriageError> {
        let path = format!("/{}/_update/{}", index, id);
        self.send(reqwest::Method::POST, &path, json!({"doc": patch}))
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_index")]
    index: Option<String>,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_config() {
        let config = AdapterConfig::new("https://opensearch.example.com:9200")
            .with_credentials("admin", "admin");
        let store = OpenSearchStore::new(config, "wazuh-alerts-*");
        assert_eq!(store.index, "wazuh-alerts-*");
    }

    #[tokio::test]
    async fn vector_search_parses_hits() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/alerts/_search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "hits": {"hits": [
                        {"_id": "a1", "_index": "alerts", "_score": 0.91,
                         "_source": {"rule": {"description": "ssh failure"}}},
                        {"_id": "a2", "_index": "alerts", "_score": 0.85, "_source": {}}
                    ]}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = OpenSearchStore::new(AdapterConfig::new(&server.url()), "alerts");
        let docs = store
            .search_vector_similar(&[0.1, 0.2], 5, false)
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "a1");
        assert_eq!(docs[0].score, Some(0.91));
    }

    #[tokio::test]
    async fn unanalyzed_scan_assigns_hit_metadata() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/alerts/_search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "hits": {"hits": [{
                        "_id": "doc-7",
                        "_index": "alerts-2026.08",
                        "_source": {
                            "timestamp": "2026-08-30T10:00:00Z",
                            "rule": {"id": "100", "description": "test", "level": 5}
                        }
                    }]}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = OpenSearchStore::new(AdapterConfig::new(&server.url()), "alerts");
        let alerts = store.query_unanalyzed(25).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "doc-7");
        assert_eq!(alerts[0].index, "alerts-2026.08");
    }

    #[tokio::test]
    async fn api_failure_maps_to_store_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/alerts/_search")
            .with_status(400)
            .with_body("parsing_exception")
            .create_async()
            .await;

        let store = OpenSearchStore::new(AdapterConfig::new(&server.url()), "alerts");
        let err = store.query_unanalyzed(10).await.unwrap_err();
        assert!(matches!(err, TriageError::Store(_)));
    }

    #[tokio::test]
    async fn update_posts_partial_doc() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/alerts/_update/a1")
            .match_body(mockito::Matcher::PartialJson(json!({
                "doc": {"analysis": {"risk_level": "high"}}
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let store = OpenSearchStore::new(AdapterConfig::new(&server.url()), "alerts");
        store
            .update_document("alerts", "a1", json!({"analysis": {"risk_level": "high"}}))
            .await
            .unwrap();
        m.assert_async().await;
    }
}
