use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::models::{FieldMapping, SearchWeights};

/// A fused lexical+vector query against one collection.
#[derive(Debug, Clone)]
pub struct UnifiedQuery<'a> {
    pub collection: &'a str,
    pub query_text: &'a str,
    /// Query embedding, present only when at least one vector method is active.
    pub query_vector: Option<&'a [f32]>,
    pub weights: &'a SearchWeights,
    pub fields: &'a FieldMapping,
    pub k: usize,
    /// Optional exact-match filter, e.g. on the research identifier field.
    pub filter: Option<TermFilter<'a>>,
}

#[derive(Debug, Clone, Copy)]
pub struct TermFilter<'a> {
    pub field: &'a str,
    pub value: &'a str,
}

/// One hit returned by the gateway. `source` keys follow the collection's
/// field mapping; callers convert it into a typed result immediately.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayHit {
    pub score: f32,
    #[serde(default)]
    pub source: serde_json::Map<String, Value>,
}

/// The seam between the engine and the index backend. The engine only ever
/// talks to this trait, so tests can drive it with in-memory fakes.
#[allow(async_fn_in_trait)]
pub trait SimilarityGateway {
    /// True when the backend is reachable in principle (configured).
    fn is_configured(&self) -> bool;

    /// Run one fused query and return scored hits, best first.
    async fn unified_search(&self, query: &UnifiedQuery<'_>) -> Result<Vec<GatewayHit>>;

    /// Distinct values of `field` across `collection`, up to `max`.
    /// Used once at startup to snapshot the known research identifiers.
    async fn list_identifier_values(
        &self,
        collection: &str,
        field: &str,
        max: usize,
    ) -> Result<Vec<String>>;
}

/// HTTP implementation speaking the gateway's JSON search API.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

#[derive(Serialize)]
struct WeightEntry<'a> {
    field: &'a str,
    weight: u32,
    kind: &'a str,
}

#[derive(Serialize)]
struct UnifiedSearchRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector: Option<&'a [f32]>,
    weights: Vec<WeightEntry<'a>>,
    k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<TermFilterBody<'a>>,
}

#[derive(Serialize)]
struct TermFilterBody<'a> {
    field: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct UnifiedSearchResponse {
    #[serde(default)]
    hits: Vec<GatewayHit>,
}

#[derive(Serialize)]
struct DistinctValuesRequest<'a> {
    field: &'a str,
    max: usize,
}

#[derive(Deserialize)]
struct DistinctValuesResponse {
    #[serde(default)]
    values: Vec<String>,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Translate the abstract weight table into per-field wire entries.
    /// Only active methods (nonzero weight) are sent; vector entries are
    /// dropped when no query vector accompanies the request.
    fn weight_entries<'a>(query: &'a UnifiedQuery<'_>) -> Vec<WeightEntry<'a>> {
        let w = query.weights;
        let f = query.fields;
        let mut entries = Vec::new();
        if w.text > 0 {
            entries.push(WeightEntry {
                field: f.abstract_text,
                weight: w.text,
                kind: "text",
            });
        }
        if query.query_vector.is_some() {
            if w.abstract_vector > 0 {
                entries.push(WeightEntry {
                    field: f.abstract_vector,
                    weight: w.abstract_vector,
                    kind: "knn",
                });
            }
            if w.tags_vector > 0 {
                entries.push(WeightEntry {
                    field: f.tags_vector,
                    weight: w.tags_vector,
                    kind: "knn",
                });
            }
            if w.proper_noun_vector > 0 {
                entries.push(WeightEntry {
                    field: f.proper_noun_vector,
                    weight: w.proper_noun_vector,
                    kind: "knn",
                });
            }
        }
        entries
    }
}

impl SimilarityGateway for HttpGateway {
    fn is_configured(&self) -> bool {
        self.config.base_url.is_some()
    }

    async fn unified_search(&self, query: &UnifiedQuery<'_>) -> Result<Vec<GatewayHit>> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .context("Gateway base_url not configured")?;
        let url = format!(
            "{}/api/collections/{}/unified_search",
            base_url.trim_end_matches('/'),
            query.collection
        );

        let req = UnifiedSearchRequest {
            query: query.query_text,
            vector: query.query_vector,
            weights: Self::weight_entries(query),
            k: query.k,
            filter: query.filter.map(|f| TermFilterBody {
                field: f.field,
                value: f.value,
            }),
        };

        let resp = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Failed to call index gateway")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Index gateway returned {status}: {body}");
        }

        let body: UnifiedSearchResponse = resp
            .json()
            .await
            .context("Failed to parse gateway search response")?;

        Ok(body.hits)
    }

    async fn list_identifier_values(
        &self,
        collection: &str,
        field: &str,
        max: usize,
    ) -> Result<Vec<String>> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .context("Gateway base_url not configured")?;
        let url = format!(
            "{}/api/collections/{collection}/distinct_values",
            base_url.trim_end_matches('/')
        );

        let resp = self
            .client
            .post(&url)
            .json(&DistinctValuesRequest { field, max })
            .send()
            .await
            .context("Failed to list identifier values")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Index gateway returned {status}: {body}");
        }

        let body: DistinctValuesResponse = resp
            .json()
            .await
            .context("Failed to parse distinct values response")?;

        Ok(body.values)
    }
}
