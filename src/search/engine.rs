//! The search orchestrator: routes queries to the right collection, fuses
//! lexical and vector scoring through the index gateway, and shapes raw hits
//! into ranked, deduplicated, balanced results.
//!
//! Collaborator failures never propagate: an unconfigured or failing gateway
//! or embedding provider degrades the affected call to an empty result.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;

use crate::config::{Config, SearchConfig};
use crate::index::gateway::{GatewayHit, SimilarityGateway, TermFilter, UnifiedQuery};
use crate::llm::embeddings::EmbeddingProvider;
use crate::models::{
    ChatMessage, DeepFileSearchResult, FieldMapping, SearchResult, SourceType,
};
use crate::search::balance::balance_image_ratio;
use crate::search::categorize::categorize_file;
use crate::search::classify::{Classifier, KnownIdentifiers, SearchRoute};
use crate::search::dedup::dedup_by_version;
use crate::search::tags::rank_tags;

/// Year assumed when neither timestamps nor tags carry a date signal.
const DEFAULT_YEAR: &str = "2024";
/// Title length cap in chars before the ellipsis.
const MAX_TITLE_CHARS: usize = 50;
/// Excerpt length cap in chars.
const MAX_EXCERPT_CHARS: usize = 200;
/// Fallback title when a hit has neither abstract nor folder summary.
const UNTITLED: &str = "Untitled Research";
/// Cap on the identifier snapshot pulled at startup.
const MAX_KNOWN_IDENTIFIERS: usize = 10_000;
/// Supplementary keywords accepted by deep file search.
const MAX_DEEP_SEARCH_KEYWORDS: usize = 5;

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"20\d{2}").expect("year regex"));

/// Hybrid retrieval engine over the summary and details collections.
///
/// Stateless per request apart from the read-only [`KnownIdentifiers`]
/// snapshot, which is replaced wholesale by [`reload_known_identifiers`]
/// (intended for the host's startup hook) and never mutated mid-request.
///
/// [`reload_known_identifiers`]: SearchEngine::reload_known_identifiers
pub struct SearchEngine<G, E> {
    gateway: G,
    embedder: E,
    search: SearchConfig,
    summary_collection: String,
    details_collection: String,
    summary_fields: FieldMapping,
    details_fields: FieldMapping,
    known: RwLock<Arc<KnownIdentifiers>>,
}

impl<G: SimilarityGateway, E: EmbeddingProvider> SearchEngine<G, E> {
    pub fn new(gateway: G, embedder: E, config: &Config) -> Self {
        Self {
            gateway,
            embedder,
            search: config.search.clone(),
            summary_collection: config.gateway.summary_collection.clone(),
            details_collection: config.gateway.details_collection.clone(),
            summary_fields: FieldMapping::summary(),
            details_fields: FieldMapping::details(),
            known: RwLock::new(Arc::new(KnownIdentifiers::empty())),
        }
    }

    /// True only when both collaborators report configured.
    pub fn is_configured(&self) -> bool {
        self.gateway.is_configured() && self.embedder.is_configured()
    }

    /// Replace the known-identifier snapshot with the distinct identifier
    /// values currently in the details collection. On failure the previous
    /// snapshot stays in place and the error is returned for the host to log.
    pub async fn reload_known_identifiers(&self) -> anyhow::Result<usize> {
        let values = self
            .gateway
            .list_identifier_values(
                &self.details_collection,
                self.details_fields.identifier,
                MAX_KNOWN_IDENTIFIERS,
            )
            .await?;
        let snapshot = KnownIdentifiers::new(values);
        let count = snapshot.len();
        *self.known.write() = Arc::new(snapshot);
        tracing::info!("Loaded {count} known research identifiers");
        Ok(count)
    }

    /// Seed the identifier snapshot directly, bypassing the gateway.
    pub fn set_known_identifiers(&self, ids: impl IntoIterator<Item = String>) {
        *self.known.write() = Arc::new(KnownIdentifiers::new(ids));
    }

    fn classifier(&self) -> Classifier {
        Classifier::new(self.known.read().clone())
    }

    /// The single external entry point: classify the query, then dispatch to
    /// summary or details mode.
    pub async fn search(
        &self,
        query: &str,
        history: &[ChatMessage],
        identifier_filter: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<SearchResult> {
        match self.classifier().route(query, identifier_filter) {
            SearchRoute::Summary => {
                tracing::debug!("Routing to summary mode: {query}");
                self.search_projects(query, limit).await
            }
            SearchRoute::Details { identifier } => {
                tracing::debug!(?identifier, "Routing to details mode: {query}");
                self.search_details(query, history, identifier.as_deref(), limit)
                    .await
            }
        }
    }

    /// Discovery mode: one fused query against the summary collection.
    pub async fn search_projects(&self, query: &str, limit: Option<usize>) -> Vec<SearchResult> {
        let limit = limit.unwrap_or(self.search.default_limit);
        if !self.is_configured() {
            tracing::warn!("Project search skipped: collaborators not configured");
            return Vec::new();
        }

        let vector = self.embed_if_active(query).await;
        let unified = UnifiedQuery {
            collection: &self.summary_collection,
            query_text: query,
            query_vector: vector.as_deref(),
            weights: &self.search.weights,
            fields: &self.summary_fields,
            k: limit,
            filter: None,
        };

        let hits = match self.gateway.unified_search(&unified).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Summary search failed: {e:#}");
                return Vec::new();
            }
        };

        hits.iter().map(|h| self.map_summary_hit(h, query)).collect()
    }

    /// Lookup mode: over-fetched fused query against the details collection,
    /// then dedup and, on image intent, modality balancing.
    pub async fn search_details(
        &self,
        query: &str,
        history: &[ChatMessage],
        identifier: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<SearchResult> {
        let limit = limit.unwrap_or(self.search.default_limit);
        if !self.is_configured() {
            tracing::warn!("Details search skipped: collaborators not configured");
            return Vec::new();
        }

        let embed_input = embedding_input(query, history);
        let vector = self.embed_if_active(&embed_input).await;
        let fetch_k = limit * self.search.over_fetch_factor;
        let filter = identifier.map(|value| TermFilter {
            field: self.details_fields.identifier,
            value,
        });

        let unified = UnifiedQuery {
            collection: &self.details_collection,
            query_text: query,
            query_vector: vector.as_deref(),
            weights: &self.search.weights,
            fields: &self.details_fields,
            k: fetch_k,
            filter,
        };

        let hits = match self.gateway.unified_search(&unified).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Details search failed: {e:#}");
                return Vec::new();
            }
        };

        let results: Vec<SearchResult> =
            hits.iter().map(|h| self.map_details_hit(h, query)).collect();

        // The balancer needs the full deduplicated pool to pull the minority
        // modality up, so truncation to `limit` happens inside it.
        if Classifier::detect_image_intent(query) {
            let deduped = dedup_by_version(results, fetch_k);
            balance_image_ratio(deduped, limit)
        } else {
            dedup_by_version(results, limit)
        }
    }

    /// Drill-down retrieval: the query plus up to five supplementary
    /// keywords, mapped to categorized file results.
    pub async fn deep_file_search(
        &self,
        query: &str,
        identifier: Option<&str>,
        keywords: &[String],
        limit: Option<usize>,
    ) -> Vec<DeepFileSearchResult> {
        let limit = limit.unwrap_or(self.search.default_limit);
        if !self.is_configured() {
            tracing::warn!("Deep file search skipped: collaborators not configured");
            return Vec::new();
        }

        let mut combined = query.to_string();
        for keyword in keywords.iter().take(MAX_DEEP_SEARCH_KEYWORDS) {
            if !keyword.is_empty() {
                combined.push(' ');
                combined.push_str(keyword);
            }
        }

        let vector = self.embed_if_active(&combined).await;
        let fetch_k = limit * self.search.over_fetch_factor;
        let filter = identifier.map(|value| TermFilter {
            field: self.details_fields.identifier,
            value,
        });

        let unified = UnifiedQuery {
            collection: &self.details_collection,
            query_text: &combined,
            query_vector: vector.as_deref(),
            weights: &self.search.weights,
            fields: &self.details_fields,
            k: fetch_k,
            filter,
        };

        let hits = match self.gateway.unified_search(&unified).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Deep file search failed: {e:#}");
                return Vec::new();
            }
        };

        let results: Vec<DeepFileSearchResult> =
            hits.iter().map(|h| self.map_deep_hit(h, query)).collect();
        dedup_by_version(results, limit)
    }

    /// Embed the (costly) query vector only when at least one vector method
    /// carries weight. Embedding failure degrades to lexical-only scoring.
    async fn embed_if_active(&self, text: &str) -> Option<Vec<f32>> {
        if !self.search.weights.has_vector_method() {
            return None;
        }
        match self.embedder.embed(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                tracing::warn!("Embedding failed, falling back to text-only scoring: {e:#}");
                None
            }
        }
    }

    fn map_summary_hit(&self, hit: &GatewayHit, query: &str) -> SearchResult {
        let f = &self.summary_fields;
        let abstract_text = get_str(&hit.source, f.abstract_text);
        let tags = get_str_list(&hit.source, f.tags_text);

        let title = derive_title(&abstract_text)
            .or_else(|| non_empty(get_str(&hit.source, f.folder_summary)))
            .unwrap_or_else(|| UNTITLED.to_string());
        let year = year_from_tags(&tags).unwrap_or_else(|| DEFAULT_YEAR.to_string());

        SearchResult {
            title,
            tags: rank_tags(&tags, query, self.search.max_tags),
            similarity: hit.score.clamp(0.0, 1.0),
            year,
            project_id: get_str(&hit.source, f.identifier),
            abstract_excerpt: excerpt(&abstract_text),
            source_type: SourceType::Summary,
            file_path: None,
        }
    }

    fn map_details_hit(&self, hit: &GatewayHit, query: &str) -> SearchResult {
        let f = &self.details_fields;
        let abstract_text = get_str(&hit.source, f.abstract_text);
        let tags = get_str_list(&hit.source, f.tags_text);
        let file_name = f
            .file_name
            .map(|key| get_str(&hit.source, key))
            .unwrap_or_default();

        let title = non_empty(file_name)
            .or_else(|| derive_title(&abstract_text))
            .unwrap_or_else(|| UNTITLED.to_string());
        let year = f
            .timestamp
            .and_then(|key| year_from_timestamp(&get_str(&hit.source, key)))
            .or_else(|| year_from_tags(&tags))
            .unwrap_or_else(|| DEFAULT_YEAR.to_string());

        SearchResult {
            title,
            tags: rank_tags(&tags, query, self.search.max_tags),
            similarity: hit.score.clamp(0.0, 1.0),
            year,
            project_id: get_str(&hit.source, f.identifier),
            abstract_excerpt: excerpt(&abstract_text),
            source_type: SourceType::Details,
            file_path: f.file_path.map(|key| get_str(&hit.source, key)),
        }
    }

    fn map_deep_hit(&self, hit: &GatewayHit, query: &str) -> DeepFileSearchResult {
        let f = &self.details_fields;
        let path = f
            .file_path
            .map(|key| get_str(&hit.source, key))
            .unwrap_or_default();
        let file_name = f
            .file_name
            .map(|key| get_str(&hit.source, key))
            .unwrap_or_default();
        let tags = get_str_list(&hit.source, f.tags_text);

        DeepFileSearchResult {
            category: categorize_file(&path),
            relevant_content_excerpt: excerpt(&get_str(&hit.source, f.abstract_text)),
            score: hit.score.clamp(0.0, 1.0),
            keywords: rank_tags(&tags, query, self.search.max_tags),
            project_id: get_str(&hit.source, f.identifier),
            file_name,
            path,
        }
    }
}

/// Query text enriched with the most recent user turns (up to two) for the
/// embedding call only; the lexical query is never touched.
fn embedding_input(query: &str, history: &[ChatMessage]) -> String {
    let recent: Vec<&str> = history
        .iter()
        .rev()
        .filter(|m| m.role == "user" && !m.content.is_empty())
        .take(2)
        .map(|m| m.content.as_str())
        .collect();
    if recent.is_empty() {
        return query.to_string();
    }
    let mut input = query.to_string();
    for turn in recent {
        input.push('\n');
        input.push_str(turn);
    }
    input
}

// ─── Hit-field helpers ───────────────────────────────────
//
// Gateway payloads are dynamic maps; missing or malformed fields default to
// empty values rather than rejecting the whole result set.

fn get_str(source: &serde_json::Map<String, Value>, key: &str) -> String {
    match source.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn get_str_list(source: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    match source.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Everything before the first sentence boundary. A `.` only counts as a
/// boundary when no digit follows, so decimals like "3.5 GHz" stay intact.
fn first_sentence(text: &str) -> &str {
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '。' | '\n' => return &text[..idx],
            '.' => {
                let followed_by_digit =
                    matches!(chars.peek(), Some((_, next)) if next.is_ascii_digit());
                if !followed_by_digit {
                    return &text[..idx];
                }
            }
            _ => {}
        }
    }
    text
}

/// First sentence of the abstract, capped to 50 chars with an ellipsis.
fn derive_title(abstract_text: &str) -> Option<String> {
    let trimmed = abstract_text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let sentence = first_sentence(trimmed).trim();
    if sentence.is_empty() {
        return None;
    }
    if sentence.chars().count() > MAX_TITLE_CHARS {
        let capped: String = sentence.chars().take(MAX_TITLE_CHARS).collect();
        Some(format!("{capped}…"))
    } else {
        Some(sentence.to_string())
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let capped: String = trimmed.chars().take(MAX_EXCERPT_CHARS).collect();
    format!("{capped}…")
}

/// First `20xx` token found scanning the tags in order.
fn year_from_tags(tags: &[String]) -> Option<String> {
    tags.iter()
        .find_map(|tag| YEAR_TOKEN.find(tag))
        .map(|m| m.as_str().to_string())
}

/// Year of a timestamp-like field: RFC 3339 first, then a loose scan.
fn year_from_timestamp(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return None;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value.trim()) {
        use chrono::Datelike;
        return Some(dt.year().to_string());
    }
    YEAR_TOKEN.find(value).map(|m| m.as_str().to_string())
}
