//! Integration tests for the retrieval engine.
//!
//! These drive the orchestrator through in-memory gateway and embedding
//! fakes, exercising routing, mapping, dedup, balancing, and degradation
//! without any running backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use research_search::config::Config;
use research_search::index::gateway::{GatewayHit, SimilarityGateway, UnifiedQuery};
use research_search::llm::embeddings::EmbeddingProvider;
use research_search::models::{FileCategory, SourceType};
use research_search::search::engine::SearchEngine;

#[derive(Debug, Clone)]
struct RecordedQuery {
    collection: String,
    query_text: String,
    k: usize,
    had_vector: bool,
    filter: Option<(String, String)>,
}

/// Gateway fake: returns canned hits and records every query it sees.
#[derive(Clone)]
struct MockGateway {
    configured: bool,
    hits: Arc<Vec<GatewayHit>>,
    identifier_values: Vec<String>,
    recorded: Arc<Mutex<Vec<RecordedQuery>>>,
}

impl MockGateway {
    fn new(hits: Vec<GatewayHit>) -> Self {
        Self {
            configured: true,
            hits: Arc::new(hits),
            identifier_values: Vec::new(),
            recorded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn unconfigured() -> Self {
        let mut gateway = Self::new(Vec::new());
        gateway.configured = false;
        gateway
    }

    fn last_query(&self) -> RecordedQuery {
        self.recorded.lock().last().cloned().expect("no query recorded")
    }
}

impl SimilarityGateway for MockGateway {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn unified_search(&self, query: &UnifiedQuery<'_>) -> anyhow::Result<Vec<GatewayHit>> {
        self.recorded.lock().push(RecordedQuery {
            collection: query.collection.to_string(),
            query_text: query.query_text.to_string(),
            k: query.k,
            had_vector: query.query_vector.is_some(),
            filter: query
                .filter
                .map(|f| (f.field.to_string(), f.value.to_string())),
        });
        Ok(self.hits.as_ref().clone())
    }

    async fn list_identifier_values(
        &self,
        _collection: &str,
        _field: &str,
        _max: usize,
    ) -> anyhow::Result<Vec<String>> {
        Ok(self.identifier_values.clone())
    }
}

/// Embedding fake: fixed 1024-dim vector, optional failure, call counting.
#[derive(Clone)]
struct MockEmbedder {
    configured: bool,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    fn new() -> Self {
        Self {
            configured: true,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing() -> Self {
        let mut embedder = Self::new();
        embedder.fail = true;
        embedder
    }
}

impl EmbeddingProvider for MockEmbedder {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("embedding service unavailable");
        }
        Ok(vec![0.1; 1024])
    }
}

fn engine(
    gateway: MockGateway,
    embedder: MockEmbedder,
) -> SearchEngine<MockGateway, MockEmbedder> {
    SearchEngine::new(gateway, embedder, &Config::default())
}

fn summary_hit(score: f32, research_id: &str, abstract_text: &str, tags: &[&str]) -> GatewayHit {
    let source = json!({
        "research_id": research_id,
        "abstract": abstract_text,
        "tags": tags,
    });
    GatewayHit {
        score,
        source: source.as_object().unwrap().clone(),
    }
}

fn details_hit(score: f32, research_id: &str, file_path: &str) -> GatewayHit {
    let file_name = file_path.rsplit('/').next().unwrap_or(file_path);
    let source = json!({
        "research_id": research_id,
        "file_path": file_path,
        "file_name": file_name,
        "content_summary": "実験条件と結果のまとめ。",
        "keywords": ["熱処理", "2022"],
        "updated_at": "2022-06-01T09:30:00+09:00",
    });
    GatewayHit {
        score,
        source: source.as_object().unwrap().clone(),
    }
}

// ─── Degradation ─────────────────────────────────────────

#[tokio::test]
async fn test_unconfigured_gateway_returns_empty_without_error() {
    let gateway = MockGateway::unconfigured();
    let engine = engine(gateway, MockEmbedder::new());

    assert!(!engine.is_configured());
    let results = engine.search("過去の研究を教えて", &[], None, None).await;
    assert!(results.is_empty());
    let results = engine.deep_file_search("熱処理", None, &[], None).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_embedding_failure_degrades_to_text_only() {
    let gateway = MockGateway::new(vec![details_hit(0.9, "AB12", "proj/notes.txt")]);
    let engine = engine(gateway.clone(), MockEmbedder::failing());

    let results = engine.search("熱処理の実験条件", &[], None, None).await;
    assert_eq!(results.len(), 1);
    assert!(!gateway.last_query().had_vector);
}

// ─── Routing ─────────────────────────────────────────────

#[tokio::test]
async fn test_explicit_filter_beats_discovery_classification() {
    let gateway = MockGateway::new(vec![details_hit(0.8, "XYZ9", "proj/report.pdf")]);
    let engine = engine(gateway.clone(), MockEmbedder::new());

    let results = engine.search("過去の研究を教えて", &[], Some("XYZ9"), None).await;
    assert!(!results.is_empty());

    let query = gateway.last_query();
    assert_eq!(query.collection, "research_details");
    assert_eq!(
        query.filter,
        Some(("research_id".to_string(), "XYZ9".to_string()))
    );
}

#[tokio::test]
async fn test_discovery_query_routes_to_summary() {
    let gateway = MockGateway::new(vec![summary_hit(
        0.9,
        "CD34",
        "電池材料の長期劣化を評価した。三年間の追跡データを含む。",
        &["2023", "材料科学"],
    )]);
    let engine = engine(gateway.clone(), MockEmbedder::new());

    let results = engine.search("過去の研究を教えて", &[], None, None).await;

    let query = gateway.last_query();
    assert_eq!(query.collection, "research_summaries");
    assert_eq!(query.filter, None);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source_type, SourceType::Summary);
    assert_eq!(results[0].title, "電池材料の長期劣化を評価した");
    assert_eq!(results[0].year, "2023");
    assert_eq!(results[0].project_id, "CD34");
    assert_eq!(results[0].file_path, None);
}

#[tokio::test]
async fn test_detected_identifier_routes_to_filtered_details() {
    let gateway = MockGateway::new(vec![details_hit(0.9, "AB12", "proj/data.csv")]);
    let engine = engine(gateway.clone(), MockEmbedder::new());
    engine.set_known_identifiers(["AB12".to_string()]);

    engine.search("AB12に似た研究はありますか", &[], None, None).await;

    let query = gateway.last_query();
    assert_eq!(query.collection, "research_details");
    assert_eq!(
        query.filter,
        Some(("research_id".to_string(), "AB12".to_string()))
    );
}

#[tokio::test]
async fn test_default_query_routes_to_unfiltered_details() {
    let gateway = MockGateway::new(vec![details_hit(0.9, "AB12", "proj/notes.txt")]);
    let engine = engine(gateway.clone(), MockEmbedder::new());

    let results = engine.search("熱処理の実験条件", &[], None, None).await;

    let query = gateway.last_query();
    assert_eq!(query.collection, "research_details");
    assert_eq!(query.filter, None);
    // Details mode over-fetches 3x the default limit of 10
    assert_eq!(query.k, 30);
    assert_eq!(results[0].source_type, SourceType::Details);
    assert_eq!(results[0].year, "2022");
    assert_eq!(results[0].file_path.as_deref(), Some("proj/notes.txt"));
}

#[tokio::test]
async fn test_reload_known_identifiers_from_gateway() {
    let mut gateway = MockGateway::new(vec![details_hit(0.9, "AB12", "proj/a.txt")]);
    gateway.identifier_values = vec!["AB12".to_string(), "XY99".to_string()];
    let engine = engine(gateway.clone(), MockEmbedder::new());

    let count = engine.reload_known_identifiers().await.unwrap();
    assert_eq!(count, 2);

    engine.search("XY99の測定データ", &[], None, None).await;
    let query = gateway.last_query();
    assert_eq!(
        query.filter,
        Some(("research_id".to_string(), "XY99".to_string()))
    );
}

// ─── Details pipeline ────────────────────────────────────

#[tokio::test]
async fn test_version_duplicates_collapse_to_final() {
    let gateway = MockGateway::new(vec![
        details_hit(0.9, "AB12", "proj/report_v1.pdf"),
        details_hit(0.8, "AB12", "proj/report_final.pdf"),
        details_hit(0.7, "AB12", "proj/unrelated_notes.txt"),
    ]);
    let engine = engine(gateway, MockEmbedder::new());

    let results = engine.search("実験報告", &[], None, None).await;
    let paths: Vec<&str> = results
        .iter()
        .filter_map(|r| r.file_path.as_deref())
        .collect();
    assert_eq!(results.len(), 2);
    assert!(paths.contains(&"proj/report_final.pdf"));
    assert!(paths.contains(&"proj/unrelated_notes.txt"));
    assert!(!paths.contains(&"proj/report_v1.pdf"));
}

#[tokio::test]
async fn test_image_intent_balances_modalities() {
    let mut hits = Vec::new();
    for i in 0..8 {
        hits.push(details_hit(0.9 - i as f32 * 0.01, "AB12", &format!("p{i}/sem_{i}.png")));
    }
    for i in 0..8 {
        hits.push(details_hit(0.5 - i as f32 * 0.01, "AB12", &format!("q{i}/cond_{i}.txt")));
    }
    let gateway = MockGateway::new(hits);
    let engine = engine(gateway, MockEmbedder::new());

    let results = engine.search("実験の画像を見せて", &[], None, Some(10)).await;
    assert_eq!(results.len(), 10);
    let images = results
        .iter()
        .filter(|r| {
            r.file_path
                .as_deref()
                .is_some_and(|p| p.to_lowercase().ends_with(".png"))
        })
        .count();
    assert_eq!(images, 5);
}

#[tokio::test]
async fn test_similarity_clamped_and_tags_ranked() {
    let gateway = MockGateway::new(vec![summary_hit(
        1.7,
        "EF56",
        "熱電材料の性能評価。",
        &["電子顕微鏡", "熱電材料", "2020"],
    )]);
    let engine = engine(gateway, MockEmbedder::new());

    let results = engine.search_projects("熱電材料の性能", None).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].similarity <= 1.0);
    // The query-relevant tag moves to the front
    assert_eq!(results[0].tags[0], "熱電材料");
}

#[tokio::test]
async fn test_missing_fields_default_rather_than_reject() {
    let source = json!({ "research_id": "GH78" });
    let hit = GatewayHit {
        score: 0.4,
        source: source.as_object().unwrap().clone(),
    };
    let gateway = MockGateway::new(vec![hit]);
    let engine = engine(gateway, MockEmbedder::new());

    let results = engine.search("何でもよい質問", &[], None, None).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Untitled Research");
    assert_eq!(results[0].year, "2024");
    assert!(results[0].tags.is_empty());
    assert_eq!(results[0].abstract_excerpt, "");
}

// ─── Deep file search ────────────────────────────────────

#[tokio::test]
async fn test_deep_file_search_concatenates_capped_keywords() {
    let gateway = MockGateway::new(vec![details_hit(0.9, "AB12", "proj/src/analysis.py")]);
    let engine = engine(gateway.clone(), MockEmbedder::new());

    let keywords: Vec<String> = (0..7).map(|i| format!("kw{i}")).collect();
    let results = engine
        .deep_file_search("劣化解析", Some("AB12"), &keywords, None)
        .await;

    let query = gateway.last_query();
    assert!(query.query_text.contains("kw0"));
    assert!(query.query_text.contains("kw4"));
    // Only five supplementary keywords are folded in
    assert!(!query.query_text.contains("kw5"));
    assert_eq!(
        query.filter,
        Some(("research_id".to_string(), "AB12".to_string()))
    );

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].category, FileCategory::Code);
    assert_eq!(results[0].file_name, "analysis.py");
    assert_eq!(results[0].project_id, "AB12");
}

#[tokio::test]
async fn test_deep_file_search_categorizes_by_extension_and_path() {
    let gateway = MockGateway::new(vec![
        details_hit(0.9, "AB12", "proj/measurements.csv"),
        details_hit(0.8, "AB12", "proj/sem_image.png"),
        details_hit(0.7, "AB12", "proj/文献/survey.pdf"),
        details_hit(0.6, "AB12", "proj/misc/overview"),
    ]);
    let engine = engine(gateway, MockEmbedder::new());

    let results = engine.deep_file_search("materials", None, &[], None).await;
    let categories: Vec<FileCategory> = results.iter().map(|r| r.category).collect();
    assert_eq!(
        categories,
        vec![
            FileCategory::Data,
            FileCategory::Figure,
            FileCategory::Reference,
            FileCategory::Folder,
        ]
    );
}

// ─── Weight gating ───────────────────────────────────────

#[tokio::test]
async fn test_zero_vector_weights_skip_embedding_call() {
    let gateway = MockGateway::new(vec![details_hit(0.9, "AB12", "proj/a.txt")]);
    let embedder = MockEmbedder::new();
    let calls = embedder.calls.clone();

    let mut config = Config::default();
    config.search.weights.abstract_vector = 0;
    config.search.weights.tags_vector = 0;
    config.search.weights.proper_noun_vector = 0;
    let engine = SearchEngine::new(gateway.clone(), embedder, &config);

    let results = engine.search("熱処理の実験条件", &[], None, None).await;
    assert!(!results.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!gateway.last_query().had_vector);
}
