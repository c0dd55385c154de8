use serde::{Deserialize, Serialize};

/// Which logical collection a result came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Summary,
    Details,
}

/// A single ranked search result. Built fresh per query; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub tags: Vec<String>,
    /// Fused relevance score, clamped to [0, 1].
    pub similarity: f32,
    /// Four-digit year as a string, e.g. "2023".
    pub year: String,
    /// Research project identifier. May be empty when the hit carries none.
    pub project_id: String,
    pub abstract_excerpt: String,
    pub source_type: SourceType,
    /// Set for details-collection hits only.
    pub file_path: Option<String>,
}

/// File-type category assigned by deep file search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Data,
    Figure,
    Code,
    Reference,
    Folder,
}

/// A drill-down result from deep file search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepFileSearchResult {
    pub path: String,
    pub relevant_content_excerpt: String,
    pub category: FileCategory,
    pub score: f32,
    pub keywords: Vec<String>,
    pub project_id: String,
    pub file_name: String,
}

/// One turn of conversation history supplied alongside a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// Relative weights for the fused scoring methods, each in 0..=100.
/// A weight of zero disables the method entirely; vector methods with
/// nonzero weight are what make the per-query embedding call worthwhile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchWeights {
    pub text: u32,
    pub abstract_vector: u32,
    pub tags_vector: u32,
    pub proper_noun_vector: u32,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            text: 30,
            abstract_vector: 40,
            tags_vector: 20,
            proper_noun_vector: 10,
        }
    }
}

impl SearchWeights {
    /// True if at least one vector-based method is active, i.e. the
    /// embedding call is needed at all.
    pub fn has_vector_method(&self) -> bool {
        self.abstract_vector > 0 || self.tags_vector > 0 || self.proper_noun_vector > 0
    }

    /// True if any method at all is active.
    pub fn has_active_method(&self) -> bool {
        self.text > 0 || self.has_vector_method()
    }
}

/// Translates the engine's abstract facets into the concrete field names of
/// one collection. The summary and details collections name the same facets
/// differently, so each gets its own table; nothing outside this table may
/// hardcode a collection field name.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub abstract_text: &'static str,
    pub abstract_vector: &'static str,
    pub tags_text: &'static str,
    pub tags_vector: &'static str,
    pub proper_noun_text: &'static str,
    pub proper_noun_vector: &'static str,
    pub identifier: &'static str,
    /// Human-readable fallback summary for folder-level entries.
    pub folder_summary: &'static str,
    /// File name field; absent in the summary collection.
    pub file_name: Option<&'static str>,
    /// Full file path field; absent in the summary collection.
    pub file_path: Option<&'static str>,
    /// Last-modified timestamp field; absent in the summary collection.
    pub timestamp: Option<&'static str>,
}

impl FieldMapping {
    /// Field names of the project-level summary collection.
    pub fn summary() -> Self {
        Self {
            abstract_text: "abstract",
            abstract_vector: "abstract_embedding",
            tags_text: "tags",
            tags_vector: "tags_embedding",
            proper_noun_text: "proper_nouns",
            proper_noun_vector: "proper_noun_embedding",
            identifier: "research_id",
            folder_summary: "folder_summary",
            file_name: None,
            file_path: None,
            timestamp: None,
        }
    }

    /// Field names of the file-level details collection.
    pub fn details() -> Self {
        Self {
            abstract_text: "content_summary",
            abstract_vector: "content_embedding",
            tags_text: "keywords",
            tags_vector: "keyword_embedding",
            proper_noun_text: "named_entities",
            proper_noun_vector: "named_entity_embedding",
            identifier: "research_id",
            folder_summary: "folder_summary",
            file_name: Some("file_name"),
            file_path: Some("file_path"),
            timestamp: Some("updated_at"),
        }
    }
}
