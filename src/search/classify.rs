//! Query classification: explicit identifier extraction, known-identifier
//! detection inside free text, discovery-vs-lookup routing, and image intent.
//!
//! Every heuristic is an ordered table of (pattern, label) pairs evaluated
//! first-match-wins, so the patterns stay data and the matching logic stays
//! generic.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

/// Snapshot of all research identifiers known to the index. Loaded once at
/// startup and swapped wholesale on reload; never mutated mid-request.
/// An empty snapshot is a valid fail-open state, not an error.
#[derive(Debug, Default)]
pub struct KnownIdentifiers {
    /// (original, lowercase) pairs, sorted by original for determinism.
    ids: Vec<(String, String)>,
}

impl KnownIdentifiers {
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        let mut pairs: Vec<(String, String)> = ids
            .into_iter()
            .filter(|id| !id.is_empty())
            .map(|id| {
                let lower = id.to_lowercase();
                (id, lower)
            })
            .collect();
        pairs.sort();
        pairs.dedup();
        Self { ids: pairs }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// An ordered (pattern, label) table evaluated first-match-wins.
struct PatternTable {
    entries: Vec<(Regex, &'static str)>,
}

impl PatternTable {
    fn new(entries: &[(&str, &'static str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(pattern, label)| {
                    (Regex::new(pattern).expect("classifier pattern"), *label)
                })
                .collect(),
        }
    }

    fn first_match(&self, text: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, label)| *label)
    }
}

/// Labeled identifier prefixes, most specific first. Each accepts a full- or
/// half-width colon and captures the identifier token after it.
static EXPLICIT_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)対象研究ID[:：]\s*([A-Za-z0-9][A-Za-z0-9_-]*)",
        r"(?i)研究ID[:：]\s*([A-Za-z0-9][A-Za-z0-9_-]*)",
        r"(?i)研究番号[:：]\s*([A-Za-z0-9][A-Za-z0-9_-]*)",
        r"(?i)target\s+research\s+id[:：]\s*([A-Za-z0-9][A-Za-z0-9_-]*)",
        r"(?i)research\s+id[:：]\s*([A-Za-z0-9][A-Za-z0-9_-]*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("explicit id pattern"))
    .collect()
});

/// Phrasings that ask about the existence or history of past projects
/// rather than the content of a specific one.
static DISCOVERY_PATTERNS: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::new(&[
        (r"過去の(研究|プロジェクト|案件)", "past-projects"),
        (r"これまでの(研究|プロジェクト)", "past-projects"),
        (r"どんな(研究|プロジェクト)", "past-projects"),
        (r"(研究|開発)実績", "achievements"),
        (r"(似た|類似の?)(研究|プロジェクト|テーマ)", "similar-research"),
        (r"研究ID.?一覧", "id-listing"),
        (r"(?i)past\s+(research|projects?)", "past-projects"),
        (r"(?i)previous\s+(research|projects?|work)", "past-projects"),
        (r"(?i)research\s+achievements?", "achievements"),
        (r"(?i)similar\s+(research|projects?|studies)", "similar-research"),
        (r"(?i)list\s+(of\s+)?research\s+ids?", "id-listing"),
    ])
});

/// Phrasings implying the caller wants figures or images back.
static IMAGE_INTENT_PATTERNS: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::new(&[
        (r"図|図表|画像|写真|グラフ|イメージ", "image"),
        (r"(?i)\b(image|figure|diagram|chart|graph|photo|picture)s?\b", "image"),
    ])
});

/// Where a query should be sent, decided before any index call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRoute {
    /// Project-level summary collection, unfiltered.
    Summary,
    /// File-level details collection, optionally filtered by identifier.
    Details { identifier: Option<String> },
}

/// Stateless query classifier over an immutable identifier snapshot.
pub struct Classifier {
    known: Arc<KnownIdentifiers>,
}

impl Classifier {
    pub fn new(known: Arc<KnownIdentifiers>) -> Self {
        Self { known }
    }

    /// First capture of the labeled-identifier patterns, if any.
    pub fn extract_explicit_identifier(query: &str) -> Option<String> {
        EXPLICIT_ID_PATTERNS
            .iter()
            .find_map(|re| re.captures(query))
            .map(|caps| caps[1].to_string())
    }

    /// Case-insensitive scan for a known identifier inside free text. A match
    /// must not sit inside a longer alphanumeric token: "AB12について" hits,
    /// "FAB12C" does not. Empty snapshot means no match, never an error.
    pub fn find_known_identifier(&self, query: &str) -> Option<String> {
        if self.known.is_empty() {
            return None;
        }
        let query_lower = query.to_lowercase();
        for (original, lower) in &self.known.ids {
            for (pos, matched) in query_lower.match_indices(lower.as_str()) {
                let before = query_lower[..pos].chars().next_back();
                let after = query_lower[pos + matched.len()..].chars().next();
                let bounded = |c: Option<char>| c.map_or(true, |c| !c.is_ascii_alphanumeric());
                if bounded(before) && bounded(after) {
                    return Some(original.clone());
                }
            }
        }
        None
    }

    /// True when the query asks about past projects rather than file content.
    pub fn is_discovery_query(query: &str) -> bool {
        DISCOVERY_PATTERNS.first_match(query).is_some()
    }

    /// True when the query implies the caller wants figures or images.
    pub fn detect_image_intent(query: &str) -> bool {
        IMAGE_INTENT_PATTERNS.first_match(query).is_some()
    }

    /// Routing policy. An explicit or detected identifier always wins and
    /// sends the query to details mode filtered by it, even when the phrasing
    /// also looks like discovery. Discovery goes to summary mode; everything
    /// else defaults to unfiltered details mode.
    pub fn route(&self, query: &str, explicit_filter: Option<&str>) -> SearchRoute {
        let identifier = explicit_filter
            .map(str::to_string)
            .or_else(|| Self::extract_explicit_identifier(query))
            .or_else(|| self.find_known_identifier(query));

        if let Some(id) = identifier {
            return SearchRoute::Details {
                identifier: Some(id),
            };
        }
        if Self::is_discovery_query(query) {
            return SearchRoute::Summary;
        }
        SearchRoute::Details { identifier: None }
    }
}
