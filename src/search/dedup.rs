//! Collapses near-duplicate file versions into one representative.
//!
//! The details collection indexes at file granularity, so versions, drafts
//! and backups of the same artifact cluster in nearby directories. Matching
//! is purely lexical: content-identical files with unrelated names are never
//! merged.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{DeepFileSearchResult, SearchResult};

/// The slice of a result the deduplicator (and balancer) needs.
pub trait FileHit {
    fn path(&self) -> &str;
    fn score(&self) -> f32;
}

impl FileHit for SearchResult {
    fn path(&self) -> &str {
        self.file_path.as_deref().unwrap_or("")
    }
    fn score(&self) -> f32 {
        self.similarity
    }
}

impl FileHit for DeepFileSearchResult {
    fn path(&self) -> &str {
        &self.path
    }
    fn score(&self) -> f32 {
        self.score
    }
}

/// Trailing tokens stripped when reducing a file name to its base name:
/// version markers, date-like suffixes, status words (English and Japanese),
/// and bare numbers, along with the separators that attach them.
static TRAILING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)[\s_\-()（）.]*(
            v\d+ | ver\.?\s*\d+
          | \d{4}[-_/年]\d{1,2}[-_/月]\d{1,2}日? | \d{8} | \d{6}
          | final | draft | revised | backup | copy | old
          | 最終版? | 完成版? | 確定版? | 修正版? | 改訂版? | 下書き | バックアップ | コピー | 旧
          | \d+
        )$",
    )
    .expect("trailing marker regex")
});

static FINAL_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)final|最終|完成|確定").expect("final marker regex"));

static REVISED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)revised|修正|改訂").expect("revised marker regex"));

static DEMOTED_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)backup|draft|copy|バックアップ|下書き|コピー|旧").expect("demoted marker regex")
});

static VERSION_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)v(?:er\.?\s*)?(\d+)").expect("version number regex"));

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"20\d{2}").expect("year regex"));

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn directory(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

/// File name reduced to the part shared by all versions of the artifact:
/// extension, version markers, date suffixes, status words and trailing
/// bare numbers removed, lowercased.
pub fn base_name(path: &str) -> String {
    let name = file_name(path);
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };

    let mut current = stem.to_string();
    loop {
        let stripped = TRAILING_MARKER.replace(&current, "").to_string();
        if stripped == current || stripped.is_empty() {
            break;
        }
        current = stripped;
    }
    current.to_lowercase()
}

/// Two directories are "nearby" when equal, or when one is a path prefix of
/// the other no more than two levels apart. Prefix comparison is on raw
/// strings, matching the long-standing grouping behavior.
fn is_nearby_directory(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if a.starts_with(b) || b.starts_with(a) {
        return depth(a).abs_diff(depth(b)) <= 2;
    }
    false
}

/// Heuristic preference score among versions of the same artifact. Higher
/// wins; ties fall back to similarity.
pub fn version_score(path: &str) -> i64 {
    let name = file_name(path);
    let mut score = 0i64;

    if FINAL_MARKER.is_match(name) {
        score += 100;
    }
    if REVISED_MARKER.is_match(name) {
        score += 50;
    }
    if let Some(caps) = VERSION_NUMBER.captures(name) {
        if let Ok(n) = caps[1].parse::<i64>() {
            score += 10 * n;
        }
    }
    if let Some(m) = YEAR_TOKEN.find(name) {
        if let Ok(year) = m.as_str().parse::<i64>() {
            score += year - 2000;
        }
    }
    if DEMOTED_MARKER.is_match(name) {
        score -= 50;
    }
    score -= 2 * depth(path) as i64;
    score
}

struct Group {
    base: String,
    dir: String,
    best_idx: usize,
    best_key: (i64, f32),
}

/// Collapse near-duplicate file versions, keeping the best-scored
/// representative per group, then re-sort survivors by similarity and
/// truncate to `limit`. Output is always no longer than the input.
///
/// Grouping is anchored to each group's founding directory, so a chain of
/// directories (`p`, `p/a`, `p/a/b/c`) can need more than one pass before
/// no two survivors are still nearby each other. The collapse is repeated
/// until it reaches a fixpoint, which makes the result idempotent.
pub fn dedup_by_version<T: FileHit>(hits: Vec<T>, limit: usize) -> Vec<T> {
    let mut survivors = hits;
    loop {
        let before = survivors.len();
        survivors = collapse_once(survivors);
        if survivors.len() == before {
            break;
        }
    }

    survivors.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    survivors.truncate(limit);
    survivors
}

/// One grouping pass: keep the best (version score, similarity) member of
/// each `(base name, nearby directory)` group.
fn collapse_once<T: FileHit>(hits: Vec<T>) -> Vec<T> {
    if hits.is_empty() {
        return hits;
    }

    let mut groups: Vec<Group> = Vec::new();
    for (idx, hit) in hits.iter().enumerate() {
        let path = hit.path();
        let base = base_name(path);
        let dir = directory(path).to_string();
        let key = (version_score(path), hit.score());

        match groups
            .iter_mut()
            .find(|g| g.base == base && is_nearby_directory(&g.dir, &dir))
        {
            Some(group) => {
                if key > group.best_key {
                    group.best_key = key;
                    group.best_idx = idx;
                }
            }
            None => groups.push(Group {
                base,
                dir,
                best_idx: idx,
                best_key: key,
            }),
        }
    }

    let mut keep = vec![false; hits.len()];
    for group in &groups {
        keep[group.best_idx] = true;
    }

    hits.into_iter()
        .enumerate()
        .filter_map(|(idx, hit)| keep[idx].then_some(hit))
        .collect()
}
