//! Query-relevance reordering of per-result tags.

/// Reorder `tags` so that query-relevant tags come first, then truncate to
/// `max_tags`. A tag counts as matched when it contains the query, the query
/// contains it, or any whitespace token of either is contained in the other
/// (all case-insensitive). Relative order within the matched and unmatched
/// groups is preserved, so the output is deterministic.
pub fn rank_tags(tags: &[String], query: &str, max_tags: usize) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let query_tokens: Vec<&str> = query_lower.split_whitespace().collect();

    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    for tag in tags {
        if is_match(&tag.to_lowercase(), &query_lower, &query_tokens) {
            matched.push(tag.clone());
        } else {
            unmatched.push(tag.clone());
        }
    }

    matched.extend(unmatched);
    matched.truncate(max_tags);
    matched
}

fn is_match(tag_lower: &str, query_lower: &str, query_tokens: &[&str]) -> bool {
    if tag_lower.is_empty() {
        return false;
    }
    if query_lower.contains(tag_lower) || tag_lower.contains(query_lower) {
        return true;
    }
    if query_tokens
        .iter()
        .any(|t| !t.is_empty() && tag_lower.contains(t))
    {
        return true;
    }
    tag_lower
        .split_whitespace()
        .any(|t| query_lower.contains(t))
}
