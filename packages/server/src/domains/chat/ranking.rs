//! Keyword-scored local search over the `laws` table.
//!
//! Candidates come from an OR-chained ILIKE query; scoring and the final cut
//! happen here so they do not depend on the database.

use anyhow::Result;

use crate::domains::laws::models::{ilike_pattern, Law};
use crate::kernel::{BaseLawStore, HistoryTurn};

use super::classifier::QueryAnalysis;

pub const MAX_KEYWORDS: usize = 12;
pub const CANDIDATE_LIMIT: i64 = 10;
pub const MIN_SCORE: i32 = 3;
pub const MAX_RESULTS: usize = 5;
/// Keywords found in this many leading characters of the content weigh more
pub const CONTENT_HEAD_CHARS: usize = 1000;
/// User turns folded into the keywords of a follow-up
pub const FOLLOW_UP_TURNS: usize = 2;

const WHOLE_QUERY_IN_TITLE: i32 = 10;
const KEYWORD_IN_TITLE: i32 = 5;
const DOCUMENT_NUMBER_MATCH: i32 = 8;
const KEYWORD_IN_CONTENT_HEAD: i32 = 2;
const KEYWORD_IN_CONTENT: i32 = 1;

/// A law with its relevance score
#[derive(Debug, Clone)]
pub struct ScoredLaw {
    pub law: Law,
    pub score: i32,
}

/// Search keywords from the query, plus the last user turns for follow-ups
pub fn extract_keywords(query: &str, history: &[HistoryTurn], include_history: bool) -> Vec<String> {
    let mut texts: Vec<&str> = vec![query];
    if include_history {
        let recent: Vec<&str> = history
            .iter()
            .rev()
            .filter(|turn| turn.role == "user")
            .take(FOLLOW_UP_TURNS)
            .map(|turn| turn.content.as_str())
            .collect();
        texts.extend(recent.into_iter().rev());
    }

    let mut keywords: Vec<String> = Vec::new();
    for text in texts {
        for word in tokenize(text) {
            if keywords.len() == MAX_KEYWORDS {
                return keywords;
            }
            if !keywords.contains(&word) {
                keywords.push(word);
            }
        }
    }
    keywords
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '/' || c == '-'))
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() > 2)
}

pub fn score_law(law: &Law, query: &str, keywords: &[String], document_numbers: &[String]) -> i32 {
    let title = law.title.to_lowercase();
    let query = query.trim().to_lowercase();
    let content = law.content.as_deref().unwrap_or_default().to_lowercase();
    let head = char_prefix(&content, CONTENT_HEAD_CHARS);

    let mut score = 0;

    if !query.is_empty() && title.contains(&query) {
        score += WHOLE_QUERY_IN_TITLE;
    }

    for keyword in keywords {
        if title.contains(keyword.as_str()) {
            score += KEYWORD_IN_TITLE;
        }
        if head.contains(keyword.as_str()) {
            score += KEYWORD_IN_CONTENT_HEAD;
        } else if content.contains(keyword.as_str()) {
            score += KEYWORD_IN_CONTENT;
        }
    }

    let so_hieu = law.so_hieu.as_deref().unwrap_or_default().to_uppercase();
    let title_upper = law.title.to_uppercase();
    for number in document_numbers {
        if so_hieu.contains(number.as_str()) || title_upper.contains(number.as_str()) {
            score += DOCUMENT_NUMBER_MATCH;
        }
    }

    score
}

/// Score, drop anything under `MIN_SCORE`, sort (stable) and keep the best `MAX_RESULTS`
pub fn rank_laws(
    candidates: Vec<Law>,
    query: &str,
    keywords: &[String],
    document_numbers: &[String],
) -> Vec<ScoredLaw> {
    let mut scored: Vec<ScoredLaw> = candidates
        .into_iter()
        .map(|law| {
            let score = score_law(&law, query, keywords, document_numbers);
            ScoredLaw { law, score }
        })
        .filter(|s| s.score >= MIN_SCORE)
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(MAX_RESULTS);
    scored
}

/// Fetch candidates for the query and rank them
pub async fn local_search(
    laws: &dyn BaseLawStore,
    query: &str,
    analysis: &QueryAnalysis,
    history: &[HistoryTurn],
) -> Result<Vec<ScoredLaw>> {
    let keywords = extract_keywords(query, history, analysis.is_follow_up());
    if keywords.is_empty() {
        return Ok(Vec::new());
    }

    let patterns: Vec<String> = keywords.iter().map(|kw| ilike_pattern(kw)).collect();
    let candidates = laws.search_candidates(&patterns, CANDIDATE_LIMIT).await?;
    let candidate_count = candidates.len();

    let ranked = rank_laws(candidates, query, &keywords, &analysis.document_numbers);
    tracing::debug!(
        keywords = ?keywords,
        candidates = candidate_count,
        ranked = ranked.len(),
        "Local law search"
    );
    Ok(ranked)
}

fn char_prefix(s: &str, chars: usize) -> &str {
    match s.char_indices().nth(chars) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}
