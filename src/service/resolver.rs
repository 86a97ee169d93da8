use serde::Serialize;

use crate::models::KnownEntity;

/// Similarity floor a candidate must clear before it can match at all.
const MIN_SIMILARITY: f64 = 0.2;
/// Margin the best candidate must hold over the runner-up; ties within it
/// are reported as ambiguous rather than guessed.
const MIN_MARGIN: f64 = 0.1;

/// A candidate surfaced by an ambiguous match, so the caller can ask the
/// user instead of the router picking one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Resolution {
    Match { id: String, score: f64 },
    Ambiguous { candidates: Vec<Candidate> },
    NotFound,
}

/// Matches a natural-language mention against the snapshot by lexical
/// token overlap. Every id this returns comes from the snapshot; it never
/// fabricates one.
pub fn resolve(mention: &str, snapshot: &[KnownEntity]) -> Resolution {
    let mention_tokens = tokens(mention);
    if mention_tokens.is_empty() || snapshot.is_empty() {
        return Resolution::NotFound;
    }

    let mut scored: Vec<Candidate> = snapshot
        .iter()
        .map(|entity| Candidate {
            id: entity.id.clone(),
            text: entity.text.clone(),
            score: dice(&mention_tokens, &tokens(&entity.text)),
        })
        .filter(|candidate| candidate.score >= MIN_SIMILARITY)
        .collect();

    if scored.is_empty() {
        return Resolution::NotFound;
    }
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    let best = scored[0].score;
    let tied: Vec<Candidate> = scored
        .into_iter()
        .take_while(|candidate| best - candidate.score < MIN_MARGIN)
        .collect();

    if tied.len() == 1 {
        let winner = &tied[0];
        Resolution::Match {
            id: winner.id.clone(),
            score: winner.score,
        }
    } else {
        Resolution::Ambiguous { candidates: tied }
    }
}

/// True when `id` belongs to the snapshot; verbatim model ids must pass
/// this check before they are trusted.
pub fn contains_id(id: &str, snapshot: &[KnownEntity]) -> bool {
    snapshot.iter().any(|entity| entity.id == id)
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Dice coefficient over token sets: 2|A∩B| / (|A| + |B|).
fn dice(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut remaining: Vec<&String> = b.iter().collect();
    let mut overlap = 0usize;
    for token in a {
        if let Some(pos) = remaining.iter().position(|t| *t == token) {
            remaining.remove(pos);
            overlap += 1;
        }
    }
    (2.0 * overlap as f64) / (a.len() + b.len()) as f64
}
