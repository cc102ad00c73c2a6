//! Folder resolution: mapping a model's free-form folder suggestion onto
//! a concrete node of the real tree.
//!
//! The model sees a serialized tree and may answer with anything: an
//! identifier, a full path, a bare name with the wrong case, a partially
//! invented path, or a name duplicated across branches. Resolution tries
//! progressively looser strategies and refuses to guess: ambiguity and
//! no-match are explicit failures, never a silent fallback to some default
//! folder. Misfiling quietly is worse than failing loudly.

use std::collections::HashSet;

use thiserror::Error;

use super::{FolderNode, FolderTree};

/// Tunable thresholds for the fuzzy stage.
///
/// Classification accuracy is sensitive to both values; they are
/// configuration, not constants.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Minimum similarity (0-1) the best candidate must reach
    pub acceptance_threshold: f64,
    /// Minimum similarity gap between the best and second-best candidate
    pub ambiguity_margin: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.82,
            ambiguity_margin: 0.10,
        }
    }
}

/// Terminal outcomes of a failed resolution
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolutionFailure {
    /// The reference does not resemble any node in the tree
    #[error("No folder plausibly matches the proposed reference")]
    NoPlausibleNode,

    /// Several nodes match equally well; picking one would be a guess
    #[error("Ambiguous folder reference, candidates: {}", candidates.join(", "))]
    AmbiguousCandidates { candidates: Vec<String> },
}

/// Stateless resolver holding only its thresholds
#[derive(Debug, Clone, Default)]
pub struct FolderResolver {
    config: ResolverConfig,
}

impl FolderResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolve a proposed reference against a tree.
    ///
    /// Strategies, each tried only if the previous found nothing:
    /// 1. exact identifier match
    /// 2. normalized full-path match
    /// 3. unique normalized display-name match
    /// 4. fuzzy similarity with acceptance threshold and runner-up margin
    pub fn resolve<'t>(
        &self,
        reference: &str,
        tree: &'t FolderTree,
    ) -> Result<&'t FolderNode, ResolutionFailure> {
        let reference = reference.trim();
        if reference.is_empty() || tree.is_empty() {
            return Err(ResolutionFailure::NoPlausibleNode);
        }

        // 1. Identifier match is unambiguous by tree invariant.
        if let Some(node) = tree.get(reference) {
            tracing::debug!("[Resolver] '{}' matched node id", reference);
            return Ok(node);
        }

        let normalized_ref = normalize(reference);

        // 2. Normalized full-path match.
        let path_matches: Vec<&FolderNode> = tree
            .nodes()
            .filter(|n| tree.path(&n.id).map(normalize).as_deref() == Some(normalized_ref.as_str()))
            .collect();
        match path_matches.len() {
            1 => {
                tracing::debug!("[Resolver] '{}' matched path of {}", reference, path_matches[0].id);
                return Ok(path_matches[0]);
            }
            n if n > 1 => return Err(ambiguous(&path_matches)),
            _ => {}
        }

        // 3. Display-name match, only when unique across the whole tree.
        let name_matches: Vec<&FolderNode> = tree
            .nodes()
            .filter(|n| normalize(&n.name) == normalized_ref)
            .collect();
        match name_matches.len() {
            1 => {
                tracing::debug!("[Resolver] '{}' matched name of {}", reference, name_matches[0].id);
                return Ok(name_matches[0]);
            }
            n if n > 1 => return Err(ambiguous(&name_matches)),
            _ => {}
        }

        // 4. Fuzzy: best similarity against name and path, margin-gated.
        self.resolve_fuzzy(&normalized_ref, tree)
    }

    fn resolve_fuzzy<'t>(
        &self,
        normalized_ref: &str,
        tree: &'t FolderTree,
    ) -> Result<&'t FolderNode, ResolutionFailure> {
        let ref_segments = normalized_ref.matches('/').count() + 1;
        let mut scored: Vec<(f64, &FolderNode)> = tree
            .nodes()
            .map(|node| {
                let name_score = similarity(normalized_ref, &normalize(&node.name));
                // A partial path like "Projects/Alpha" should score against
                // the tail of "Work/Projects/Alpha", not just the whole.
                let path_score = tree
                    .path(&node.id)
                    .map(|p| {
                        let full = normalize(p);
                        let tail = path_tail(&full, ref_segments);
                        similarity(normalized_ref, &full).max(similarity(normalized_ref, tail))
                    })
                    .unwrap_or(0.0);
                (name_score.max(path_score), node)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let (best_score, best) = scored[0];
        if best_score < self.config.acceptance_threshold {
            tracing::debug!(
                "[Resolver] best fuzzy score {:.2} below threshold {:.2}",
                best_score,
                self.config.acceptance_threshold
            );
            return Err(ResolutionFailure::NoPlausibleNode);
        }

        if let Some(&(second_score, second)) = scored.get(1) {
            if best_score - second_score < self.config.ambiguity_margin {
                return Err(ResolutionFailure::AmbiguousCandidates {
                    candidates: vec![best.id.clone(), second.id.clone()],
                });
            }
        }

        tracing::debug!(
            "[Resolver] fuzzy accepted {} at {:.2}",
            best.id,
            best_score
        );
        Ok(best)
    }
}

fn ambiguous(nodes: &[&FolderNode]) -> ResolutionFailure {
    ResolutionFailure::AmbiguousCandidates {
        candidates: nodes.iter().map(|n| n.id.clone()).collect(),
    }
}

/// Case-fold and collapse whitespace/separator runs into a canonical
/// slash-delimited form: "Work / Projects  > Alpha" -> "work/projects/alpha"
fn normalize(reference: &str) -> String {
    reference
        .split(['/', '\\', '>'])
        .map(|segment| {
            segment
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Similarity in [0, 1]: the better of normalized edit distance and token
/// overlap. Edit distance rewards near-typos, token overlap rewards
/// reordered or partially quoted paths.
fn similarity(a: &str, b: &str) -> f64 {
    edit_similarity(a, b).max(token_overlap(a, b))
}

fn edit_similarity(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 && len_b == 0 {
        return 1.0;
    }
    let distance = levenshtein(a, b);
    1.0 - distance as f64 / len_a.max(len_b) as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

/// Last `segments` slash-delimited segments of a normalized path
fn path_tail(path: &str, segments: usize) -> &str {
    let total = path.matches('/').count() + 1;
    if total <= segments {
        return path;
    }
    let mut start = 0;
    for _ in 0..total - segments {
        match path[start..].find('/') {
            Some(idx) => start += idx + 1,
            None => break,
        }
    }
    &path[start..]
}

/// Jaccard overlap of slash/space-delimited tokens
fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<&str> = a.split(['/', ' ']).filter(|t| !t.is_empty()).collect();
    let tokens_b: HashSet<&str> = b.split(['/', ' ']).filter(|t| !t.is_empty()).collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}
