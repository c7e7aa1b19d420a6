//! Automated topic labelling: PMI-based candidate extraction followed by
//! first-order relevance ranking.
//!
//! Follows: Mei, Q., Shen, X., & Zhai, C. (2007). Automatic labeling of
//! multinomial topic models. In Proceedings of the 13th ACM SIGKDD
//! International Conference on Knowledge Discovery and Data Mining.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    model::{Document, ModelData},
    vocab::Vocabulary,
};

/// Options for automated topic labelling.
#[derive(Clone, Debug)]
pub struct LabelingOptions {
    /// Whether labelling is performed at all.
    pub active: bool,
    /// Minimum total occurrence of a candidate.
    pub min_cf: usize,
    /// Minimum number of documents containing a candidate.
    pub min_df: usize,
    /// Minimum candidate length, in tokens.
    pub min_len: usize,
    /// Maximum candidate length, in tokens.
    pub max_len: usize,
    /// Maximum number of candidates to extract.
    pub max_candidates: usize,
    /// Laplace smoothing added to co-occurrence counts.
    pub smoothing: f32,
    /// Discriminative coefficient: higher values favour labels specific
    /// to one topic.
    pub mu: f32,
    /// Size of the sliding window for co-occurrence counting; zero means
    /// whole documents.
    pub window_size: usize,
}

impl Default for LabelingOptions {
    fn default() -> Self {
        Self {
            active: false,
            min_cf: 0,
            min_df: 0,
            min_len: 1,
            max_len: 1,
            max_candidates: 0,
            smoothing: 0.,
            mu: 0.,
            window_size: 0,
        }
    }
}

/// Ranked labels per topic.
pub(crate) struct Labeler {
    labels: Vec<Vec<(String, f32)>>,
}

impl Labeler {
    /// Extracts label candidates from the documents and scores them
    /// against the given per-topic top tokens.
    pub(crate) fn build(
        data: &ModelData,
        top_tokens: &[Vec<(String, f32)>],
        options: &LabelingOptions,
    ) -> Self {
        let candidates = extract_candidates(data, options);

        debug!(candidates = candidates.len(), "extracted label candidates");

        let windows = collect_windows(data, options.window_size);
        let num_windows = windows.len().max(1) as f32;

        // windowed occurrence and co-occurrence counts
        let mut candidate_windows: HashMap<&str, u32> = HashMap::new();
        let mut cooccurrence: HashMap<(&str, &str), u32> = HashMap::new();
        let mut token_windows: HashMap<&str, u32> = HashMap::new();

        let scored_tokens: HashSet<&str> = top_tokens
            .iter()
            .flat_map(|tokens| tokens.iter().map(|(token, _)| token.as_str()))
            .collect();

        for window in &windows {
            let present: Vec<&str> = candidates
                .iter()
                .map(|candidate| candidate.text.as_str())
                .filter(|candidate| contains_phrase(window, candidate))
                .collect();

            let tokens: HashSet<&str> = window
                .iter()
                .map(String::as_str)
                .filter(|token| scored_tokens.contains(token))
                .collect();

            for token in &tokens {
                *token_windows.entry(token).or_default() += 1;
            }

            for candidate in present {
                *candidate_windows.entry(candidate).or_default() += 1;

                for token in &tokens {
                    *cooccurrence.entry((candidate, token)).or_default() += 1;
                }
            }
        }

        // relevance of every candidate for every topic
        let raw_scores: Vec<Vec<f32>> = top_tokens
            .par_iter()
            .map(|tokens| {
                candidates
                    .iter()
                    .map(|candidate| {
                        let candidate_probability = candidate_windows
                            .get(candidate.text.as_str())
                            .copied()
                            .unwrap_or(0)
                            as f32
                            / num_windows;

                        tokens
                            .iter()
                            .map(|(token, probability)| {
                                let together = cooccurrence
                                    .get(&(candidate.text.as_str(), token.as_str()))
                                    .copied()
                                    .unwrap_or(0)
                                    as f32
                                    + options.smoothing;
                                let token_probability = token_windows
                                    .get(token.as_str())
                                    .copied()
                                    .unwrap_or(0)
                                    as f32
                                    / num_windows;

                                let joint = together / num_windows;
                                let independent = candidate_probability * token_probability;

                                if joint > 0. && independent > 0. {
                                    probability * (joint / independent).ln()
                                } else {
                                    0.
                                }
                            })
                            .sum()
                    })
                    .collect()
            })
            .collect();

        // discriminative re-scoring across topics
        let num_topics = raw_scores.len();
        let labels = (0..num_topics)
            .map(|topic| {
                let mut scored: Vec<(String, f32)> = candidates
                    .iter()
                    .enumerate()
                    .map(|(index, candidate)| {
                        let own = raw_scores[topic][index];
                        let others: f32 = (0..num_topics)
                            .filter(|&other| other != topic)
                            .map(|other| raw_scores[other][index])
                            .sum();
                        let mean_others = if num_topics > 1 {
                            others / (num_topics - 1) as f32
                        } else {
                            0.
                        };

                        (candidate.text.clone(), own - options.mu * mean_others)
                    })
                    .collect();

                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

                scored
            })
            .collect();

        Self { labels }
    }

    pub(crate) fn cleared() -> Self {
        Self { labels: Vec::new() }
    }

    /// The top `n` labels of a topic, sorted by descending score.
    pub(crate) fn labels(&self, topic: usize, n: usize) -> Vec<(String, f32)> {
        self.labels
            .get(topic)
            .map(|labels| labels.iter().take(n).cloned().collect())
            .unwrap_or_default()
    }
}

struct Candidate {
    text: String,
}

/// Collects n-gram candidates over the used tokens of all documents.
fn extract_candidates(data: &ModelData, options: &LabelingOptions) -> Vec<Candidate> {
    let min_len = options.min_len.max(1);
    let max_len = options.max_len.max(min_len);

    let mut cf: HashMap<Vec<u32>, usize> = HashMap::new();
    let mut df: HashMap<Vec<u32>, usize> = HashMap::new();

    for document in &data.docs {
        let used = used_tokens(document, &data.vocab);
        let mut seen: HashSet<Vec<u32>> = HashSet::new();

        for len in min_len..=max_len {
            for gram in used.windows(len) {
                let gram = gram.to_vec();

                *cf.entry(gram.clone()).or_default() += 1;

                if seen.insert(gram.clone()) {
                    *df.entry(gram).or_default() += 1;
                }
            }
        }
    }

    let mut candidates: Vec<(Vec<u32>, usize)> = cf
        .into_iter()
        .filter(|(gram, count)| {
            *count >= options.min_cf.max(1)
                && df.get(gram).copied().unwrap_or(0) >= options.min_df.max(1)
        })
        .collect();

    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    if options.max_candidates > 0 {
        candidates.truncate(options.max_candidates);
    }

    candidates
        .into_iter()
        .map(|(gram, _)| Candidate {
            text: gram.iter().map(|&id| data.vocab.word(id)).join(" "),
        })
        .collect()
}

/// The document's tokens that survived removal, as strings.
fn used_tokens(document: &Document, vocab: &Vocabulary) -> Vec<u32> {
    let used = vocab.used() as u32;

    document
        .tokens
        .iter()
        .copied()
        .filter(|&token| token < used)
        .collect()
}

/// Splits every document into consecutive windows of the given size.
fn collect_windows(data: &ModelData, window_size: usize) -> Vec<Vec<String>> {
    let mut windows = Vec::new();

    for document in &data.docs {
        let tokens: Vec<String> = used_tokens(document, &data.vocab)
            .into_iter()
            .map(|id| data.vocab.word(id).to_string())
            .collect();

        if tokens.is_empty() {
            continue;
        }

        if window_size == 0 || window_size >= tokens.len() {
            windows.push(tokens);
        } else {
            for window in tokens.chunks(window_size) {
                windows.push(window.to_vec());
            }
        }
    }

    windows
}

/// Whether the window contains the candidate phrase as consecutive
/// tokens.
fn contains_phrase(window: &[String], phrase: &str) -> bool {
    let parts: Vec<&str> = phrase.split(' ').collect();

    window
        .windows(parts.len())
        .any(|tokens| tokens.iter().map(String::as_str).eq(parts.iter().copied()))
}
