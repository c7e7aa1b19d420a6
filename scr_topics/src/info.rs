//! Summary information about a trained topic model.

use serde::{Deserialize, Serialize};

/// Everything the surrounding platform wants to report about a trained
/// model. HDP-only fields are zero for LDA models and vice versa.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicModelInfo {
    /// The name of the model (`HDPModel` or `LDAModel`).
    pub model_name: String,
    /// The version of the modelling engine.
    pub model_version: String,
    pub number_of_documents: usize,
    pub number_of_tokens: usize,
    /// The number of distinct tokens before removal.
    pub size_of_vocabulary: usize,
    /// The number of distinct tokens used for training.
    pub size_of_vocabulary_used: usize,
    pub token_entropy: f64,
    /// The most frequent tokens removed before training.
    pub removed_tokens: Vec<String>,
    pub number_of_iterations: usize,
    pub number_of_burn_in_steps: usize,
    pub optimization_interval: usize,
    pub log_likelihood_per_token: f64,
    /// Term weighting mode, as a string.
    pub weighting: String,
    pub min_collection_frequency: usize,
    pub min_document_frequency: usize,
    pub number_of_top_tokens_to_be_removed: usize,
    /// The initial number of topics (HDP only).
    pub number_of_initial_topics: usize,
    pub initial_alpha: f32,
    pub initial_eta: f32,
    /// The initial concentration coefficient for table-topic (HDP only).
    pub initial_gamma: f32,
    pub seed: u64,
    /// The engine version the model was trained with.
    pub trained_with_version: String,
    /// The number of topics alive after training.
    pub number_of_topics: usize,
    /// Document-topic prior; the scalar `alpha` for HDP models.
    pub alpha: f32,
    /// Per-topic document-topic priors (LDA only).
    pub alphas: Vec<f32>,
    pub eta: f32,
    /// The concentration coefficient for table-topic (HDP only).
    pub gamma: f32,
    /// The number of tables (HDP only).
    pub number_of_tables: usize,
}
