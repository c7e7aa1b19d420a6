//! Topic modelling over a tokenized corpus, using Hierarchical Dirichlet
//! Processes (HDP) when no fixed number of topics is given and Latent
//! Dirichlet Allocation (LDA) when one is.
//!
//! If you use the HDP topic modelling algorithm, please cite:
//!
//! Teh, Y. W., Jordan, M. I., Beal, M. J., & Blei, D. M. (2005). Sharing
//! clusters among related groups: Hierarchical Dirichlet processes.
//! In Advances in neural information processing systems, 1385-1392.
//!
//! If you use the LDA topic modelling algorithm, please cite:
//!
//! Blei, D. M., Ng, A. Y., & Jordan, M. I. (2003). Latent dirichlet
//! allocation. Journal of Machine Learning Research, 3(Jan), 993-1022.

mod info;
mod io;
mod label;
mod model;
mod pickle;
mod vocab;

use std::{
    collections::{HashMap, HashSet},
    io::Cursor,
    path::Path,
};

use rand::Rng;
use rayon::prelude::*;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::{
    label::Labeler,
    model::{HdpModel, LdaModel, ModelData},
    pickle::PickleDict,
};

pub use crate::{info::TopicModelInfo, label::LabelingOptions, model::TermWeight};

type Result<T, E = Error> = std::result::Result<T, E>;

/// The version of the modelling engine, recorded in trained models.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the HDP model.
pub const HDP_MODEL_NAME: &str = "HDPModel";

/// The name of the LDA model.
pub const LDA_MODEL_NAME: &str = "LDAModel";

/// The initial number of topics by default.
pub const DEFAULT_NUMBER_OF_INITIAL_TOPICS: usize = 2;

/// The default concentration coefficient of the Dirichlet process for
/// document-table.
pub const DEFAULT_ALPHA: f32 = 0.1;

/// The default hyperparameter of the Dirichlet distribution for
/// topic-token.
pub const DEFAULT_ETA: f32 = 0.01;

/// The default concentration coefficient of the Dirichlet process for
/// table-topic; unused by LDA models.
pub const DEFAULT_GAMMA: f32 = 0.1;

/// The default interval for optimizing the parameters, in iterations.
pub const DEFAULT_OPTIMIZATION_INTERVAL: usize = 10;

/// After how many classified articles callers should update their
/// status.
pub const TOPIC_MODELLING_UPDATE_EVERY: usize = 1_000;

/// The beginning of a valid model file.
pub const MODEL_FILE_HEAD: &[u8; 5] = b"LDA\0\0";

/// The term weighting scheme ONE, as saved in a model file.
pub const MODEL_FILE_TERM_WEIGHTING_ONE: &[u8; 5] = b"one\0\0";

/// The term weighting scheme IDF, as saved in a model file.
pub const MODEL_FILE_TERM_WEIGHTING_IDF: &[u8; 5] = b"idf\0\0";

/// The file format tag following the model head and term weighting.
pub const MODEL_FILE_TYPE: &[u8; 4] = b"TPTK";

/// How many top tokens of a topic enter the relevance score of a label.
const SCORING_TOP_TOKENS: usize = 10;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Error)))]
pub enum Error {
    #[snafu(display("{operation}(): {what} after the model has been initialized"))]
    ModelAlreadyInitialised {
        operation: &'static str,
        what: &'static str,
    },

    #[snafu(display("{operation}(): the model has already been trained"))]
    ModelAlreadyTrained { operation: &'static str },

    #[snafu(display("{operation}(): the model has not been trained yet"))]
    ModelNotTrained { operation: &'static str },

    #[snafu(display(
        "{operation}(): no documents have been added or the model has been cleared"
    ))]
    NoDocuments { operation: &'static str },

    #[snafu(display("unknown document: '{name}'"))]
    UnknownDocument { name: String },

    #[snafu(display("invalid model file: {reason}"))]
    ModelFileInvalid { reason: &'static str },

    #[snafu(display("could not access model file '{path}': {source}"))]
    ModelFile {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("I/O error: {source}"))]
    Io { source: std::io::Error },
}

/// The model variants: HDP or LDA, each with one-weighting or IDF
/// weighting. Common operations dispatch by pattern match.
enum Model {
    Hdp(HdpModel),
    HdpIdf(HdpModel),
    Lda(LdaModel),
    LdaIdf(LdaModel),
}

impl Model {
    fn is_hdp(&self) -> bool {
        matches!(self, Model::Hdp(_) | Model::HdpIdf(_))
    }

    fn data(&self) -> &ModelData {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => &model.data,
            Model::Lda(model) | Model::LdaIdf(model) => &model.data,
        }
    }

    fn data_mut(&mut self) -> &mut ModelData {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => &mut model.data,
            Model::Lda(model) | Model::LdaIdf(model) => &mut model.data,
        }
    }

    fn add_document(&mut self, name: &str, tokens: &[String]) {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.add_document(name, tokens),
            Model::Lda(model) | Model::LdaIdf(model) => model.add_document(name, tokens),
        }
    }

    fn prepare(&mut self, min_cf: u64, min_df: u64, top_n: usize) {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.prepare(min_cf, min_df, top_n),
            Model::Lda(model) | Model::LdaIdf(model) => model.prepare(min_cf, min_df, top_n),
        }
    }

    fn train(&mut self, iterations: usize) {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.train(iterations),
            Model::Lda(model) | Model::LdaIdf(model) => model.train(iterations),
        }
    }

    /// The number of topic slots, dead HDP topics included.
    fn k(&self) -> usize {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.k,
            Model::Lda(model) | Model::LdaIdf(model) => model.k,
        }
    }

    fn is_live_topic(&self, topic: usize) -> bool {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.is_live_topic(topic),
            Model::Lda(model) | Model::LdaIdf(model) => topic < model.k,
        }
    }

    /// The number of topics alive after training.
    fn live_k(&self) -> usize {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.live_k(),
            Model::Lda(model) | Model::LdaIdf(model) => model.k,
        }
    }

    fn count_by_topic(&self) -> Vec<u64> {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.count_by_topic(),
            Model::Lda(model) | Model::LdaIdf(model) => model.count_by_topic(),
        }
    }

    fn doc_distribution(&self, index: usize) -> Vec<f32> {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => {
                model.doc_distribution(&model.data.docs[index])
            }
            Model::Lda(model) | Model::LdaIdf(model) => {
                model.doc_distribution(&model.data.docs[index])
            }
        }
    }

    fn infer(&self, tokens: &[String], max_iterations: usize, seed: u64) -> Vec<f32> {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.infer(tokens, max_iterations, seed),
            Model::Lda(model) | Model::LdaIdf(model) => model.infer(tokens, max_iterations, seed),
        }
    }

    fn top_tokens(&self, topic: usize, n: usize) -> Vec<(String, f32)> {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.top_tokens(topic, n),
            Model::Lda(model) | Model::LdaIdf(model) => model.top_tokens(topic, n),
        }
    }

    fn log_likelihood_per_token(&self) -> f64 {
        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.log_likelihood_per_token(),
            Model::Lda(model) | Model::LdaIdf(model) => model.log_likelihood_per_token(),
        }
    }

    fn write(&self, to: &mut Vec<u8>, full: bool) -> Result<()> {
        io::write_u8(to, self.is_hdp() as u8)?;

        match self {
            Model::Hdp(model) | Model::HdpIdf(model) => model.write(to, full),
            Model::Lda(model) | Model::LdaIdf(model) => model.write(to, full),
        }
    }
}

/// Topic modeller.
///
/// Configure the model, add the documents of a tokenized corpus, train,
/// then query topics and per-document topic distributions. A fixed
/// number of topics selects the LDA algorithm; without one, HDP adjusts
/// the number of topics to the data.
pub struct TopicModel {
    model: Option<Model>,

    // state
    has_docs: bool,
    is_prepared: bool,
    loaded: bool,
    resume_after_load: bool,
    workers_used: usize,

    // settings
    fixed_number_of_topics: usize,
    use_idf: bool,
    number_of_initial_topics: usize,
    initial_alpha: f32,
    initial_eta: f32,
    initial_gamma: f32,
    seed: u64,
    min_token_cf: u64,
    min_token_df: u64,
    remove_top_n_tokens: usize,
    optimization_interval: usize,
    trained_with_version: String,

    // labelling
    labeler: Option<Labeler>,
    labeling: LabelingOptions,
}

impl Default for TopicModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicModel {
    pub fn new() -> Self {
        Self {
            model: None,
            has_docs: false,
            is_prepared: false,
            loaded: false,
            resume_after_load: false,
            workers_used: 0,
            fixed_number_of_topics: 0,
            use_idf: false,
            number_of_initial_topics: DEFAULT_NUMBER_OF_INITIAL_TOPICS,
            initial_alpha: DEFAULT_ALPHA,
            initial_eta: DEFAULT_ETA,
            initial_gamma: DEFAULT_GAMMA,
            seed: rand::thread_rng().gen(),
            min_token_cf: 0,
            min_token_df: 0,
            remove_top_n_tokens: 0,
            optimization_interval: DEFAULT_OPTIMIZATION_INTERVAL,
            trained_with_version: String::new(),
            labeler: None,
            labeling: LabelingOptions::default(),
        }
    }

    /*
     * SETTERS
     */

    /// Sets the fixed number of topics; zero selects the HDP algorithm.
    pub fn set_fixed_number_of_topics(&mut self, k: usize) -> Result<()> {
        self.check_no_model("set_fixed_number_of_topics", "the number of topics cannot be set")?;

        self.fixed_number_of_topics = k;

        Ok(())
    }

    /// Sets whether token occurrences are weighted by inverse document
    /// frequency instead of all weighing one.
    pub fn set_use_idf(&mut self, idf: bool) -> Result<()> {
        self.check_no_model("set_use_idf", "the term weighting cannot be changed")?;

        self.use_idf = idf;

        Ok(())
    }

    /// Sets the number of iterations to skip at the beginning of the
    /// training before optimizing parameters.
    pub fn set_burn_in(&mut self, iterations: usize) -> Result<()> {
        self.init_model();
        self.check_not_trained("set_burn_in")?;

        if let Some(model) = &mut self.model {
            model.data_mut().burn_in = iterations;
        }

        Ok(())
    }

    /// Sets which tokens to remove before training: tokens occurring
    /// fewer than `min_cf` times in the corpus or in fewer than `min_df`
    /// documents, plus the `top_n` most frequent tokens.
    pub fn set_token_removal(&mut self, min_cf: u64, min_df: u64, top_n: usize) -> Result<()> {
        self.check_not_trained("set_token_removal")?;

        self.min_token_cf = min_cf;
        self.min_token_df = min_df;
        self.remove_top_n_tokens = top_n;

        Ok(())
    }

    /// Sets the initial model parameters; `initial_topics` and `gamma`
    /// are ignored when a fixed number of topics is set.
    pub fn set_initial_parameters(
        &mut self,
        initial_topics: usize,
        alpha: f32,
        eta: f32,
        gamma: f32,
    ) -> Result<()> {
        self.check_no_model("set_initial_parameters", "initial parameters cannot be set")?;

        self.number_of_initial_topics = initial_topics;
        self.initial_alpha = alpha;
        self.initial_eta = eta;
        self.initial_gamma = gamma;

        Ok(())
    }

    /// Sets the interval for parameter optimization, in iterations.
    pub fn set_parameter_optimization_interval(&mut self, interval: usize) -> Result<()> {
        self.check_no_model(
            "set_parameter_optimization_interval",
            "the optimization interval cannot be set",
        )?;

        self.optimization_interval = interval;

        Ok(())
    }

    /// Sets the seed for random number generation.
    pub fn set_random_number_generation_seed(&mut self, seed: u64) -> Result<()> {
        self.check_no_model(
            "set_random_number_generation_seed",
            "the seed cannot be set",
        )?;

        self.seed = seed;

        Ok(())
    }

    /// Sets whether a loaded model may be extended with further
    /// documents and training; only effective when the model file has
    /// been saved with its full document set.
    pub fn set_resume_after_load(&mut self, resume: bool) -> Result<()> {
        self.check_no_model("set_resume_after_load", "resuming cannot be configured")?;

        self.resume_after_load = resume;

        Ok(())
    }

    /// Sets the options for automated topic labelling, re-labelling if
    /// the topics have already been labelled.
    pub fn set_labeling_options(&mut self, options: LabelingOptions) -> Result<()> {
        self.labeling = options;

        if self.labeler.is_some() {
            self.label(self.workers_used)?;
        }

        Ok(())
    }

    /*
     * TOPIC MODELLING
     */

    /// Adds a document from a tokenized corpus, copying `num_tokens`
    /// tokens starting at `first_token`.
    pub fn add_document(
        &mut self,
        name: &str,
        tokens: &[String],
        first_token: usize,
        num_tokens: usize,
    ) -> Result<()> {
        if self.loaded {
            let resumable = self.resume_after_load
                && self
                    .model
                    .as_ref()
                    .is_some_and(|model| !model.data().docs.is_empty());

            if !resumable {
                return ModelAlreadyTrainedError {
                    operation: "add_document",
                }
                .fail();
            }

            // extending a loaded model restarts training from scratch
            self.is_prepared = false;
        }

        self.init_model();
        self.check_not_trained("add_document")?;

        let model = self.model.as_mut().expect("the model has been initialized");

        model.add_document(name, &tokens[first_token..first_token + num_tokens]);

        if num_tokens > 0 {
            self.has_docs = true;
        }

        Ok(())
    }

    /// Prepares the model for training without performing an iteration:
    /// applies token removal, initializes the sampler state, and records
    /// the engine version.
    pub fn start_training(&mut self) -> Result<()> {
        self.require_model("start_training")?;
        self.prepare_model();

        self.trained_with_version = ENGINE_VERSION.to_string();

        Ok(())
    }

    /// Trains the model for the given number of Gibbs iterations. May be
    /// called repeatedly; afterwards no further documents can be added.
    ///
    /// The worker count is advisory: sampling runs single-threaded to
    /// stay reproducible, as multi-threaded training is documented to
    /// harm reproducibility.
    pub fn train(&mut self, iterations: usize, threads: usize) -> Result<()> {
        self.require_model("train")?;
        self.prepare_model();

        if self.trained_with_version.is_empty() {
            self.trained_with_version = ENGINE_VERSION.to_string();
        }

        debug!(iterations, threads, "training topic model");

        if let Some(model) = &mut self.model {
            model.train(iterations);
        }

        Ok(())
    }

    /// Labels the trained topics, if labelling has been activated;
    /// otherwise clears any previous labelling.
    pub fn label(&mut self, threads: usize) -> Result<()> {
        if !self.labeling.active {
            self.labeler = None;

            return Ok(());
        }

        self.require_model("label")?;
        self.check_trained("label")?;

        self.workers_used = threads;

        let model = self.require_model("label")?;

        let top_tokens: Vec<Vec<(String, f32)>> = (0..model.k())
            .map(|topic| {
                if model.is_live_topic(topic) {
                    model.top_tokens(topic, SCORING_TOP_TOKENS)
                } else {
                    Vec::new()
                }
            })
            .collect();

        let labeler = in_pool(threads, || {
            Labeler::build(model.data(), &top_tokens, &self.labeling)
        });

        self.labeler = Some(labeler);

        Ok(())
    }

    /*
     * GETTERS
     */

    /// The number of documents in the model.
    pub fn get_number_of_documents(&self) -> Result<usize> {
        let model = self.require_model("get_number_of_documents")?;

        self.check_trained("get_number_of_documents")?;

        Ok(model.data().docs.len())
    }

    /// A map from document names to their indices; unnamed documents are
    /// skipped.
    pub fn get_documents(&self) -> Result<HashMap<String, usize>> {
        let model = self.require_model("get_documents")?;

        self.check_trained("get_documents")?;

        Ok(model
            .data()
            .docs
            .iter()
            .enumerate()
            .filter(|(_, document)| !document.name.is_empty())
            .map(|(index, document)| (document.name.clone(), index))
            .collect())
    }

    /// The index of the document with the given name.
    pub fn get_document_id(&self, name: &str) -> Result<usize> {
        let model = self.require_model("get_document_id")?;

        self.check_trained("get_document_id")?;

        model
            .data()
            .docs
            .iter()
            .position(|document| document.name == name)
            .ok_or_else(|| UnknownDocumentError { name }.build())
    }

    /// The number of distinct tokens used for training.
    pub fn get_vocabulary_size(&self) -> Result<usize> {
        let model = self.require_model("get_vocabulary_size")?;

        self.check_trained("get_vocabulary_size")?;

        Ok(model.data().vocab.used())
    }

    /// The number of distinct tokens before removal.
    pub fn get_original_vocabulary_size(&self) -> Result<usize> {
        let model = self.require_model("get_original_vocabulary_size")?;

        self.check_trained("get_original_vocabulary_size")?;

        Ok(model.data().vocab.len())
    }

    /// The complete dictionary of the model, removed tokens included.
    pub fn get_vocabulary(&self) -> Result<&[String]> {
        let model = self.require_model("get_vocabulary")?;

        self.check_trained("get_vocabulary")?;

        Ok(model.data().vocab.words())
    }

    /// The number of tokens used for training.
    pub fn get_number_of_tokens(&self) -> Result<usize> {
        let model = self.require_model("get_number_of_tokens")?;

        self.check_trained("get_number_of_tokens")?;

        let used = model.data().vocab.used() as u32;

        Ok(model
            .data()
            .docs
            .iter()
            .map(|document| {
                document
                    .tokens
                    .iter()
                    .filter(|&&token| token < used)
                    .count()
            })
            .sum())
    }

    /// The most frequent tokens removed before training.
    pub fn get_removed_tokens(&self) -> Result<Vec<String>> {
        let model = self.require_model("get_removed_tokens")?;

        self.check_trained("get_removed_tokens")?;

        Ok(model.data().vocab.removed_tokens())
    }

    pub fn get_burn_in_iterations(&self) -> Result<usize> {
        Ok(self.require_model("get_burn_in_iterations")?.data().burn_in)
    }

    /// The number of training iterations performed so far.
    pub fn get_iterations(&self) -> Result<usize> {
        Ok(self.require_model("get_iterations")?.data().global_step)
    }

    pub fn get_parameter_optimization_interval(&self) -> usize {
        self.optimization_interval
    }

    pub fn get_random_number_generation_seed(&self) -> u64 {
        self.seed
    }

    /// The name of the underlying model.
    pub fn get_model_name(&self) -> Result<&'static str> {
        let model = self.require_model("get_model_name")?;

        Ok(if model.is_hdp() {
            HDP_MODEL_NAME
        } else {
            LDA_MODEL_NAME
        })
    }

    /// The term weighting scheme, as a string.
    pub fn get_term_weighting(&self) -> Result<&'static str> {
        Ok(self
            .require_model("get_term_weighting")?
            .data()
            .weight
            .as_str())
    }

    /// The number of topics alive after training.
    pub fn get_number_of_topics(&self) -> Result<usize> {
        let model = self.require_model("get_number_of_topics")?;

        self.check_trained("get_number_of_topics")?;

        Ok(model.live_k())
    }

    /// The IDs of the topics alive after training.
    pub fn get_topics(&self) -> Result<Vec<usize>> {
        let model = self.require_model("get_topics")?;

        self.check_trained("get_topics")?;

        Ok((0..model.k())
            .filter(|&topic| model.is_live_topic(topic))
            .collect())
    }

    /// The IDs and token counts of the topics alive after training,
    /// sorted by descending count.
    pub fn get_topics_sorted(&self) -> Result<Vec<(usize, u64)>> {
        let model = self.require_model("get_topics_sorted")?;

        self.check_trained("get_topics_sorted")?;

        let mut topics: Vec<(usize, u64)> = model
            .count_by_topic()
            .into_iter()
            .enumerate()
            .filter(|&(topic, _)| model.is_live_topic(topic))
            .collect();

        topics.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(topics)
    }

    /// The current log-likelihood per token.
    pub fn get_log_likelihood_per_token(&self) -> Result<f64> {
        let model = self.require_model("get_log_likelihood_per_token")?;

        self.check_trained("get_log_likelihood_per_token")?;

        Ok(model.log_likelihood_per_token())
    }

    /// The token entropy of the corpus the model has been trained on.
    pub fn get_token_entropy(&self) -> Result<f64> {
        let model = self.require_model("get_token_entropy")?;

        self.check_trained("get_token_entropy")?;

        let vocab = &model.data().vocab;
        let total: u64 = (0..vocab.used() as u32).map(|id| vocab.cf(id)).sum();

        if total == 0 {
            return Ok(0.);
        }

        Ok((0..vocab.used() as u32)
            .map(|id| vocab.cf(id) as f64 / total as f64)
            .filter(|&p| p > 0.)
            .map(|p| p * p.ln())
            .sum())
    }

    /// The top `n` tokens of a topic with their probabilities, sorted by
    /// descending probability.
    pub fn get_topic_top_n_tokens(&self, topic: usize, n: usize) -> Result<Vec<(String, f32)>> {
        let model = self.require_model("get_topic_top_n_tokens")?;

        self.check_trained("get_topic_top_n_tokens")?;

        Ok(model.top_tokens(topic, n))
    }

    /// The top `n` labels of a topic with their scores, sorted by
    /// descending score. Empty if labelling was not activated or not
    /// performed.
    pub fn get_topic_top_n_labels(&self, topic: usize, n: usize) -> Result<Vec<(String, f32)>> {
        self.require_model("get_topic_top_n_labels")?;
        self.check_trained("get_topic_top_n_labels")?;

        Ok(self
            .labeler
            .as_ref()
            .map(|labeler| labeler.labels(topic, n))
            .unwrap_or_default())
    }

    /// The topic distributions of all trained documents whose names have
    /// not yet been inserted into `done`. Dead HDP topics are elided,
    /// preserving topic order; distributions consisting only of NaN
    /// values are discarded.
    pub fn get_documents_topics(
        &self,
        done: &mut HashSet<String>,
    ) -> Result<Vec<(String, Vec<f32>)>> {
        let model = self.require_model("get_documents_topics")?;

        self.check_trained("get_documents_topics")?;

        let mut results = Vec::new();

        for (index, document) in model.data().docs.iter().enumerate() {
            if document.name.is_empty() || !done.insert(document.name.clone()) {
                continue;
            }

            let distribution = self.filter_live(model, model.doc_distribution(index));

            if !distribution.is_empty() && distribution.iter().all(|value| value.is_nan()) {
                // an all-NaN distribution carries no information
                done.remove(&document.name);

                continue;
            }

            results.push((document.name.clone(), distribution));
        }

        Ok(results)
    }

    /// Infers the topic distributions of previously unseen tokenized
    /// documents. Zero workers use the platform default.
    pub fn infer_documents_topics(
        &self,
        documents: &[Vec<String>],
        max_iterations: usize,
        workers: usize,
    ) -> Result<Vec<Vec<f32>>> {
        let model = self.require_model("infer_documents_topics")?;

        self.check_trained("infer_documents_topics")?;

        let seed = self.seed;

        Ok(in_pool(workers, || {
            documents
                .par_iter()
                .enumerate()
                .map(|(index, tokens)| {
                    let distribution =
                        model.infer(tokens, max_iterations, seed.wrapping_add(index as u64 + 1));

                    self.filter_live(model, distribution)
                })
                .collect()
        }))
    }

    /// Summary information about the trained model.
    pub fn get_model_info(&self) -> Result<TopicModelInfo> {
        let model = self.require_model("get_model_info")?;

        self.check_trained("get_model_info")?;

        let mut info = TopicModelInfo {
            model_name: self.get_model_name()?.to_string(),
            model_version: ENGINE_VERSION.to_string(),
            number_of_documents: model.data().docs.len(),
            number_of_tokens: self.get_number_of_tokens()?,
            size_of_vocabulary: model.data().vocab.len(),
            size_of_vocabulary_used: model.data().vocab.used(),
            token_entropy: self.get_token_entropy()?,
            removed_tokens: model.data().vocab.removed_tokens(),
            number_of_iterations: model.data().global_step,
            number_of_burn_in_steps: model.data().burn_in,
            optimization_interval: model.data().optimization_interval,
            log_likelihood_per_token: model.log_likelihood_per_token(),
            weighting: model.data().weight.as_str().to_string(),
            min_collection_frequency: self.min_token_cf as usize,
            min_document_frequency: self.min_token_df as usize,
            number_of_top_tokens_to_be_removed: self.remove_top_n_tokens,
            initial_alpha: self.initial_alpha,
            initial_eta: self.initial_eta,
            seed: self.seed,
            trained_with_version: self.trained_with_version.clone(),
            number_of_topics: model.live_k(),
            ..TopicModelInfo::default()
        };

        match model {
            Model::Hdp(hdp) | Model::HdpIdf(hdp) => {
                info.number_of_initial_topics = self.number_of_initial_topics;
                info.initial_gamma = self.initial_gamma;
                info.alpha = hdp.alpha;
                info.eta = hdp.eta;
                info.gamma = hdp.gamma;
                info.number_of_tables = hdp.num_tables();
            }
            Model::Lda(lda) | Model::LdaIdf(lda) => {
                info.alpha = lda.alpha.iter().sum::<f32>() / lda.alpha.len().max(1) as f32;
                info.alphas = lda.alpha.clone();
                info.eta = lda.eta;
            }
        }

        Ok(info)
    }

    /*
     * LOAD AND SAVE
     */

    /// Writes the model to a file, returning the number of bytes
    /// written. With `full`, all documents are saved so that training
    /// can be resumed; without, the saved model can only classify.
    pub fn save(&self, path: impl AsRef<Path>, full: bool) -> Result<u64> {
        let model = self.require_model("save")?;

        self.check_trained("save")?;

        let mut buffer: Vec<u8> = Vec::new();

        buffer.extend_from_slice(MODEL_FILE_HEAD);
        buffer.extend_from_slice(match model.data().weight {
            TermWeight::One => MODEL_FILE_TERM_WEIGHTING_ONE,
            TermWeight::Idf => MODEL_FILE_TERM_WEIGHTING_IDF,
        });
        buffer.extend_from_slice(MODEL_FILE_TYPE);

        model.write(&mut buffer, full)?;

        buffer.extend_from_slice(&self.metadata(model).to_bytes());

        std::fs::write(path.as_ref(), &buffer).context(ModelFileError {
            path: path.as_ref().display().to_string(),
        })?;

        debug!(bytes = buffer.len(), full, "saved topic model");

        Ok(buffer.len() as u64)
    }

    /// Loads a model from a file, returning the number of bytes read.
    /// All previous data is cleared first.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<u64> {
        self.clear(false);

        let data = std::fs::read(path.as_ref()).context(ModelFileError {
            path: path.as_ref().display().to_string(),
        })?;

        if data.len() < 14 || data[..5] != MODEL_FILE_HEAD[..] {
            return ModelFileInvalidError {
                reason: "missing model file head",
            }
            .fail();
        }

        let is_idf = if data[5..10] == MODEL_FILE_TERM_WEIGHTING_ONE[..] {
            false
        } else if data[5..10] == MODEL_FILE_TERM_WEIGHTING_IDF[..] {
            true
        } else {
            return ModelFileInvalidError {
                reason: "unknown term weighting scheme",
            }
            .fail();
        };

        if data[10..14] != MODEL_FILE_TYPE[..] {
            return ModelFileInvalidError {
                reason: "unknown model file type",
            }
            .fail();
        }

        let mut cursor = Cursor::new(&data[14..]);
        let is_hdp = io::read_u8(&mut cursor)? != 0;

        let model = if is_hdp {
            let hdp = HdpModel::read(&mut cursor)?;

            if is_idf {
                Model::HdpIdf(hdp)
            } else {
                Model::Hdp(hdp)
            }
        } else {
            let lda = LdaModel::read(&mut cursor)?;

            if is_idf {
                Model::LdaIdf(lda)
            } else {
                Model::Lda(lda)
            }
        };

        // the pickled metadata dictionary follows the payload
        let metadata = PickleDict::from_bytes(&data[14 + cursor.position() as usize..])?;

        self.use_idf = is_idf;
        self.min_token_cf = metadata.number("min_cf") as u64;
        self.min_token_df = metadata.number("min_df") as u64;
        self.remove_top_n_tokens = metadata.number("rm_top") as usize;
        self.seed = metadata.number("seed") as u64;
        self.initial_alpha = metadata.float("alpha") as f32;
        self.initial_eta = metadata.float("eta") as f32;
        self.trained_with_version = metadata.string("version");

        if is_hdp {
            self.number_of_initial_topics = metadata.number("initial_k") as usize;
            self.initial_gamma = metadata.float("gamma") as f32;
            self.fixed_number_of_topics = 0;
        } else {
            self.fixed_number_of_topics = metadata.number("k") as usize;
        }

        self.has_docs = true;
        self.loaded = true;
        self.is_prepared = model.data().global_step > 0;
        self.model = Some(model);

        debug!(bytes = data.len(), "loaded topic model");

        Ok(data.len() as u64)
    }

    /*
     * CLEANUP
     */

    /// Clears the model, resets its settings and frees the memory used;
    /// labelling options are only reset when requested.
    pub fn clear(&mut self, labeling_options: bool) {
        self.model = None;
        self.has_docs = false;
        self.is_prepared = false;
        self.loaded = false;
        self.workers_used = 0;
        self.fixed_number_of_topics = 0;
        self.use_idf = false;
        self.number_of_initial_topics = DEFAULT_NUMBER_OF_INITIAL_TOPICS;
        self.initial_alpha = DEFAULT_ALPHA;
        self.initial_eta = DEFAULT_ETA;
        self.initial_gamma = DEFAULT_GAMMA;
        self.seed = rand::thread_rng().gen();
        self.min_token_cf = 0;
        self.min_token_df = 0;
        self.remove_top_n_tokens = 0;
        self.optimization_interval = DEFAULT_OPTIMIZATION_INTERVAL;
        self.trained_with_version = String::new();
        self.labeler = None;

        if labeling_options {
            self.labeling = LabelingOptions::default();
        }
    }

    /*
     * INTERNAL HELPERS
     */

    fn init_model(&mut self) {
        if self.model.is_some() {
            return;
        }

        let weight = if self.use_idf {
            TermWeight::Idf
        } else {
            TermWeight::One
        };

        self.model = Some(if self.fixed_number_of_topics == 0 {
            let hdp = HdpModel::new(
                self.number_of_initial_topics,
                self.initial_alpha,
                self.initial_eta,
                self.initial_gamma,
                weight,
                self.seed,
                self.optimization_interval,
            );

            if self.use_idf {
                Model::HdpIdf(hdp)
            } else {
                Model::Hdp(hdp)
            }
        } else {
            let lda = LdaModel::new(
                self.fixed_number_of_topics,
                self.initial_alpha,
                self.initial_eta,
                weight,
                self.seed,
                self.optimization_interval,
            );

            if self.use_idf {
                Model::LdaIdf(lda)
            } else {
                Model::Lda(lda)
            }
        });
    }

    fn prepare_model(&mut self) {
        if self.is_prepared {
            return;
        }

        if let Some(model) = &mut self.model {
            model.prepare(self.min_token_cf, self.min_token_df, self.remove_top_n_tokens);
        }

        self.is_prepared = true;
    }

    // elide dead HDP topics, preserving order
    fn filter_live(&self, model: &Model, distribution: Vec<f32>) -> Vec<f32> {
        if !model.is_hdp() {
            return distribution;
        }

        distribution
            .into_iter()
            .enumerate()
            .filter(|&(topic, _)| model.is_live_topic(topic))
            .map(|(_, value)| value)
            .collect()
    }

    fn require_model(&self, operation: &'static str) -> Result<&Model> {
        match &self.model {
            Some(model) if self.has_docs => Ok(model),
            _ => NoDocumentsError { operation }.fail(),
        }
    }

    fn check_no_model(&self, operation: &'static str, what: &'static str) -> Result<()> {
        if self.model.is_some() {
            return ModelAlreadyInitialisedError { operation, what }.fail();
        }

        Ok(())
    }

    fn check_trained(&self, operation: &'static str) -> Result<()> {
        if !self.is_prepared {
            return ModelNotTrainedError { operation }.fail();
        }

        Ok(())
    }

    fn check_not_trained(&self, operation: &'static str) -> Result<()> {
        if self.is_prepared {
            return ModelAlreadyTrainedError { operation }.fail();
        }

        Ok(())
    }

    fn metadata(&self, model: &Model) -> PickleDict {
        let mut dict = PickleDict::new();

        dict.set_number(
            "tw",
            matches!(model.data().weight, TermWeight::Idf) as i64,
        );
        dict.set_number("min_cf", self.min_token_cf as i64);
        dict.set_number("min_df", self.min_token_df as i64);
        dict.set_number("rm_top", self.remove_top_n_tokens as i64);

        if model.is_hdp() {
            dict.set_number("initial_k", self.number_of_initial_topics as i64);
            dict.set_float("gamma", self.initial_gamma as f64);
        } else {
            dict.set_number("k", self.fixed_number_of_topics as i64);
        }

        dict.set_number("seed", self.seed as i64);
        dict.set_float("alpha", self.initial_alpha as f64);
        dict.set_float("eta", self.initial_eta as f64);
        dict.set_string("version", &self.trained_with_version);

        dict
    }
}

/// Runs a closure inside a rayon pool with the given number of workers;
/// zero uses the global pool with the platform default.
fn in_pool<T: Send>(workers: usize, task: impl FnOnce() -> T + Send) -> T {
    if workers == 0 {
        return task();
    }

    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(task),
        Err(_) => task(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn settings_are_locked_after_initialization() {
        let mut model = TopicModel::new();

        model.set_fixed_number_of_topics(2).unwrap();
        model.set_random_number_generation_seed(7).unwrap();

        model
            .add_document("doc", &strings(&["a", "b"]), 0, 2)
            .unwrap();

        assert!(matches!(
            model.set_fixed_number_of_topics(3),
            Err(Error::ModelAlreadyInitialised { .. })
        ));
        assert!(matches!(
            model.set_use_idf(true),
            Err(Error::ModelAlreadyInitialised { .. })
        ));
    }

    #[test]
    fn documents_cannot_be_added_after_training() {
        let mut model = TopicModel::new();

        model.set_random_number_generation_seed(7).unwrap();
        model
            .add_document("doc", &strings(&["a", "b"]), 0, 2)
            .unwrap();
        model.start_training().unwrap();

        assert!(matches!(
            model.add_document("late", &strings(&["c"]), 0, 1),
            Err(Error::ModelAlreadyTrained { .. })
        ));
    }

    #[test]
    fn queries_require_training() {
        let mut model = TopicModel::new();

        model
            .add_document("doc", &strings(&["a", "b"]), 0, 2)
            .unwrap();

        assert!(matches!(
            model.get_number_of_topics(),
            Err(Error::ModelNotTrained { .. })
        ));
        assert!(matches!(
            model.get_documents_topics(&mut HashSet::new()),
            Err(Error::ModelNotTrained { .. })
        ));
    }

    #[test]
    fn queries_require_documents() {
        let model = TopicModel::new();

        assert!(matches!(
            model.get_model_name(),
            Err(Error::NoDocuments { .. })
        ));
    }
}
