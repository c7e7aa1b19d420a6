//! The Gibbs samplers behind the topic modeller: LDA with a fixed number
//! of topics, and an HDP variant growing its topic set from the data.

use std::io::{Read, Write};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::trace;

use crate::{
    io::{
        read_f32, read_string, read_u32, read_u64, read_u8, write_f32, write_string, write_u32,
        write_u64, write_u8,
    },
    vocab::Vocabulary,
    ModelFileInvalidError, Result,
};

/// Assignment of a token excluded from training.
const NO_TOPIC: u32 = u32::MAX;

/// Tolerance when testing weighted counts for zero.
const COUNT_EPSILON: f32 = 1e-6;

/// Term weighting scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermWeight {
    /// Every token occurrence is weighted one.
    One,
    /// Token occurrences are weighted by inverse document frequency.
    Idf,
}

impl TermWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermWeight::One => "TermWeight.ONE",
            TermWeight::Idf => "TermWeight.IDF",
        }
    }
}

/// One training document.
#[derive(Clone, Debug, Default)]
pub(crate) struct Document {
    pub(crate) name: String,
    pub(crate) tokens: Vec<u32>,
    /// Per-token topic assignment; [`NO_TOPIC`] for removed tokens.
    pub(crate) topics: Vec<u32>,
    /// Per-token term weight.
    pub(crate) weights: Vec<f32>,
    /// Weighted topic counts of this document.
    pub(crate) doc_topic: Vec<f32>,
}

/// State shared by all model variants.
#[derive(Clone, Debug)]
pub(crate) struct ModelData {
    pub(crate) vocab: Vocabulary,
    pub(crate) docs: Vec<Document>,
    pub(crate) weight: TermWeight,
    pub(crate) seed: u64,
    pub(crate) burn_in: usize,
    pub(crate) optimization_interval: usize,
    pub(crate) global_step: usize,
}

impl ModelData {
    fn new(weight: TermWeight, seed: u64, optimization_interval: usize) -> Self {
        Self {
            vocab: Vocabulary::new(),
            docs: Vec::new(),
            weight,
            seed,
            burn_in: 0,
            optimization_interval,
            global_step: 0,
        }
    }

    fn add_document(&mut self, name: &str, tokens: &[String]) {
        let mut document = Document {
            name: name.to_string(),
            ..Document::default()
        };

        let mut distinct = Vec::new();

        for token in tokens {
            let id = self.vocab.add_occurrence(token);

            if !distinct.contains(&id) {
                distinct.push(id);
            }

            document.tokens.push(id);
        }

        for id in distinct {
            self.vocab.add_document_with(id);
        }

        self.docs.push(document);
    }

    /// Applies token removal and computes the per-token weights.
    fn prepare(&mut self, min_cf: u64, min_df: u64, top_n: usize) {
        let remap = self.vocab.prepare(min_cf, min_df, top_n);
        let used = self.vocab.used() as u32;
        let num_docs = self.docs.len() as f64;

        for document in &mut self.docs {
            for token in &mut document.tokens {
                *token = remap[*token as usize];
            }

            document.weights = document
                .tokens
                .iter()
                .map(|&token| {
                    if token >= used {
                        0.
                    } else {
                        match self.weight {
                            TermWeight::One => 1.,
                            TermWeight::Idf => {
                                (num_docs / self.vocab.df(token) as f64).ln() as f32
                            }
                        }
                    }
                })
                .collect();
        }
    }

    fn write<T: Write>(&self, to: &mut T, full: bool) -> Result<()> {
        write_u64(to, self.seed)?;
        write_u64(to, self.burn_in as u64)?;
        write_u64(to, self.optimization_interval as u64)?;
        write_u64(to, self.global_step as u64)?;
        write_u8(to, matches!(self.weight, TermWeight::Idf) as u8)?;

        write_u64(to, self.vocab.len() as u64)?;

        for id in 0..self.vocab.len() as u32 {
            write_string(to, self.vocab.word(id))?;
            write_u64(to, self.vocab.cf(id))?;
            write_u64(to, self.vocab.df(id))?;
        }

        write_u64(to, self.vocab.used() as u64)?;
        write_u64(to, self.vocab.removed_top() as u64)?;

        write_u8(to, full as u8)?;

        if full {
            write_u64(to, self.docs.len() as u64)?;

            for document in &self.docs {
                write_string(to, &document.name)?;
                write_u64(to, document.tokens.len() as u64)?;

                for (&token, &topic) in document.tokens.iter().zip(document.topics.iter()) {
                    write_u32(to, token)?;
                    write_u32(to, topic)?;
                }
            }
        }

        Ok(())
    }

    fn read<T: Read>(from: &mut T) -> Result<Self> {
        let seed = read_u64(from)?;
        let burn_in = read_u64(from)? as usize;
        let stored_interval = read_u64(from)? as usize;
        let global_step = read_u64(from)? as usize;
        let weight = if read_u8(from)? == 0 {
            TermWeight::One
        } else {
            TermWeight::Idf
        };

        let mut data = Self::new(weight, seed, stored_interval);

        data.burn_in = burn_in;
        data.global_step = global_step;

        let num_words = read_u64(from)? as usize;
        let mut frequencies = Vec::with_capacity(num_words);

        for _ in 0..num_words {
            let word = read_string(from)?;
            let cf = read_u64(from)?;
            let df = read_u64(from)?;

            frequencies.push((word, cf, df));
        }

        let used = read_u64(from)? as usize;
        let removed_top = read_u64(from)? as usize;

        data.vocab = Vocabulary::restore(frequencies, used, removed_top)?;

        let full = read_u8(from)? != 0;

        if full {
            let num_docs = read_u64(from)? as usize;

            for _ in 0..num_docs {
                let name = read_string(from)?;
                let num_tokens = read_u64(from)? as usize;
                let mut document = Document {
                    name,
                    ..Document::default()
                };

                for _ in 0..num_tokens {
                    document.tokens.push(read_u32(from)?);
                    document.topics.push(read_u32(from)?);
                }

                data.docs.push(document);
            }

            // weights were not stored; they are fully determined by the
            // vocabulary and the weighting scheme
            let used = data.vocab.used() as u32;
            let num_docs = data.docs.len() as f64;

            for document in &mut data.docs {
                document.weights = document
                    .tokens
                    .iter()
                    .map(|&token| {
                        if token >= used {
                            0.
                        } else {
                            match data.weight {
                                TermWeight::One => 1.,
                                TermWeight::Idf => {
                                    (num_docs / data.vocab.df(token) as f64).ln() as f32
                                }
                            }
                        }
                    })
                    .collect();
            }
        }

        Ok(data)
    }
}

/// Latent Dirichlet Allocation with a fixed number of topics.
#[derive(Clone, Debug)]
pub(crate) struct LdaModel {
    pub(crate) data: ModelData,
    pub(crate) k: usize,
    pub(crate) alpha: Vec<f32>,
    pub(crate) eta: f32,
    pub(crate) topic_word: Vec<Vec<f32>>,
    pub(crate) topic_sum: Vec<f32>,
    rng: StdRng,
}

impl LdaModel {
    pub(crate) fn new(
        k: usize,
        alpha: f32,
        eta: f32,
        weight: TermWeight,
        seed: u64,
        optimization_interval: usize,
    ) -> Self {
        Self {
            data: ModelData::new(weight, seed, optimization_interval),
            k,
            alpha: vec![alpha; k],
            eta,
            topic_word: Vec::new(),
            topic_sum: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn add_document(&mut self, name: &str, tokens: &[String]) {
        self.data.add_document(name, tokens);
    }

    /// Removes infrequent and overly frequent tokens and randomly
    /// initializes the topic assignments.
    pub(crate) fn prepare(&mut self, min_cf: u64, min_df: u64, top_n: usize) {
        self.data.prepare(min_cf, min_df, top_n);

        let used = self.data.vocab.used();

        self.topic_word = vec![vec![0.; used]; self.k];
        self.topic_sum = vec![0.; self.k];

        self.rng = StdRng::seed_from_u64(self.data.seed);

        for document in &mut self.data.docs {
            document.doc_topic = vec![0.; self.k];
            document.topics = vec![NO_TOPIC; document.tokens.len()];

            for index in 0..document.tokens.len() {
                let token = document.tokens[index] as usize;
                let weight = document.weights[index];

                if token >= used {
                    continue;
                }

                let topic = self.rng.gen_range(0..self.k);

                document.topics[index] = topic as u32;
                document.doc_topic[topic] += weight;

                self.topic_word[topic][token] += weight;
                self.topic_sum[topic] += weight;
            }
        }

        trace!(k = self.k, used, "prepared LDA model");
    }

    /// Performs the given number of collapsed Gibbs passes.
    pub(crate) fn train(&mut self, iterations: usize) {
        let used = self.data.vocab.used();
        let eta_sum = self.eta * used as f32;
        let mut distribution = vec![0f32; self.k];

        for _ in 0..iterations {
            let mut docs = std::mem::take(&mut self.data.docs);

            for document in &mut docs {
                for index in 0..document.tokens.len() {
                    let topic = document.topics[index];

                    if topic == NO_TOPIC {
                        continue;
                    }

                    let token = document.tokens[index] as usize;
                    let weight = document.weights[index];
                    let old = topic as usize;

                    document.doc_topic[old] -= weight;
                    self.topic_word[old][token] -= weight;
                    self.topic_sum[old] -= weight;

                    for k in 0..self.k {
                        distribution[k] = (document.doc_topic[k] + self.alpha[k])
                            * (self.topic_word[k][token] + self.eta)
                            / (self.topic_sum[k] + eta_sum);
                    }

                    let new = sample_discrete(&mut self.rng, &distribution);

                    document.topics[index] = new as u32;
                    document.doc_topic[new] += weight;
                    self.topic_word[new][token] += weight;
                    self.topic_sum[new] += weight;
                }
            }

            self.data.docs = docs;
            self.data.global_step += 1;
        }
    }

    /// Rebuilds all counts from stored topic assignments after loading.
    pub(crate) fn rebuild_counts(&mut self) {
        let used = self.data.vocab.used();

        self.topic_word = vec![vec![0.; used]; self.k];
        self.topic_sum = vec![0.; self.k];

        for document in &mut self.data.docs {
            document.doc_topic = vec![0.; self.k];

            for index in 0..document.tokens.len() {
                let topic = document.topics[index];

                if topic == NO_TOPIC {
                    continue;
                }

                let token = document.tokens[index] as usize;
                let weight = document.weights[index];

                document.doc_topic[topic as usize] += weight;
                self.topic_word[topic as usize][token] += weight;
                self.topic_sum[topic as usize] += weight;
            }
        }
    }

    /// The topic distribution of a trained document.
    pub(crate) fn doc_distribution(&self, document: &Document) -> Vec<f32> {
        let alpha_sum: f32 = self.alpha.iter().sum();
        let total: f32 = document.doc_topic.iter().sum::<f32>() + alpha_sum;

        (0..self.k)
            .map(|k| (document.doc_topic[k] + self.alpha[k]) / total)
            .collect()
    }

    /// Infers the topic distribution of an unseen document, holding the
    /// topic-token counts fixed.
    pub(crate) fn infer(&self, tokens: &[String], max_iterations: usize, seed: u64) -> Vec<f32> {
        let used = self.data.vocab.used() as u32;
        let ids: Vec<u32> = tokens
            .iter()
            .filter_map(|token| self.data.vocab.id(token))
            .filter(|&id| id < used)
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut doc_topic = vec![0f32; self.k];
        let mut assignment = Vec::with_capacity(ids.len());
        let eta_sum = self.eta * self.data.vocab.used() as f32;
        let mut distribution = vec![0f32; self.k];

        for _ in &ids {
            let topic = rng.gen_range(0..self.k);

            doc_topic[topic] += 1.;
            assignment.push(topic);
        }

        for _ in 0..max_iterations {
            for (index, &token) in ids.iter().enumerate() {
                let old = assignment[index];

                doc_topic[old] -= 1.;

                for k in 0..self.k {
                    distribution[k] = (doc_topic[k] + self.alpha[k])
                        * (self.topic_word[k][token as usize] + self.eta)
                        / (self.topic_sum[k] + eta_sum);
                }

                let new = sample_discrete(&mut rng, &distribution);

                assignment[index] = new;
                doc_topic[new] += 1.;
            }
        }

        let alpha_sum: f32 = self.alpha.iter().sum();
        let total: f32 = doc_topic.iter().sum::<f32>() + alpha_sum;

        (0..self.k)
            .map(|k| (doc_topic[k] + self.alpha[k]) / total)
            .collect()
    }

    pub(crate) fn count_by_topic(&self) -> Vec<u64> {
        self.topic_sum
            .iter()
            .map(|&sum| sum.round().max(0.) as u64)
            .collect()
    }

    pub(crate) fn top_tokens(&self, topic: usize, n: usize) -> Vec<(String, f32)> {
        top_tokens_of(
            &self.data.vocab,
            &self.topic_word[topic],
            self.topic_sum[topic],
            self.eta,
            n,
        )
    }

    pub(crate) fn log_likelihood_per_token(&self) -> f64 {
        log_likelihood(
            &self.data,
            self.k,
            |document, k| (document.doc_topic[k] + self.alpha[k]) as f64,
            |k, token| {
                (self.topic_word[k][token] + self.eta) as f64
                    / (self.topic_sum[k] + self.eta * self.data.vocab.used() as f32) as f64
            },
        )
    }

    pub(crate) fn write<T: Write>(&self, to: &mut T, full: bool) -> Result<()> {
        self.data.write(to, full)?;

        write_u64(to, self.k as u64)?;

        for &alpha in &self.alpha {
            write_f32(to, alpha)?;
        }

        write_f32(to, self.eta)?;

        for row in &self.topic_word {
            for &count in row {
                write_f32(to, count)?;
            }
        }

        Ok(())
    }

    pub(crate) fn read<T: Read>(from: &mut T) -> Result<Self> {
        let data = ModelData::read(from)?;
        let k = read_u64(from)? as usize;

        if k == 0 {
            return ModelFileInvalidError {
                reason: "LDA model without topics",
            }
            .fail();
        }

        let mut alpha = Vec::with_capacity(k);

        for _ in 0..k {
            alpha.push(read_f32(from)?);
        }

        let eta = read_f32(from)?;
        let used = data.vocab.used();
        let mut topic_word = vec![vec![0f32; used]; k];

        for row in topic_word.iter_mut() {
            for count in row.iter_mut() {
                *count = read_f32(from)?;
            }
        }

        let topic_sum = topic_word.iter().map(|row| row.iter().sum()).collect();
        let seed = data.seed;

        let mut model = Self {
            data,
            k,
            alpha,
            eta,
            topic_word,
            topic_sum,
            rng: StdRng::seed_from_u64(seed),
        };

        if !model.data.docs.is_empty() {
            model.rebuild_counts();
        }

        Ok(model)
    }
}

/// Hierarchical Dirichlet Process model: like LDA, but the number of
/// topics grows with the data. A topic is alive while at least one
/// document holds a table serving it.
#[derive(Clone, Debug)]
pub(crate) struct HdpModel {
    pub(crate) data: ModelData,
    pub(crate) k: usize,
    pub(crate) initial_k: usize,
    pub(crate) alpha: f32,
    pub(crate) eta: f32,
    pub(crate) gamma: f32,
    pub(crate) topic_word: Vec<Vec<f32>>,
    pub(crate) topic_sum: Vec<f32>,
    pub(crate) tables: Vec<u32>,
    rng: StdRng,
}

impl HdpModel {
    pub(crate) fn new(
        initial_k: usize,
        alpha: f32,
        eta: f32,
        gamma: f32,
        weight: TermWeight,
        seed: u64,
        optimization_interval: usize,
    ) -> Self {
        Self {
            data: ModelData::new(weight, seed, optimization_interval),
            k: initial_k,
            initial_k,
            alpha,
            eta,
            gamma,
            topic_word: Vec::new(),
            topic_sum: Vec::new(),
            tables: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn add_document(&mut self, name: &str, tokens: &[String]) {
        self.data.add_document(name, tokens);
    }

    pub(crate) fn prepare(&mut self, min_cf: u64, min_df: u64, top_n: usize) {
        self.data.prepare(min_cf, min_df, top_n);

        let used = self.data.vocab.used();

        self.k = self.initial_k.max(1);
        self.topic_word = vec![vec![0.; used]; self.k];
        self.topic_sum = vec![0.; self.k];
        self.tables = vec![0; self.k];

        self.rng = StdRng::seed_from_u64(self.data.seed);

        for document in &mut self.data.docs {
            document.doc_topic = vec![0.; self.k];
            document.topics = vec![NO_TOPIC; document.tokens.len()];

            for index in 0..document.tokens.len() {
                let token = document.tokens[index] as usize;
                let weight = document.weights[index];

                if token >= used {
                    continue;
                }

                let topic = self.rng.gen_range(0..self.k);

                if document.doc_topic[topic] <= COUNT_EPSILON {
                    self.tables[topic] += 1;
                }

                document.topics[index] = topic as u32;
                document.doc_topic[topic] += weight;

                self.topic_word[topic][token] += weight;
                self.topic_sum[topic] += weight;
            }
        }

        trace!(k = self.k, used, "prepared HDP model");
    }

    pub(crate) fn train(&mut self, iterations: usize) {
        let used = self.data.vocab.used();
        let eta_sum = self.eta * used as f32;

        for _ in 0..iterations {
            for d in 0..self.data.docs.len() {
                for index in 0..self.data.docs[d].tokens.len() {
                    let topic = self.data.docs[d].topics[index];

                    if topic == NO_TOPIC {
                        continue;
                    }

                    let token = self.data.docs[d].tokens[index] as usize;
                    let weight = self.data.docs[d].weights[index];
                    let old = topic as usize;

                    self.data.docs[d].doc_topic[old] -= weight;
                    self.topic_word[old][token] -= weight;
                    self.topic_sum[old] -= weight;

                    if self.data.docs[d].doc_topic[old] <= COUNT_EPSILON {
                        self.data.docs[d].doc_topic[old] = 0.;

                        self.tables[old] = self.tables[old].saturating_sub(1);
                    }

                    // build the sampling distribution, with one extra slot
                    // for a fresh topic drawn from the base distribution
                    let total_tables: f32 = self.tables.iter().map(|&t| t as f32).sum();
                    let denominator = total_tables + self.gamma;
                    let mut distribution = Vec::with_capacity(self.k + 1);

                    for k in 0..self.k {
                        let table_weight = self.tables[k] as f32 / denominator;

                        distribution.push(
                            (self.data.docs[d].doc_topic[k] + self.alpha * table_weight)
                                * (self.topic_word[k][token] + self.eta)
                                / (self.topic_sum[k] + eta_sum),
                        );
                    }

                    distribution.push(self.alpha * (self.gamma / denominator) / used.max(1) as f32);

                    let sampled = sample_discrete(&mut self.rng, &distribution);
                    let new = if sampled < self.k {
                        sampled
                    } else {
                        self.open_topic()
                    };

                    if self.data.docs[d].doc_topic[new] <= COUNT_EPSILON {
                        self.tables[new] += 1;
                    }

                    self.data.docs[d].topics[index] = new as u32;
                    self.data.docs[d].doc_topic[new] += weight;
                    self.topic_word[new][token] += weight;
                    self.topic_sum[new] += weight;
                }
            }

            self.data.global_step += 1;
        }
    }

    // reuse a dead topic slot or append a new one
    fn open_topic(&mut self) -> usize {
        for k in 0..self.k {
            if self.tables[k] == 0 && self.topic_sum[k] <= COUNT_EPSILON {
                return k;
            }
        }

        let used = self.data.vocab.used();

        self.k += 1;
        self.topic_word.push(vec![0.; used]);
        self.topic_sum.push(0.);
        self.tables.push(0);

        for document in &mut self.data.docs {
            document.doc_topic.push(0.);
        }

        self.k - 1
    }

    pub(crate) fn rebuild_counts(&mut self) {
        let used = self.data.vocab.used();

        self.topic_word = vec![vec![0.; used]; self.k];
        self.topic_sum = vec![0.; self.k];

        let mut tables = vec![0u32; self.k];

        for document in &mut self.data.docs {
            document.doc_topic = vec![0.; self.k];

            for index in 0..document.tokens.len() {
                let topic = document.topics[index];

                if topic == NO_TOPIC {
                    continue;
                }

                let token = document.tokens[index] as usize;
                let weight = document.weights[index];

                if document.doc_topic[topic as usize] <= COUNT_EPSILON {
                    tables[topic as usize] += 1;
                }

                document.doc_topic[topic as usize] += weight;
                self.topic_word[topic as usize][token] += weight;
                self.topic_sum[topic as usize] += weight;
            }
        }

        // without the full document set, keep the stored table counts
        if !self.data.docs.is_empty() {
            self.tables = tables;
        }
    }

    pub(crate) fn is_live_topic(&self, topic: usize) -> bool {
        self.tables.get(topic).is_some_and(|&tables| tables > 0)
    }

    pub(crate) fn live_k(&self) -> usize {
        self.tables.iter().filter(|&&tables| tables > 0).count()
    }

    pub(crate) fn num_tables(&self) -> usize {
        self.tables.iter().map(|&tables| tables as usize).sum()
    }

    /// The topic distribution of a trained document over all topic
    /// slots, dead ones included; callers elide dead topics.
    pub(crate) fn doc_distribution(&self, document: &Document) -> Vec<f32> {
        let total_tables: f32 = self.tables.iter().map(|&t| t as f32).sum();
        let denominator = total_tables + self.gamma;
        let doc_total: f32 = document.doc_topic.iter().sum();
        let total = doc_total + self.alpha * (total_tables / denominator);

        (0..self.k)
            .map(|k| {
                let table_weight = self.tables[k] as f32 / denominator;

                (document.doc_topic.get(k).copied().unwrap_or(0.) + self.alpha * table_weight)
                    / total
            })
            .collect()
    }

    pub(crate) fn infer(&self, tokens: &[String], max_iterations: usize, seed: u64) -> Vec<f32> {
        let used = self.data.vocab.used() as u32;
        let ids: Vec<u32> = tokens
            .iter()
            .filter_map(|token| self.data.vocab.id(token))
            .filter(|&id| id < used)
            .collect();

        let live: Vec<usize> = (0..self.k).filter(|&k| self.is_live_topic(k)).collect();

        if live.is_empty() {
            return vec![0.; self.k];
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut doc_topic = vec![0f32; self.k];
        let mut assignment = Vec::with_capacity(ids.len());
        let eta_sum = self.eta * self.data.vocab.used() as f32;
        let mut distribution = vec![0f32; live.len()];

        for _ in &ids {
            let topic = live[rng.gen_range(0..live.len())];

            doc_topic[topic] += 1.;
            assignment.push(topic);
        }

        for _ in 0..max_iterations {
            for (index, &token) in ids.iter().enumerate() {
                let old = assignment[index];

                doc_topic[old] -= 1.;

                for (slot, &k) in live.iter().enumerate() {
                    distribution[slot] = (doc_topic[k] + self.alpha)
                        * (self.topic_word[k][token as usize] + self.eta)
                        / (self.topic_sum[k] + eta_sum);
                }

                let new = live[sample_discrete(&mut rng, &distribution)];

                assignment[index] = new;
                doc_topic[new] += 1.;
            }
        }

        let total: f32 = doc_topic.iter().sum::<f32>() + self.alpha * live.len() as f32;

        (0..self.k)
            .map(|k| {
                if self.is_live_topic(k) {
                    (doc_topic[k] + self.alpha) / total
                } else {
                    0.
                }
            })
            .collect()
    }

    pub(crate) fn count_by_topic(&self) -> Vec<u64> {
        self.topic_sum
            .iter()
            .map(|&sum| sum.round().max(0.) as u64)
            .collect()
    }

    pub(crate) fn top_tokens(&self, topic: usize, n: usize) -> Vec<(String, f32)> {
        top_tokens_of(
            &self.data.vocab,
            &self.topic_word[topic],
            self.topic_sum[topic],
            self.eta,
            n,
        )
    }

    pub(crate) fn log_likelihood_per_token(&self) -> f64 {
        let total_tables: f32 = self.tables.iter().map(|&t| t as f32).sum();
        let denominator = total_tables + self.gamma;

        log_likelihood(
            &self.data,
            self.k,
            |document, k| {
                (document.doc_topic.get(k).copied().unwrap_or(0.)
                    + self.alpha * (self.tables[k] as f32 / denominator)) as f64
            },
            |k, token| {
                (self.topic_word[k][token] + self.eta) as f64
                    / (self.topic_sum[k] + self.eta * self.data.vocab.used() as f32) as f64
            },
        )
    }

    pub(crate) fn write<T: Write>(&self, to: &mut T, full: bool) -> Result<()> {
        self.data.write(to, full)?;

        write_u64(to, self.k as u64)?;
        write_u64(to, self.initial_k as u64)?;
        write_f32(to, self.alpha)?;
        write_f32(to, self.eta)?;
        write_f32(to, self.gamma)?;

        for &tables in &self.tables {
            write_u32(to, tables)?;
        }

        for row in &self.topic_word {
            for &count in row {
                write_f32(to, count)?;
            }
        }

        Ok(())
    }

    pub(crate) fn read<T: Read>(from: &mut T) -> Result<Self> {
        let data = ModelData::read(from)?;
        let k = read_u64(from)? as usize;
        let initial_k = read_u64(from)? as usize;
        let alpha = read_f32(from)?;
        let eta = read_f32(from)?;
        let gamma = read_f32(from)?;

        let mut tables = Vec::with_capacity(k);

        for _ in 0..k {
            tables.push(read_u32(from)?);
        }

        let used = data.vocab.used();
        let mut topic_word = vec![vec![0f32; used]; k];

        for row in topic_word.iter_mut() {
            for count in row.iter_mut() {
                *count = read_f32(from)?;
            }
        }

        let topic_sum = topic_word.iter().map(|row| row.iter().sum()).collect();
        let seed = data.seed;

        let mut model = Self {
            data,
            k,
            initial_k,
            alpha,
            eta,
            gamma,
            topic_word,
            topic_sum,
            tables,
            rng: StdRng::seed_from_u64(seed),
        };

        if !model.data.docs.is_empty() {
            model.rebuild_counts();
        }

        Ok(model)
    }
}

/// Samples an index proportionally to the given unnormalized weights.
fn sample_discrete(rng: &mut StdRng, distribution: &[f32]) -> usize {
    let total: f32 = distribution.iter().sum();

    if total <= 0. {
        return 0;
    }

    let mut draw = rng.gen::<f32>() * total;

    for (index, &weight) in distribution.iter().enumerate() {
        draw -= weight;

        if draw <= 0. {
            return index;
        }
    }

    distribution.len() - 1
}

fn top_tokens_of(
    vocab: &Vocabulary,
    topic_word: &[f32],
    topic_sum: f32,
    eta: f32,
    n: usize,
) -> Vec<(String, f32)> {
    let denominator = topic_sum + eta * vocab.used() as f32;
    let mut weighted: Vec<(u32, f32)> = topic_word
        .iter()
        .enumerate()
        .map(|(id, &count)| (id as u32, (count + eta) / denominator))
        .collect();

    weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    weighted.truncate(n);

    weighted
        .into_iter()
        .map(|(id, probability)| (vocab.word(id).to_string(), probability))
        .collect()
}

fn log_likelihood(
    data: &ModelData,
    k: usize,
    doc_weight: impl Fn(&Document, usize) -> f64,
    word_probability: impl Fn(usize, usize) -> f64,
) -> f64 {
    let mut log_sum = 0f64;
    let mut num_tokens = 0usize;

    for document in &data.docs {
        let total: f64 = (0..k).map(|topic| doc_weight(document, topic)).sum();

        if total <= 0. {
            continue;
        }

        for (index, &token) in document.tokens.iter().enumerate() {
            if document.topics.get(index) == Some(&NO_TOPIC) {
                continue;
            }

            let probability: f64 = (0..k)
                .map(|topic| doc_weight(document, topic) / total * word_probability(topic, token as usize))
                .sum();

            if probability > 0. {
                log_sum += probability.ln();

                num_tokens += 1;
            }
        }
    }

    if num_tokens == 0 {
        return 0.;
    }

    log_sum / num_tokens as f64
}
