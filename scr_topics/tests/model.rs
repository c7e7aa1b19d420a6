//! End-to-end tests for topic model training, persistence and
//! classification.

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use scr_topics::{Error, LabelingOptions, TopicModel};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Four single-sentence documents with two obviously different
/// vocabularies.
fn add_sample_documents(model: &mut TopicModel) {
    let fruit_a = strings(&["apple", "banana", "fruit", "sweet", "apple"]);
    let fruit_b = strings(&["banana", "fruit", "apple", "juice"]);
    let cars_a = strings(&["engine", "car", "road", "wheel", "engine"]);
    let cars_b = strings(&["car", "road", "engine", "fuel"]);

    model.add_document("fruit-a", &fruit_a, 0, fruit_a.len()).unwrap();
    model.add_document("fruit-b", &fruit_b, 0, fruit_b.len()).unwrap();
    model.add_document("cars-a", &cars_a, 0, cars_a.len()).unwrap();
    model.add_document("cars-b", &cars_b, 0, cars_b.len()).unwrap();
}

fn trained_hdp() -> TopicModel {
    let mut model = TopicModel::new();

    model.set_random_number_generation_seed(42).unwrap();
    model.set_initial_parameters(2, 0.1, 0.01, 0.1).unwrap();

    add_sample_documents(&mut model);

    model.start_training().unwrap();
    model.train(50, 1).unwrap();

    model
}

fn trained_lda(k: usize) -> TopicModel {
    let mut model = TopicModel::new();

    model.set_fixed_number_of_topics(k).unwrap();
    model.set_random_number_generation_seed(42).unwrap();

    add_sample_documents(&mut model);

    model.start_training().unwrap();
    model.train(50, 1).unwrap();

    model
}

#[test]
fn hdp_reports_live_topics() {
    let model = trained_hdp();

    let topics = model.get_topics().unwrap();

    assert!(!topics.is_empty());
    assert_eq!(topics.len(), model.get_number_of_topics().unwrap());

    // counts cover exactly the tokens used for training
    let total: u64 = model
        .get_topics_sorted()
        .unwrap()
        .iter()
        .map(|&(_, count)| count)
        .sum();

    assert_eq!(total, model.get_number_of_tokens().unwrap() as u64);
}

#[test]
fn document_distributions_are_normalized() {
    let model = trained_hdp();
    let mut done = HashSet::new();

    let results = model.get_documents_topics(&mut done).unwrap();

    assert_eq!(results.len(), 4);

    let num_topics = model.get_number_of_topics().unwrap();

    for (name, distribution) in &results {
        assert!(!name.is_empty());
        assert_eq!(distribution.len(), num_topics);

        let sum: f32 = distribution.iter().sum();

        assert!((sum - 1.).abs() < 1e-3, "distribution of {name} sums to {sum}");
    }

    // already classified documents are not returned again
    assert!(model.get_documents_topics(&mut done).unwrap().is_empty());
}

#[test]
fn lda_uses_the_fixed_number_of_topics() {
    let model = trained_lda(2);

    assert_eq!(model.get_number_of_topics().unwrap(), 2);
    assert_eq!(model.get_topics().unwrap(), vec![0, 1]);
    assert_eq!(model.get_model_name().unwrap(), "LDAModel");

    let top = model.get_topic_top_n_tokens(0, 3).unwrap();

    assert_eq!(top.len(), 3);
    assert!(top[0].1 >= top[1].1 && top[1].1 >= top[2].1);
}

#[test]
fn inference_is_deterministic() {
    let model = trained_lda(2);
    let unseen = vec![strings(&["apple", "banana"]), strings(&["engine", "road"])];

    let first = model.infer_documents_topics(&unseen, 20, 1).unwrap();
    let second = model.infer_documents_topics(&unseen, 20, 1).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].len(), 2);
}

#[test]
fn model_round_trips_through_a_file() {
    let model = trained_hdp();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    let written = model.save(&path, true).unwrap();

    assert!(written > 0);

    let mut restored = TopicModel::new();
    let read = restored.load(&path).unwrap();

    assert_eq!(read, written);
    assert_eq!(
        restored.get_topics_sorted().unwrap(),
        model.get_topics_sorted().unwrap()
    );
    assert_eq!(
        restored.get_vocabulary().unwrap(),
        model.get_vocabulary().unwrap()
    );
    assert_eq!(
        restored.get_iterations().unwrap(),
        model.get_iterations().unwrap()
    );
    assert_eq!(
        restored.get_number_of_documents().unwrap(),
        model.get_number_of_documents().unwrap()
    );
    assert_eq!(
        restored.get_random_number_generation_seed(),
        model.get_random_number_generation_seed()
    );
}

#[test]
fn loaded_models_reject_new_documents() {
    let model = trained_hdp();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    model.save(&path, true).unwrap();

    let mut restored = TopicModel::new();

    restored.load(&path).unwrap();

    assert!(matches!(
        restored.add_document("late", &strings(&["x"]), 0, 1),
        Err(Error::ModelAlreadyTrained { .. })
    ));
}

#[test]
fn resumable_models_accept_new_documents() {
    let model = trained_hdp();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    model.save(&path, true).unwrap();

    let mut restored = TopicModel::new();

    restored.set_resume_after_load(true).unwrap();
    restored.load(&path).unwrap();

    restored
        .add_document("fresh", &strings(&["grape", "fruit"]), 0, 2)
        .unwrap();

    restored.start_training().unwrap();
    restored.train(10, 1).unwrap();

    assert_eq!(restored.get_number_of_documents().unwrap(), 5);
}

#[test]
fn invalid_model_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.bin");

    std::fs::write(&path, b"definitely not a model file").unwrap();

    let mut model = TopicModel::new();

    assert!(matches!(
        model.load(&path),
        Err(Error::ModelFileInvalid { .. })
    ));
}

#[test]
fn token_removal_shrinks_the_used_vocabulary() {
    let mut model = TopicModel::new();

    model.set_fixed_number_of_topics(2).unwrap();
    model.set_random_number_generation_seed(42).unwrap();
    model.set_token_removal(0, 2, 1).unwrap();

    add_sample_documents(&mut model);

    model.start_training().unwrap();

    // every token occurring in a single document is removed, as is the
    // most frequent remaining one
    assert!(model.get_vocabulary_size().unwrap() < model.get_original_vocabulary_size().unwrap());
    assert_eq!(model.get_removed_tokens().unwrap().len(), 1);
}

#[test]
fn labelling_produces_ranked_labels() {
    let mut model = TopicModel::new();

    model.set_fixed_number_of_topics(2).unwrap();
    model.set_random_number_generation_seed(42).unwrap();
    model
        .set_labeling_options(LabelingOptions {
            active: true,
            min_cf: 1,
            min_df: 1,
            min_len: 1,
            max_len: 2,
            max_candidates: 16,
            smoothing: 0.01,
            mu: 0.25,
            window_size: 0,
        })
        .unwrap();

    add_sample_documents(&mut model);

    model.start_training().unwrap();
    model.train(30, 1).unwrap();
    model.label(1).unwrap();

    let labels = model.get_topic_top_n_labels(0, 3).unwrap();

    assert!(!labels.is_empty());
    assert!(labels.len() <= 3);
    assert!(labels.windows(2).all(|pair| pair[0].1 >= pair[1].1));
}

#[test]
fn inactive_labelling_yields_no_labels() {
    let mut model = trained_lda(2);

    model.label(1).unwrap();

    assert!(model.get_topic_top_n_labels(0, 5).unwrap().is_empty());
}

#[test]
fn zero_labels_requested_yields_nothing() {
    let model = trained_lda(2);

    assert!(model.get_topic_top_n_labels(0, 0).unwrap().is_empty());
}

#[test]
fn document_lookup() {
    let model = trained_hdp();

    assert_eq!(model.get_document_id("fruit-a").unwrap(), 0);
    assert!(matches!(
        model.get_document_id("nope"),
        Err(Error::UnknownDocument { .. })
    ));

    let documents = model.get_documents().unwrap();

    assert_eq!(documents.len(), 4);
    assert_eq!(documents["cars-b"], 3);
}

#[test]
fn model_info_reports_the_configuration() {
    let model = trained_lda(2);
    let info = model.get_model_info().unwrap();

    assert_eq!(info.model_name, "LDAModel");
    assert_eq!(info.number_of_documents, 4);
    assert_eq!(info.number_of_topics, 2);
    assert_eq!(info.alphas.len(), 2);
    assert_eq!(info.weighting, "TermWeight.ONE");
    assert_eq!(info.seed, 42);
    assert!(!info.trained_with_version.is_empty());
    assert!(info.token_entropy < 0.);
    assert!(info.log_likelihood_per_token < 0.);
}
