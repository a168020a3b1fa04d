use std::time::Duration;

use ncv_ai::embeddings::{Embedder, HashingEmbedder, OllamaEmbedder};
use ncv_ai::llm::{Llm, OllamaLlm};
use ncv_ai::ollama::OllamaClient;
use ncv_ai::retrieve::similarity::{cosine_similarity, l2_norm};
use pretty_assertions::assert_eq;

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity(a, b, l2_norm(a), l2_norm(b))
}

#[test]
fn hashing_embedder_is_deterministic_and_normalised() {
    let e = HashingEmbedder::new(128).unwrap();
    assert_eq!(e.dims(), 128);
    assert_eq!(e.model_id(), "hashing-128");

    let a = e.embed("The fisherman mended his nets.").unwrap();
    let b = HashingEmbedder::new(128).unwrap().embed("The fisherman mended his nets.").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 128);
    assert!((l2_norm(&a) - 1.0).abs() < 1e-5);
}

#[test]
fn shared_vocabulary_scores_higher() {
    let e = HashingEmbedder::new(256).unwrap();
    let claim = e.embed("born in Paris to a poor family").unwrap();
    let close = e.embed("He was born in Paris, to a poor family of weavers.").unwrap();
    let far = e.embed("Whales breached beyond the reef at dawn.").unwrap();
    assert!(cosine(&claim, &close) > cosine(&claim, &far));
    // Case and edge punctuation are ignored.
    assert_eq!(e.embed("Paris!").unwrap(), e.embed("paris").unwrap());
}

#[test]
fn empty_text_embeds_to_zero_vector() {
    let e = HashingEmbedder::new(16).unwrap();
    let v = e.embed("  ...  ").unwrap();
    assert!(v.iter().all(|x| *x == 0.0));
    assert_eq!(cosine(&v, &e.embed("word").unwrap()), 0.0);
}

#[test]
fn zero_dims_is_invalid() {
    assert_eq!(HashingEmbedder::new(0).unwrap_err().code, "INVALID_ARGUMENT");
}

#[test]
fn unreachable_ollama_reports_retryable_errors() {
    let client = OllamaClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();

    let err = OllamaEmbedder::new(client.clone(), "all-minilm").embed("text").unwrap_err();
    assert_eq!(err.code, "EMBEDDINGS_FAILED");
    assert!(err.retryable);

    let err = OllamaLlm::new(client.clone(), "llama3.1:8b").generate("prompt").unwrap_err();
    assert_eq!(err.code, "LLM_GENERATE_FAILED");
    assert!(err.retryable);

    assert_eq!(client.health_check().unwrap_err().code, "LLM_UNREACHABLE");
}
