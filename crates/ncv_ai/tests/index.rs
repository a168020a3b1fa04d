use std::sync::Arc;

use ncv_ai::embeddings::Embedder;
use ncv_ai::evidence::{build_index, Chunk, ChunkParams, IndexHandle, VectorIndex};
use ncv_core::domain::Document;
use ncv_core::error::AppError;
use pretty_assertions::assert_eq;

fn chunk(document_id: &str, ordinal: u32, text: &str) -> Chunk {
    Chunk {
        chunk_id: format!("{document_id}-{ordinal}"),
        document_id: document_id.to_string(),
        ordinal,
        text: text.to_string(),
        text_sha256: String::new(),
        char_range: [0, text.chars().count() as u32],
    }
}

fn sample_index() -> VectorIndex {
    VectorIndex::build(
        2,
        vec![
            (vec![1.0, 0.0], chunk("a", 0, "east")),
            (vec![0.0, 1.0], chunk("a", 1, "north")),
            (vec![1.0, 1.0], chunk("b", 0, "north-east")),
            (vec![2.0, 0.0], chunk("b", 1, "far east")),
            (vec![-1.0, 0.0], chunk("b", 2, "west")),
        ],
    )
    .expect("build")
}

fn ids(hits: &[ncv_ai::evidence::IndexHit]) -> Vec<String> {
    hits.iter().map(|h| h.chunk.chunk_id.clone()).collect()
}

#[test]
fn has_document_matches_ids_exactly() {
    let index = sample_index();
    assert!(index.has_document("a"));
    assert!(index.has_document("b"));
    assert!(!index.has_document("A"));
    assert!(!index.has_document("c"));
    assert!(!VectorIndex::build(2, Vec::new()).unwrap().has_document("a"));
}

#[test]
fn large_k_returns_everything_sorted_with_stable_ties() {
    let index = sample_index();
    let hits = index.query(&[1.0, 0.0], 100, None).expect("query");
    // a-0 and b-1 both score 1.0; insertion order decides.
    assert_eq!(ids(&hits), vec!["a-0", "b-1", "b-0", "a-1", "b-2"]);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!((hits[4].score + 1.0).abs() < 1e-6);
}

#[test]
fn truncates_to_k() {
    let index = sample_index();
    let hits = index.query(&[1.0, 0.0], 2, None).expect("query");
    assert_eq!(ids(&hits), vec!["a-0", "b-1"]);
}

#[test]
fn non_positive_k_is_invalid() {
    let index = sample_index();
    for k in [0, -1, -100] {
        let err = index.query(&[1.0, 0.0], k, None).expect_err("should error");
        assert_eq!(err.code, "INVALID_ARGUMENT");
    }
}

#[test]
fn empty_index_returns_no_hits() {
    let index = VectorIndex::build(3, Vec::new()).expect("build");
    assert!(index.is_empty());
    assert!(index.query(&[1.0, 0.0, 0.0], 5, None).expect("query").is_empty());
}

#[test]
fn filter_applies_before_truncation() {
    let index = sample_index();
    // Unfiltered, the top two include a-0. Filtered to "b", we still get two "b" hits.
    let hits = index.query(&[1.0, 0.0], 2, Some("b")).expect("query");
    assert_eq!(ids(&hits), vec!["b-1", "b-0"]);

    let none = index.query(&[1.0, 0.0], 2, Some("missing")).expect("query");
    assert!(none.is_empty());
}

#[test]
fn rejects_mismatched_dims() {
    let err = VectorIndex::build(2, vec![(vec![1.0, 0.0, 0.0], chunk("a", 0, "x"))]).expect_err("build");
    assert_eq!(err.code, "INVALID_ARGUMENT");

    let err = VectorIndex::build(0, Vec::new()).expect_err("build");
    assert_eq!(err.code, "INVALID_ARGUMENT");

    let err = sample_index().query(&[1.0, 0.0, 0.0], 1, None).expect_err("query");
    assert_eq!(err.code, "INVALID_ARGUMENT");
}

#[test]
fn rejects_non_finite_vectors() {
    let err = VectorIndex::build(2, vec![(vec![f32::NAN, 0.0], chunk("a", 0, "x"))]).expect_err("build");
    assert_eq!(err.code, "INVALID_ARGUMENT");
}

#[test]
fn zero_vectors_score_zero_instead_of_failing() {
    let index = VectorIndex::build(
        2,
        vec![(vec![0.0, 0.0], chunk("a", 0, "blank")), (vec![1.0, 0.0], chunk("a", 1, "x"))],
    )
    .expect("build");
    let hits = index.query(&[1.0, 0.0], 5, None).expect("query");
    assert_eq!(ids(&hits), vec!["a-1", "a-0"]);
    assert_eq!(hits[1].score, 0.0);
}

#[test]
fn save_and_load_preserve_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("index.json");
    let index = sample_index().with_model("mock");
    index.save(&path).expect("save");
    assert!(!path.with_extension("tmp").exists());

    let loaded = VectorIndex::load(&path).expect("load");
    assert_eq!(loaded.status(), index.status());
    assert_eq!(loaded.status().document_count, 2);
    assert_eq!(loaded.status().embedding_model.as_deref(), Some("mock"));
    assert_eq!(
        loaded.query(&[0.3, 0.7], 5, None).unwrap(),
        index.query(&[0.3, 0.7], 5, None).unwrap()
    );
}

#[test]
fn load_reports_missing_and_corrupt_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = VectorIndex::load(&dir.path().join("absent.json")).expect_err("load");
    assert_eq!(missing.code, "INDEX_NOT_FOUND");

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "{not json").unwrap();
    assert_eq!(VectorIndex::load(&corrupt).unwrap_err().code, "INDEX_CORRUPT");
}

struct LenEmbedder;

impl Embedder for LenEmbedder {
    fn model_id(&self) -> &str {
        "len"
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        let vowels = input.chars().filter(|c| "aeiou".contains(*c)).count();
        Ok(vec![input.len() as f32, vowels as f32, 1.0])
    }
}

struct DriftingEmbedder;

impl Embedder for DriftingEmbedder {
    fn model_id(&self) -> &str {
        "drift"
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        Ok(vec![1.0; 1 + input.len() % 2])
    }
}

#[test]
fn build_index_orders_by_document_then_ordinal() {
    let docs = vec![
        Document::new("zeta", "Zeta one. Zeta two. Zeta three."),
        Document::new("alpha", "Alpha one. Alpha two."),
    ];
    let index = build_index(&docs, &LenEmbedder, ChunkParams::new(12, 2).unwrap()).expect("build");
    let order = index
        .chunks()
        .map(|c| (c.document_id.clone(), c.ordinal))
        .collect::<Vec<_>>();
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);
    assert_eq!(order[0], ("alpha".to_string(), 0));

    let st = index.status();
    assert_eq!(st.dims, 3);
    assert_eq!(st.document_count, 2);
    assert_eq!(st.embedding_model.as_deref(), Some("len"));
}

#[test]
fn build_index_rejects_empty_and_duplicate_corpora() {
    let params = ChunkParams::new(100, 10).unwrap();
    let err = build_index(&[], &LenEmbedder, params).expect_err("empty");
    assert_eq!(err.code, "INVALID_ARGUMENT");

    let blank = vec![Document::new("blank", "")];
    assert_eq!(build_index(&blank, &LenEmbedder, params).unwrap_err().code, "INVALID_ARGUMENT");

    let dup = vec![Document::new("a", "one"), Document::new("a", "two")];
    assert_eq!(build_index(&dup, &LenEmbedder, params).unwrap_err().code, "INVALID_ARGUMENT");
}

#[test]
fn build_index_rejects_dimension_drift() {
    let docs = vec![Document::new("a", "ab abc abcd abcde abcdef")];
    let err = build_index(&docs, &DriftingEmbedder, ChunkParams::new(5, 0).unwrap()).expect_err("drift");
    assert_eq!(err.code, "INDEX_BUILD_FAILED");
}

#[test]
fn published_index_replaces_snapshot_atomically() {
    let handle = Arc::new(IndexHandle::new(VectorIndex::build(2, Vec::new()).unwrap()));
    let before = handle.snapshot();
    assert!(before.is_empty());

    handle.publish(sample_index());
    let after = handle.snapshot();
    assert_eq!(after.len(), 5);
    // Readers holding the old snapshot keep a complete, unchanged view.
    assert!(before.is_empty());
}
