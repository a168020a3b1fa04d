use ncv_core::error::AppError;
use sha2::{Digest, Sha256};

use super::Embedder;
use crate::tokenize::tokens;

/// Offline embedder: signed feature hashing of word tokens, L2-normalised.
///
/// Texts sharing vocabulary land close in cosine space. Deterministic across runs
/// and platforms since buckets come from SHA-256 rather than a seeded hasher.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Result<Self, AppError> {
        if dims == 0 {
            return Err(AppError::invalid_argument("Embedding dims must be positive"));
        }
        Ok(Self {
            dims,
            model_id: format!("hashing-{dims}"),
        })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        let mut v = vec![0.0f32; self.dims];
        for token in tokens(input) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        Ok(v)
    }
}
