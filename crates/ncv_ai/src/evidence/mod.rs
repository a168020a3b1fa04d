pub mod chunking;
pub mod index;
pub mod model;

pub use chunking::{chunk_document, ChunkParams};
pub use index::{build_index, IndexHandle, IndexHit, IndexStatus, VectorIndex};
pub use model::{Chunk, Evidence, EvidenceHit};
