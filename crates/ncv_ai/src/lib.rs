pub mod aggregate;
pub mod decompose;
pub mod embeddings;
pub mod evidence;
pub mod llm;
pub mod ollama;
pub mod pacing;
pub mod pipeline;
pub mod retrieve;
pub mod tokenize;
pub mod verify;
