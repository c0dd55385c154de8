//! Embedding provider clients (Ollama or OpenAI-compatible APIs).

pub mod embeddings;
