//! # research-search
//!
//! Hybrid retrieval and ranking engine for an internal research knowledge
//! base: given a natural-language query (optionally with conversation
//! history and an explicit research-identifier filter), it returns the most
//! relevant entries from two logical collections — project-level research
//! summaries and file-level research details.
//!
//! ## Architecture
//!
//! ```text
//!                        ┌──────────────┐
//!                        │  User Query   │
//!                        └──────┬───────┘
//!                               │
//!                        ┌──────▼───────┐
//!                        │  Classifier   │ identifier? discovery? image?
//!                        └──────┬───────┘
//!              discovery        │        lookup / identifier
//!            ┌──────────────────┴──────────────────┐
//!            ▼                                     ▼
//!   ┌─────────────────┐                  ┌──────────────────┐
//!   │  Summary mode    │                  │   Details mode    │
//!   │  embed + fused   │                  │  embed + fused    │
//!   │  query, k=limit  │                  │  query, k=3×limit │
//!   └────────┬────────┘                  └────────┬─────────┘
//!            │                                     │
//!            │                           ┌─────────▼────────┐
//!            │                           │  Deduplicator     │
//!            │                           │  (file versions)  │
//!            │                           └─────────┬────────┘
//!            │                           ┌─────────▼────────┐
//!            │                           │  Balancer         │
//!            │                           │  (image intent)   │
//!            │                           └─────────┬────────┘
//!            └──────────────────┬─────────────────┘
//!                        ┌──────▼───────┐
//!                        │  Tag Ranker   │
//!                        └──────┬───────┘
//!                               ▼
//!                         ranked results
//! ```
//!
//! The index backend and the embedding service are external collaborators
//! behind the [`index::gateway::SimilarityGateway`] and
//! [`llm::embeddings::EmbeddingProvider`] seams. Collaborator failures are
//! caught at the call site and degrade to empty results; a broken search
//! backend never breaks the response flow it feeds.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for the gateway, the
//!   embedding provider, and ranking knobs
//! - [`models`] - Shared data types: `SearchResult`, `DeepFileSearchResult`,
//!   `SearchWeights`, per-collection `FieldMapping` tables
//! - [`index::gateway`] - Fused lexical+vector query contract and its HTTP client
//! - [`llm::embeddings`] - Query embedding via Ollama or OpenAI-compatible APIs
//! - [`search::classify`] - Identifier extraction/detection, discovery and
//!   image-intent heuristics, routing policy
//! - [`search::dedup`] - Collapses near-duplicate file versions
//! - [`search::balance`] - Evens out the image/non-image mix on image intent
//! - [`search::tags`] - Query-relevance reordering of per-result tags
//! - [`search::categorize`] - File-type categorization for deep file search
//! - [`search::engine`] - The `SearchEngine` orchestrator tying it together

pub mod config;
pub mod index;
pub mod llm;
pub mod models;
pub mod search;
