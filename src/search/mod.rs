//! Retrieval core: query classification, the search orchestrator, and the
//! pure post-processing stages (dedup, balance, tag ranking, categorization).

pub mod balance;
pub mod categorize;
pub mod classify;
pub mod dedup;
pub mod engine;
pub mod tags;
