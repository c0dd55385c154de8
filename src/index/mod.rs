//! Similarity index gateway: the fused lexical+vector query contract.

pub mod gateway;
