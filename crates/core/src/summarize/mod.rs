//! Summarization of KPI tables into the persisted business-insight
//! documents.
//!
//! Field names here are load-bearing: the JSON produced by these structs is
//! what gets persisted per (program, analysis type) and later fed into offer
//! generation, so renames are a compatibility break.

pub mod customer;
pub mod order;
