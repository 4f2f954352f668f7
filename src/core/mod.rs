// src/core/mod.rs — Domain types and the optimization pipeline

pub mod orchestrator;
pub mod ranking;
pub mod report;
pub mod types;
