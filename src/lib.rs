// src/lib.rs — Library root for factor-optimizer

pub mod brain;
pub mod cli;
pub mod core;
pub mod infra;
pub mod operators;
pub mod provider;
pub mod suggest;
pub mod util;
