// src/operators/mod.rs — Operator catalog and expression hygiene

pub mod catalog;
pub mod validator;

pub use catalog::OperatorCatalog;
pub use validator::{check, validate, Rejection};
