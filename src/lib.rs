//! Checkpoint persistence, cached per-epoch results and evaluation
//! metrics for a relation classifier built on Burn.

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
