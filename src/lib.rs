//! duelsim: a card-buffed duel resolution engine and batch simulator.
//!
//! The [combat] module holds the engine: stat model, card effect ledger,
//! probabilistic damage resolver, turn scheduler, and batch aggregation.
//! [catalog] ingests card definitions from CSV with row-level validation.

pub mod catalog;
pub mod cli;
pub mod combat;
