//! Polymarket Agent — conversational access to prediction markets.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod platforms;
pub mod llm;
pub mod agent;
pub mod server;
