// src/lib.rs

//! Screening intake library
//!
//! Upload proxy, screening record store and the staged submission
//! sequencer shared by the CLI and the Lambda backend.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
