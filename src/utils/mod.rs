//! Utility functions and helpers.

pub mod console;
pub mod http;
