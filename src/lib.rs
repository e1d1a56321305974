//! Dramaball Library
//!
//! Exposes the cache, data, story, config and CLI modules for the binary and
//! for integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod story;
