//! Mood playlist recommendations over a SQLite track catalog.

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod http;
pub mod storage;
pub mod taxonomy;
