//! currconv library
//!
//! Exposes the cache, lookup and menu modules for the binary and for
//! integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod lookup;
