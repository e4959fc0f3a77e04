//! Command implementations.

pub mod chat;
pub mod config;
pub mod serve;
pub mod translate;
