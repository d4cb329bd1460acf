//! Token Signal Bot
//!
//! Stream-driven pipeline that turns free-text token alerts from social
//! feeds into per-token state and filtered, rate-limited notifications.

pub mod config;
pub mod decision;
pub mod error;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod storage;
pub mod stream;
pub mod types;
