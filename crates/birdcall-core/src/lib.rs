//! Core dispatch pipeline for posting notifications to the X/Twitter REST API.
//!
//! This crate is intentionally transport-agnostic. HTTP lives behind the
//! [`ports::Transport`] port, implemented in adapter crates (see `birdcall-reqwest`).

pub mod attachment;
pub mod batch;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod endpoint;
pub mod errors;
pub mod formatting;
pub mod gateway;
pub mod identity;
pub mod logging;
pub mod oauth;
pub mod ports;
pub mod rate_limit;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
