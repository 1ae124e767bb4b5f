//! Core domain + application logic for the group warden bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `TransportPort` trait implemented in the adapter crate.

pub mod banlist;
pub mod broadcast;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod moderation;
pub mod registry;
pub mod scheduler;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
