//! Core types and collaborator traits for the massmap sync core.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! sync engine, the storage backend and the CLI all depend on it; the
//! collaborators they plug in (rendering surface, ride query, message
//! transport, key-value store) are defined here as traits.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod chat;
pub mod entity;
pub mod error;
pub mod feature;
pub mod friends;
pub mod location;
pub mod permission;
pub mod preferences;
pub mod ride;
pub mod surface;

pub use error::{Error, Result};
