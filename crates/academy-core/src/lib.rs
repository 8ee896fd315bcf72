//! Core types and the academy store.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! durable backend is reached only through [`kv::KeyValueStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod academy;
pub mod attendance;
pub mod detect;
pub mod error;
pub mod kv;
pub mod policy;
pub mod seed;
pub mod stats;
pub mod student;

pub use academy::Academy;
pub use error::{Error, Result};
