//! Core types and trait definitions for p2k16.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the domain model, the [`store::Store`] persistence abstraction, and the
//! [`lifecycle::ToolLifecycle`] manager that enforces the checkout rules.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod badge;
pub mod circle;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod membership;
pub mod session;
pub mod store;
pub mod tool;

pub use error::{Entity, Error, Result};
