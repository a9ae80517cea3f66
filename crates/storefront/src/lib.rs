//! PartsHub Storefront library.
//!
//! The two core components live here:
//!
//! - [`cart`] - the Cart Pricing Store: line items, discount and
//!   dual-currency pricing, derived totals
//! - [`checkout`] - the Checkout Orchestrator: the linear cart-to-order
//!   state machine with its partial-failure policy
//!
//! plus the [`api`] client for the remote parts API, configuration, error
//! handling, and the thin JSON [`routes`] the UI consumes. The binary in
//! `main.rs` wires these into an axum server.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{AppError, Result};
