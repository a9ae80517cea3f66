//! PartsHub Core - Shared types library.
//!
//! This crate provides common types used across all PartsHub components:
//! - `storefront` - Public-facing auto-parts store and checkout
//! - `integration-tests` - End-to-end checkout workflow tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, decimal money amounts,
//!   exchange rates, and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
