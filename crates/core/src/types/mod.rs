//! Core types for PartsHub.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod status;

pub use id::*;
pub use money::{ExchangeRate, LocalAmount, Usd};
pub use status::*;
