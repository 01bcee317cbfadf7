//! Glue Common Library
//!
//! Shared types, constants, and utilities for the Glue Protocol reserve
//! engine.
//!
//! ## Overview
//!
//! Sticky assets are fungible or non-fungible tokens backed by a pool of
//! reserve tokens. Burning ("ungluing") sticky tokens redeems a
//! proportional share of every reserve; the same reserves back flash loans.
//!
//! This crate holds the pieces that carry no execution context:
//!
//! - **Math**: multiply-then-divide with explicit rounding direction
//! - **Reserve Ledger**: tracked reserve balances and their storage layout
//! - **Errors**: typed, coded errors shared by every component
//! - **Events**: indexable protocol events and the event log
//! - **Config**: runtime parameters and their bounds

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod math;
pub mod types;

// Re-exports for convenience
pub use config::*;
pub use errors::*;
pub use events::*;
pub use ledger::*;
pub use math::*;
pub use types::*;
