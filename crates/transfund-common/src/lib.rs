//! # TransFund Common
//!
//! Shared types, errors, and constants used across TransFund verification
//! components.
//!
//! ## Modules
//! - `types` - Core data structures (Identity, Challenge, wire payloads)
//! - `error` - Common error taxonomy
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Result, TransfundError};
pub use types::*;
