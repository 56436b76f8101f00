//! Template evaluation for computed keys.
//!
//! This module provides:
//! - `{{name}}` substitution with collect-all error reporting (`substitute`)
//! - Connection-string detection and credential extraction (`connection`)
//! - The JSON payload record stored for computed keys (`payload`)

pub mod connection;
pub mod payload;
pub mod substitute;

pub use connection::{detect, ConnectionTemplate, DEFAULT_SCHEMES};
pub use payload::{marshal, Payload};
pub use substitute::{placeholders, substitute};
