pub mod atomic;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod errors;
pub mod generator;
pub mod manifest;
pub mod metadata;
pub mod resolver;
pub mod seal;
pub mod store;
pub mod template;

#[cfg(feature = "audit-log")]
pub mod audit;
