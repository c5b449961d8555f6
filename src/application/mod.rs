//! Application services layer.

pub mod error;
pub mod provider;
pub mod rovers;
