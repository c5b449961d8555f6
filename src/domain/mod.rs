//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod rover;

pub use entities::{Camera, Manifest, Photo, PhotoSet, RoverSummary, SolSummary};
pub use error::DomainError;
pub use rover::{EarthDate, RoverId, Sol};
