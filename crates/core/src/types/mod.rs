//! Core types for CrowdFork.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod coordinates;
pub mod email;
pub mod id;
pub mod rating;

pub use coordinates::{Coordinates, CoordinatesError};
pub use email::{Email, EmailError};
pub use id::*;
pub use rating::{Rating, RatingError};
