//! CrowdFork Core - Shared types library.
//!
//! This crate provides the domain types used across the CrowdFork components:
//! - `client` - Search-and-favorites session controller and REST adapter
//! - `cli` - Command-line front end driving the client
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no runtime. This keeps it lightweight and usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for restaurant/review/user IDs, emails,
//!   ratings, and coordinates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
