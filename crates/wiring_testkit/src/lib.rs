//! # Wiring Testkit
//!
//! Test utilities for wiring.
//!
//! This crate provides:
//! - Fixture payload types and registry helpers
//! - Property-based test generators using proptest
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use wiring_testkit::prelude::*;
//!
//! with_registry(|registry| {
//!     let circuit = scenarios::small_circuit(registry).unwrap();
//!     assert_eq!(circuit.carrier.payload().data_id, circuit.data.id().as_u64());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
