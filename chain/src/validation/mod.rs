//! Block validity predicates for the chain.
//!
//! This module implements concrete block validators that plug into the
//! consensus layer via [`crate::consensus::validator::BlockValidator`].
//!
//! - [`base::StructuralValidity`]: signature, size, and tx-count checks.
//! - [`crate::consensus::engine`] supplies the Nxt-specific consensus
//!   checks, composed alongside this one via
//!   [`crate::consensus::validator::CombinedValidator`].

pub mod base;

pub use base::StructuralValidity;
