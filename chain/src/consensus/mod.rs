//! Consensus layer: Nxt-style hit/target forging rule plus the block
//! validity predicates that compose around it.
//!
//! - [`params`]: protocol constants (`AvgDelay`, genesis base target, ...).
//! - [`config::ConsensusConfig`]: tunable limits.
//! - [`engine`]: the stateless Nxt primitives (`hit`, `target`,
//!   `baseTarget` retargeting, `generateNextBlock`) plus
//!   [`engine::ConsensusValidity`], a [`validator::BlockValidator`]
//!   adapter bound to a specific parent.
//! - [`validator`]: the `BlockValidator` trait and combinators.
//! - [`error`]: `ValidationError` / `ConsensusError`.

pub mod config;
pub mod engine;
pub mod error;
pub mod params;
pub mod validator;

pub use config::ConsensusConfig;
pub use error::{ConsensusError, ValidationError};
pub use validator::{AcceptAllValidator, BlockValidator, CombinedValidator};
