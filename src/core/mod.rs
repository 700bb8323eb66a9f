//! Core types shared by every layer of the codec.
//!
//! - [`constants`]: protocol defaults and limits
//! - `error`: error enums for the wire and configuration surfaces
//! - `traits`: the [`EditTarget`] trait actions are applied through

pub mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
