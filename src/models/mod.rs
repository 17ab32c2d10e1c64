//! Data models for the GTN API client.
//!
//! - [`primitives`] - Identifier newtypes (`CustomerNumber`, `Channel`)
//! - [`token`] - Access/refresh token pairs
//! - [`status`] - Login outcomes and session states

pub mod primitives;
pub mod status;
pub mod token;

pub use primitives::*;
pub use status::*;
pub use token::*;
