//! Independent and project agnostic libraries
//!
//! Libraries in this module have been developed with the user feed in mind, however,
//! they are in no way bound to it and everything domain specific lives in the
//! [`domain`](super::domain) module.

pub mod communication;
pub mod helpers;

/// Generic error type
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result with no value and a [`BoxedError`]
pub type EmptyResult = Result<(), BoxedError>;
