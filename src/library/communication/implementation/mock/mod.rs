//! Test doubles for the traits from this module

mod requestor;

pub use requestor::*;
