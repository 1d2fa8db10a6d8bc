//! This library crate contains everything needed to verify catalog articles for the user feed.
//!
//! Submodules have been introduced to split responsibilities. They together form a chain of
//! dependencies from the low-level [`library`], over the feed specific [`domain`], through
//! the executable [`harness`], up to the high-level [`modules`](module) which wire everything
//! into runnable components.

#![deny(missing_docs)]

pub mod domain;
pub mod harness;
pub mod library;
pub mod module;
