//! Runnable modules each bundling services and providing a unified configuration

pub mod options;

pub mod catalog;
pub mod lookup;
pub mod responder;
