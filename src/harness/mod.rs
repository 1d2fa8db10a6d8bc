//! Runtime harness to execute services in the context of components

mod heart;
mod module;
mod redis;
mod service;

pub use self::redis::*;
pub use heart::*;
pub use module::*;
pub use service::*;
