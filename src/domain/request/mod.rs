//! Domain specific [`Request`](super::super::library::communication::request::Request) structures

mod lookup;

pub use lookup::*;
