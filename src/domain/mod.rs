//! Domain specific structures, implementations, and logic

/// Number of lookups that may wait in the shared queue
///
/// It should hold a number of items that equals the maximum reasonable burst of comment
/// submissions arriving while no responder is consuming.
const QUEUE_SIZE_LOOKUP: usize = 10_000;

mod article;
mod catalog;

pub mod request;

pub use article::*;
pub use catalog::*;
