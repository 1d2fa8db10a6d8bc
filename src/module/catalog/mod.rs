//! Article catalog access
//!
//! The [`HttpArticleSource`] talks to the catalog REST API directly and backs the responder.
//! Everything else uses the [`MessagingArticleCatalog`] which asks that responder over the broker.

mod http;
mod messaging;

pub use http::*;
pub use messaging::*;
