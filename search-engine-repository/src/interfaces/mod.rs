//! Interface definitions for the search engine abstraction.
//!
//! These traits are the seams between the core and its collaborators: the
//! backend capability interface, the query converter and the observer that
//! receives connection events.

mod connection_observer;
mod query_converter;
mod search_backend;

pub use connection_observer::{ConnectionObserver, TracingObserver};
pub use query_converter::QueryConverter;
pub use search_backend::SearchBackend;
