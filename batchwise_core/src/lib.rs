//! batchwise_core - request, query and result types
//!
//! These types are shared between the batching engine in `batchwise_query`
//! and the executors that plug into it. They carry no behaviour beyond
//! construction helpers.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
