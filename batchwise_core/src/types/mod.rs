pub mod data_source;
pub mod query;
pub mod result;

pub use data_source::*;
pub use query::*;
pub use result::*;
