pub mod error;
pub mod graph;
pub mod loader;
pub mod retry;
pub mod source;
pub mod staging;
pub mod statements;

pub use error::{GraphError, LoaderError};
pub use loader::{LoadSummary, Loader};
