pub mod error;

pub use error::{BackendError, LogRagError};
