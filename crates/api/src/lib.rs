pub mod error;
pub mod models;

// Re-export commonly used types
pub use error::ResolutionFailure;
pub use models::*;
