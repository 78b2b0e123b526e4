pub mod error;
pub mod normal;
pub mod types;

#[cfg(feature = "structural")]
pub mod structural;

pub use error::MertonKmvError;
pub use types::*;

/// Standard result type for all merton-kmv operations
pub type MertonKmvResult<T> = Result<T, MertonKmvError>;
