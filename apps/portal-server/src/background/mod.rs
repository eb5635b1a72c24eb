//! Work that runs outside the request path.

#[cfg(feature = "scheduler")]
pub mod scheduler;
pub mod worker;
