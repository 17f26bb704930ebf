//! # jast-remote
//!
//! The [`RemoteStore`] seam and its implementations:
//!
//! - [`JamfClient`] talks to a Jamf Pro server over HTTPS.
//! - `MemoryStore` keeps records in process and records every call. It is
//!   built for this crate's tests and behind the `test-support` feature.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod payload;
pub mod store;

pub use client::{ClientOptions, JamfClient};
pub use error::RemoteError;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
pub use store::RemoteStore;
